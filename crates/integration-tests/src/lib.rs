//! Shared fixtures for the integration tests: a scripted transport and
//! JSON payload builders.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use domains::{BoardInfo, FetchResponse, MirrorError, Result, Transport, Watermark};
use serde_json::{json, Value};

pub const BOARD: &str = "g";

pub fn board_info() -> BoardInfo {
    BoardInfo::new(BOARD, true)
}

pub fn thread_url(id: u64) -> String {
    board_info().thread_endpoint(id)
}

pub fn page_url(page: u32) -> String {
    board_info().page_endpoint(page)
}

pub fn catalog_url() -> String {
    board_info().catalog_endpoint()
}

/// A watermark `n` seconds after a fixed epoch.
pub fn stamp(n: i64) -> Watermark {
    Watermark::new(chrono::DateTime::from_timestamp(1_700_000_000 + n, 0).expect("valid timestamp"))
}

fn post(number: u64, topic: u64) -> Value {
    let resto = if number == topic { 0 } else { topic };
    json!({ "no": number, "resto": resto, "com": format!("post {number}") })
}

/// Thread document: `numbers[0]` is the topic.
pub fn thread_json(numbers: &[u64]) -> Value {
    let topic = numbers[0];
    json!({ "posts": numbers.iter().map(|&n| post(n, topic)).collect::<Vec<_>>() })
}

/// Page document from thread summaries; each summary is (posts, omitted).
pub fn page_json(summaries: &[(&[u64], u32)]) -> Value {
    let threads: Vec<Value> = summaries
        .iter()
        .map(|(numbers, omitted)| {
            let mut summary = thread_json(numbers);
            summary["posts"][0]["omitted_posts"] = json!(omitted);
            summary
        })
        .collect();
    json!({ "threads": threads })
}

/// Catalog document: one entry per page, listing topic numbers.
pub fn catalog_json(pages: &[&[u64]]) -> Value {
    let pages: Vec<Value> = pages
        .iter()
        .enumerate()
        .map(|(i, ids)| {
            let threads: Vec<Value> = ids.iter().map(|&id| post(id, id)).collect();
            json!({ "page": i + 1, "threads": threads })
        })
        .collect();
    json!(pages)
}

pub fn fresh(body: Value, watermark: Option<Watermark>) -> FetchResponse {
    FetchResponse::fresh(body.to_string(), watermark)
}

/// Transport answering each URL from a FIFO of canned responses.
///
/// Every request is recorded; a URL with no response left fails with a
/// transport error naming it. A stalled URL never answers within an hour.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<FetchResponse>>>,
    stalled: Mutex<HashSet<String>>,
    requests: Mutex<Vec<(String, Option<Watermark>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: impl Into<String>, response: FetchResponse) -> &Self {
        self.script
            .lock()
            .expect("script lock")
            .entry(url.into())
            .or_default()
            .push_back(response);
        self
    }

    pub fn stall(&self, url: impl Into<String>) -> &Self {
        self.stalled.lock().expect("stall lock").insert(url.into());
        self
    }

    pub fn requests(&self) -> Vec<(String, Option<Watermark>)> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, url: &str) -> usize {
        self.requests().iter().filter(|(u, _)| u == url).count()
    }

    pub fn pending(&self) -> usize {
        self.script.lock().expect("script lock").values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &str, since: Option<Watermark>) -> Result<FetchResponse> {
        self.requests.lock().expect("requests lock").push((url.to_string(), since));
        let stalled = self.stalled.lock().expect("stall lock").contains(url);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.script
            .lock()
            .expect("script lock")
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| MirrorError::Transport(format!("unscripted request to {url}")))
    }
}
