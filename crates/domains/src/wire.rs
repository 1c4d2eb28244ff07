//! # Wire Payloads
//!
//! Shapes of the three JSON documents the remote serves. Decoding is done
//! in full before any cache is touched, so a bad payload never leaves a
//! half-applied update behind.

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};
use crate::models::PostData;

/// A thread document: a flat ordered post list, topic first.
///
/// Page listings reuse the same shape for their thread summaries, with a
/// truncated reply list and omitted counts on the topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadPayload {
    pub posts: Vec<PostData>,
}

impl ThreadPayload {
    /// Decodes a thread document, rejecting one without a topic post.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let payload: ThreadPayload = serde_json::from_slice(body)?;
        payload.topic()?;
        Ok(payload)
    }

    pub fn topic(&self) -> Result<&PostData> {
        self.posts
            .first()
            .ok_or_else(|| MirrorError::MalformedPayload("thread has no posts".into()))
    }

    /// Splits into the topic and its replies, in arrival order.
    pub fn into_parts(self) -> Result<(PostData, Vec<PostData>)> {
        let mut posts = self.posts.into_iter();
        let topic = posts
            .next()
            .ok_or_else(|| MirrorError::MalformedPayload("thread has no posts".into()))?;
        Ok((topic, posts.collect()))
    }
}

/// One board index page: thread summaries in position order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagePayload {
    pub threads: Vec<ThreadPayload>,
}

impl PagePayload {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let payload: PagePayload = serde_json::from_slice(body)?;
        for summary in &payload.threads {
            summary.topic()?;
        }
        Ok(payload)
    }
}

/// One page of the catalog, each thread summarized by its topic post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub page: u32,
    #[serde(default)]
    pub threads: Vec<PostData>,
}

impl CatalogPage {
    /// Decodes the whole catalog document.
    pub fn list_from_slice(body: &[u8]) -> Result<Vec<Self>> {
        Ok(serde_json::from_slice(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thread_payload_keeps_arrival_order() {
        let body = json!({ "posts": [
            { "no": 100, "resto": 0, "sub": "topic" },
            { "no": 101, "resto": 100 },
            { "no": 103, "resto": 100 },
        ]})
        .to_string();

        let (topic, replies) = ThreadPayload::from_slice(body.as_bytes())
            .unwrap()
            .into_parts()
            .unwrap();
        assert_eq!(topic.number, 100);
        assert_eq!(topic.subject, "topic");
        let numbers: Vec<u64> = replies.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![101, 103]);
    }

    #[test]
    fn empty_thread_is_malformed() {
        let err = ThreadPayload::from_slice(br#"{"posts": []}"#).unwrap_err();
        assert!(matches!(err, MirrorError::MalformedPayload(_)));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = PagePayload::from_slice(b"<html>").unwrap_err();
        assert!(matches!(err, MirrorError::MalformedPayload(_)));
    }

    #[test]
    fn page_summary_without_topic_is_rejected() {
        let body = json!({ "threads": [ { "posts": [ { "no": 1 } ] }, { "posts": [] } ] }).to_string();
        assert!(PagePayload::from_slice(body.as_bytes()).is_err());
    }

    #[test]
    fn catalog_decodes_pages_and_summaries() {
        let body = json!([
            { "page": 1, "threads": [ { "no": 100, "omitted_posts": 4, "last_replies": [ { "no": 150, "resto": 100 } ] } ] },
            { "page": 2, "threads": [ { "no": 200 } ] },
        ])
        .to_string();

        let pages = CatalogPage::list_from_slice(body.as_bytes()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].threads[0].omitted_posts, 4);
        assert_eq!(pages[0].threads[0].last_replies[0].number, 150);
        assert_eq!(pages[1].threads[0].number, 200);
    }
}
