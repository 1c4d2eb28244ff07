//! # transport-adapters
//!
//! `reqwest` implementation of the `Transport` port: a conditional GET keyed
//! on `If-Modified-Since` / `Last-Modified`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{FetchResponse, FetchStatus, MirrorError, Result, Transport, Watermark};
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use tracing::{debug, warn};

/// IMF-fixdate, the only format servers must accept in conditional headers.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, since: Option<Watermark>) -> Result<FetchResponse> {
        let mut request = self.client.get(url);
        if let Some(watermark) = since {
            request = request.header(IF_MODIFIED_SINCE, format_http_date(watermark));
        }

        let response = request
            .send()
            .await
            .map_err(|e| MirrorError::Transport(e.to_string()))?;
        let status = FetchStatus::from_code(response.status().as_u16());
        debug!(url, status = status.code(), "fetched");
        if status != FetchStatus::Fresh {
            return Ok(FetchResponse::empty(status));
        }

        let watermark = match response.headers().get(LAST_MODIFIED) {
            Some(value) => {
                let parsed = value.to_str().ok().and_then(parse_http_date);
                if parsed.is_none() {
                    warn!(url, value = ?value, "unparseable Last-Modified header");
                }
                parsed
            }
            None => {
                warn!(url, "response carries no Last-Modified header");
                None
            }
        };
        let body = response
            .bytes()
            .await
            .map_err(|e| MirrorError::Transport(e.to_string()))?;
        Ok(FetchResponse::fresh(body, watermark))
    }
}

pub fn format_http_date(watermark: Watermark) -> String {
    watermark.timestamp().format(HTTP_DATE_FORMAT).to_string()
}

/// Parses an HTTP date header value (RFC 2822 with the `GMT` zone).
pub fn parse_http_date(value: &str) -> Option<Watermark> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|at| Watermark::new(at.with_timezone(&Utc)))
}
