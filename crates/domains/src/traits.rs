//! # Core Traits (Ports)
//!
//! Any transport must implement these traits to be used by the services.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::models::Watermark;

/// Outcome of a conditional fetch, as far as the core cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// 200: the body holds current data.
    Fresh,
    /// 304: nothing changed since the presented watermark.
    NotModified,
    /// 404: the resource is gone.
    NotFound,
    /// Anything else, with the raw status code.
    Unexpected(u16),
}

impl FetchStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => FetchStatus::Fresh,
            304 => FetchStatus::NotModified,
            404 => FetchStatus::NotFound,
            other => FetchStatus::Unexpected(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            FetchStatus::Fresh => 200,
            FetchStatus::NotModified => 304,
            FetchStatus::NotFound => 404,
            FetchStatus::Unexpected(code) => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: FetchStatus,
    pub body: Bytes,
    /// Freshness token to present on the next fetch, when the remote sent one.
    pub watermark: Option<Watermark>,
}

impl FetchResponse {
    pub fn fresh(body: impl Into<Bytes>, watermark: Option<Watermark>) -> Self {
        Self {
            status: FetchStatus::Fresh,
            body: body.into(),
            watermark,
        }
    }

    pub fn not_modified() -> Self {
        Self::empty(FetchStatus::NotModified)
    }

    pub fn not_found() -> Self {
        Self::empty(FetchStatus::NotFound)
    }

    pub fn empty(status: FetchStatus) -> Self {
        Self {
            status,
            body: Bytes::new(),
            watermark: None,
        }
    }
}

/// Conditional GET contract.
///
/// `since` is the watermark from the previous successful fetch of the same
/// URL; `None` asks for an unconditional fetch. Network failures surface as
/// `MirrorError::Transport`; every HTTP status is a successful return.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, since: Option<Watermark>) -> Result<FetchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_the_modeled_set() {
        assert_eq!(FetchStatus::from_code(200), FetchStatus::Fresh);
        assert_eq!(FetchStatus::from_code(304), FetchStatus::NotModified);
        assert_eq!(FetchStatus::from_code(404), FetchStatus::NotFound);
        assert_eq!(FetchStatus::from_code(503), FetchStatus::Unexpected(503));
        assert_eq!(FetchStatus::Unexpected(418).code(), 418);
    }
}
