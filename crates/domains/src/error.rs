//! # MirrorError
//!
//! Failure kinds shared by the transport, decoding and cache layers.
//! A thread that no longer exists is not an error: lookups report it as `None`.

use thiserror::Error;

/// Every fallible board operation fails with one of these.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Network or transfer failure. Never retried by the core.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a status outside 200/304/404.
    #[error("unexpected response status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// A page index beyond the board's page count.
    #[error("page {0} not found")]
    PageNotFound(u32),

    #[error("catalog not found")]
    CatalogNotFound,

    /// Schema or parse failure on an otherwise successful fetch.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The caller's deadline elapsed before the transport answered.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::MalformedPayload(err.to_string())
    }
}

/// A specialized Result type for mirror logic.
pub type Result<T> = std::result::Result<T, MirrorError>;
