//! crates/services/src/lib.rs
//!
//! The cache-consistency and incremental-synchronization engine: per-thread
//! fetch/merge/expiry, and reconciliation of the thread, page and catalog
//! caches over shared thread objects.

pub mod board;
pub mod cache;
pub mod deadline;
pub mod thread;

pub use board::Board;
pub use cache::SharedThread;
pub use deadline::Deadline;
pub use thread::{Thread, UpdateOutcome};
