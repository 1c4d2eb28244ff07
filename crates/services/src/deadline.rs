//! Per-call deadline threaded through every board operation.

use std::future::Future;
use std::time::Duration;

use domains::{MirrorError, Result};
use tokio::time::Instant;

/// Point in time after which pending transport calls are abandoned.
///
/// Dropping an operation's future cancels it; caches are only written after
/// a response is fully decoded, so cancellation never leaves them torn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// No deadline: wait as long as the transport does.
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    pub fn at(at: Instant) -> Self {
        Self { at: Some(at) }
    }

    pub(crate) async fn run<T, F>(self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.at {
            None => fut.await,
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| MirrorError::DeadlineExceeded)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_deadline_passes_result_through() {
        let value = Deadline::none().run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_fails() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let result: Result<()> = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(MirrorError::DeadlineExceeded)));
    }
}
