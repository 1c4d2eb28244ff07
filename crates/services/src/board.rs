//! # Board
//!
//! Coordinates the thread, page and catalog caches of one remote board and
//! decides when a remote fetch is required.
//!
//! ## Locking
//! All cache maps and every thread's mutable fields are written only while
//! the board lock is held, board lock first, thread lock second. The lock is
//! never held across a network round trip: each operation fetches and
//! decodes first, then applies the result in one locked step.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use domains::{
    BoardInfo, CatalogPage, FetchResponse, FetchStatus, MirrorError, PagePayload, Result,
    ThreadPayload, Transport, Watermark,
};
use tracing::{debug, info, warn};

use crate::cache::{BoardCaches, SharedThread};
use crate::deadline::Deadline;
use crate::thread::{Thread, UpdateOutcome};

pub struct Board {
    info: Arc<BoardInfo>,
    transport: Arc<dyn Transport>,
    caches: Mutex<BoardCaches>,
}

impl Board {
    pub fn new(info: BoardInfo, transport: Arc<dyn Transport>) -> Self {
        Self {
            info: Arc::new(info),
            transport,
            caches: Mutex::new(BoardCaches::default()),
        }
    }

    pub fn info(&self) -> &BoardInfo {
        &self.info
    }

    fn caches(&self) -> MutexGuard<'_, BoardCaches> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, url: &str, since: Option<Watermark>, deadline: Deadline) -> Result<FetchResponse> {
        deadline.run(self.transport.fetch(url, since)).await
    }

    /// Thread-id cache lookup. No network.
    pub fn cached_thread(&self, id: u64) -> Option<SharedThread> {
        self.caches().thread(id)
    }

    /// Page cache lookup. No network.
    pub fn cached_page(&self, page: u32) -> Vec<SharedThread> {
        self.caches().page(page)
    }

    /// Catalog cache lookup. No network.
    pub fn cached_catalog(&self) -> Vec<SharedThread> {
        self.caches().catalog()
    }

    /// Returns a thread, refreshing it first when it is already cached.
    ///
    /// A cached thread is returned even if the refresh failed or found it
    /// expired; only an elapsed deadline is reported. `Ok(None)` means the
    /// remote has no such thread.
    pub async fn get_thread(&self, id: u64, deadline: Deadline) -> Result<Option<SharedThread>> {
        if let Some(cached) = self.cached_thread(id) {
            debug!(board = %self.info.name, thread_id = id, "thread cache hit");
            self.refresh_passively(&cached, deadline).await?;
            return Ok(Some(cached));
        }

        let fetched = self.fetch_thread(id, deadline).await?;
        Ok(fetched.map(|thread| self.caches().adopt(thread)))
    }

    /// Fetches a thread in full without touching the caches.
    async fn fetch_thread(&self, id: u64, deadline: Deadline) -> Result<Option<SharedThread>> {
        let url = self.info.thread_endpoint(id);
        let response = self.fetch(&url, None, deadline).await?;
        match response.status {
            FetchStatus::Fresh => {
                let payload = ThreadPayload::from_slice(&response.body)?;
                check_topic(id, payload.topic()?.number)?;
                let thread = Thread::from_full(self.info.clone(), payload, response.watermark)?;
                debug!(board = %self.info.name, thread_id = id, "thread fetched");
                Ok(Some(SharedThread::new(thread)))
            }
            FetchStatus::NotFound => {
                debug!(board = %self.info.name, thread_id = id, "thread not found");
                Ok(None)
            }
            status => Err(MirrorError::UnexpectedStatus { url, status: status.code() }),
        }
    }

    /// Asks the remote whether a thread exists. Reads and writes no cache.
    pub async fn thread_exists(&self, id: u64, deadline: Deadline) -> Result<bool> {
        let response = self.fetch(&self.info.thread_endpoint(id), None, deadline).await?;
        Ok(response.status == FetchStatus::Fresh)
    }

    /// Fetches new posts for `thread` and applies them.
    ///
    /// An expired thread is skipped without a request unless `force` is set.
    /// Expiry drops the thread from the thread-id cache; fresh data for an
    /// expired thread puts it back.
    pub async fn update_thread(
        &self,
        thread: &SharedThread,
        force: bool,
        deadline: Deadline,
    ) -> Result<UpdateOutcome> {
        let (expired, since) = {
            let current = thread.read();
            (current.is_expired(), current.watermark())
        };
        if expired && !force {
            debug!(board = %self.info.name, thread_id = thread.id(), "skipping expired thread");
            return Ok(UpdateOutcome::Unchanged);
        }

        let url = self.info.thread_endpoint(thread.id());
        let response = self.fetch(&url, since, deadline).await?;
        match response.status {
            FetchStatus::NotModified => Ok(UpdateOutcome::Unchanged),
            FetchStatus::NotFound => {
                let mut caches = self.caches();
                let outcome = thread.write().mark_expired();
                caches.evict(thread);
                info!(board = %self.info.name, thread_id = thread.id(), "thread expired");
                Ok(outcome)
            }
            FetchStatus::Fresh => {
                let (topic, replies) = ThreadPayload::from_slice(&response.body)?.into_parts()?;
                check_topic(thread.id(), topic.number)?;
                let mut caches = self.caches();
                let outcome = thread.write().apply_fresh(topic, replies, response.watermark, force);
                if let UpdateOutcome::Resurrected(_) = outcome {
                    caches.restore(thread);
                    info!(board = %self.info.name, thread_id = thread.id(), "thread resurrected");
                }
                debug!(board = %self.info.name, thread_id = thread.id(), delta = outcome.new_posts(), "thread updated");
                Ok(outcome)
            }
            FetchStatus::Unexpected(status) => Err(MirrorError::UnexpectedStatus { url, status }),
        }
    }

    /// Returns the threads on one index page, in page order.
    ///
    /// Fresh data rebuilds the page entry from scratch. Threads already known
    /// by id are refreshed and reused; unknown ones are built from the
    /// page summary and enter the thread-id cache with the new page entry.
    pub async fn get_threads_by_page(&self, page: u32, deadline: Deadline) -> Result<Vec<SharedThread>> {
        let url = self.info.page_endpoint(page);
        let since = self.caches().page_watermark(page);
        let response = self.fetch(&url, since, deadline).await?;

        match response.status {
            FetchStatus::NotModified => {
                debug!(board = %self.info.name, page, "page not modified");
                Ok(self.cached_page(page))
            }
            FetchStatus::NotFound => Err(MirrorError::PageNotFound(page)),
            FetchStatus::Fresh => {
                let listing = PagePayload::from_slice(&response.body)?;
                let mut listed = Vec::with_capacity(listing.threads.len());
                let mut built: Vec<SharedThread> = Vec::new();
                for summary in listing.threads {
                    let id = summary.topic()?.number;
                    if listed.iter().any(|thread: &SharedThread| thread.id() == id) {
                        debug!(board = %self.info.name, thread_id = id, "thread listed twice");
                    } else if let Some(cached) = self.cached_thread(id) {
                        self.refresh_passively(&cached, deadline).await?;
                        listed.push(cached);
                    } else {
                        let thread = SharedThread::new(Thread::from_summary(self.info.clone(), summary)?);
                        built.push(thread.clone());
                        listed.push(thread);
                    }
                }

                let mut caches = self.caches();
                let rebuilt = caches.adopt_listing(listed, &built);
                caches.replace_page(page, rebuilt.clone(), response.watermark);
                info!(board = %self.info.name, page, threads = rebuilt.len(), new = built.len(), "page rebuilt");
                Ok(rebuilt)
            }
            FetchStatus::Unexpected(status) => Err(MirrorError::UnexpectedStatus { url, status }),
        }
    }

    /// Returns every thread on the board, in catalog order.
    ///
    /// Unlike the page path, threads unknown by id are fetched in full rather
    /// than built from the catalog summary.
    pub async fn get_catalog(&self, deadline: Deadline) -> Result<Vec<SharedThread>> {
        let url = self.info.catalog_endpoint();
        let since = self.caches().catalog_watermark();
        let response = self.fetch(&url, since, deadline).await?;

        match response.status {
            FetchStatus::NotModified => {
                debug!(board = %self.info.name, "catalog not modified");
                Ok(self.cached_catalog())
            }
            FetchStatus::NotFound => Err(MirrorError::CatalogNotFound),
            FetchStatus::Fresh => {
                let pages = CatalogPage::list_from_slice(&response.body)?;
                let mut listed = Vec::new();
                let mut built: Vec<SharedThread> = Vec::new();
                for summary in pages.iter().flat_map(|page| page.threads.iter()) {
                    let id = summary.number;
                    if listed.iter().any(|thread: &SharedThread| thread.id() == id) {
                        debug!(board = %self.info.name, thread_id = id, "thread listed twice");
                    } else if let Some(cached) = self.cached_thread(id) {
                        self.refresh_passively(&cached, deadline).await?;
                        listed.push(cached);
                    } else if let Some(fetched) = self.fetch_thread(id, deadline).await? {
                        built.push(fetched.clone());
                        listed.push(fetched);
                    } else {
                        debug!(board = %self.info.name, thread_id = id, "catalog thread vanished before fetch");
                    }
                }

                let mut caches = self.caches();
                let rebuilt = caches.adopt_listing(listed, &built);
                caches.replace_catalog(rebuilt.clone(), response.watermark);
                info!(board = %self.info.name, threads = rebuilt.len(), new = built.len(), "catalog rebuilt");
                Ok(rebuilt)
            }
            FetchStatus::Unexpected(status) => Err(MirrorError::UnexpectedStatus { url, status }),
        }
    }

    /// Refresh of a thread the caller did not ask to update. Failures other
    /// than an elapsed deadline are logged and the cached object is kept.
    async fn refresh_passively(&self, thread: &SharedThread, deadline: Deadline) -> Result<()> {
        match self.update_thread(thread, false, deadline).await {
            Ok(_) => Ok(()),
            Err(MirrorError::DeadlineExceeded) => Err(MirrorError::DeadlineExceeded),
            Err(err) => {
                warn!(board = %self.info.name, thread_id = thread.id(), error = %err, "passive thread refresh failed");
                Ok(())
            }
        }
    }
}

/// A thread document must open with the topic post of the requested thread.
fn check_topic(id: u64, topic: u64) -> Result<()> {
    if topic == id {
        Ok(())
    } else {
        Err(MirrorError::MalformedPayload(format!("thread {id} document opens with post {topic}")))
    }
}
