//! # Board Caches
//!
//! One live thread object is shared by every cache that shows it. The
//! thread-id map is the canonical store; page and catalog entries are views
//! holding handles into it, never copies.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use domains::Watermark;

use crate::thread::Thread;

/// Reference-counted handle to one live thread.
///
/// Cloning is cheap and yields the same object; compare handles with
/// [`SharedThread::ptr_eq`]. Do not hold a guard across a board call.
#[derive(Clone)]
pub struct SharedThread {
    id: u64,
    inner: Arc<RwLock<Thread>>,
}

impl SharedThread {
    pub(crate) fn new(thread: Thread) -> Self {
        Self {
            id: thread.id(),
            inner: Arc::new(RwLock::new(thread)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Thread> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access for consumers acknowledging new data.
    pub fn write(&self) -> RwLockWriteGuard<'_, Thread> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True if both handles point at the same thread object.
    pub fn ptr_eq(&self, other: &SharedThread) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SharedThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedThread")
            .field("id", &self.id)
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

/// The three caches of a board. Guarded as a whole by the board's lock.
#[derive(Debug, Default)]
pub(crate) struct BoardCaches {
    threads: HashMap<u64, SharedThread>,
    pages: HashMap<u32, Vec<SharedThread>>,
    page_watermarks: HashMap<u32, Watermark>,
    catalog: Vec<SharedThread>,
    catalog_watermark: Option<Watermark>,
}

impl BoardCaches {
    pub(crate) fn thread(&self, id: u64) -> Option<SharedThread> {
        self.threads.get(&id).cloned()
    }

    /// Inserts `thread` unless its id is already cached; returns the
    /// canonical handle either way. A newly inserted object also takes over
    /// page and catalog entries still holding an older object for its id.
    pub(crate) fn adopt(&mut self, thread: SharedThread) -> SharedThread {
        if let Some(cached) = self.threads.get(&thread.id()) {
            return cached.clone();
        }
        self.threads.insert(thread.id(), thread.clone());
        self.repoint(&thread);
        thread
    }

    /// Adopts the threads of `listed` that were built during a rebuild and
    /// maps every entry to its canonical handle, dropping repeats.
    pub(crate) fn adopt_listing(
        &mut self,
        listed: Vec<SharedThread>,
        built: &[SharedThread],
    ) -> Vec<SharedThread> {
        let mut view = Vec::with_capacity(listed.len());
        for thread in listed {
            let canonical = if built.iter().any(|new| new.ptr_eq(&thread)) {
                self.adopt(thread)
            } else {
                thread
            };
            push_unique(&mut view, canonical);
        }
        view
    }

    /// Drops `thread` from the thread-id map. A different object cached under
    /// the same id is left alone.
    pub(crate) fn evict(&mut self, thread: &SharedThread) -> bool {
        match self.threads.get(&thread.id()) {
            Some(cached) if cached.ptr_eq(thread) => {
                self.threads.remove(&thread.id());
                true
            }
            _ => false,
        }
    }

    /// Makes `thread` canonical for its id again. If another object took the
    /// id meanwhile, page and catalog entries are repointed to `thread`.
    pub(crate) fn restore(&mut self, thread: &SharedThread) {
        self.threads.insert(thread.id(), thread.clone());
        self.repoint(thread);
    }

    /// Replaces every view entry that shares the id of `canonical` but is a
    /// different object.
    fn repoint(&mut self, canonical: &SharedThread) {
        let views = self.pages.values_mut().chain(std::iter::once(&mut self.catalog));
        for view in views {
            let mut touched = false;
            for entry in view.iter_mut() {
                if entry.id() == canonical.id() && !entry.ptr_eq(canonical) {
                    *entry = canonical.clone();
                    touched = true;
                }
            }
            if touched {
                dedup_by_identity(view);
            }
        }
    }

    pub(crate) fn page(&self, page: u32) -> Vec<SharedThread> {
        self.pages.get(&page).cloned().unwrap_or_default()
    }

    pub(crate) fn page_watermark(&self, page: u32) -> Option<Watermark> {
        self.page_watermarks.get(&page).copied()
    }

    pub(crate) fn replace_page(
        &mut self,
        page: u32,
        threads: Vec<SharedThread>,
        watermark: Option<Watermark>,
    ) {
        match watermark {
            Some(watermark) => self.page_watermarks.insert(page, watermark),
            None => self.page_watermarks.remove(&page),
        };
        self.pages.insert(page, threads);
    }

    pub(crate) fn catalog(&self) -> Vec<SharedThread> {
        self.catalog.clone()
    }

    pub(crate) fn catalog_watermark(&self) -> Option<Watermark> {
        self.catalog_watermark
    }

    pub(crate) fn replace_catalog(&mut self, threads: Vec<SharedThread>, watermark: Option<Watermark>) {
        self.catalog_watermark = watermark;
        self.catalog = threads;
    }
}

/// Appends `thread` unless the same object is already listed.
fn push_unique(view: &mut Vec<SharedThread>, thread: SharedThread) {
    if !view.iter().any(|listed| listed.ptr_eq(&thread)) {
        view.push(thread);
    }
}

fn dedup_by_identity(view: &mut Vec<SharedThread>) {
    let mut kept = Vec::with_capacity(view.len());
    for thread in view.drain(..) {
        push_unique(&mut kept, thread);
    }
    *view = kept;
}
