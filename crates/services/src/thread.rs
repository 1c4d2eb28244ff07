//! # Thread
//!
//! Mutable aggregate of the posts of one remote thread, plus the
//! synchronization state needed to keep it current with minimal re-fetching.
//!
//! A `Thread` never touches the network or the board caches itself: the
//! board fetches, decodes the payload, and then applies it here while it
//! holds the cache lock. The returned [`UpdateOutcome`] tells the board
//! which cache bookkeeping the transition requires.

use std::sync::Arc;

use domains::{BoardInfo, Post, PostData, Result, ThreadPayload, Watermark};

/// What an update did to a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No data applied: not modified, or skipped because the thread is expired.
    Unchanged,
    /// Fresh data applied. Carries the change in reply count; 0 means the
    /// fetch succeeded but brought nothing new.
    Updated(isize),
    /// The remote answered not-found; the thread is now expired.
    Expired,
    /// Fresh data arrived for a thread previously marked expired.
    Resurrected(isize),
}

impl UpdateOutcome {
    /// Change in reply count, 0 for outcomes that applied no data.
    pub fn new_posts(&self) -> isize {
        match self {
            UpdateOutcome::Updated(delta) | UpdateOutcome::Resurrected(delta) => *delta,
            UpdateOutcome::Unchanged | UpdateOutcome::Expired => 0,
        }
    }
}

#[derive(Debug)]
pub struct Thread {
    board: Arc<BoardInfo>,
    id: u64,
    topic: Post,
    replies: Vec<Post>,
    omitted_posts: u32,
    omitted_images: u32,
    watermark: Option<Watermark>,
    /// `None` until the full reply list has been seen once.
    last_reply_id: Option<u64>,
    expired: bool,
    wants_update: bool,
}

impl Thread {
    /// Builds a thread from a complete thread document.
    pub(crate) fn from_full(
        board: Arc<BoardInfo>,
        payload: ThreadPayload,
        watermark: Option<Watermark>,
    ) -> Result<Self> {
        let (topic, replies) = payload.into_parts()?;
        let mut thread = Self::seed(board, topic);
        thread.watermark = watermark;
        append_newer(&mut thread.replies, replies, thread.id);
        thread.last_reply_id = Some(thread.tail_id());
        Ok(thread)
    }

    /// Builds a thread from a page summary.
    ///
    /// The summary only carries the newest replies, so no reply watermark is
    /// recorded: the first update rebuilds the reply list from a full fetch.
    pub(crate) fn from_summary(board: Arc<BoardInfo>, payload: ThreadPayload) -> Result<Self> {
        let (topic, replies) = payload.into_parts()?;
        let omitted_posts = topic.omitted_posts;
        let omitted_images = topic.omitted_images;
        let mut thread = Self::seed(board, topic);
        append_newer(&mut thread.replies, replies, thread.id);
        thread.omitted_posts = omitted_posts;
        thread.omitted_images = omitted_images;
        thread.wants_update = true;
        Ok(thread)
    }

    fn seed(board: Arc<BoardInfo>, topic: PostData) -> Self {
        Self {
            board,
            id: topic.number,
            topic: Post::new(topic),
            replies: Vec::new(),
            omitted_posts: 0,
            omitted_images: 0,
            watermark: None,
            last_reply_id: None,
            expired: false,
            wants_update: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &Post {
        &self.topic
    }

    pub fn replies(&self) -> &[Post] {
        &self.replies
    }

    pub fn omitted_posts(&self) -> u32 {
        self.omitted_posts
    }

    pub fn omitted_images(&self) -> u32 {
        self.omitted_images
    }

    pub fn watermark(&self) -> Option<Watermark> {
        self.watermark
    }

    pub fn last_reply_id(&self) -> Option<u64> {
        self.last_reply_id
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn wants_update(&self) -> bool {
        self.wants_update
    }

    /// Acknowledges new data: returns the wants-update flag and clears it.
    pub fn take_wants_update(&mut self) -> bool {
        std::mem::take(&mut self.wants_update)
    }

    /// URLs of every attached file, topic first.
    pub fn files(&self) -> Vec<String> {
        self.posts()
            .filter(|post| post.has_file())
            .map(|post| post.file_url(&self.board))
            .collect()
    }

    /// URLs of every thumbnail, topic first.
    pub fn thumbnails(&self) -> Vec<String> {
        self.posts()
            .filter(|post| post.has_file())
            .map(|post| post.thumbnail_url(&self.board))
            .collect()
    }

    pub fn web_url(&self) -> String {
        self.board.thread_web_url(self.id)
    }

    fn posts(&self) -> impl Iterator<Item = &Post> {
        std::iter::once(&self.topic).chain(self.replies.iter())
    }

    fn tail_id(&self) -> u64 {
        self.replies.last().map_or(self.topic.number(), Post::number)
    }

    pub(crate) fn mark_expired(&mut self) -> UpdateOutcome {
        self.expired = true;
        UpdateOutcome::Expired
    }

    /// Applies a fresh thread document.
    ///
    /// Without `force`, and once a reply watermark exists, only replies newer
    /// than it are appended. Otherwise the reply list is rebuilt.
    pub(crate) fn apply_fresh(
        &mut self,
        topic: PostData,
        replies: Vec<PostData>,
        watermark: Option<Watermark>,
        force: bool,
    ) -> UpdateOutcome {
        let resurrected = std::mem::take(&mut self.expired);
        self.wants_update = true;
        self.omitted_posts = 0;
        self.omitted_images = 0;
        if watermark.is_some() {
            self.watermark = watermark;
        }
        self.topic = Post::new(topic);

        let original = self.replies.len();
        match self.last_reply_id {
            Some(last) if !force => append_newer(&mut self.replies, replies, last),
            _ => {
                self.replies.clear();
                append_newer(&mut self.replies, replies, self.id);
            }
        }
        self.last_reply_id = Some(self.tail_id());

        let delta = self.replies.len() as isize - original as isize;
        if resurrected {
            UpdateOutcome::Resurrected(delta)
        } else {
            UpdateOutcome::Updated(delta)
        }
    }
}

/// Appends, in arrival order, the posts numbered above `floor`, raising the
/// floor as it goes so the sequence stays strictly increasing.
fn append_newer(replies: &mut Vec<Post>, incoming: Vec<PostData>, mut floor: u64) {
    for data in incoming {
        if data.number > floor {
            floor = data.number;
            replies.push(Post::new(data));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(number: u64, resto: u64) -> PostData {
        PostData { number, resto, ..Default::default() }
    }

    fn payload(numbers: &[u64]) -> ThreadPayload {
        let topic = numbers[0];
        ThreadPayload {
            posts: numbers
                .iter()
                .map(|&n| post(n, if n == topic { 0 } else { topic }))
                .collect(),
        }
    }

    fn numbers(thread: &Thread) -> Vec<u64> {
        thread.replies().iter().map(Post::number).collect()
    }

    fn board() -> Arc<BoardInfo> {
        Arc::new(BoardInfo::new("g", true))
    }

    fn apply(thread: &mut Thread, numbers: &[u64], force: bool) -> UpdateOutcome {
        let (topic, replies) = payload(numbers).into_parts().unwrap();
        thread.apply_fresh(topic, replies, None, force)
    }

    #[test]
    fn full_thread_tracks_last_reply() {
        let thread = Thread::from_full(board(), payload(&[100, 101, 102]), None).unwrap();
        assert_eq!(thread.id(), 100);
        assert_eq!(numbers(&thread), vec![101, 102]);
        assert_eq!(thread.last_reply_id(), Some(102));
        assert!(!thread.wants_update());
    }

    #[test]
    fn topic_only_thread_uses_topic_as_last_reply() {
        let thread = Thread::from_full(board(), payload(&[100]), None).unwrap();
        assert_eq!(thread.last_reply_id(), Some(100));
    }

    #[test]
    fn incremental_merge_appends_only_newer_replies() {
        let mut thread = Thread::from_full(board(), payload(&[100, 101, 102]), None).unwrap();
        let outcome = apply(&mut thread, &[100, 101, 102, 103], false);

        assert_eq!(outcome, UpdateOutcome::Updated(1));
        assert_eq!(numbers(&thread), vec![101, 102, 103]);
        assert_eq!(thread.last_reply_id(), Some(103));
        assert!(thread.wants_update());
    }

    #[test]
    fn incremental_merge_keeps_known_posts() {
        let mut thread = Thread::from_full(board(), payload(&[100, 101, 102]), None).unwrap();
        let before = thread.replies()[0].clone();

        // 101 was deleted remotely; the incremental path does not notice.
        apply(&mut thread, &[100, 102, 104], false);
        assert_eq!(numbers(&thread), vec![101, 102, 104]);
        assert_eq!(thread.replies()[0], before);
    }

    #[test]
    fn unchanged_remote_yields_zero_delta() {
        let mut thread = Thread::from_full(board(), payload(&[100, 101]), None).unwrap();
        assert_eq!(apply(&mut thread, &[100, 101], false), UpdateOutcome::Updated(0));
        assert_eq!(apply(&mut thread, &[100, 101], false).new_posts(), 0);
        assert_eq!(numbers(&thread), vec![101]);
    }

    #[test]
    fn forced_update_rebuilds_replies() {
        let mut thread = Thread::from_full(board(), payload(&[100, 101, 102, 103]), None).unwrap();
        let outcome = apply(&mut thread, &[100, 102], true);

        assert_eq!(outcome, UpdateOutcome::Updated(-2));
        assert_eq!(numbers(&thread), vec![102]);
        assert_eq!(thread.last_reply_id(), Some(102));
    }

    #[test]
    fn rebuild_to_empty_falls_back_to_topic() {
        let mut thread = Thread::from_full(board(), payload(&[100, 101]), None).unwrap();
        apply(&mut thread, &[100], true);
        assert!(thread.replies().is_empty());
        assert_eq!(thread.last_reply_id(), Some(100));
    }

    #[test]
    fn summary_thread_rebuilds_on_first_update() {
        let mut summary = payload(&[100, 150, 151]);
        summary.posts[0].omitted_posts = 49;
        summary.posts[0].omitted_images = 3;
        let mut thread = Thread::from_summary(board(), summary).unwrap();

        assert!(thread.wants_update());
        assert_eq!(thread.omitted_posts(), 49);
        assert_eq!(thread.last_reply_id(), None);

        let full: Vec<u64> = std::iter::once(100).chain(101..=151).collect();
        let outcome = apply(&mut thread, &full, false);
        assert_eq!(outcome, UpdateOutcome::Updated(49));
        assert_eq!(thread.replies().len(), 51);
        assert_eq!(thread.omitted_posts(), 0);
        assert_eq!(thread.omitted_images(), 0);
        assert_eq!(thread.last_reply_id(), Some(151));
    }

    #[test]
    fn out_of_order_replies_never_duplicate() {
        let mut thread = Thread::from_full(board(), payload(&[100, 101]), None).unwrap();
        apply(&mut thread, &[100, 101, 103, 102, 103, 104], false);
        assert_eq!(numbers(&thread), vec![101, 103, 104]);
    }

    #[test]
    fn expired_thread_resurrects_on_fresh_data() {
        let mut thread = Thread::from_full(board(), payload(&[100, 101]), None).unwrap();
        assert_eq!(thread.mark_expired(), UpdateOutcome::Expired);
        assert!(thread.is_expired());

        let outcome = apply(&mut thread, &[100, 101, 102], false);
        assert_eq!(outcome, UpdateOutcome::Resurrected(1));
        assert!(!thread.is_expired());
    }

    #[test]
    fn missing_watermark_keeps_previous_one() {
        let stamp = Watermark::new(chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let mut thread = Thread::from_full(board(), payload(&[100]), Some(stamp)).unwrap();
        apply(&mut thread, &[100, 101], false);
        assert_eq!(thread.watermark(), Some(stamp));
    }

    #[test]
    fn take_wants_update_clears_flag() {
        let mut thread = Thread::from_summary(board(), payload(&[100])).unwrap();
        assert!(thread.take_wants_update());
        assert!(!thread.wants_update());
        assert!(!thread.take_wants_update());
    }

    #[test]
    fn files_cover_topic_and_replies() {
        let mut doc = payload(&[100, 101, 102]);
        doc.posts[0].filename = "op".into();
        doc.posts[0].tim = 1;
        doc.posts[0].extension = ".jpg".into();
        doc.posts[2].filename = "reply".into();
        doc.posts[2].tim = 2;
        doc.posts[2].extension = ".webm".into();
        let thread = Thread::from_full(board(), doc, None).unwrap();

        assert_eq!(
            thread.files(),
            vec!["https://i.4cdn.org/g/src/1.jpg", "https://i.4cdn.org/g/src/2.webm"]
        );
        assert_eq!(thread.thumbnails().len(), 2);
        assert_eq!(thread.web_url(), "https://boards.4chan.org/g/thread/100");
    }
}
