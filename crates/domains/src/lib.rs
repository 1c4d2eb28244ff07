//! crates/domains/src/lib.rs
//!
//! Data model, wire payloads and port definitions of the board mirror.
//! Nothing in this crate performs I/O.

pub mod error;
pub mod models;
pub mod traits;
pub mod wire;

// Flat paths: `domains::Transport` rather than `domains::traits::Transport`.
pub use error::*;
pub use models::*;
pub use traits::*;
pub use wire::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    fn with_file() -> Post {
        Post::new(PostData {
            number: 101,
            resto: 100,
            tim: 1_700_000_000_123,
            filename: "cat".to_string(),
            extension: ".png".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_media_urls_follow_transport_flag() {
        let post = with_file();
        let secure = BoardInfo::new("g", true);
        let plain = BoardInfo::new("g", false);

        assert!(post.has_file());
        assert_eq!(post.file_url(&secure), "https://i.4cdn.org/g/src/1700000000123.png");
        assert_eq!(post.thumbnail_url(&plain), "http://t.4cdn.org/g/thumb/1700000000123s.jpg");
    }

    #[test]
    fn test_no_file_yields_empty_urls() {
        let post = Post::new(PostData { number: 5, ..Default::default() });
        let board = BoardInfo::new("g", true);

        assert!(!post.has_file());
        assert!(post.is_topic());
        assert_eq!(post.file_url(&board), "");
        assert_eq!(post.thumbnail_url(&board), "");
    }

    #[test]
    fn test_endpoints() {
        let board = BoardInfo::new("v", true);
        assert_eq!(board.thread_endpoint(42), "https://a.4cdn.org/v/res/42.json");
        assert_eq!(board.page_endpoint(3), "https://a.4cdn.org/v/3.json");
        assert_eq!(board.catalog_endpoint(), "https://a.4cdn.org/v/catalog.json");
        assert_eq!(board.thread_web_url(42), "https://boards.4chan.org/v/thread/42");
    }
}
