//! # Domain Models
//!
//! These structs represent the remote board as the mirror sees it.
//! `PostData` mirrors the wire record one-to-one; `Post` is the immutable
//! per-fetch record a thread owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_HOST: &str = "a.4cdn.org";
pub const DEFAULT_IMAGE_HOST: &str = "i.4cdn.org";
pub const DEFAULT_THUMB_HOST: &str = "t.4cdn.org";
pub const DEFAULT_WEB_HOST: &str = "boards.4chan.org";

/// Opaque freshness token from a prior fetch.
///
/// Presented on the next fetch so the remote only sends data that changed
/// since then. The core never inspects it beyond equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

/// Read-only endpoint configuration of one remote board (e.g. /g/, /v/).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardInfo {
    /// The board slug (e.g. "g" for /g/)
    pub name: String,
    pub https: bool,
    pub api_host: String,
    pub image_host: String,
    pub thumb_host: String,
    pub web_host: String,
}

impl BoardInfo {
    /// A board on the default hosts.
    pub fn new(name: impl Into<String>, https: bool) -> Self {
        Self {
            name: name.into(),
            https,
            api_host: DEFAULT_API_HOST.to_string(),
            image_host: DEFAULT_IMAGE_HOST.to_string(),
            thumb_host: DEFAULT_THUMB_HOST.to_string(),
            web_host: DEFAULT_WEB_HOST.to_string(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }

    /// Base endpoint of the JSON API, e.g. `https://a.4cdn.org`.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.api_host)
    }

    pub fn thread_endpoint(&self, id: u64) -> String {
        format!("{}/{}/res/{}.json", self.base_url(), self.name, id)
    }

    pub fn page_endpoint(&self, page: u32) -> String {
        format!("{}/{}/{}.json", self.base_url(), self.name, page)
    }

    pub fn catalog_endpoint(&self) -> String {
        format!("{}/{}/catalog.json", self.base_url(), self.name)
    }

    /// The human-facing URL of a thread.
    pub fn thread_web_url(&self, id: u64) -> String {
        format!("{}://{}/{}/thread/{}", self.scheme(), self.web_host, self.name, id)
    }
}

/// One post record exactly as the remote API ships it.
///
/// Every field is optional on the wire; absent fields take their default.
/// Omitted-post/image counts are only present on topic and summary posts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostData {
    #[serde(rename = "no")]
    pub number: u64,
    /// Parent thread id, 0 for the topic post
    pub resto: u64,
    pub sticky: u8,
    pub closed: u8,
    pub archived: u8,
    pub now: String,
    pub time: i64,
    pub name: String,
    #[serde(rename = "trip")]
    pub tripcode: String,
    #[serde(rename = "id")]
    pub poster_id: String,
    pub capcode: String,
    pub country: String,
    pub country_name: String,
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(rename = "com")]
    pub comment: String,
    /// Upload timestamp in milliseconds, names the stored file
    pub tim: i64,
    pub filename: String,
    #[serde(rename = "ext")]
    pub extension: String,
    #[serde(rename = "fsize")]
    pub file_size: u64,
    pub md5: String,
    #[serde(rename = "w")]
    pub image_width: u32,
    #[serde(rename = "h")]
    pub image_height: u32,
    #[serde(rename = "tn_w")]
    pub thumbnail_width: u32,
    #[serde(rename = "tn_h")]
    pub thumbnail_height: u32,
    #[serde(rename = "filedeleted")]
    pub file_deleted: u8,
    pub spoiler: u8,
    pub custom_spoiler: u32,
    pub omitted_posts: u32,
    pub omitted_images: u32,
    pub replies: u32,
    pub images: u32,
    #[serde(rename = "bumplimit")]
    pub bump_limit: u8,
    #[serde(rename = "imagelimit")]
    pub image_limit: u8,
    pub capcode_replies: Option<serde_json::Value>,
    pub last_modified: i64,
    pub tag: String,
    pub semantic_url: String,
    pub last_replies: Vec<PostData>,
}

/// The immutable record of one reply or topic post.
///
/// A later fetch of the same post number produces a new `Post`; posts are
/// never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    data: PostData,
}

impl Post {
    pub fn new(data: PostData) -> Self {
        Self { data }
    }

    pub fn number(&self) -> u64 {
        self.data.number
    }

    pub fn is_topic(&self) -> bool {
        self.data.resto == 0
    }

    /// True if the post carries an attached file.
    pub fn has_file(&self) -> bool {
        !self.data.filename.is_empty()
    }

    /// URL of the attached file, or an empty string when there is none.
    pub fn file_url(&self, board: &BoardInfo) -> String {
        if !self.has_file() {
            return String::new();
        }
        format!(
            "{}://{}/{}/src/{}{}",
            board.scheme(),
            board.image_host,
            board.name,
            self.data.tim,
            self.data.extension
        )
    }

    /// URL of the attached file's thumbnail, or an empty string when there is none.
    pub fn thumbnail_url(&self, board: &BoardInfo) -> String {
        if !self.has_file() {
            return String::new();
        }
        format!(
            "{}://{}/{}/thumb/{}s.jpg",
            board.scheme(),
            board.thumb_host,
            board.name,
            self.data.tim
        )
    }
}

impl From<PostData> for Post {
    fn from(data: PostData) -> Self {
        Self::new(data)
    }
}
