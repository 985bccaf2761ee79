use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// Post number assigned by the upstream when the post is created.
///
/// Ids only ever increase within a board and are never reused, so ordering
/// by id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        PostId(id)
    }
}

/// Anything reconciliation can order by identity.
///
/// The sync engine only ever looks at this id; the rest of the value is
/// carried through untouched.
pub trait Identified {
    fn post_id(&self) -> PostId;
}

impl Identified for PostId {
    fn post_id(&self) -> PostId {
        *self
    }
}

/// Board + thread number. Used as the per-entity gate key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    pub board: String, // without slashes, e.g. "g" or "ck"
    pub thread: PostId,
}

impl ThreadKey {
    pub fn new(board: impl Into<String>, thread: impl Into<PostId>) -> Self {
        Self {
            board: board.into(),
            thread: thread.into(),
        }
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.board, self.thread)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub reply_to: Option<PostId>, // None on the OP
    pub board: String,
    pub time: DateTime<Utc>,
    pub subject: String,
    pub last_modified: Option<DateTime<Utc>>,

    // Poster info
    pub name: String,
    pub trip: String,
    pub email: String,
    pub poster_id: String,
    pub capcode: String,
    // Empty unless the board shows flags
    pub country: String,
    pub country_name: String,

    /// Comment body as sent by the API (escaped HTML).
    pub comment: String,
    pub file: Option<File>,
    pub capcode_replies: HashMap<String, Vec<PostId>>,

    /// Thread-level counters, only meaningful on the OP.
    pub op: OpInfo,
}

/// Thread counters and flags the API only attaches to the opening post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpInfo {
    pub replies: u32,
    pub images: u32,
    pub omitted_posts: u32,
    pub omitted_images: u32,
    pub bump_limit: bool,
    pub image_limit: bool,
    pub sticky: bool,
    pub closed: bool,
    pub custom_spoiler: u32,
}

impl Post {
    pub fn is_op(&self) -> bool {
        self.reply_to.is_none()
    }

    /// Comment with markup removed: line breaks kept, tags dropped, entities decoded.
    pub fn plain_comment(&self) -> String {
        let with_newlines = LINE_BREAK.replace_all(&self.comment, "\n");
        let stripped = TAG.replace_all(&with_newlines, "");
        html_escape::decode_html_entities(&stripped).to_string()
    }
}

impl Identified for Post {
    fn post_id(&self) -> PostId {
        self.id
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "#{} {}{} on {}:",
            self.id,
            self.name,
            self.trip,
            self.time.format("%d %b %y %H:%M UTC")
        )?;
        if let Some(file) = &self.file {
            write!(f, "{}", file)?;
        }
        write!(f, "{}", self.comment)
    }
}

/// Metadata of an uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: u64, // renamed filename, UNIX time + microseconds
    pub name: String,
    pub ext: String,
    pub size: u64,
    /// MD5 digest of the file, base64-encoded exactly as the API sends it.
    /// Callers that need the raw 16 bytes decode it themselves.
    pub md5: String,
    pub width: u32,
    pub height: u32,
    pub thumb_width: u32,
    pub thumb_height: u32,
    pub deleted: bool,
    pub spoiler: bool,
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "File: {}{} ({}x{}, {} bytes, md5 {})",
            self.name, self.ext, self.width, self.height, self.size, self.md5
        )
    }
}

/// A board as listed in `/boards.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Board {
    pub board: String,
    pub title: String,
}

/// A thread as it appears on an index page: the OP plus the last few replies.
#[derive(Debug, Clone)]
pub struct ThreadPreview {
    pub board: String,
    pub posts: Vec<Post>,
}

impl ThreadPreview {
    pub fn op(&self) -> Option<&Post> {
        find_op(&self.posts)
    }
}

/// One page of a board catalog. Each thread is represented by its OP only.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub page: u32,
    pub threads: Vec<Post>,
}

/// The OP is the post that replies to nothing; fall back to the first post.
pub fn find_op(posts: &[Post]) -> Option<&Post> {
    posts.iter().find(|p| p.is_op()).or_else(|| posts.first())
}
