//! Error types for the thread mirror.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the board API.
///
/// Every variant is local to a single request; none of them leave a
/// [`ThreadMirror`](crate::mirror::ThreadMirror) in a modified state.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body was not the expected JSON shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A thread document came back without any posts.
    #[error("thread /{board}/{thread} has no posts")]
    EmptyThread { board: String, thread: u64 },

    /// A board-scoped request was made with an empty board name.
    #[error("no board name given")]
    MissingBoard,

    /// The board is not present in the board list.
    #[error("board '{0}' not found")]
    BoardNotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The upstream answered 404, e.g. a thread that has been pruned or
    /// deleted. Retrying will not bring it back.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Status { status: 404, .. })
    }
}
