//! Local mirror of one remote thread.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::gate::{later, RequestGate};
use crate::models::{find_op, Identified, OpInfo, Post, PostId, ThreadKey};
use crate::sync::{reconcile, Delta};

/// Result of one fetch of a thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<P> {
    /// The full post sequence, strictly increasing by id.
    Posts(Vec<P>),
    /// The thread has not changed since the time that was passed in.
    NotModified,
}

/// Source of fresh post sequences for a thread.
///
/// Implementations do the network call and parsing. They are called after
/// the mirror has been granted a slot by the [`RequestGate`], so they must
/// not pace themselves against the same gate again.
pub trait Fetcher<P> {
    type Error: std::error::Error;

    /// Fetch the current posts of `key`. `since` is the time of the last
    /// successful fetch; it is only a hint and may be ignored.
    fn fetch(
        &self,
        key: &ThreadKey,
        since: Option<DateTime<Utc>>,
    ) -> Result<Fetched<P>, Self::Error>;
}

/// Last known state of one thread.
///
/// A refresh needs `&mut self`, so there is exactly one writer per mirror.
/// Mirrors of different threads only share the gate.
pub struct ThreadMirror<P = Post> {
    key: ThreadKey,
    gate_key: String,
    posts: Vec<P>,
    gate: Arc<RequestGate>,
    interval: Duration,
    last_fetch: Option<DateTime<Utc>>,
    next_update: Option<Instant>,
}

impl<P: Identified> ThreadMirror<P> {
    /// An empty mirror. The first refresh counts every post as inserted.
    pub fn new(key: ThreadKey, gate: Arc<RequestGate>) -> Self {
        let interval = gate.config().default_key_interval;
        Self {
            gate_key: key.to_string(),
            key,
            posts: Vec::new(),
            gate,
            interval,
            last_fetch: None,
            next_update: None,
        }
    }

    /// Create a mirror and fill it with an initial fetch.
    pub fn open<F: Fetcher<P>>(
        key: ThreadKey,
        gate: Arc<RequestGate>,
        fetcher: &F,
    ) -> Result<Self, F::Error> {
        let mut mirror = Self::new(key, gate);
        mirror.refresh(fetcher)?;
        Ok(mirror)
    }

    /// Minimum time between two refreshes of this thread. Values below the
    /// gate's floor are raised to it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start from posts fetched elsewhere, e.g. from an index page.
    pub fn with_posts(mut self, posts: Vec<P>, fetched_at: DateTime<Utc>) -> Self {
        self.posts = posts;
        self.last_fetch = Some(fetched_at);
        self
    }

    /// Wait for a slot, fetch, reconcile and adopt the fetched posts.
    ///
    /// On a fetch error the held posts and fetch time are left as they were;
    /// the gate slot is still spent.
    pub fn refresh<F: Fetcher<P>>(&mut self, fetcher: &F) -> Result<Delta, F::Error> {
        let granted = self.gate.acquire(&self.gate_key, self.interval);
        self.next_update = Some(later(granted, self.gate.effective_interval(self.interval)));

        let fetched = match fetcher.fetch(&self.key, self.last_fetch) {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(thread = %self.key, error = %e, "thread refresh failed");
                return Err(e);
            }
        };

        let delta = match fetched {
            Fetched::NotModified => Delta::default(),
            Fetched::Posts(posts) => {
                let delta = reconcile(&self.posts, &posts);
                self.posts = posts;
                delta
            }
        };
        self.last_fetch = Some(Utc::now());

        tracing::info!(
            thread = %self.key,
            inserted = delta.inserted,
            deleted = delta.deleted,
            total = self.posts.len(),
            "thread refreshed"
        );
        Ok(delta)
    }
}

impl<P> ThreadMirror<P> {
    pub fn key(&self) -> &ThreadKey {
        &self.key
    }

    pub fn posts(&self) -> &[P] {
        &self.posts
    }

    /// Number of posts currently known.
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.last_fetch
    }

    /// Earliest instant the next refresh can go out without waiting on this
    /// thread's own floor. `None` before the first refresh.
    pub fn next_update(&self) -> Option<Instant> {
        self.next_update
    }

    pub fn into_posts(self) -> Vec<P> {
        self.posts
    }
}

// Thread-level fields are only carried by the OP.
impl ThreadMirror<Post> {
    pub fn op(&self) -> Option<&Post> {
        find_op(&self.posts)
    }

    /// Id of the OP, or the requested thread number before anything is held.
    pub fn thread_id(&self) -> PostId {
        self.op().map(|p| p.id).unwrap_or(self.key.thread)
    }

    fn op_info(&self) -> OpInfo {
        self.op().map(|p| p.op.clone()).unwrap_or_default()
    }

    pub fn replies(&self) -> u32 {
        self.op_info().replies
    }

    pub fn images(&self) -> u32 {
        self.op_info().images
    }

    pub fn omitted_posts(&self) -> u32 {
        self.op_info().omitted_posts
    }

    pub fn omitted_images(&self) -> u32 {
        self.op_info().omitted_images
    }

    pub fn bump_limit(&self) -> bool {
        self.op_info().bump_limit
    }

    pub fn image_limit(&self) -> bool {
        self.op_info().image_limit
    }

    pub fn closed(&self) -> bool {
        self.op_info().closed
    }

    pub fn sticky(&self) -> bool {
        self.op_info().sticky
    }

    pub fn custom_spoiler(&self) -> u32 {
        self.op_info().custom_spoiler
    }
}

impl fmt::Display for ThreadMirror<Post> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for post in &self.posts {
            write!(f, "{}\n\n", post)?;
        }
        Ok(())
    }
}
