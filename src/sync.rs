//! Reconciliation of a held post sequence against a freshly fetched one.
//!
//! The upstream only ever appends posts or removes them; it never reorders
//! or brings a deleted id back. Under that contract a single forward scan
//! over both sequences is enough to tell removed posts from new ones, using
//! nothing but post ids.
//!
//! Both inputs must be strictly increasing by id. If they are not, the
//! counts are best effort and carry no guarantee.

use crate::models::Identified;

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delta {
    /// Posts in the new sequence past the last matched position.
    pub inserted: usize,
    /// Posts of the old sequence with no counterpart in the new one.
    pub deleted: usize,
}

impl Delta {
    pub fn is_unchanged(&self) -> bool {
        self.inserted == 0 && self.deleted == 0
    }
}

/// Count inserted and deleted posts between `old` and `new`.
///
/// Walks `old` once. A post that matches the current position in `new`
/// advances both cursors; one that doesn't is counted as deleted and the
/// cursor into `new` stays put, so a run of deletions is absorbed one post
/// at a time. Whatever remains of `new` afterwards is counted as inserted.
///
/// Runs in O(m + n) and does not allocate. The caller adopts `new`
/// wholesale afterwards; nothing here patches `old`.
pub fn reconcile<P: Identified>(old: &[P], new: &[P]) -> Delta {
    let mut matched = 0;
    let mut deleted = 0;

    for post in old {
        // Once `new` is exhausted every remaining old post is gone.
        match new.get(matched) {
            Some(candidate) if candidate.post_id() == post.post_id() => matched += 1,
            _ => deleted += 1,
        }
    }

    Delta {
        inserted: new.len() - matched,
        deleted,
    }
}
