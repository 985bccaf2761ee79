use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::IF_MODIFIED_SINCE;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::gate::RequestGate;
use crate::mirror::{Fetched, Fetcher, ThreadMirror};
use crate::models::{Board, CatalogPage, Post, PostId, ThreadKey, ThreadPreview};
use crate::parse;
use crate::urls::ApiHosts;

/// Blocking client for the read-only board API.
///
/// Every request is paced by the shared [`RequestGate`]. Board lists,
/// catalogs and index pages only wait on the global floor; thread refreshes
/// go through a [`ThreadMirror`], which also applies the per-thread floor.
pub struct ChanClient {
    client: Client,
    hosts: ApiHosts,
    gate: Arc<RequestGate>,
    update_cooldown: std::time::Duration,
    // Filled on the first board list fetch
    boards: Mutex<Option<Vec<Board>>>,
}

impl ChanClient {
    pub fn new(config: &Config) -> Result<Self> {
        let gate = Arc::new(RequestGate::new(config.gate_config()));
        Self::with_gate(config, gate)
    }

    /// Build a client that shares pacing with other users of `gate`.
    pub fn with_gate(config: &Config, gate: Arc<RequestGate>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            hosts: config.hosts(),
            gate,
            update_cooldown: config.update_cooldown,
            boards: Mutex::new(None),
        })
    }

    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    pub fn hosts(&self) -> &ApiHosts {
        &self.hosts
    }

    /// All boards with their titles. The list is cached for [`lookup_board`](Self::lookup_board).
    pub fn boards(&self) -> Result<Vec<Board>> {
        let body = self.get_paced(&self.hosts.boards_url())?;
        let boards = parse::parse_boards(&body)?;

        if let Ok(mut cache) = self.boards.lock() {
            *cache = Some(boards.clone());
        }
        tracing::debug!(count = boards.len(), "board list updated");
        Ok(boards)
    }

    /// Find a board by name, fetching the board list once if needed.
    pub fn lookup_board(&self, name: &str) -> Result<Board> {
        let cached = self.boards.lock().ok().and_then(|cache| cache.clone());
        let boards = match cached {
            Some(boards) => boards,
            None => self.boards()?,
        };

        boards
            .into_iter()
            .find(|b| b.board == name)
            .ok_or_else(|| Error::BoardNotFound(name.to_string()))
    }

    /// Ids of every live thread on `board`, grouped by page.
    pub fn thread_list(&self, board: &str) -> Result<Vec<Vec<PostId>>> {
        require_board(board)?;
        let body = self.get_paced(&self.hosts.thread_list_url(board))?;
        parse::parse_thread_list(&body)
    }

    /// Thread previews on one index page of `board`.
    pub fn index(&self, board: &str, page: u32) -> Result<Vec<ThreadPreview>> {
        require_board(board)?;
        let body = self.get_paced(&self.hosts.index_url(board, page))?;
        parse::parse_index(&body, board)
    }

    pub fn catalog(&self, board: &str) -> Result<Vec<CatalogPage>> {
        require_board(board)?;
        let body = self.get_paced(&self.hosts.catalog_url(board))?;
        parse::parse_catalog(&body, board)
    }

    /// Fetch a thread once. To follow a thread over time use [`mirror`](Self::mirror),
    /// which sends `If-Modified-Since` and keeps the per-thread floor.
    pub fn thread(&self, board: &str, thread: PostId) -> Result<Vec<Post>> {
        require_board(board)?;
        let body = self.get_paced(&self.hosts.thread_url(board, thread))?;
        let posts = parse::parse_thread(&body, board)?;
        if posts.is_empty() {
            return Err(Error::EmptyThread {
                board: board.to_string(),
                thread: thread.0,
            });
        }
        Ok(posts)
    }

    /// A mirror of `/board/thread`, filled with an initial fetch.
    pub fn mirror(&self, board: &str, thread: PostId) -> Result<ThreadMirror<Post>> {
        require_board(board)?;
        let mut mirror = ThreadMirror::new(ThreadKey::new(board, thread), Arc::clone(&self.gate))
            .with_interval(self.update_cooldown);
        mirror.refresh(self)?;
        Ok(mirror)
    }

    fn get_paced(&self, url: &str) -> Result<String> {
        self.gate.acquire_global();
        match self.get(url, None)? {
            Some(body) => Ok(body),
            // Only possible if the server ignores the missing precondition.
            None => Err(Error::Status {
                status: StatusCode::NOT_MODIFIED.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    /// Plain GET. `Ok(None)` means the server answered 304 Not Modified.
    fn get(&self, url: &str, since: Option<DateTime<Utc>>) -> Result<Option<String>> {
        tracing::trace!(url, "GET");
        let mut request = self.client.get(url);
        if let Some(since) = since {
            request = request.header(IF_MODIFIED_SINCE, http_date(since));
        }

        let response = request.send()?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "request failed");
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(Some(response.text()?))
    }
}

impl Fetcher<Post> for ChanClient {
    type Error = Error;

    fn fetch(&self, key: &ThreadKey, since: Option<DateTime<Utc>>) -> Result<Fetched<Post>> {
        let url = self.hosts.thread_url(&key.board, key.thread);
        match self.get(&url, since)? {
            None => Ok(Fetched::NotModified),
            Some(body) => Ok(Fetched::Posts(parse::parse_thread(&body, &key.board)?)),
        }
    }
}

fn require_board(board: &str) -> Result<()> {
    if board.is_empty() {
        return Err(Error::MissingBoard);
    }
    Ok(())
}

/// RFC 1123 date as used in HTTP headers.
fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client() -> ChanClient {
        ChanClient::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_http_date() {
        let time = Utc.with_ymd_and_hms(2012, 9, 6, 22, 0, 17).unwrap();
        assert_eq!(http_date(time), "Thu, 06 Sep 2012 22:00:17 GMT");
    }

    #[test]
    fn test_missing_board_is_rejected_before_any_request() {
        let client = client();
        assert!(matches!(client.catalog(""), Err(Error::MissingBoard)));
        assert!(matches!(client.index("", 1), Err(Error::MissingBoard)));
        assert!(matches!(client.thread("", PostId(1)), Err(Error::MissingBoard)));
        assert!(matches!(client.mirror("", PostId(1)), Err(Error::MissingBoard)));
        assert!(client.gate().next_allowed_global().is_none());
    }

    #[test]
    fn test_lookup_board_uses_cache() {
        let client = client();
        *client.boards.lock().unwrap() = Some(vec![Board {
            board: "ck".to_string(),
            title: "Food & Cooking".to_string(),
        }]);

        assert_eq!(client.lookup_board("ck").unwrap().title, "Food & Cooking");
        assert!(matches!(client.lookup_board("zz"), Err(Error::BoardNotFound(name)) if name == "zz"));
        assert!(client.gate().next_allowed_global().is_none());
    }

    #[test]
    fn test_shared_gate() {
        let gate = Arc::new(RequestGate::default());
        let a = ChanClient::with_gate(&Config::default(), Arc::clone(&gate)).unwrap();
        let b = ChanClient::with_gate(&Config::default(), Arc::clone(&gate)).unwrap();
        assert!(Arc::ptr_eq(a.gate(), b.gate()));
    }
}
