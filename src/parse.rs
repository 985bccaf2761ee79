//! Mapping from the API's JSON documents to the crate's models.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{Board, CatalogPage, File, OpInfo, Post, PostId, ThreadPreview};

/// A post exactly as the API sends it. Every field is optional upstream.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonPost {
    no: u64,
    resto: u64, // 0 on the OP
    sticky: u8,
    closed: u8,
    time: i64,
    name: String,
    trip: String,
    id: String,
    capcode: String,
    country: String,
    country_name: String,
    email: String,
    sub: String,
    com: String,
    tim: u64,
    filename: String,
    ext: String,
    fsize: u64,
    md5: String,
    w: u32,
    h: u32,
    tn_w: u32,
    tn_h: u32,
    filedeleted: u8,
    spoiler: u8,
    custom_spoiler: u32,
    omitted_posts: u32,
    omitted_images: u32,
    replies: u32,
    images: u32,
    bumplimit: u8,
    imagelimit: u8,
    capcode_replies: HashMap<String, Vec<u64>>,
    last_modified: i64,
}

#[derive(Deserialize)]
struct ThreadDocument {
    #[serde(default)]
    posts: Vec<JsonPost>,
}

#[derive(Deserialize)]
struct IndexDocument {
    #[serde(default)]
    threads: Vec<ThreadDocument>,
}

#[derive(Deserialize)]
struct CatalogDocumentPage {
    page: u32,
    #[serde(default)]
    threads: Vec<JsonPost>,
}

#[derive(Deserialize)]
struct ThreadListPage {
    page: u32,
    #[serde(default)]
    threads: Vec<ThreadListEntry>,
}

#[derive(Deserialize)]
struct ThreadListEntry {
    no: u64,
}

#[derive(Deserialize)]
struct BoardsDocument {
    boards: Vec<Board>,
}

impl JsonPost {
    fn into_post(self, board: &str) -> Post {
        let file = if self.filename.is_empty() {
            None
        } else {
            Some(File {
                id: self.tim,
                name: self.filename,
                ext: self.ext,
                size: self.fsize,
                md5: self.md5,
                width: self.w,
                height: self.h,
                thumb_width: self.tn_w,
                thumb_height: self.tn_h,
                deleted: self.filedeleted == 1,
                spoiler: self.spoiler == 1,
            })
        };

        Post {
            id: PostId(self.no),
            reply_to: (self.resto != 0).then_some(PostId(self.resto)),
            board: board.to_string(),
            time: DateTime::<Utc>::from_timestamp(self.time, 0).unwrap_or_default(),
            subject: self.sub,
            last_modified: (self.last_modified != 0)
                .then(|| DateTime::<Utc>::from_timestamp(self.last_modified, 0))
                .flatten(),
            name: self.name,
            trip: self.trip,
            email: self.email,
            poster_id: self.id,
            capcode: self.capcode,
            country: self.country,
            country_name: self.country_name,
            comment: self.com,
            file,
            capcode_replies: self
                .capcode_replies
                .into_iter()
                .map(|(capcode, ids)| (capcode, ids.into_iter().map(PostId).collect()))
                .collect(),
            op: OpInfo {
                replies: self.replies,
                images: self.images,
                omitted_posts: self.omitted_posts,
                omitted_images: self.omitted_images,
                bump_limit: self.bumplimit == 1,
                image_limit: self.imagelimit == 1,
                sticky: self.sticky == 1,
                closed: self.closed == 1,
                custom_spoiler: self.custom_spoiler,
            },
        }
    }
}

fn into_posts(posts: Vec<JsonPost>, board: &str) -> Vec<Post> {
    posts.into_iter().map(|p| p.into_post(board)).collect()
}

/// Parse `/{board}/thread/{id}.json`. Posts come back in upstream order.
pub fn parse_thread(body: &str, board: &str) -> Result<Vec<Post>> {
    let doc: ThreadDocument = serde_json::from_str(body)?;
    Ok(into_posts(doc.posts, board))
}

/// Parse an index page `/{board}/{page}.json`.
pub fn parse_index(body: &str, board: &str) -> Result<Vec<ThreadPreview>> {
    let doc: IndexDocument = serde_json::from_str(body)?;
    Ok(doc
        .threads
        .into_iter()
        .map(|t| ThreadPreview {
            board: board.to_string(),
            posts: into_posts(t.posts, board),
        })
        .collect())
}

/// Parse `/{board}/catalog.json`.
pub fn parse_catalog(body: &str, board: &str) -> Result<Vec<CatalogPage>> {
    let pages: Vec<CatalogDocumentPage> = serde_json::from_str(body)?;
    Ok(pages
        .into_iter()
        .map(|p| CatalogPage {
            page: p.page,
            threads: into_posts(p.threads, board),
        })
        .collect())
}

/// Parse `/{board}/threads.json` into thread ids grouped by page, in page order.
pub fn parse_thread_list(body: &str) -> Result<Vec<Vec<PostId>>> {
    let mut pages: Vec<ThreadListPage> = serde_json::from_str(body)?;
    pages.sort_by_key(|p| p.page);
    Ok(pages
        .into_iter()
        .map(|p| p.threads.into_iter().map(|t| PostId(t.no)).collect())
        .collect())
}

/// Parse `/boards.json`.
pub fn parse_boards(body: &str) -> Result<Vec<Board>> {
    let doc: BoardsDocument = serde_json::from_str(body)?;
    Ok(doc.boards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const THREAD: &str = r#"{"posts":[
        {"no":100,"resto":0,"sticky":1,"time":1346968817,"name":"Anonymous",
         "sub":"Soup","com":"first","tim":1346968817055,"filename":"soup",
         "ext":".jpg","fsize":2048,"md5":"q1w2e3==","w":800,"h":600,
         "tn_w":250,"tn_h":187,"replies":2,"images":1,"custom_spoiler":2,
         "last_modified":1346969000},
        {"no":101,"resto":100,"time":1346968900,"name":"Anonymous",
         "trip":"!abc","com":"second","country":"US","country_name":"United States"},
        {"no":105,"resto":100,"time":1346968950,"capcode":"mod","com":"third"}
    ]}"#;

    #[test]
    fn test_parse_thread() {
        let posts = parse_thread(THREAD, "ck").unwrap();
        assert_eq!(posts.len(), 3);

        let op = &posts[0];
        assert!(op.is_op());
        assert_eq!(op.id, PostId(100));
        assert_eq!(op.board, "ck");
        assert_eq!(op.subject, "Soup");
        assert!(op.op.sticky);
        assert!(!op.op.closed);
        assert_eq!(op.op.replies, 2);
        assert_eq!(op.op.custom_spoiler, 2);
        assert_eq!(op.time.timestamp(), 1346968817);
        assert_eq!(op.last_modified.map(|t| t.timestamp()), Some(1346969000));

        let file = op.file.as_ref().unwrap();
        assert_eq!(file.id, 1346968817055);
        assert_eq!(file.ext, ".jpg");
        assert_eq!((file.width, file.height), (800, 600));

        let reply = &posts[1];
        assert_eq!(reply.reply_to, Some(PostId(100)));
        assert_eq!(reply.trip, "!abc");
        assert_eq!(reply.country, "US");
        assert!(reply.file.is_none());
        assert!(reply.last_modified.is_none());

        assert_eq!(posts[2].capcode, "mod");
    }

    #[test]
    fn test_parse_thread_rejects_garbage() {
        assert!(matches!(parse_thread("not json", "ck"), Err(Error::Json(_))));
        assert!(matches!(parse_thread("", "ck"), Err(Error::Json(_))));
    }

    #[test]
    fn test_parse_empty_thread() {
        assert!(parse_thread(r#"{"posts":[]}"#, "ck").unwrap().is_empty());
    }

    #[test]
    fn test_parse_index() {
        let body = r#"{"threads":[
            {"posts":[{"no":1,"resto":0,"omitted_posts":5,"omitted_images":1},{"no":9,"resto":1}]},
            {"posts":[{"no":2,"resto":0}]}
        ]}"#;
        let threads = parse_index(body, "a").unwrap();
        assert_eq!(threads.len(), 2);
        let op = threads[0].op().unwrap();
        assert_eq!(op.id, PostId(1));
        assert_eq!(op.op.omitted_posts, 5);
        assert_eq!(threads[0].posts.len(), 2);
        assert_eq!(threads[1].op().map(|p| p.id), Some(PostId(2)));
    }

    #[test]
    fn test_parse_catalog() {
        let body = r#"[
            {"page":1,"threads":[{"no":10,"sub":"a"},{"no":11}]},
            {"page":2,"threads":[{"no":12,"closed":1}]}
        ]"#;
        let pages = parse_catalog(body, "g").unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page, 1);
        assert_eq!(pages[0].threads.len(), 2);
        assert!(pages[1].threads[0].op.closed);
    }

    #[test]
    fn test_parse_thread_list_orders_pages() {
        let body = r#"[
            {"page":2,"threads":[{"no":5,"last_modified":1}]},
            {"page":1,"threads":[{"no":9},{"no":7}]}
        ]"#;
        let pages = parse_thread_list(body).unwrap();
        assert_eq!(pages, vec![vec![PostId(9), PostId(7)], vec![PostId(5)]]);
    }

    #[test]
    fn test_parse_boards() {
        let body = r#"{"boards":[{"board":"ck","title":"Food & Cooking","ws_board":1}]}"#;
        let boards = parse_boards(body).unwrap();
        assert_eq!(
            boards,
            vec![Board {
                board: "ck".to_string(),
                title: "Food & Cooking".to_string()
            }]
        );
    }
}
