//! Endpoint and media URL construction.

use crate::models::{Post, PostId};

pub const API_HOST: &str = "a.4cdn.org";
pub const IMAGE_HOST: &str = "i.4cdn.org";
pub const STATIC_HOST: &str = "s.4cdn.org";

/// Hosts and scheme for every URL the client builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiHosts {
    pub ssl: bool,
    pub api: String,
    pub image: String,
    pub static_files: String,
}

impl Default for ApiHosts {
    fn default() -> Self {
        Self {
            ssl: true,
            api: API_HOST.to_string(),
            image: IMAGE_HOST.to_string(),
            static_files: STATIC_HOST.to_string(),
        }
    }
}

impl ApiHosts {
    fn scheme(&self) -> &'static str {
        if self.ssl {
            "https"
        } else {
            "http"
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme(), self.api, path)
    }

    pub fn thread_url(&self, board: &str, thread: PostId) -> String {
        self.api_url(&format!("/{}/thread/{}.json", board, thread))
    }

    pub fn index_url(&self, board: &str, page: u32) -> String {
        self.api_url(&format!("/{}/{}.json", board, page))
    }

    pub fn catalog_url(&self, board: &str) -> String {
        self.api_url(&format!("/{}/catalog.json", board))
    }

    pub fn thread_list_url(&self, board: &str) -> String {
        self.api_url(&format!("/{}/threads.json", board))
    }

    pub fn boards_url(&self) -> String {
        self.api_url("/boards.json")
    }

    /// Full-size attachment, if the post has one.
    pub fn image_url(&self, post: &Post) -> Option<String> {
        let file = post.file.as_ref()?;
        Some(format!(
            "{}://{}/{}/{}{}",
            self.scheme(),
            self.image,
            post.board,
            file.id,
            file.ext
        ))
    }

    /// Thumbnails are always JPEG.
    pub fn thumb_url(&self, post: &Post) -> Option<String> {
        let file = post.file.as_ref()?;
        Some(format!(
            "{}://{}/{}/{}s.jpg",
            self.scheme(),
            self.image,
            post.board,
            file.id
        ))
    }

    pub fn country_flag_url(&self, post: &Post) -> Option<String> {
        if post.country.is_empty() {
            return None;
        }
        // /pol/ serves its own flag set
        let set = if post.board == "pol" { "country/troll" } else { "country" };
        Some(format!(
            "{}://{}/image/{}/{}.gif",
            self.scheme(),
            self.static_files,
            set,
            post.country
        ))
    }

    /// Custom spoiler image `id` of `board`, or `None` past the thread's spoiler count.
    pub fn custom_spoiler_url(&self, board: &str, available: u32, id: u32) -> Option<String> {
        if id == 0 || id > available {
            return None;
        }
        Some(format!(
            "{}://{}/image/spoiler-{}{}.png",
            self.scheme(),
            self.static_files,
            board,
            id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{File, OpInfo};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn post_on(board: &str) -> Post {
        Post {
            id: PostId(3856791),
            reply_to: None,
            board: board.to_string(),
            time: Utc.timestamp_opt(0, 0).unwrap(),
            subject: String::new(),
            last_modified: None,
            name: "Anonymous".to_string(),
            trip: String::new(),
            email: String::new(),
            poster_id: String::new(),
            capcode: String::new(),
            country: String::new(),
            country_name: String::new(),
            comment: String::new(),
            file: None,
            capcode_replies: HashMap::new(),
            op: OpInfo::default(),
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let hosts = ApiHosts::default();
        assert_eq!(
            hosts.thread_url("ck", PostId(3856791)),
            "https://a.4cdn.org/ck/thread/3856791.json"
        );
        assert_eq!(hosts.index_url("a", 0), "https://a.4cdn.org/a/0.json");
        assert_eq!(hosts.catalog_url("g"), "https://a.4cdn.org/g/catalog.json");
        assert_eq!(hosts.thread_list_url("g"), "https://a.4cdn.org/g/threads.json");

        let plain = ApiHosts {
            ssl: false,
            ..ApiHosts::default()
        };
        assert_eq!(plain.boards_url(), "http://a.4cdn.org/boards.json");
    }

    #[test]
    fn test_media_urls() {
        let hosts = ApiHosts::default();
        let mut post = post_on("ck");
        assert_eq!(hosts.image_url(&post), None);
        assert_eq!(hosts.thumb_url(&post), None);

        post.file = Some(File {
            id: 1346968817055,
            name: "soup".to_string(),
            ext: ".png".to_string(),
            size: 1,
            md5: String::new(),
            width: 1,
            height: 1,
            thumb_width: 1,
            thumb_height: 1,
            deleted: false,
            spoiler: false,
        });
        assert_eq!(
            hosts.image_url(&post).as_deref(),
            Some("https://i.4cdn.org/ck/1346968817055.png")
        );
        assert_eq!(
            hosts.thumb_url(&post).as_deref(),
            Some("https://i.4cdn.org/ck/1346968817055s.jpg")
        );
    }

    #[test]
    fn test_country_flag_url() {
        let hosts = ApiHosts::default();
        let mut post = post_on("int");
        assert_eq!(hosts.country_flag_url(&post), None);

        post.country = "NZ".to_string();
        assert_eq!(
            hosts.country_flag_url(&post).as_deref(),
            Some("https://s.4cdn.org/image/country/NZ.gif")
        );

        post.board = "pol".to_string();
        assert_eq!(
            hosts.country_flag_url(&post).as_deref(),
            Some("https://s.4cdn.org/image/country/troll/NZ.gif")
        );
    }

    #[test]
    fn test_custom_spoiler_url() {
        let hosts = ApiHosts::default();
        assert_eq!(
            hosts.custom_spoiler_url("a", 3, 2).as_deref(),
            Some("https://s.4cdn.org/image/spoiler-a2.png")
        );
        assert_eq!(hosts.custom_spoiler_url("a", 3, 4), None);
        assert_eq!(hosts.custom_spoiler_url("a", 0, 0), None);
    }
}
