use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One page of comments plus the cursor for the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub next_max_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub pk: u64,
    pub user: CommentUser,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at_utc: Option<i64>,
    #[serde(default)]
    pub comment_like_count: u64,
    // Reply attributes are frequently absent on the wire.
    #[serde(default)]
    pub parent_comment_id: Option<u64>,
    #[serde(default)]
    pub child_comment_count: u64,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at_utc
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentUser {
    #[serde(default)]
    pub pk: u64,
    pub username: String,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}
