use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Envelope returned by the media-info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfoResponse {
    pub items: Vec<MediaInfoRecord>,
    #[serde(default)]
    pub status: String,
}

/// Normalized description of a single post.
///
/// List-typed fields are plain `Vec`s: after a successful decode they are
/// always present containers (possibly empty), never absent. The raw
/// transport may emit `null` for them, which makes the typed decode fail;
/// that failure is repaired by the fetch chain's normalization pass, not
/// tolerated here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaInfoRecord {
    #[serde(default)]
    pub pk: u64,
    pub user: MediaUser,
    #[serde(default)]
    pub caption: Option<Caption>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub taken_at: i64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub carousel_media: Vec<MediaResource>,
    #[serde(default)]
    pub video_versions: Vec<VideoVersion>,
    #[serde(default)]
    pub usertags: Vec<Usertag>,
}

impl MediaInfoRecord {
    pub fn caption_text(&self) -> &str {
        self.caption.as_ref().map_or("", |c| c.text.as_str())
    }

    pub fn taken_at_utc(&self) -> Option<DateTime<Utc>> {
        if self.taken_at == 0 {
            return None;
        }
        Utc.timestamp_opt(self.taken_at, 0).single()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaUser {
    #[serde(default)]
    pub pk: u64,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Caption {
    #[serde(default)]
    pub text: String,
}

/// One attached media candidate of a carousel post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaResource {
    #[serde(default)]
    pub pk: u64,
    #[serde(default)]
    pub media_type: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoVersion {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Usertag {
    pub user: MediaUser,
}
