use crate::application::models::comment::CommentPage;
use crate::application::models::media::MediaInfoRecord;
use crate::error::ClientError;
use crate::session::interface::Session;
use async_trait::async_trait;

/// Structured and raw retrieval of a post's media info.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Typed retrieval; fails when the payload does not match the schema.
    async fn media_info(
        &self,
        session: &Session,
        media_pk: u64,
    ) -> Result<MediaInfoRecord, ClientError>;

    /// Untyped retrieval of the same payload, for local repair before decode.
    async fn media_info_raw(
        &self,
        session: &Session,
        media_pk: u64,
    ) -> Result<serde_json::Value, ClientError>;
}

/// Cursor-paginated comment retrieval.
#[async_trait]
pub trait CommentTransport: Send + Sync {
    async fn media_comments(
        &self,
        session: &Session,
        media_pk: u64,
        max_id: Option<&str>,
    ) -> Result<CommentPage, ClientError>;
}
