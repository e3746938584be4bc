use crate::application::models::comment::Comment;
use crate::error::ClientError;
use crate::session::interface::Session;
use crate::transport::interface::CommentTransport;
use std::sync::Arc;
use tracing::{debug, info};

/// Pages through a post's comments until the platform-reported total is
/// reached or the cursor runs out. The platform routinely serves fewer
/// comments than it reports, so the cursor ending early is not an error.
pub struct CommentService<T: CommentTransport> {
    transport: Arc<T>,
}

impl<T: CommentTransport> CommentService<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn fetch_all(
        &self,
        session: &Session,
        media_pk: u64,
        expected_total: u64,
    ) -> Result<Vec<Comment>, ClientError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .transport
                .media_comments(session, media_pk, cursor.as_deref())
                .await?;
            if page.comments.is_empty() {
                break;
            }
            all.extend(page.comments);
            debug!(
                "fetched {} of {} reported comments",
                all.len(),
                expected_total
            );
            if all.len() as u64 >= expected_total {
                break;
            }
            match page.next_max_id {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            "comment pagination done: {} fetched, {} reported",
            all.len(),
            expected_total
        );
        Ok(all)
    }
}
