use crate::application::models::media::{MediaInfoRecord, MediaInfoResponse};
use crate::constants::MUST_BE_LIST_KEYS;
use crate::error::{classify_failure, ClientError, FailureKind, FetchError};
use crate::session::interface::{Authenticator, Session};
use crate::session::manager::SessionManager;
use crate::transport::interface::MediaTransport;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Retrieves a post's media info through an ordered fallback chain:
///
/// 1. direct typed retrieval;
/// 2. raw fetch + null-to-empty-list normalization + typed decode;
/// 3. for auth-signature failures only: one fixed delay, a fresh login
///    (persisted best-effort by the session manager), and one repeat of 2;
/// 4. terminal error carrying both truncated strategy messages.
///
/// The chain wraps the transport capability explicitly at construction; the
/// operation is a pure read except for the session replacement in step 3.
pub struct ResilientFetcher<T: MediaTransport, A: Authenticator> {
    transport: Arc<T>,
    sessions: Arc<SessionManager<A>>,
    retry_delay: Duration,
}

impl<T: MediaTransport, A: Authenticator> ResilientFetcher<T, A> {
    pub fn new(transport: Arc<T>, sessions: Arc<SessionManager<A>>, retry_delay: Duration) -> Self {
        Self {
            transport,
            sessions,
            retry_delay,
        }
    }

    #[instrument(skip(self, session))]
    pub async fn fetch(
        &self,
        session: &mut Session,
        media_pk: u64,
    ) -> Result<MediaInfoRecord, FetchError> {
        let direct_err = match self.transport.media_info(session, media_pk).await {
            Ok(record) => return Ok(record),
            Err(e) => {
                debug!("direct media info failed: {e}");
                e
            }
        };

        let normalize_err = match self.fetch_normalized(session, media_pk).await {
            Ok(record) => return Ok(record),
            Err(e) => {
                debug!("raw fetch and normalize failed: {e}");
                e
            }
        };

        // Re-login is worth its cost only when the symptom matches an auth
        // failure; a pure data-shape error would not be fixed by it.
        if classify_failure(&normalize_err) == FailureKind::AuthExpired {
            info!("session looks expired, re-authenticating once");
            tokio::time::sleep(self.retry_delay).await;
            match self.sessions.fresh_login().await {
                Ok(new_session) => {
                    *session = new_session;
                    match self.fetch_normalized(session, media_pk).await {
                        Ok(record) => return Ok(record),
                        Err(e) => {
                            debug!("post-relogin fetch failed: {e}");
                            return Err(FetchError::exhausted(&direct_err, &e));
                        }
                    }
                }
                Err(e) => {
                    debug!("re-login failed: {e}");
                    return Err(FetchError::exhausted(&direct_err, &e));
                }
            }
        }

        Err(FetchError::exhausted(&direct_err, &normalize_err))
    }

    async fn fetch_normalized(
        &self,
        session: &Session,
        media_pk: u64,
    ) -> Result<MediaInfoRecord, ClientError> {
        let mut raw = self.transport.media_info_raw(session, media_pk).await?;
        normalize_payload(&mut raw, &MUST_BE_LIST_KEYS);
        let response: MediaInfoResponse = serde_json::from_value(raw)?;
        response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::MissingData("media info response had no items".to_string()))
    }
}

/// Replaces `null` values under any key in `must_be_list` with an empty
/// array, anywhere in the tree. Values under other keys and non-null values
/// are left untouched; the walk recurses into every mapping and sequence.
pub fn normalize_payload(value: &mut Value, must_be_list: &[&str]) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if child.is_null() && must_be_list.contains(&key.as_str()) {
                    *child = Value::Array(Vec::new());
                } else {
                    normalize_payload(child, must_be_list);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_payload(item, must_be_list);
            }
        }
        _ => {}
    }
}


#[cfg(test)]
mod tests_fetcher {
    use super::*;
    use crate::config::Credentials;
    use crate::error::AuthError;
    use crate::session::store::SessionStore;
    use crate::transport::interface::MediaTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeTransport {
        calls: Mutex<Vec<&'static str>>,
        direct_results: Mutex<VecDeque<Result<MediaInfoRecord, ClientError>>>,
        raw_results: Mutex<VecDeque<Result<Value, ClientError>>>,
    }

    impl FakeTransport {
        fn new(
            direct: Vec<Result<MediaInfoRecord, ClientError>>,
            raw: Vec<Result<Value, ClientError>>,
        ) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                direct_results: Mutex::new(direct.into()),
                raw_results: Mutex::new(raw.into()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl MediaTransport for FakeTransport {
        async fn media_info(
            &self,
            _session: &Session,
            _media_pk: u64,
        ) -> Result<MediaInfoRecord, ClientError> {
            self.calls.lock().unwrap().push("media_info");
            self.direct_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::MissingData("no queued result".to_string())))
        }

        async fn media_info_raw(
            &self,
            _session: &Session,
            _media_pk: u64,
        ) -> Result<Value, ClientError> {
            self.calls.lock().unwrap().push("media_info_raw");
            self.raw_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::MissingData("no queued result".to_string())))
        }
    }

    struct FakeAuth {
        logins: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Authenticator for FakeAuth {
        async fn login(&self, _credentials: &Credentials) -> Result<Session, AuthError> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(Session::new(json!({"username": "alice", "fresh": true})))
        }

        async fn probe(&self, _session: &Session) -> Result<(), AuthError> {
            Ok(())
        }
    }

    fn shape_error() -> ClientError {
        ClientError::Json(serde_json::from_str::<u64>("\"boom\"").unwrap_err())
    }

    fn good_raw_payload() -> Value {
        json!({
            "status": "ok",
            "items": [{
                "pk": 42,
                "user": {"pk": 7, "username": "alice"},
                "caption": {"text": "repaired"},
                "like_count": 5,
                "taken_at": 1_700_000_000,
                "comment_count": 9,
                "carousel_media": null,
                "video_versions": null,
                "usertags": null
            }]
        })
    }

    struct Harness {
        transport: Arc<FakeTransport>,
        auth: Arc<FakeAuth>,
        fetcher: ResilientFetcher<FakeTransport, FakeAuth>,
        session: Session,
        // Keeps the session directory alive for the test's duration.
        _dir: tempfile::TempDir,
    }

    fn harness(
        direct: Vec<Result<MediaInfoRecord, ClientError>>,
        raw: Vec<Result<Value, ClientError>>,
    ) -> Harness {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::new(direct, raw));
        let auth = Arc::new(FakeAuth {
            logins: AtomicUsize::new(0),
        });
        let sessions = Arc::new(SessionManager::new(
            auth.clone(),
            Credentials {
                username: "alice".to_string(),
                password: "hunter2".to_string(),
            },
            SessionStore::new(dir.path().join("session.json")),
            Duration::from_millis(1),
        ));
        let fetcher =
            ResilientFetcher::new(transport.clone(), sessions, Duration::from_millis(1));
        Harness {
            transport,
            auth,
            fetcher,
            session: Session::new(json!({"username": "alice"})),
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn direct_success_skips_every_fallback() {
        let record: MediaInfoRecord = serde_json::from_value(
            json!({"pk": 42, "user": {"username": "alice"}, "taken_at": 0}),
        )
        .unwrap();
        let mut h = harness(vec![Ok(record.clone())], vec![]);

        let fetched = h.fetcher.fetch(&mut h.session, 42).await.unwrap();

        assert_eq!(fetched, record);
        assert_eq!(h.transport.calls(), vec!["media_info"]);
        assert_eq!(h.auth.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn normalization_repairs_null_lists_without_relogin() {
        let mut h = harness(vec![Err(shape_error())], vec![Ok(good_raw_payload())]);

        let record = h.fetcher.fetch(&mut h.session, 42).await.unwrap();

        assert_eq!(record.caption_text(), "repaired");
        assert!(record.carousel_media.is_empty());
        assert!(record.usertags.is_empty());
        assert_eq!(h.transport.calls(), vec!["media_info", "media_info_raw"]);
        assert_eq!(h.auth.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_auth_failure_never_triggers_relogin() {
        let mut h = harness(
            vec![Err(shape_error())],
            vec![Err(ClientError::MissingData("still broken".to_string()))],
        );

        let err = h.fetcher.fetch(&mut h.session, 42).await.unwrap_err();

        assert_eq!(h.auth.logins.load(Ordering::SeqCst), 0);
        assert_eq!(h.transport.calls(), vec!["media_info", "media_info_raw"]);
        assert!(err.normalize.contains("still broken"));
    }

    #[tokio::test]
    async fn auth_failure_triggers_one_relogin_and_one_repeat() {
        let mut h = harness(
            vec![Err(shape_error())],
            vec![
                Err(ClientError::LoginRequired(
                    r#"{"message":"login_required"}"#.to_string(),
                )),
                Ok(good_raw_payload()),
            ],
        );

        let record = h.fetcher.fetch(&mut h.session, 42).await.unwrap();

        assert_eq!(record.comment_count, 9);
        assert_eq!(h.auth.logins.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.transport.calls(),
            vec!["media_info", "media_info_raw", "media_info_raw"]
        );
        // The caller's session was replaced by the fresh login.
        assert_eq!(
            h.session.settings().get("fresh"),
            Some(&Value::Bool(true))
        );
    }

    #[tokio::test]
    async fn exhaustion_reports_both_truncated_messages() {
        let long_direct = "d".repeat(500);
        let long_normalize = "n".repeat(500);
        let mut h = harness(
            vec![Err(ClientError::MissingData(long_direct))],
            vec![Err(ClientError::MissingData(long_normalize))],
        );

        let err = h.fetcher.fetch(&mut h.session, 42).await.unwrap_err();

        assert!(err.direct.chars().count() <= 200);
        assert!(err.normalize.chars().count() <= 200);
        assert!(err.direct.contains("ddd"));
        assert!(err.normalize.contains("nnn"));
        assert!(err.to_string().contains("fresh credentials"));
    }

    #[tokio::test]
    async fn relogin_repeat_failure_is_terminal() {
        let mut h = harness(
            vec![Err(shape_error())],
            vec![
                Err(ClientError::Unauthorized),
                Err(ClientError::MissingData("gone after relogin".to_string())),
            ],
        );

        let err = h.fetcher.fetch(&mut h.session, 42).await.unwrap_err();

        assert_eq!(h.auth.logins.load(Ordering::SeqCst), 1);
        assert!(err.normalize.contains("gone after relogin"));
    }
}
