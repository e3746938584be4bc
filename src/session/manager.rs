use crate::config::Credentials;
use crate::error::AuthError;
use crate::session::interface::{Authenticator, Session};
use crate::session::store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Produces a usable, validated session for one account, minimizing
/// redundant logins.
///
/// Callers must not invoke concurrently for the same persisted path; the
/// manager does no internal locking.
pub struct SessionManager<A: Authenticator> {
    auth: Arc<A>,
    credentials: Credentials,
    store: SessionStore,
    retry_delay: Duration,
}

impl<A: Authenticator> SessionManager<A> {
    pub fn new(
        auth: Arc<A>,
        credentials: Credentials,
        store: SessionStore,
        retry_delay: Duration,
    ) -> Self {
        Self {
            auth,
            credentials,
            store,
            retry_delay,
        }
    }

    /// Returns a validated session, reusing the persisted one when its probe
    /// succeeds and falling back to a fresh login otherwise.
    pub async fn acquire(&self) -> Result<Session, AuthError> {
        let persisted = match self.store.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                info!(
                    "persisted session at {} is unreadable ({e}), deleting it",
                    self.store.path().display()
                );
                if let Err(e) = self.store.delete() {
                    warn!("failed to delete unreadable session file: {e}");
                }
                None
            }
        };
        if let Some(session) = persisted {
            match self.auth.probe(&session).await {
                Ok(()) => {
                    debug!("persisted session is valid, no login needed");
                    return Ok(session);
                }
                Err(e) => {
                    info!("session probe failed ({e}), discarding persisted session");
                    if let Err(e) = self.store.delete() {
                        warn!("failed to delete stale session file: {e}");
                    }
                }
            }
        }

        let session = self.login_with_retry().await?;
        self.store.save(&session).map_err(AuthError::from)?;
        Ok(session)
    }

    /// Fresh login for the fetch chain's re-authentication path; persistence
    /// of the new session is best-effort.
    pub async fn fresh_login(&self) -> Result<Session, AuthError> {
        let session = self.login_with_retry().await?;
        if let Err(e) = self.store.save(&session) {
            warn!("failed to persist refreshed session: {e}");
        }
        Ok(session)
    }

    async fn login_with_retry(&self) -> Result<Session, AuthError> {
        let first = match self.auth.login(&self.credentials).await {
            Ok(session) => {
                info!("login succeeded for {}", self.credentials.username);
                return Ok(session);
            }
            Err(e) => e,
        };
        // One fixed-delay retry to absorb transient rate-limiting.
        warn!("login failed ({first}), retrying once");
        tokio::time::sleep(self.retry_delay).await;
        match self.auth.login(&self.credentials).await {
            Ok(session) => {
                info!("login retry succeeded for {}", self.credentials.username);
                Ok(session)
            }
            Err(second) => Err(AuthError::LoginFailed {
                first: first.to_string(),
                second: second.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests_manager {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeAuth {
        login_results: Mutex<VecDeque<Result<Session, AuthError>>>,
        probe_ok: bool,
        login_calls: AtomicUsize,
        probe_calls: AtomicUsize,
    }

    impl FakeAuth {
        fn new(login_results: Vec<Result<Session, AuthError>>, probe_ok: bool) -> Self {
            Self {
                login_results: Mutex::new(login_results.into()),
                probe_ok,
                login_calls: AtomicUsize::new(0),
                probe_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Authenticator for FakeAuth {
        async fn login(&self, _credentials: &Credentials) -> Result<Session, AuthError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            self.login_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AuthError::Other("no queued login result".to_string())))
        }

        async fn probe(&self, _session: &Session) -> Result<(), AuthError> {
            self.probe_calls.fetch_add(1, Ordering::SeqCst);
            if self.probe_ok {
                Ok(())
            } else {
                Err(AuthError::BadCredentials)
            }
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn fresh_session(tag: &str) -> Session {
        Session::new(json!({"username": "alice", "tag": tag}))
    }

    fn manager(auth: Arc<FakeAuth>, store: SessionStore) -> SessionManager<FakeAuth> {
        SessionManager::new(auth, credentials(), store, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn valid_persisted_session_performs_zero_logins() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let persisted = fresh_session("persisted");
        store.save(&persisted).unwrap();

        let auth = Arc::new(FakeAuth::new(vec![], true));
        let session = manager(auth.clone(), store).acquire().await.unwrap();

        assert_eq!(session, persisted);
        assert_eq!(auth.login_calls.load(Ordering::SeqCst), 0);
        assert_eq!(auth.probe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_session_performs_exactly_one_login() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let auth = Arc::new(FakeAuth::new(vec![Ok(fresh_session("new"))], true));
        let session = manager(auth.clone(), store.clone()).acquire().await.unwrap();

        assert_eq!(auth.login_calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.probe_calls.load(Ordering::SeqCst), 0);
        // New session was persisted.
        assert_eq!(store.load().unwrap().unwrap(), session);
    }

    #[tokio::test]
    async fn failed_probe_deletes_file_and_logs_in() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&fresh_session("stale")).unwrap();

        let auth = Arc::new(FakeAuth::new(vec![Ok(fresh_session("new"))], false));
        let session = manager(auth.clone(), store.clone()).acquire().await.unwrap();

        assert_eq!(auth.probe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.login_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().unwrap().unwrap(), session);
    }

    #[tokio::test]
    async fn malformed_session_file_falls_through_to_login() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{broken").unwrap();
        let store = SessionStore::new(path);

        let auth = Arc::new(FakeAuth::new(vec![Ok(fresh_session("new"))], true));
        let session = manager(auth.clone(), store.clone()).acquire().await.unwrap();

        assert_eq!(auth.probe_calls.load(Ordering::SeqCst), 0);
        assert_eq!(auth.login_calls.load(Ordering::SeqCst), 1);
        // The unreadable blob was replaced by the fresh session.
        assert_eq!(store.load().unwrap().unwrap(), session);
    }

    #[tokio::test]
    async fn malformed_session_file_is_deleted_even_when_login_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{broken").unwrap();
        let store = SessionStore::new(path.clone());

        let auth = Arc::new(FakeAuth::new(
            vec![
                Err(AuthError::Other("down".to_string())),
                Err(AuthError::Other("still down".to_string())),
            ],
            true,
        ));
        let result = manager(auth, store).acquire().await;

        assert!(result.is_err());
        // The corrupt file must not survive to poison the next run.
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn login_retries_exactly_once_and_succeeds() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let auth = Arc::new(FakeAuth::new(
            vec![
                Err(AuthError::Other("rate limited".to_string())),
                Ok(fresh_session("second try")),
            ],
            true,
        ));
        let result = manager(auth.clone(), store).acquire().await;

        assert!(result.is_ok());
        assert_eq!(auth.login_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn double_login_failure_carries_both_messages() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let auth = Arc::new(FakeAuth::new(
            vec![
                Err(AuthError::Other("first boom".to_string())),
                Err(AuthError::BadCredentials),
            ],
            true,
        ));
        let err = manager(auth.clone(), store).acquire().await.unwrap_err();

        assert_eq!(auth.login_calls.load(Ordering::SeqCst), 2);
        match err {
            AuthError::LoginFailed { first, second } => {
                assert!(first.contains("first boom"));
                assert!(second.contains("bad credentials"));
            }
            other => panic!("expected LoginFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fresh_login_persists_best_effort() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let auth = Arc::new(FakeAuth::new(vec![Ok(fresh_session("refreshed"))], true));
        let session = manager(auth, store.clone()).fresh_login().await.unwrap();

        assert_eq!(store.load().unwrap().unwrap(), session);
    }
}
