use crate::config::Credentials;
use crate::error::AuthError;
use serde::{Deserialize, Serialize};

/// Opaque serialized authentication state for one account.
///
/// The settings blob is produced and interpreted only by the authentication
/// transport; everything else reads, writes, or deletes it wholesale. A
/// session is never mutated in place, only replaced by a fresh login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    settings: serde_json::Value,
}

impl Session {
    pub fn new(settings: serde_json::Value) -> Self {
        Self { settings }
    }

    pub(crate) fn settings(&self) -> &serde_json::Value {
        &self.settings
    }
}

#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Fresh login; on success returns a new session replacing any prior one.
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Cheap authenticated call used solely to test session validity.
    async fn probe(&self, session: &Session) -> Result<(), AuthError>;
}
