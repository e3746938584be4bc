use crate::error::ClientError;
use crate::session::interface::Session;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem persistence for one account's session blob.
///
/// The file is read at most once per acquire and written at most once per
/// successful login; callers serialize access across processes themselves.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted session, `None` when no file exists.
    pub fn load(&self) -> Result<Option<Session>, ClientError> {
        if !self.path.exists() {
            debug!("no persisted session at {}", self.path.display());
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let session = serde_json::from_str(&contents)?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<(), ClientError> {
        let contents = serde_json::to_string(session)?;
        fs::write(&self.path, contents)?;
        debug!("session persisted to {}", self.path.display());
        Ok(())
    }

    pub fn delete(&self) -> Result<(), ClientError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!("session file {} deleted", self.path.display());
        }
        Ok(())
    }
}
