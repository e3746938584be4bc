use crate::constants::FETCH_ERROR_MSG_LIMIT;
use reqwest::StatusCode;
use std::fmt::{self, Display, Formatter};
use std::io;

/// Transport-level error for private-API and rendering-service calls.
#[derive(Debug)]
pub enum ClientError {
    Network(reqwest::Error),
    Io(io::Error),
    Json(serde_json::Error),
    /// The platform answered with an explicit login-required signal.
    LoginRequired(String),
    Unauthorized,
    NotFound,
    RateLimitExceeded,
    Unexpected { status: StatusCode, body: String },
    MissingData(String),
    Csv(csv::Error),
    Xlsx(rust_xlsxwriter::XlsxError),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Network(e) => write!(f, "network error: {e}"),
            ClientError::Io(e) => write!(f, "io error: {e}"),
            ClientError::Json(e) => write!(f, "json error: {e}"),
            ClientError::LoginRequired(body) => write!(f, "login required: {body}"),
            ClientError::Unauthorized => write!(f, "unauthorized"),
            ClientError::NotFound => write!(f, "not found"),
            ClientError::RateLimitExceeded => write!(f, "rate limit exceeded"),
            ClientError::Unexpected { status, body } => {
                write!(f, "unexpected http status {status}: {body}")
            }
            ClientError::MissingData(msg) => write!(f, "missing data: {msg}"),
            ClientError::Csv(e) => write!(f, "csv error: {e}"),
            ClientError::Xlsx(e) => write!(f, "xlsx error: {e}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e)
    }
}
impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Io(e)
    }
}
impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Json(e)
    }
}
impl From<csv::Error> for ClientError {
    fn from(e: csv::Error) -> Self {
        ClientError::Csv(e)
    }
}
impl From<rust_xlsxwriter::XlsxError> for ClientError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ClientError::Xlsx(e)
    }
}

/// Error surfaced by the session manager and the login path.
#[derive(Debug)]
pub enum AuthError {
    Network(reqwest::Error),
    Io(io::Error),
    Json(serde_json::Error),
    BadCredentials,
    /// Login failed twice; carries both failure messages.
    LoginFailed { first: String, second: String },
    Unexpected(StatusCode),
    Other(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Network(e) => write!(f, "network error: {e}"),
            AuthError::Io(e) => write!(f, "io error: {e}"),
            AuthError::Json(e) => write!(f, "json error: {e}"),
            AuthError::BadCredentials => write!(f, "bad credentials"),
            AuthError::LoginFailed { first, second } => {
                write!(f, "login failed after retry: first: {first}; retry: {second}")
            }
            AuthError::Unexpected(s) => write!(f, "unexpected http status: {s}"),
            AuthError::Other(msg) => write!(f, "other error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e)
    }
}
impl From<io::Error> for AuthError {
    fn from(e: io::Error) -> Self {
        AuthError::Io(e)
    }
}
impl From<ClientError> for AuthError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Network(e) => AuthError::Network(e),
            ClientError::Io(e) => AuthError::Io(e),
            ClientError::Json(e) => AuthError::Json(e),
            ClientError::Unauthorized | ClientError::LoginRequired(_) => AuthError::BadCredentials,
            ClientError::Unexpected { status, .. } => AuthError::Unexpected(status),
            other => AuthError::Other(other.to_string()),
        }
    }
}

/// Terminal error of the resilient fetch chain: every strategy failed.
#[derive(Debug)]
pub struct FetchError {
    /// Truncated message from the direct typed-retrieval strategy.
    pub direct: String,
    /// Truncated message from the last raw-fetch-and-normalize attempt
    /// (or from the re-login that preceded it).
    pub normalize: String,
}

impl FetchError {
    pub fn exhausted<D: Display, N: Display>(direct: &D, normalize: &N) -> Self {
        Self {
            direct: truncate_msg(&direct.to_string()),
            normalize: truncate_msg(&normalize.to_string()),
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all media info strategies failed (direct: {}; normalized: {}); \
             delete the persisted session file and retry with fresh credentials",
            self.direct, self.normalize
        )
    }
}

impl std::error::Error for FetchError {}

/// Malformed or excessive input links; the binary maps this to exit(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "validation error: {}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Which axis of failure a transport error sits on. The fetch chain escalates
/// to re-login only for `AuthExpired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    DataShape,
    AuthExpired,
    Unknown,
}

/// Single decision table separating "repair the data" failures from
/// "repair the session" failures.
pub fn classify_failure(error: &ClientError) -> FailureKind {
    match error {
        ClientError::LoginRequired(_) | ClientError::Unauthorized => FailureKind::AuthExpired,
        ClientError::Unexpected { status, body } => {
            if *status == StatusCode::UNAUTHORIZED
                || *status == StatusCode::FORBIDDEN
                || body.contains("login_required")
            {
                FailureKind::AuthExpired
            } else {
                FailureKind::Unknown
            }
        }
        ClientError::Json(_) | ClientError::MissingData(_) => FailureKind::DataShape,
        _ => FailureKind::Unknown,
    }
}

pub(crate) fn truncate_msg(msg: &str) -> String {
    msg.chars().take(FETCH_ERROR_MSG_LIMIT).collect()
}
