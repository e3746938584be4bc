use crate::application::models::comment::CommentPage;
use crate::application::models::media::{MediaInfoRecord, MediaInfoResponse};
use crate::config::Credentials;
use crate::constants::DEFAULT_USER_AGENT;
use crate::error::{AuthError, ClientError};
use crate::session::interface::{Authenticator, Session};
use crate::transport::interface::{CommentTransport, MediaTransport};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, instrument};

/// HTTP client for the private API: login, session probe, media info, and
/// comment pages. Produces and interprets the opaque session blob; nothing
/// outside this client reads its fields.
#[derive(Debug)]
pub struct PrivateApiClient {
    client: Client,
    base_url: String,
}

impl PrivateApiClient {
    pub fn new(base_url: &str, timeout: u64) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self, session))]
    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &Session,
        endpoint: &str,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Sending GET request to {}", url);

        let mut request = self.client.get(&url);
        if let Some(auth) = Self::session_authorization(session) {
            request = request.header(header::AUTHORIZATION, auth);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        debug!("Response Status: {}", status);

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        error!("API request failed. Status: {}, Body: {}", status, body);
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                if body.contains("login_required") {
                    ClientError::LoginRequired(body)
                } else {
                    ClientError::Unauthorized
                }
            }
            StatusCode::NOT_FOUND => ClientError::NotFound,
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimitExceeded,
            _ => ClientError::Unexpected { status, body },
        })
    }

    fn extract_header(response: &Response, header_name: &str) -> Option<String> {
        match response
            .headers()
            .get(header_name)
            .and_then(|h| h.to_str().ok())
        {
            Some(value) => Some(value.to_string()),
            None => {
                debug!("Header {} not found in response", header_name);
                None
            }
        }
    }

    fn session_authorization(session: &Session) -> Option<&str> {
        session
            .settings()
            .get("authorization")
            .and_then(Value::as_str)
    }
}

#[async_trait]
impl Authenticator for PrivateApiClient {
    #[instrument(skip(self, credentials))]
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        debug!("Logging in user: {}", credentials.username);
        let url = format!("{}/accounts/login/", self.base_url);
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let authorization = Self::extract_header(&response, "ig-set-authorization");
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Login failed. Status: {}, Body: {}", status, text);
            if text.contains("bad_password") || text.contains("invalid_user") {
                return Err(AuthError::BadCredentials);
            }
            return Err(AuthError::Unexpected(status));
        }

        let payload: Value = serde_json::from_str(&text).map_err(AuthError::Json)?;
        if payload.get("status").and_then(Value::as_str) != Some("ok") {
            return Err(AuthError::Other(format!("unexpected login payload: {text}")));
        }

        debug!("Login successful");
        Ok(Session::new(json!({
            "username": credentials.username,
            "authorization": authorization,
            "logged_in_at": chrono::Utc::now().timestamp(),
        })))
    }

    #[instrument(skip(self, session))]
    async fn probe(&self, session: &Session) -> Result<(), AuthError> {
        let _: Value = self.get_json(session, "/accounts/current_user/").await?;
        debug!("Session probe succeeded");
        Ok(())
    }
}

#[async_trait]
impl MediaTransport for PrivateApiClient {
    async fn media_info(
        &self,
        session: &Session,
        media_pk: u64,
    ) -> Result<MediaInfoRecord, ClientError> {
        let response: MediaInfoResponse = self
            .get_json(session, &format!("/media/{media_pk}/info/"))
            .await?;
        response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::MissingData("media info response had no items".to_string()))
    }

    async fn media_info_raw(&self, session: &Session, media_pk: u64) -> Result<Value, ClientError> {
        self.get_json(session, &format!("/media/{media_pk}/info/"))
            .await
    }
}

#[async_trait]
impl CommentTransport for PrivateApiClient {
    async fn media_comments(
        &self,
        session: &Session,
        media_pk: u64,
        max_id: Option<&str>,
    ) -> Result<CommentPage, ClientError> {
        let mut endpoint = format!("/media/{media_pk}/comments/?can_support_threading=true");
        if let Some(max_id) = max_id {
            endpoint.push_str(&format!("&max_id={max_id}"));
        }
        self.get_json(session, &endpoint).await
    }
}
