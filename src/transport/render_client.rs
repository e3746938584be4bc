use crate::error::ClientError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Client for the JS-rendering scrape service used by the unauthenticated
/// backend. Returns rendered HTML; extraction happens elsewhere.
#[derive(Debug)]
pub struct RenderClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RenderClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key,
        })
    }

    /// Fetches the fully rendered page for a post URL.
    #[instrument(skip(self))]
    pub async fn render(&self, url: &str) -> Result<String, ClientError> {
        debug!("Requesting rendered page for {}", url);
        let mut request = self.client.get(&self.base_url).query(&[
            ("url", url),
            ("render_js", "true"),
            ("rendering_wait", "3000"),
            ("asp", "true"),
            ("country", "US"),
        ]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Rendering service failed. Status: {}", status);
            return Err(ClientError::Unexpected { status, body });
        }
        Ok(body)
    }
}
