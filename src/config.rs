use serde::Deserialize;
use std::env;
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;
use tracing::error;

/// Account credentials for the authenticated backend.
#[derive(Debug, Deserialize, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Present only when both username and password are configured; without
    /// them only the unauthenticated backend is usable.
    pub credentials: Option<Credentials>,
    pub api: ApiConfig,
    pub render: RenderConfig,
    pub scraper: ScraperConfig,
}

/// Private-API endpoint settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: u64,
}

/// Rendering-service settings for the unauthenticated backend.
#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    pub session_file: String,
    pub output_dir: String,
    /// Fixed delay in seconds between retries; no jitter, no backoff growth.
    pub retry_delay: u64,
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"username\":\"{}\",\"password\":\"[REDACTED]\"}}",
            self.username
        )
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credentials = self
            .credentials
            .as_ref()
            .map_or("null".to_string(), |c| c.to_string());
        write!(
            f,
            "{{\"credentials\":{},\"api\":{},\"render\":{},\"scraper\":{}}}",
            credentials, self.api, self.render, self.scraper
        )
    }
}

impl fmt::Display for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"base_url\":\"{}\",\"timeout\":{}}}",
            self.base_url, self.timeout
        )
    }
}

impl fmt::Display for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"base_url\":\"{}\",\"api_key\":{}}}",
            self.base_url,
            self.api_key
                .as_ref()
                .map_or("null".to_string(), |_| "\"[REDACTED]\"".to_string())
        )
    }
}

impl fmt::Display for ScraperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"session_file\":\"{}\",\"output_dir\":\"{}\",\"retry_delay\":{}}}",
            self.session_file, self.output_dir, self.retry_delay
        )
    }
}

pub fn get_env_or_default<T: FromStr>(env_var: &str, default: T) -> T
where
    <T as FromStr>::Err: Debug,
{
    match env::var(env_var) {
        Ok(val) => val.parse::<T>().unwrap_or_else(|_| {
            error!("Failed to parse {}: {}, using default", env_var, val);
            default
        }),
        Err(_) => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        let credentials = match (env::var("IG_USERNAME"), env::var("IG_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(Credentials { username, password }),
            _ => None,
        };
        Config {
            credentials,
            api: ApiConfig {
                base_url: get_env_or_default(
                    "IG_API_BASE_URL",
                    String::from("https://i.instagram.com/api/v1"),
                ),
                timeout: get_env_or_default("IG_API_TIMEOUT", 30),
            },
            render: RenderConfig {
                base_url: get_env_or_default(
                    "RENDER_API_URL",
                    String::from("https://api.scrapfly.io/scrape"),
                ),
                api_key: env::var("RENDER_API_KEY").ok(),
            },
            scraper: ScraperConfig {
                session_file: get_env_or_default(
                    "SCRAPER_SESSION_FILE",
                    String::from("instagram_session.json"),
                ),
                output_dir: get_env_or_default("SCRAPER_OUTPUT_DIR", String::from("scrape")),
                retry_delay: get_env_or_default("SCRAPER_RETRY_DELAY", 2),
            },
        }
    }
}
