use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use insta_scraper::application::services::comment_service::CommentService;
use insta_scraper::application::services::fetcher::ResilientFetcher;
use insta_scraper::application::services::web_info_service::WebInfoService;
use insta_scraper::config::{Config, Credentials};
use insta_scraper::presentation::export::{
    build_post_metadata, date_for_filename, export_post, CommentRow, ExportFormat,
};
use insta_scraper::session::manager::SessionManager;
use insta_scraper::session::store::SessionStore;
use insta_scraper::transport::http_client::PrivateApiClient;
use insta_scraper::transport::render_client::RenderClient;
use insta_scraper::utils::links::{media_pk_from_shortcode, shortcode_from_url, validate_links};
use insta_scraper::utils::logger::setup_logger;

const PLATFORM: &str = "instagram";

/// Scrapes Instagram post metadata and comments to CSV or XLSX files.
///
/// With credentials, the authenticated backend fetches metadata and all
/// reachable comments; without them, the rendering-service backend fetches
/// metadata only.
#[derive(Debug, Parser)]
#[command(name = "insta_scraper", version)]
struct Cli {
    /// Post URL to scrape; repeat for multiple posts (max 10 per run)
    #[arg(long = "link", required = true)]
    links: Vec<String>,

    /// Instagram username (overrides IG_USERNAME)
    #[arg(long)]
    username: Option<String>,

    /// Instagram password (overrides IG_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Output directory root (overrides SCRAPER_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Export file format
    #[arg(long, value_enum, default_value = "csv")]
    format: ExportFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger();
    let cli = Cli::parse();

    let mut config = Config::new();
    if let (Some(username), Some(password)) = (cli.username.clone(), cli.password.clone()) {
        config.credentials = Some(Credentials { username, password });
    }
    if let Some(dir) = &cli.output_dir {
        config.scraper.output_dir = dir.to_string_lossy().into_owned();
    }

    // Input validation happens before any network call.
    if let Err(e) = validate_links(&cli.links, PLATFORM) {
        error!("{e}");
        std::process::exit(1);
    }

    let output_dir = PathBuf::from(&config.scraper.output_dir);
    let date = date_for_filename();
    let mut exported = 0usize;

    match config.credentials.clone() {
        Some(credentials) => {
            info!("credentials provided, using the authenticated backend");
            let client = Arc::new(PrivateApiClient::new(
                &config.api.base_url,
                config.api.timeout,
            )?);
            let retry_delay = Duration::from_secs(config.scraper.retry_delay);
            let sessions = Arc::new(SessionManager::new(
                client.clone(),
                credentials,
                SessionStore::new(&config.scraper.session_file),
                retry_delay,
            ));
            let fetcher = ResilientFetcher::new(client.clone(), sessions.clone(), retry_delay);
            let comments = CommentService::new(client.clone());

            for link in &cli.links {
                match scrape_authenticated(link, &sessions, &fetcher, &comments).await {
                    Ok((metadata, rows)) => {
                        let stem = stem_for(link, &date);
                        let path =
                            export_post(cli.format, &metadata, &rows, &output_dir, PLATFORM, &stem)?;
                        info!("exported {} -> {}", link, path.display());
                        exported += 1;
                    }
                    Err(e) => warn!("skipping {link}: {e:#}"),
                }
            }
        }
        None => {
            warn!("no credentials given: metadata only, comments require login");
            let render = Arc::new(RenderClient::new(
                &config.render.base_url,
                config.render.api_key.clone(),
            )?);
            let service = WebInfoService::new(render);

            for link in &cli.links {
                match service.fetch(link).await {
                    Ok(Some(record)) => {
                        info!(
                            "{} comments not scraped for {link} (login required)",
                            record.comment_count
                        );
                        let metadata = build_post_metadata(&record, link, &[]);
                        let stem = stem_for(link, &date);
                        let path =
                            export_post(cli.format, &metadata, &[], &output_dir, PLATFORM, &stem)?;
                        info!("exported {} -> {}", link, path.display());
                        exported += 1;
                    }
                    Ok(None) => warn!("skipping {link}: could not extract media data"),
                    Err(e) => warn!("skipping {link}: {e}"),
                }
            }
        }
    }

    if exported == 0 {
        error!("nothing could be scraped");
        std::process::exit(1);
    }
    Ok(())
}

async fn scrape_authenticated(
    link: &str,
    sessions: &SessionManager<PrivateApiClient>,
    fetcher: &ResilientFetcher<PrivateApiClient, PrivateApiClient>,
    comments: &CommentService<PrivateApiClient>,
) -> Result<(Vec<(String, String)>, Vec<CommentRow>)> {
    let shortcode =
        shortcode_from_url(link).ok_or_else(|| anyhow!("no shortcode found in URL"))?;
    let media_pk = media_pk_from_shortcode(shortcode)
        .ok_or_else(|| anyhow!("shortcode {shortcode} is not decodable"))?;

    let mut session = sessions.acquire().await.context("session acquisition")?;
    let record = fetcher
        .fetch(&mut session, media_pk)
        .await
        .context("media info fetch")?;
    info!("post reports {} comments", record.comment_count);

    let fetched = comments
        .fetch_all(&session, media_pk, record.comment_count)
        .await
        .context("comment pagination")?;
    let rows: Vec<CommentRow> = fetched
        .iter()
        .enumerate()
        .map(|(i, c)| CommentRow::from_comment(i + 1, c))
        .collect();

    let metadata = build_post_metadata(&record, link, &rows);
    Ok((metadata, rows))
}

fn stem_for(link: &str, date: &str) -> String {
    match shortcode_from_url(link) {
        Some(shortcode) => format!("{PLATFORM}_{date}_{shortcode}"),
        None => format!("{PLATFORM}_{date}"),
    }
}
