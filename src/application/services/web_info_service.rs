use crate::application::models::media::MediaInfoRecord;
use crate::application::services::fetcher::normalize_payload;
use crate::constants::MUST_BE_LIST_KEYS;
use crate::error::ClientError;
use crate::transport::render_client::RenderClient;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// JSON blob key that marks the embedded media payload in rendered pages.
const WEB_INFO_KEY: &str = "xdt_api__v1__media__shortcode__web_info";
/// Scripts shorter than this never carry the payload; skip them outright.
const MIN_SCRIPT_LEN: usize = 10_000;

/// Unauthenticated, best-effort backend: renders the post page and digs the
/// embedded media JSON out of its script tags. Metadata only; the comment
/// count is reported but no comment rows can be retrieved this way.
pub struct WebInfoService {
    render: Arc<RenderClient>,
    script_re: Regex,
}

impl WebInfoService {
    pub fn new(render: Arc<RenderClient>) -> Self {
        Self {
            render,
            script_re: Regex::new(r"(?s)<script[^>]*>(.*?)</script>").unwrap(),
        }
    }

    /// Returns `Ok(None)` for ordinary "could not find data" cases; errors
    /// only on transport failures.
    pub async fn fetch(&self, url: &str) -> Result<Option<MediaInfoRecord>, ClientError> {
        let html = self.render.render(url).await?;
        let record = self.extract_media_data(&html);
        if record.is_none() {
            info!("no embedded media data found for {url}");
        }
        Ok(record)
    }

    pub fn extract_media_data(&self, html: &str) -> Option<MediaInfoRecord> {
        for caps in self.script_re.captures_iter(html) {
            let script = caps.get(1).map_or("", |m| m.as_str());
            if script.len() < MIN_SCRIPT_LEN || !script.contains(WEB_INFO_KEY) {
                continue;
            }
            let Ok(data) = serde_json::from_str::<Value>(script) else {
                debug!("candidate script was not valid JSON, skipping");
                continue;
            };
            let Some(web_info) = find_in_value(&data, WEB_INFO_KEY) else {
                continue;
            };
            let Some(item) = web_info.get("items").and_then(|items| items.get(0)) else {
                continue;
            };
            let mut item = item.clone();
            normalize_payload(&mut item, &MUST_BE_LIST_KEYS);
            match serde_json::from_value::<MediaInfoRecord>(item) {
                Ok(record) => return Some(record),
                Err(e) => debug!("embedded media item failed to decode: {e}"),
            }
        }
        None
    }
}

/// Depth-first search for a key anywhere in a nested JSON tree.
pub fn find_in_value<'a>(value: &'a Value, target_key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(target_key) {
                return Some(found);
            }
            map.values().find_map(|v| find_in_value(v, target_key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_in_value(v, target_key)),
        _ => None,
    }
}
