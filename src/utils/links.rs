use crate::constants::{MAX_LINKS_PER_RUN, SHORTCODE_ALPHABET};
use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

static SHORTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(p|reel)/([A-Za-z0-9_-]+)").unwrap());

/// Rejects runs with more than 10 links or any link that does not contain
/// the platform token (case-insensitive). Checked before any network call.
pub fn validate_links(links: &[String], platform: &str) -> Result<(), ValidationError> {
    if links.len() > MAX_LINKS_PER_RUN {
        return Err(ValidationError(format!(
            "at most {MAX_LINKS_PER_RUN} links are allowed per run, got {}",
            links.len()
        )));
    }
    let platform = platform.to_lowercase();
    for link in links {
        if !link.to_lowercase().contains(&platform) {
            return Err(ValidationError(format!(
                "link {link} does not belong to {platform}"
            )));
        }
    }
    Ok(())
}

/// Extracts the shortcode from a `/p/` or `/reel/` post URL.
pub fn shortcode_from_url(url: &str) -> Option<&str> {
    SHORTCODE_RE
        .captures(url)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

/// Resolves a shortcode to the numeric media primary key (base-64 positional
/// decode over the URL-safe alphabet).
pub fn media_pk_from_shortcode(shortcode: &str) -> Option<u64> {
    shortcode.chars().try_fold(0u64, |acc, c| {
        let idx = SHORTCODE_ALPHABET.find(c)? as u64;
        acc.checked_mul(64)?.checked_add(idx)
    })
}
