/// Keys that the structured media schema declares as lists but the raw
/// transport may emit as `null`.
pub(crate) const MUST_BE_LIST_KEYS: [&str; 3] = ["carousel_media", "video_versions", "usertags"];

/// Upper bound on each upstream message embedded in a terminal fetch error.
pub(crate) const FETCH_ERROR_MSG_LIMIT: usize = 200;

pub(crate) const MAX_LINKS_PER_RUN: usize = 10;

pub(crate) const SHORTCODE_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Instagram 269.0.0.18.75 Android (30/11; 480dpi; 1080x2158; Xiaomi; M2101K6G; veux; qcom)";
