//! Video identifier extraction from YouTube URLs.

use once_cell::sync::Lazy;
use regex::Regex;

// Recognised URL shapes, tried in order: watch page, short link, embed.
static VIDEO_URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^https?://(?:www\.)?youtube\.com/watch\?v=([^&]+)",
        r"^https?://(?:www\.)?youtu\.be/([^?]+)",
        r"^https?://(?:www\.)?youtube\.com/embed/([^?]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("video URL pattern must compile"))
    .collect()
});

/// Extract the video ID from a watch, short-link or embed URL.
///
/// Returns `None` when the input matches none of the known shapes. The ID is not
/// checked against the platform; an unknown video fails later when its comments
/// are fetched.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    VIDEO_URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
