//! YouTube URL parsing and canonicalization.

use thiserror::Error;
use url::Url;

/// Errors that can occur during video ID extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VideoIdError {
    /// URL is not a YouTube URL
    #[error("URL is not a YouTube URL")]
    NotYoutube,
    /// Video ID has invalid format
    #[error("Video ID has invalid format")]
    InvalidId,
    /// Video ID not found in URL
    #[error("Video ID not found in URL")]
    IdNotFound,
}

/// Result type for video ID extraction.
pub type VideoIdResult<T> = Result<T, VideoIdError>;

/// Markers that precede a video ID, tried in order. `/v/` must come after
/// the more specific path forms it would shadow.
const ID_MARKERS: &[&str] = &["?v=", "&v=", "youtu.be/", "/embed/", "/shorts/", "/v/"];

/// Extract the 11-character video ID from any common YouTube URL form.
///
/// Supports:
/// - https://youtube.com/watch?v=VIDEO_ID
/// - https://youtu.be/VIDEO_ID
/// - https://youtube.com/embed/VIDEO_ID
/// - https://youtube.com/v/VIDEO_ID
/// - https://youtube.com/shorts/VIDEO_ID
///
/// with or without extra query parameters and fragments.
pub fn extract_video_id(url: &str) -> VideoIdResult<String> {
    let url = url.trim();

    if !is_youtube_domain(url) {
        return Err(VideoIdError::NotYoutube);
    }

    for marker in ID_MARKERS {
        if let Some(pos) = url.find(marker) {
            let rest = &url[pos + marker.len()..];
            if rest.is_empty() {
                continue;
            }
            return validate_video_id(id_segment(rest));
        }
    }

    Err(VideoIdError::IdNotFound)
}

fn is_youtube_domain(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// Cut the candidate ID at the first delimiter that can follow it.
fn id_segment(rest: &str) -> String {
    let delimiters = ['&', '#', '?', '/'];
    let end = rest
        .find(|c| delimiters.contains(&c))
        .unwrap_or(rest.len());
    rest[..end].trim().to_string()
}

fn validate_video_id(id: String) -> VideoIdResult<String> {
    // YouTube video IDs are exactly 11 characters
    if id.len() != 11 {
        return Err(VideoIdError::InvalidId);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(VideoIdError::InvalidId);
    }

    Ok(id)
}

/// Canonical watch URL for a video ID.
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Highest-resolution thumbnail URL for a video ID.
pub fn thumbnail_url(id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", id)
}

/// Strip playlist/tracking parameters from a watch URL.
///
/// When the URL parses and carries a `v` query parameter, returns the
/// canonical `watch?v=` form; anything else (youtu.be links, unparseable
/// input) passes through unchanged and is left for the extraction tool to
/// interpret.
pub fn clean_youtube_url(url: &str) -> String {
    let trimmed = url.trim();

    if let Ok(parsed) = Url::parse(trimmed) {
        let id = parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned());

        if let Some(id) = id {
            if !id.is_empty() {
                return watch_url(&id);
            }
        }
    }

    trimmed.to_string()
}
