//! Video metadata models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::youtube::thumbnail_url;

/// Metadata shown to the user before they start a download.
///
/// Fields the lookup tier could not resolve are serialized as explicit
/// nulls; the browser client keys on their presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Video title
    pub title: String,

    /// Thumbnail URL
    pub thumbnail: Option<String>,

    /// Duration in seconds
    pub duration: Option<f64>,

    /// Channel or uploader name
    pub uploader: Option<String>,

    /// View count
    pub view_count: Option<u64>,
}

impl VideoMetadata {
    /// Metadata synthesized from nothing but the video ID, used when every
    /// lookup tier failed.
    pub fn placeholder(video_id: &str) -> Self {
        Self {
            title: format!("YouTube Video {}", video_id),
            thumbnail: Some(thumbnail_url(video_id)),
            duration: None,
            uploader: Some("Unknown".to_string()),
            view_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_metadata() {
        let meta = VideoMetadata::placeholder("dQw4w9WgXcQ");
        assert_eq!(meta.title, "YouTube Video dQw4w9WgXcQ");
        assert_eq!(
            meta.thumbnail.as_deref(),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg")
        );
        assert_eq!(meta.uploader.as_deref(), Some("Unknown"));
        assert!(meta.duration.is_none());
    }

    #[test]
    fn test_unresolved_fields_serialize_as_null() {
        let meta = VideoMetadata::placeholder("dQw4w9WgXcQ");
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"duration\":null"));
        assert!(json.contains("\"view_count\":null"));
    }
}
