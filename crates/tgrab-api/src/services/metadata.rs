//! Video metadata lookup with graceful degradation.
//!
//! Three sources are tried in order: the YouTube oEmbed endpoint (fast,
//! no tool invocation), a metadata-only run of the extraction tool, and
//! finally a synthesized placeholder. Resolution never fails; the caller
//! always gets something renderable.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use tgrab_engine::fetch_metadata_json;
use tgrab_models::VideoMetadata;

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

/// How long to wait on the oEmbed endpoint before falling back.
const OEMBED_TIMEOUT: Duration = Duration::from_secs(5);

/// The oEmbed fields we use; the rest of the payload is ignored.
#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: String,
    author_name: String,
    thumbnail_url: String,
}

/// Tiered metadata lookup for the info endpoint.
pub struct MetadataResolver {
    client: Client,
    binary: String,
    probe_timeout: Duration,
}

impl MetadataResolver {
    pub fn new(binary: String, probe_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            binary,
            probe_timeout,
        }
    }

    /// Resolve metadata for a cleaned watch URL.
    pub async fn resolve(&self, url: &str, video_id: &str) -> VideoMetadata {
        match self.fetch_oembed(url).await {
            Ok(meta) => {
                debug!(video_id, source = "oembed", "Resolved metadata");
                return meta;
            }
            Err(e) => {
                warn!(video_id, error = %e, "oEmbed lookup failed, trying tool probe")
            }
        }

        match fetch_metadata_json(&self.binary, url, self.probe_timeout).await {
            Ok(value) => {
                debug!(video_id, source = "probe", "Resolved metadata");
                return metadata_from_probe(&value, video_id);
            }
            Err(e) => {
                warn!(video_id, error = %e, "Metadata probe failed, using placeholder")
            }
        }

        VideoMetadata::placeholder(video_id)
    }

    async fn fetch_oembed(&self, url: &str) -> Result<VideoMetadata, reqwest::Error> {
        let oembed: OembedResponse = self
            .client
            .get(OEMBED_ENDPOINT)
            .query(&[("url", url), ("format", "json")])
            .timeout(OEMBED_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // oEmbed carries no duration or view count
        Ok(VideoMetadata {
            title: oembed.title,
            thumbnail: Some(oembed.thumbnail_url),
            duration: None,
            uploader: Some(oembed.author_name),
            view_count: None,
        })
    }
}

/// Map the tool's `--dump-json` output onto the wire model. Unresolved
/// fields stay null; only the title, which the model requires, gets a
/// synthesized default.
fn metadata_from_probe(value: &serde_json::Value, video_id: &str) -> VideoMetadata {
    let str_field = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };

    VideoMetadata {
        title: str_field("title").unwrap_or_else(|| format!("YouTube Video {}", video_id)),
        thumbnail: str_field("thumbnail"),
        duration: value.get("duration").and_then(|v| v.as_f64()),
        uploader: str_field("uploader").or_else(|| str_field("channel")),
        view_count: value.get("view_count").and_then(|v| v.as_u64()),
    }
}
