//! Download submission handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use tgrab_models::{clean_youtube_url, extract_video_id, DownloadId, DownloadJob, MediaFormat};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Request to start a download.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    /// YouTube URL to download
    pub url: String,
    /// Output format; defaults to video
    #[serde(default)]
    pub format: MediaFormat,
}

/// Accepted-download response.
#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    #[serde(rename = "downloadId")]
    pub download_id: DownloadId,
    pub message: String,
}

/// Accept a download job and run the strategy chain in the background.
///
/// Responds as soon as the job is registered; everything after that flows
/// over the job's event channel. Invalid input is rejected here and never
/// reaches the engine.
pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> ApiResult<Json<DownloadResponse>> {
    let clean_url = clean_youtube_url(&request.url);
    let video_id =
        extract_video_id(&clean_url).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let job = DownloadJob::new(clean_url, video_id, request.format);
    let id = state.registry.register(job).await;

    info!(job_id = %id, format = %request.format, "Download accepted");
    metrics::record_download_accepted(request.format.as_str());

    let engine = Arc::clone(&state.engine);
    let job_id = id.clone();
    tokio::spawn(async move {
        engine.execute(job_id).await;
    });

    Ok(Json(DownloadResponse {
        download_id: id,
        message: "Download started".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_format_defaults_to_video() {
        let request: DownloadRequest =
            serde_json::from_str(r#"{"url":"https://youtu.be/dQw4w9WgXcQ"}"#).unwrap();
        assert_eq!(request.format, MediaFormat::Mp4);
    }

    #[test]
    fn test_response_uses_camel_case_id() {
        let response = DownloadResponse {
            download_id: DownloadId::from("job-1"),
            message: "Download started".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"downloadId\":\"job-1\""));
        assert!(json.contains("\"message\":\"Download started\""));
    }
}
