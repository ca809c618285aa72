//! Video info endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use tgrab_models::{clean_youtube_url, extract_video_id, VideoMetadata};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters for the info endpoint.
#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    /// YouTube URL to look up
    pub url: String,
}

/// Look up renderable metadata for a YouTube URL.
///
/// The only hard failure is an unparseable video id; every lookup problem
/// past that degrades inside the resolver.
pub async fn get_video_info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> ApiResult<Json<VideoMetadata>> {
    let clean_url = clean_youtube_url(&query.url);
    let video_id =
        extract_video_id(&clean_url).map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!(video_id = %video_id, "Fetching video info");
    let meta = state.metadata.resolve(&clean_url, &video_id).await;
    Ok(Json(meta))
}
