//! Application state.

use std::sync::Arc;

use tgrab_engine::DownloadEngine;
use tgrab_events::JobRegistry;

use crate::config::ApiConfig;
use crate::services::MetadataResolver;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<JobRegistry>,
    pub engine: Arc<DownloadEngine>,
    pub metadata: Arc<MetadataResolver>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        // the artifact root must exist before the static file service and
        // the engine can use it
        tokio::fs::create_dir_all(&config.downloads_dir).await?;

        let registry = Arc::new(JobRegistry::new());
        let engine = Arc::new(DownloadEngine::new(
            config.engine_config(),
            Arc::clone(&registry),
        ));
        let metadata = Arc::new(MetadataResolver::new(
            config.ytdlp_bin.clone(),
            config.metadata_timeout,
        ));

        Ok(Self {
            config,
            registry,
            engine,
            metadata,
        })
    }
}
