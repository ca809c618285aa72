//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the extraction engine. The API layer fills this from
/// environment variables; defaults match the values the service shipped
/// with.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name or path of the yt-dlp binary
    pub binary: String,

    /// Root directory that per-job output directories are created under
    pub downloads_dir: PathBuf,

    /// Hard wall-clock limit for one strategy attempt
    pub attempt_timeout: Duration,

    /// Pause between strategy attempts, to avoid hammering rate limiters
    pub strategy_delay: Duration,

    /// Limit for metadata-only tool invocations
    pub metadata_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            downloads_dir: PathBuf::from("./downloads"),
            attempt_timeout: Duration::from_secs(600),
            strategy_delay: Duration::from_millis(1000),
            metadata_timeout: Duration::from_secs(15),
        }
    }
}
