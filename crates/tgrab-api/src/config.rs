//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use tgrab_engine::EngineConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Root directory for downloaded artifacts
    pub downloads_dir: PathBuf,
    /// yt-dlp binary name or path
    pub ytdlp_bin: String,
    /// Per-strategy-attempt timeout
    pub attempt_timeout: Duration,
    /// Pause between strategy attempts
    pub strategy_delay: Duration,
    /// Timeout for the metadata probe fallback
    pub metadata_timeout: Duration,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origins: vec!["*".to_string()],
            downloads_dir: PathBuf::from("./downloads"),
            ytdlp_bin: "yt-dlp".to_string(),
            attempt_timeout: Duration::from_secs(600),
            strategy_delay: Duration::from_millis(1000),
            metadata_timeout: Duration::from_secs(15),
            rate_limit_rps: 10,
            max_body_size: 1024 * 1024, // 1MB; request bodies are small JSON
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            downloads_dir: std::env::var("DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.downloads_dir),
            ytdlp_bin: std::env::var("YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            attempt_timeout: Duration::from_secs(
                std::env::var("ATTEMPT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            strategy_delay: Duration::from_millis(
                std::env::var("STRATEGY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            metadata_timeout: Duration::from_secs(
                std::env::var("METADATA_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Engine settings derived from the API config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            binary: self.ytdlp_bin.clone(),
            downloads_dir: self.downloads_dir.clone(),
            attempt_timeout: self.attempt_timeout,
            strategy_delay: self.strategy_delay,
            metadata_timeout: self.metadata_timeout,
        }
    }
}
