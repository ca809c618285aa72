//! Download event schemas.
//!
//! Events are broadcast in-process and forwarded verbatim over WebSocket.
//! The envelope is tagged JSON with camelCase field names to match the
//! browser client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ArtifactFile, DownloadId};

/// Event discriminant, useful for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Progress,
    Log,
    Complete,
    Error,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Progress => "progress",
            EventType::Log => "log",
            EventType::Complete => "complete",
            EventType::Error => "error",
        }
    }
}

/// One structured progress record parsed from tool output.
///
/// Percent values are carried as extracted; out-of-range values are the
/// display layer's problem, not ours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressUpdate {
    /// Percent complete, nominally 0-100
    pub percent: f64,

    /// Transfer speed as reported by the tool (e.g. "1.2MB/s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,

    /// Estimated time remaining as reported by the tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

impl ProgressUpdate {
    pub fn new(percent: f64) -> Self {
        Self {
            percent,
            speed: None,
            eta: None,
        }
    }

    pub fn with_speed(mut self, speed: impl Into<String>) -> Self {
        self.speed = Some(speed.into());
        self
    }

    pub fn with_eta(mut self, eta: impl Into<String>) -> Self {
        self.eta = Some(eta.into());
        self
    }
}

/// A lifecycle event for one download job.
///
/// Per job the stream is zero-or-more `Progress`/`Log` events followed by
/// exactly one terminal `Complete` or `Error`. Subscribers attaching late
/// see only what is published after they attach.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// Structured progress from the parser
    Progress {
        #[serde(rename = "downloadId")]
        download_id: DownloadId,
        progress: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        eta: Option<String>,
    },
    /// Raw diagnostic line from the tool or the orchestrator
    Log {
        #[serde(rename = "downloadId")]
        download_id: DownloadId,
        message: String,
    },
    /// Terminal success with the artifact listing
    Complete {
        #[serde(rename = "downloadId")]
        download_id: DownloadId,
        files: Vec<ArtifactFile>,
    },
    /// Terminal failure
    Error {
        #[serde(rename = "downloadId")]
        download_id: DownloadId,
        error: String,
    },
}

impl DownloadEvent {
    /// Progress event from a parsed update.
    pub fn progress(download_id: DownloadId, update: ProgressUpdate) -> Self {
        Self::Progress {
            download_id,
            progress: update.percent,
            speed: update.speed,
            eta: update.eta,
        }
    }

    /// Log event with a raw message line.
    pub fn log(download_id: DownloadId, message: impl Into<String>) -> Self {
        Self::Log {
            download_id,
            message: message.into(),
        }
    }

    /// Terminal completion event.
    pub fn complete(download_id: DownloadId, files: Vec<ArtifactFile>) -> Self {
        Self::Complete { download_id, files }
    }

    /// Terminal error event.
    pub fn error(download_id: DownloadId, error: impl Into<String>) -> Self {
        Self::Error {
            download_id,
            error: error.into(),
        }
    }

    /// The job this event belongs to.
    pub fn download_id(&self) -> &DownloadId {
        match self {
            Self::Progress { download_id, .. } => download_id,
            Self::Log { download_id, .. } => download_id,
            Self::Complete { download_id, .. } => download_id,
            Self::Error { download_id, .. } => download_id,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Progress { .. } => EventType::Progress,
            Self::Log { .. } => EventType::Log,
            Self::Complete { .. } => EventType::Complete,
            Self::Error { .. } => EventType::Error,
        }
    }

    /// Whether this event ends the job's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
