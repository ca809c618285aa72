//! Download job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::MediaFormat;

/// Unique identifier for a download job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DownloadId(pub String);

impl DownloadId {
    /// Generate a new random download ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DownloadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DownloadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job accepted, extraction not started yet
    #[default]
    Pending,
    /// A strategy attempt is running
    Downloading,
    /// Artifacts are on disk and listed
    Completed,
    /// All strategies exhausted, or cancelled
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Downloading => "downloading",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Terminal states accept no further transitions or events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file produced by a completed download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactFile {
    /// File name inside the job directory
    pub name: String,

    /// Public retrieval path (`/downloads/<id>/<name>`)
    pub path: String,
}

impl ArtifactFile {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// A download job tracked by the registry.
///
/// Owned exclusively by the registry; mutated only through the
/// consuming-self transitions below. Not persisted across restarts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DownloadJob {
    /// Unique job ID
    pub id: DownloadId,

    /// Canonical target URL
    pub url: String,

    /// Parsed 11-character YouTube video ID
    pub video_id: String,

    /// Requested output format
    #[serde(default)]
    pub format: MediaFormat,

    /// Lifecycle state
    #[serde(default)]
    pub state: JobState,

    /// Index of the strategy currently (or last) attempted
    #[serde(default)]
    pub strategy: usize,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Started at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Completed at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Artifacts produced (set on completion)
    #[serde(default)]
    pub files: Vec<ArtifactFile>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DownloadJob {
    /// Create a new pending job.
    pub fn new(
        url: impl Into<String>,
        video_id: impl Into<String>,
        format: MediaFormat,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: DownloadId::new(),
            url: url.into(),
            video_id: video_id.into(),
            format,
            state: JobState::Pending,
            strategy: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            files: Vec::new(),
            error_message: None,
        }
    }

    /// Begin the first extraction attempt.
    pub fn start(mut self) -> Self {
        self.state = JobState::Downloading;
        self.started_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Record the strategy index being attempted.
    pub fn with_strategy(mut self, index: usize) -> Self {
        self.strategy = index;
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job as completed with its artifact list.
    pub fn complete(mut self, files: Vec<ArtifactFile>) -> Self {
        self.state = JobState::Completed;
        self.files = files;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job as failed.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.state = JobState::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_id_uniqueness() {
        let a = DownloadId::new();
        let b = DownloadId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_job_creation_defaults() {
        let job = DownloadJob::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
            MediaFormat::Mp4,
        );

        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.strategy, 0);
        assert!(job.files.is_empty());
        assert!(job.started_at.is_none());
    }

    #[test]
    fn test_job_state_transitions() {
        let job = DownloadJob::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
            MediaFormat::Mp3,
        );

        let started = job.start();
        assert_eq!(started.state, JobState::Downloading);
        assert!(started.started_at.is_some());
        assert!(!started.state.is_terminal());

        let files = vec![ArtifactFile::new("a.mp3", "/downloads/x/a.mp3")];
        let completed = started.complete(files);
        assert_eq!(completed.state, JobState::Completed);
        assert!(completed.state.is_terminal());
        assert_eq!(completed.files.len(), 1);
    }

    #[test]
    fn test_job_failure() {
        let job = DownloadJob::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
            MediaFormat::Mp4,
        );

        let failed = job.fail("all strategies exhausted");
        assert_eq!(failed.state, JobState::Failed);
        assert!(failed.state.is_terminal());
        assert_eq!(
            failed.error_message.as_deref(),
            Some("all strategies exhausted")
        );
    }
}
