//! Shared data models for TubeGrab backend.
//!
//! This crate provides Serde-serializable types for:
//! - Download jobs and their lifecycle states
//! - Output formats
//! - Broadcast event schemas
//! - Video metadata
//! - YouTube URL parsing helpers

pub mod event;
pub mod format;
pub mod job;
pub mod video;
pub mod youtube;

// Re-export common types
pub use event::{DownloadEvent, EventType, ProgressUpdate};
pub use format::{FormatParseError, MediaFormat};
pub use job::{ArtifactFile, DownloadId, DownloadJob, JobState};
pub use video::VideoMetadata;
pub use youtube::{
    clean_youtube_url, extract_video_id, thumbnail_url, watch_url, VideoIdError, VideoIdResult,
};
