//! Output format definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Requested output format for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaFormat {
    /// Best available video in an mp4 container
    #[default]
    Mp4,
    /// Audio extracted and re-encoded to mp3
    Mp3,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mp3 => "mp3",
        }
    }

    /// Whether this format keeps the video stream.
    pub fn is_video(&self) -> bool {
        matches!(self, MediaFormat::Mp4)
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp4" => Ok(MediaFormat::Mp4),
            "mp3" => Ok(MediaFormat::Mp3),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown format: {0}")]
pub struct FormatParseError(String);
