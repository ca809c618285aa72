//! yt-dlp extraction engine.
//!
//! This crate provides:
//! - The client-spoofing strategy chain and argument builder
//! - Subprocess supervision with per-attempt timeouts
//! - Progress parsing from yt-dlp output lines
//! - The per-job download orchestrator
//! - Binary preflight and metadata probing

pub mod config;
pub mod download;
pub mod error;
pub mod probe;
pub mod progress;
pub mod runner;
pub mod strategy;

pub use config::EngineConfig;
pub use download::{DownloadEngine, EXHAUSTED_MESSAGE};
pub use error::{EngineError, EngineResult};
pub use probe::{check_ytdlp, fetch_metadata_json, ytdlp_version};
pub use progress::parse_progress_line;
pub use runner::{ExtractionRunner, OutputLine, RunOutcome, StreamKind, YtDlpRunner};
pub use strategy::{build_args, strategy_chain, StrategyConfig, PROGRESS_TEMPLATE};
