//! Axum HTTP API server.
//!
//! This crate provides:
//! - Download submission and video info endpoints
//! - WebSocket progress streaming per job and fleet-wide
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::MetadataResolver;
pub use state::AppState;
