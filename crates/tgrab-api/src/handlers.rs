//! Request handlers.

pub mod download;
pub mod health;
pub mod info;

pub use download::*;
pub use health::*;
pub use info::*;
