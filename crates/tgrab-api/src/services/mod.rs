//! Business logic services.

pub mod metadata;

pub use metadata::MetadataResolver;
