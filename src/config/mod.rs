//! Tool settings for copatch.
//!
//! This module defines the `Settings` struct that represents `copatch.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! defaults for every field, and validation of the values that end up in
//! docker argument lists.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Settings;
pub use types::{DEFAULT_CONFIG_FILE, ZeroVulnerabilityPolicy};
