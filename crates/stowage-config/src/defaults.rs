//! Default values and bounds for runtime configuration.
//!
//! # Design
//! - Keep defaults in one place so the loader, validation and CLI help agree.

/// Application name used to namespace the platform data directory.
pub const DEFAULT_APP_NAME: &str = "stowage";
/// Chunk size for progress-reporting writes.
pub const DEFAULT_CHUNK_SIZE: usize = 81_920;
/// Smallest accepted chunk size.
pub const MIN_CHUNK_SIZE: usize = 1024;
/// Largest accepted chunk size.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;
/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "STOWAGE_";
