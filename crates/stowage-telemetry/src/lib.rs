//! Telemetry primitives shared across the Stowage workspace.
//!
//! This crate centralises logging setup and save metrics so the library and the CLI report
//! outcomes the same way.
#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    unused,
    dead_code,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

pub mod error;
pub mod init;
pub mod metrics;

pub use error::{Result, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, UnknownLogFormat, build_sha, init_logging,
};
pub use metrics::{Metrics, MetricsSnapshot, OUTCOME_SAVED};
