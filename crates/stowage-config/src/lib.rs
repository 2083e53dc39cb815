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

//! Typed runtime configuration for Stowage.
//!
//! Layout: `model.rs` (typed config), `defaults.rs` (defaults and bounds), `validate.rs`
//! (validation/parsing helpers), `loader.rs` (`ConfigLoader` layering file and environment).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{DEFAULT_APP_NAME, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use model::{ResolverMode, StowageConfig};
pub use validate::validate;
