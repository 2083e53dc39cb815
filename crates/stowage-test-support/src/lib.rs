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

//! Shared test helpers used across the workspace's test suites.
//! Layout: fixtures.rs (temp dirs, payloads, digests), progress.rs (progress recorder),
//! readers.rs (misbehaving byte sources).

pub mod fixtures;
pub mod progress;
pub mod readers;
