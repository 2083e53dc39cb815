//! Save stream-backed payloads to durable storage.
//!
//! A [`FileSaver`] resolves a destination through a host-specific [`DestinationResolver`]
//! (an interactive save dialog or an app-private directory), then streams the payload into it
//! with optional progress reporting. Every save observes a `CancellationToken` and reports its
//! outcome as a [`SaveResult`] instead of an error.
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

pub mod cancel;
pub mod error;
pub mod model;
pub mod resolver;
pub mod service;
pub mod writer;

pub use cancel::{CancellationBridge, NativeCancelRegistration, WriteScope};
pub use error::{CoreResult, FailureKind, SaveError, SaveStage};
pub use model::{
    BulkSaveRequest, ProgressSink, SaveFailure, SavePayload, SaveRequest, SaveResult,
    SeekableSource,
};
pub use resolver::{
    AppDirectory, AppDirectoryResolver, DestinationResolver, DialogOperation, DialogOutcome,
    DialogResolver, FileTypeFilter, FixedAppDirectory, PlatformAppDirectory, SaveDialog,
    SaveDialogOptions, StartLocation,
};
#[cfg(any(test, feature = "test-util"))]
pub use resolver::{ScriptedDialog, ScriptedResponse};
pub use service::FileSaver;
pub use tokio_util::sync::CancellationToken;
pub use writer::{DEFAULT_CHUNK_SIZE, StreamWriter};
