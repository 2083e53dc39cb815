//! Cancellation bridging between the caller's token and each save step.
//!
//! # Design
//! - One `CancellationToken` drives the whole save.
//! - The dialog step gets a registration that forwards cancellation to the dialog's own cancel
//!   hook; dropping the registration deregisters it.
//! - The write step gets a child token scoped to the copy, so resolution listeners never see a
//!   write and vice versa.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CoreResult, SaveError, SaveStage};

/// Borrowed view of a save's cancellation token.
#[derive(Clone, Copy, Debug)]
pub struct CancellationBridge<'a> {
    token: &'a CancellationToken,
}

impl<'a> CancellationBridge<'a> {
    /// Bridge the given token.
    #[must_use]
    pub const fn new(token: &'a CancellationToken) -> Self {
        Self { token }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail with [`SaveError::Cancelled`] if the token has fired.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Cancelled`] tagged with `stage` once cancellation was requested.
    pub fn checkpoint(&self, stage: SaveStage) -> CoreResult<()> {
        if self.token.is_cancelled() {
            return Err(SaveError::Cancelled { stage });
        }
        Ok(())
    }

    /// Invoke `hook` once when the token fires, for as long as the returned registration lives.
    ///
    /// An already-cancelled token runs the hook immediately. Must be called within a Tokio
    /// runtime.
    #[must_use = "dropping the registration deregisters the hook"]
    pub fn link_native<F>(&self, hook: F) -> NativeCancelRegistration
    where
        F: FnOnce() + Send + 'static,
    {
        if self.token.is_cancelled() {
            hook();
            return NativeCancelRegistration { watcher: None };
        }

        let token = self.token.clone();
        let watcher = tokio::spawn(async move {
            token.cancelled().await;
            debug!("forwarding cancellation to native operation");
            hook();
        });
        NativeCancelRegistration {
            watcher: Some(watcher),
        }
    }

    /// Child token for the write step; dropping the scope detaches it from the parent.
    #[must_use]
    pub fn write_scope(&self) -> WriteScope {
        WriteScope {
            token: self.token.child_token(),
        }
    }
}

/// Live registration of a native cancel hook.
#[derive(Debug)]
pub struct NativeCancelRegistration {
    watcher: Option<JoinHandle<()>>,
}

impl NativeCancelRegistration {
    /// Whether the hook is still waiting for cancellation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.watcher
            .as_ref()
            .is_some_and(|watcher| !watcher.is_finished())
    }
}

impl Drop for NativeCancelRegistration {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

/// Cancellation scope owned by one write.
#[derive(Debug)]
pub struct WriteScope {
    token: CancellationToken,
}

impl WriteScope {
    /// Token observed by the writer.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}
