//! Scripted save dialog for tests.
//!
//! Replays queued answers in order and counts native cancel requests. Compiled for this crate's
//! own tests and for dependents that enable the `test-util` feature.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use super::dialog::{DialogOperation, DialogOutcome, SaveDialog, SaveDialogOptions, StartLocation};

/// Answer the scripted dialog gives for one presentation.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Close immediately with the given path.
    Pick(PathBuf),
    /// Close immediately as if the user dismissed it.
    Dismiss,
    /// Fail immediately with the given message.
    Fail(String),
    /// Stay open until the native cancel hook runs, then report dismissal.
    WaitForCancel,
    /// Stay open until the native cancel hook runs, then report the path anyway.
    PickAfterCancel(PathBuf),
}

/// In-memory test double for the save dialog capability.
///
/// Responses are consumed in order; an empty script dismisses the dialog.
#[derive(Clone, Default)]
pub struct ScriptedDialog {
    state: Arc<Mutex<ScriptState>>,
    cancels: Arc<AtomicUsize>,
    folders: bool,
}

#[derive(Default)]
struct ScriptState {
    responses: VecDeque<ScriptedResponse>,
    shown: Vec<SaveDialogOptions>,
    folder_starts: Vec<StartLocation>,
}

impl ScriptedDialog {
    /// Empty script without folder support.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow [`SaveDialog::show_folder`].
    #[must_use]
    pub const fn with_folder_support(mut self) -> Self {
        self.folders = true;
        self
    }

    /// Queue the answer for the next presentation.
    pub fn push(&self, response: ScriptedResponse) {
        self.lock().responses.push_back(response);
    }

    /// Options passed to every file dialog shown so far.
    #[must_use]
    pub fn shown(&self) -> Vec<SaveDialogOptions> {
        self.lock().shown.clone()
    }

    /// Start locations passed to every folder dialog shown so far.
    #[must_use]
    pub fn folder_starts(&self) -> Vec<StartLocation> {
        self.lock().folder_starts.clone()
    }

    /// Number of times a native cancel hook ran.
    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_operation(&self) -> DialogOperation {
        let response = self
            .lock()
            .responses
            .pop_front()
            .unwrap_or(ScriptedResponse::Dismiss);
        let cancels = Arc::clone(&self.cancels);

        let immediate = |outcome: io::Result<DialogOutcome>| {
            DialogOperation::new(async move { outcome }, move || {
                cancels.fetch_add(1, Ordering::SeqCst);
            })
        };

        match response {
            ScriptedResponse::Pick(path) => immediate(Ok(DialogOutcome::Picked(path))),
            ScriptedResponse::Dismiss => immediate(Ok(DialogOutcome::Dismissed)),
            ScriptedResponse::Fail(message) => immediate(Err(io::Error::other(message))),
            ScriptedResponse::WaitForCancel => self.until_cancelled(DialogOutcome::Dismissed),
            ScriptedResponse::PickAfterCancel(path) => {
                self.until_cancelled(DialogOutcome::Picked(path))
            }
        }
    }

    fn until_cancelled(&self, outcome: DialogOutcome) -> DialogOperation {
        let cancels = Arc::clone(&self.cancels);
        let (closed_tx, closed_rx) = oneshot::channel::<()>();
        DialogOperation::new(
            async move {
                let _ = closed_rx.await;
                Ok(outcome)
            },
            move || {
                cancels.fetch_add(1, Ordering::SeqCst);
                let _ = closed_tx.send(());
            },
        )
    }
}

impl SaveDialog for ScriptedDialog {
    fn show(&self, options: SaveDialogOptions) -> DialogOperation {
        self.lock().shown.push(options);
        self.next_operation()
    }

    fn show_folder(&self, start_location: StartLocation) -> Option<DialogOperation> {
        if !self.folders {
            return None;
        }
        self.lock().folder_starts.push(start_location);
        Some(self.next_operation())
    }
}
