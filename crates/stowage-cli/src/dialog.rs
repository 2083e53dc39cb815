//! Terminal save dialog: prompts on stderr and reads the answer from stdin.

use std::io;
use std::path::{Path, PathBuf};

use stowage_core::{DialogOperation, DialogOutcome, SaveDialog, SaveDialogOptions, StartLocation};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;
use tracing::debug;

const ANY_EXTENSION: &str = "*";

/// [`SaveDialog`] that asks for a path on the controlling terminal.
///
/// An empty answer accepts the suggestion; end of input dismisses the prompt.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TerminalDialog;

impl TerminalDialog {
    pub(crate) const fn new() -> Self {
        Self
    }
}

impl SaveDialog for TerminalDialog {
    fn show(&self, options: SaveDialogOptions) -> DialogOperation {
        let suggestion = suggested_file_name(&options);
        let types = filter_summary(&options);
        prompt(options.start_location, Some(suggestion), move |base, suggestion| {
            format!(
                "save as [{}] in {} ({types}): ",
                suggestion.unwrap_or_default(),
                base.display()
            )
        })
    }

    fn show_folder(&self, start_location: StartLocation) -> Option<DialogOperation> {
        Some(prompt(start_location, None, |base, _| {
            format!("save into folder [{}]: ", base.display())
        }))
    }
}

fn prompt<P>(start: StartLocation, suggestion: Option<String>, render: P) -> DialogOperation
where
    P: FnOnce(&Path, Option<&str>) -> String + Send + 'static,
{
    let (close_tx, close_rx) = oneshot::channel::<()>();
    DialogOperation::new(ask(start, suggestion, render, close_rx), move || {
        let _ = close_tx.send(());
    })
}

async fn ask<P>(
    start: StartLocation,
    suggestion: Option<String>,
    render: P,
    close_rx: oneshot::Receiver<()>,
) -> io::Result<DialogOutcome>
where
    P: FnOnce(&Path, Option<&str>) -> String + Send,
{
    let base = match start {
        StartLocation::Directory(directory) => directory,
        StartLocation::PlatformDefault => std::env::current_dir()?,
    };
    let mut stderr = tokio::io::stderr();
    stderr
        .write_all(render(&base, suggestion.as_deref()).as_bytes())
        .await?;
    stderr.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = tokio::select! {
        biased;
        _ = close_rx => {
            debug!("terminal prompt closed");
            stderr.write_all(b"\n").await?;
            return Ok(DialogOutcome::Dismissed);
        }
        line = lines.next_line() => line?,
    };
    Ok(interpret_answer(answer.as_deref(), suggestion.as_deref(), &base))
}

/// Suggested name with the first concrete extension filter reapplied.
fn suggested_file_name(options: &SaveDialogOptions) -> String {
    let extension = options
        .filters
        .iter()
        .flat_map(|filter| filter.extensions.iter())
        .find(|extension| extension.as_str() != ANY_EXTENSION);
    match extension {
        Some(extension) => format!("{}{extension}", options.suggested_name),
        None => options.suggested_name.clone(),
    }
}

fn filter_summary(options: &SaveDialogOptions) -> String {
    options
        .filters
        .iter()
        .map(|filter| filter.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn interpret_answer(line: Option<&str>, suggestion: Option<&str>, base: &Path) -> DialogOutcome {
    let Some(line) = line else {
        return DialogOutcome::Dismissed;
    };
    let answer = line.trim();
    let chosen: PathBuf = match (answer.is_empty(), suggestion) {
        (false, _) => PathBuf::from(answer),
        (true, Some(suggestion)) => PathBuf::from(suggestion),
        (true, None) => return DialogOutcome::Picked(base.to_path_buf()),
    };
    if chosen.is_absolute() {
        DialogOutcome::Picked(chosen)
    } else {
        DialogOutcome::Picked(base.join(chosen))
    }
}
