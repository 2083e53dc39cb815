//! `stowage bulk`: several files into one chosen directory.

use stowage_core::BulkSaveRequest;
use tracing::debug;

use super::save::{open_source, source_file_name};
use crate::cli::BulkArgs;
use crate::context::{AppContext, CliError, CliResult, absolutize};
use crate::output::{SaveReport, finish};

pub(crate) async fn handle_bulk(ctx: &AppContext, args: BulkArgs) -> CliResult<()> {
    let mut files = BulkSaveRequest::new();
    for source in &args.sources {
        let name = source_file_name(source)?;
        let payload = open_source(source).await?;
        files
            .insert(name, payload)
            .map_err(|err| CliError::validation(err.detail()))?;
    }
    let entries = files.len();
    debug!(entries, "starting bulk save");

    let initial_dir = args.initial_dir.as_deref().map(absolutize).transpose()?;
    let result = ctx
        .saver
        .bulk_save(initial_dir.as_deref(), files, &ctx.cancel)
        .await;
    let report = SaveReport::from_result("bulk", &result).with_entries(entries);
    finish(&report, &result, ctx.output)
}
