//! `stowage save`: one file or stdin to one destination.

use std::path::Path;
use std::sync::Arc;

use stowage_config::ResolverMode;
use stowage_core::SavePayload;
use tracing::debug;

use crate::cli::SaveArgs;
use crate::context::{AppContext, CliError, CliResult, absolutize};
use crate::output::{SaveReport, finish, progress_printer};

pub(crate) async fn handle_save(ctx: &AppContext, args: SaveArgs) -> CliResult<()> {
    let (payload, file_name) = if args.reads_stdin() {
        if ctx.config.resolver == ResolverMode::Interactive {
            return Err(CliError::validation(
                "reading stdin needs --resolver implicit; the terminal prompt also reads stdin",
            ));
        }
        let name = args
            .name
            .clone()
            .ok_or_else(|| CliError::validation("--name is required when reading stdin"))?;
        (SavePayload::from_reader(tokio::io::stdin(), None), name)
    } else {
        let payload = open_source(&args.source).await?;
        let name = match &args.name {
            Some(name) => name.clone(),
            None => source_file_name(&args.source)?,
        };
        (payload, name)
    };

    let initial_dir = args.initial_dir.as_deref().map(absolutize).transpose()?;
    debug!(
        file_name = %file_name,
        length = ?payload.length(),
        progress = args.progress,
        "starting save"
    );

    let result = if args.progress {
        ctx.saver
            .save_in_with_progress(
                initial_dir.as_deref(),
                &file_name,
                payload,
                Arc::new(progress_printer()),
                &ctx.cancel,
            )
            .await
    } else {
        ctx.saver
            .save_in(initial_dir.as_deref(), &file_name, payload, &ctx.cancel)
            .await
    };
    finish(&SaveReport::from_result("save", &result), &result, ctx.output)
}

pub(crate) async fn open_source(path: &Path) -> CliResult<SavePayload> {
    SavePayload::open(path)
        .await
        .map_err(|err| CliError::validation(format!("cannot open {}: {err}", path.display())))
}

pub(crate) fn source_file_name(path: &Path) -> CliResult<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::validation(format!("{} has no file name", path.display())))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn file_name_comes_from_last_component() {
        let name = source_file_name(Path::new("/data/reports/q3.pdf"))
            .map_err(|err| err.display_message());
        assert_eq!(name, Ok("q3.pdf".to_string()));
        assert!(source_file_name(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn missing_source_is_a_validation_error() {
        let error = open_source(&PathBuf::from("/definitely/missing/input.bin"))
            .await
            .expect_err("missing source");
        assert_eq!(error.exit_code(), crate::context::EXIT_VALIDATION);
        assert!(error.display_message().contains("cannot open"));
    }
}
