//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stowage_config::{ConfigLoader, ResolverMode, StowageConfig, validate};
use stowage_telemetry::init_logging;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::commands::{handle_bulk, handle_save};
use crate::context::{AppContext, CliError, CliResult, absolutize};

/// Source argument meaning "read the payload from stdin".
pub(crate) const STDIN_SOURCE: &str = "-";

/// Entrypoint for the CLI; returns the process exit code.
pub async fn run() -> i32 {
    run_with(Cli::parse()).await
}

pub(crate) async fn run_with(cli: Cli) -> i32 {
    match execute(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    if let Err(err) = init_logging(&config.logging()) {
        eprintln!("warning: {err}");
    }

    let ctx = AppContext::new(config, cli.output)?;
    ctx.cancel_on_interrupt();

    let span = info_span!(
        "cli",
        invocation_id = %Uuid::new_v4(),
        command = cli.command.label(),
        resolver = ctx.saver.resolver_name(),
    );
    let result = dispatch(cli.command, &ctx).instrument(span).await;
    ctx.log_metrics();
    result
}

async fn dispatch(command: Command, ctx: &AppContext) -> CliResult<()> {
    match command {
        Command::Save(args) => handle_save(ctx, args).await,
        Command::Bulk(args) => handle_bulk(ctx, args).await,
    }
}

/// Layer command-line overrides over the loaded configuration.
fn load_config(cli: &Cli) -> CliResult<StowageConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path.clone());
    }
    let mut config = loader
        .load()
        .map_err(|err| CliError::validation(err.detail()))?;

    if let Some(resolver) = cli.resolver {
        config.resolver = resolver.into();
    }
    if let Some(app_dir) = &cli.app_dir {
        config.app_dir = Some(absolutize(app_dir)?);
    }
    if let Some(level) = &cli.log_level {
        config.log_level.clone_from(level);
    }
    validate(&config).map_err(|err| CliError::validation(err.detail()))?;
    Ok(config)
}

#[derive(Parser)]
#[command(name = "stowage", about = "Save files and streams to durable storage")]
pub(crate) struct Cli {
    #[arg(long, env = "STOWAGE_CONFIG", global = true, help = "JSON configuration file")]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, help = "How the destination is chosen")]
    pub(crate) resolver: Option<ResolverArg>,
    #[arg(long, global = true, help = "App directory used by the implicit resolver")]
    pub(crate) app_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level or filter directive")]
    pub(crate) log_level: Option<String>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Save one file, or stdin, to a chosen destination.
    Save(SaveArgs),
    /// Save several files into one chosen directory.
    Bulk(BulkArgs),
}

impl Command {
    const fn label(&self) -> &'static str {
        match self {
            Self::Save(_) => "save",
            Self::Bulk(_) => "bulk",
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct SaveArgs {
    #[arg(help = "File to save, or `-` for stdin")]
    pub(crate) source: PathBuf,
    #[arg(long, help = "Suggested file name; required for stdin")]
    pub(crate) name: Option<String>,
    #[arg(long, help = "Directory the destination picker should start in")]
    pub(crate) initial_dir: Option<PathBuf>,
    #[arg(long, help = "Print write progress to stderr")]
    pub(crate) progress: bool,
}

impl SaveArgs {
    pub(crate) fn reads_stdin(&self) -> bool {
        self.source.as_os_str() == STDIN_SOURCE
    }
}

#[derive(Args, Debug)]
pub(crate) struct BulkArgs {
    #[arg(required = true, num_args = 1.., help = "Files to save")]
    pub(crate) sources: Vec<PathBuf>,
    #[arg(long, help = "Directory the folder picker should start in")]
    pub(crate) initial_dir: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub(crate) enum ResolverArg {
    /// Ask on the terminal.
    Interactive,
    /// Write into the app directory.
    Implicit,
}

impl From<ResolverArg> for ResolverMode {
    fn from(value: ResolverArg) -> Self {
        match value {
            ResolverArg::Interactive => Self::Interactive,
            ResolverArg::Implicit => Self::Implicit,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;
    use crate::context::EXIT_VALIDATION;
    use stowage_test_support::fixtures::{sha256_file, sha256_hex, temp_dir};

    #[test]
    fn save_arguments_parse() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "stowage",
            "save",
            "-",
            "--name",
            "notes.txt",
            "--progress",
            "--resolver",
            "implicit",
            "--output",
            "json",
        ])?;
        assert_eq!(cli.resolver, Some(ResolverArg::Implicit));
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Save(args) = cli.command else {
            anyhow::bail!("expected save command");
        };
        assert!(args.reads_stdin());
        assert!(args.progress);
        assert_eq!(args.name.as_deref(), Some("notes.txt"));
        Ok(())
    }

    #[test]
    fn bulk_requires_sources() {
        assert!(Cli::try_parse_from(["stowage", "bulk"]).is_err());
        assert!(Cli::try_parse_from(["stowage", "bulk", "a.txt", "b.txt"]).is_ok());
    }

    #[test]
    fn format_alias_is_accepted() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["stowage", "--format", "json", "bulk", "a.txt"])?;
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.command.label(), "bulk");
        Ok(())
    }

    #[test]
    fn resolver_arg_maps_to_mode() {
        assert_eq!(ResolverMode::from(ResolverArg::Implicit), ResolverMode::Implicit);
        assert_eq!(
            ResolverMode::from(ResolverArg::Interactive),
            ResolverMode::Interactive
        );
    }

    #[tokio::test]
    async fn implicit_save_writes_into_app_dir() -> anyhow::Result<()> {
        let workspace = temp_dir()?;
        let source = workspace.path().join("input.bin");
        let body = b"stowage cli payload".repeat(64);
        std::fs::write(&source, &body)?;
        let app_dir = workspace.path().join("app");

        let cli = Cli::try_parse_from(vec![
            OsString::from("stowage"),
            "--resolver".into(),
            "implicit".into(),
            "--app-dir".into(),
            app_dir.clone().into_os_string(),
            "--output".into(),
            "json".into(),
            "save".into(),
            source.into_os_string(),
            "--name".into(),
            "copy.bin".into(),
            "--progress".into(),
        ])?;
        assert_eq!(run_with(cli).await, 0);
        assert_eq!(sha256_file(&app_dir.join("copy.bin"))?, sha256_hex(&body));
        Ok(())
    }

    #[tokio::test]
    async fn bulk_rejects_duplicate_names() -> anyhow::Result<()> {
        let workspace = temp_dir()?;
        let first = workspace.path().join("one");
        let second = workspace.path().join("two");
        std::fs::create_dir_all(&first)?;
        std::fs::create_dir_all(&second)?;
        std::fs::write(first.join("same.txt"), b"a")?;
        std::fs::write(second.join("same.txt"), b"b")?;

        let cli = Cli::try_parse_from(vec![
            OsString::from("stowage"),
            "--resolver".into(),
            "implicit".into(),
            "--app-dir".into(),
            workspace.path().join("app").into_os_string(),
            "bulk".into(),
            first.join("same.txt").into_os_string(),
            second.join("same.txt").into_os_string(),
        ])?;
        assert_eq!(run_with(cli).await, EXIT_VALIDATION);
        Ok(())
    }

    #[tokio::test]
    async fn stdin_requires_implicit_resolver() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "stowage",
            "--resolver",
            "interactive",
            "save",
            "-",
            "--name",
            "notes.txt",
        ])?;
        assert_eq!(run_with(cli).await, EXIT_VALIDATION);
        Ok(())
    }
}
