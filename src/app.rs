//! Application entry point shared by the binary and the integration tests.
//!
//! [`run_app`] wires the ambient pieces (logging, Ctrl+C, configuration)
//! and dispatches to [`dedupe`] or [`dump`]. Those two take their input and
//! output streams as parameters so they can be driven without a terminal.

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{DeleteMode, DeletePolicy, StopReason};
use crate::cli::{Cli, Commands, DedupeArgs, DumpArgs, IndexArgs};
use crate::config::Config;
use crate::diagnostics::{CountingSink, DiagnosticSink, LogSink, WarningKind};
use crate::duplicates::{ContentIndex, DuplicateMatcher, Indexer, IndexerConfig};
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::output::CsvOutput;
use crate::progress::Progress;
use crate::signal::{install_handler, ShutdownHandler};

/// Run the command described by `cli` against the real terminal.
///
/// # Errors
///
/// Returns an error if configuration, indexing or output fails. An
/// interruption during indexing surfaces as [`crate::duplicates::IndexError::Interrupted`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);

    let shutdown = install_handler()?;
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log::debug!("Effective configuration: {config:?}");

    let context = RunContext::new(config, shutdown, cli.quiet);
    match cli.command {
        Commands::Dedupe(args) => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            dedupe(&args, &context, &mut stdin.lock(), &mut stdout.lock())
        }
        Commands::Dump(args) => match args.output {
            Some(ref path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                dump(&args, &context, BufWriter::new(file))
            }
            None => dump(&args, &context, io::stdout().lock()),
        },
    }
}

/// Settings and shared state for one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Layered configuration, before command-line flags
    pub config: Config,
    /// Ctrl+C flag
    pub shutdown: ShutdownHandler,
    /// Hide the progress spinner
    pub quiet: bool,
}

impl RunContext {
    /// Bundle the run settings.
    #[must_use]
    pub fn new(config: Config, shutdown: ShutdownHandler, quiet: bool) -> Self {
        Self {
            config,
            shutdown,
            quiet,
        }
    }

    /// Archive setting for the official tree: the flag if given, else the configuration.
    fn enter_archives(&self, args: &IndexArgs) -> bool {
        args.enter_archives_override()
            .unwrap_or(self.config.enter_archives)
    }

    fn indexer(&self, args: &IndexArgs, enter_archives: bool, sink: Arc<dyn DiagnosticSink>) -> Indexer {
        let io_threads = args
            .io_threads
            .map_or(self.config.io_threads, usize::from);
        let follow_symlinks = args
            .follow_symlinks_override()
            .unwrap_or(self.config.follow_symlinks);
        Indexer::new(
            IndexerConfig::default()
                .with_follow_symlinks(follow_symlinks)
                .with_enter_archives(enter_archives)
                .with_io_threads(io_threads)
                .with_sink(sink)
                .with_shutdown_flag(self.shutdown.get_flag()),
        )
    }
}

/// Diagnostics plumbing for one run: spinner, then counter, then log.
struct Reporting {
    counter: Arc<CountingSink>,
    progress: Arc<Progress>,
}

impl Reporting {
    fn new(quiet: bool) -> Self {
        let counter = Arc::new(CountingSink::new(Arc::new(LogSink)));
        let progress = Arc::new(Progress::new(quiet, counter.clone()));
        Self { counter, progress }
    }

    fn index(&self, indexer: &Indexer, root: &Path, label: &str) -> Result<ContentIndex> {
        self.progress.start(label);
        let result = indexer.index(root);
        self.progress.finish();

        let (index, stats) = result.with_context(|| format!("Failed to index {}", root.display()))?;
        log::debug!("{label}: {stats:?}");
        Ok(index)
    }

    /// Warnings that mean part of a tree was not examined.
    fn failures(&self) -> usize {
        self.counter.total() - self.counter.count(WarningKind::UnfollowedSymlink)
    }
}

/// Find the files of the new tree already present in the official tree and
/// hand them to the deletion policy.
///
/// # Errors
///
/// Returns an error if either tree cannot be indexed or the streams fail.
pub fn dedupe<R: BufRead, W: Write>(
    args: &DedupeArgs,
    context: &RunContext,
    input: &mut R,
    output: &mut W,
) -> Result<ExitCode> {
    let reporting = Reporting::new(context.quiet);
    let enter_archives = context.enter_archives(&args.index);

    let official_indexer = context.indexer(&args.index, enter_archives, reporting.progress.clone());
    let official = reporting.index(&official_indexer, &args.official, "Indexing official tree")?;

    // Archive entries of the new tree could never be deleted
    let new_indexer = context.indexer(&args.index, false, reporting.progress.clone());
    let new = reporting.index(&new_indexer, &args.new, "Indexing new tree")?;

    log::info!("Find duplicated files in {}", args.new.display());

    let mode = if args.dry_run {
        DeleteMode::DryRun
    } else if args.yes {
        DeleteMode::All
    } else {
        DeleteMode::Ask
    };
    let mut policy = DeletePolicy::new(mode)
        .with_permanent(args.permanent_override().unwrap_or(context.config.permanent))
        .with_shutdown_flag(context.shutdown.get_flag());

    let matcher = DuplicateMatcher::new(&official);
    let report = policy
        .apply(matcher.decisions(new.entries()), input, output)
        .context("Failed to interact with the terminal")?;
    writeln!(output, "{}", report.summary())?;
    output.flush()?;

    let code = if report.stopped == Some(StopReason::Interrupted) {
        ExitCode::Interrupted
    } else if report.has_problems() || reporting.failures() > 0 {
        ExitCode::PartialSuccess
    } else if report.duplicates > 0 {
        ExitCode::Success
    } else {
        ExitCode::NoDuplicates
    };
    Ok(code)
}

/// Write the CSV listing of the official tree's index.
///
/// # Errors
///
/// Returns an error if the tree cannot be indexed or the CSV cannot be written.
pub fn dump<W: Write>(args: &DumpArgs, context: &RunContext, output: W) -> Result<ExitCode> {
    let reporting = Reporting::new(context.quiet);
    let enter_archives = context.enter_archives(&args.index);

    let indexer = context.indexer(&args.index, enter_archives, reporting.progress.clone());
    let index = reporting.index(&indexer, &args.official, "Indexing")?;

    CsvOutput::new(&index)
        .with_header(args.header_override().unwrap_or(context.config.csv_header))
        .write_to(output)
        .context("Failed to write CSV")?;

    if reporting.failures() > 0 {
        Ok(ExitCode::PartialSuccess)
    } else {
        Ok(ExitCode::Success)
    }
}
