// fplsnap - season dataset snapshot pipeline
// Fetches the season tables, reconciles them, and publishes the CSV tree.

mod exit_codes;
mod schedule;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use fplsnap_core::config::{SourceKind, ViolationPolicy};
use fplsnap_core::{Error as CoreError, SnapshotConfig};
use fplsnap_pipeline::{recompute_deltas, validate_tree, PipelineError, RunSummary};
use fplsnap_source::{open_source, SourceError, SourceOverrides, TableSource, KEY_ENV, URL_ENV};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exit_codes::{
    core_exit_code, pipeline_exit_code, source_exit_code, EXIT_FETCH_AUTH, EXIT_FETCH_NOT_AUTH,
    EXIT_INTEGRITY, EXIT_IO, EXIT_SUCCESS, EXIT_VALIDATION_FINDINGS,
};
use settings::{apply_overrides, load_config, ConfigOverrides};

#[derive(Parser)]
#[command(name = "fplsnap")]
#[command(about = "Publish consistent CSV snapshots of the football season dataset")]
#[command(version, long_version = long_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, reconcile and publish one snapshot
    #[command(after_help = "\
Examples:
  SUPABASE_URL=https://xyz.supabase.co SUPABASE_KEY=... fplsnap run
  fplsnap run --source dir --input dumps/ --out data
  fplsnap run --on-violation fail")]
    Run(RunArgs),

    /// Publish a snapshot at fixed UTC times of day
    #[command(after_help = "\
Examples:
  fplsnap watch                      # 05:00 and 17:00 UTC
  fplsnap watch --at 06:30 --at 18:30 --run-now")]
    Watch {
        #[command(flatten)]
        run: RunArgs,

        /// UTC run time, HH:MM (repeatable; replaces the configured times)
        #[arg(long = "at", value_name = "HH:MM")]
        at: Vec<String>,

        /// Run once immediately before waiting for the first slot
        #[arg(long)]
        run_now: bool,
    },

    /// Check a published tree for referential consistency
    Validate {
        #[command(flatten)]
        tree: TreeArgs,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Recompute player_gameweek_stats.csv in a published tree
    Deltas {
        #[command(flatten)]
        tree: TreeArgs,
    },
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Config file (default: ./fplsnap.toml, then the user config dir)
    #[arg(long, env = "FPLSNAP_CONFIG")]
    config: Option<PathBuf>,

    /// Season folder name, e.g. 2025-2026
    #[arg(long)]
    season: Option<String>,

    /// Output root; the season folder is created under it
    #[arg(long)]
    out: Option<PathBuf>,

    /// Where the tables come from (--input implies dir)
    #[arg(long, value_enum)]
    source: Option<SourceArg>,

    /// Directory of <table>.json / <table>.csv dumps
    #[arg(long)]
    input: Option<PathBuf>,

    /// Supabase project URL (overrides SUPABASE_URL)
    #[arg(long)]
    supabase_url: Option<String>,

    /// Supabase API key (overrides SUPABASE_KEY)
    #[arg(long)]
    supabase_key: Option<String>,

    /// What to do with rows that reference missing keys
    #[arg(long, value_enum)]
    on_violation: Option<PolicyArg>,
}

#[derive(Args, Clone)]
struct TreeArgs {
    /// Config file (default: ./fplsnap.toml, then the user config dir)
    #[arg(long, env = "FPLSNAP_CONFIG")]
    config: Option<PathBuf>,

    /// Season folder name
    #[arg(long)]
    season: Option<String>,

    /// Output root holding the season folder
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Supabase,
    #[value(alias = "directory")]
    Dir,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Supabase => SourceKind::Supabase,
            SourceArg::Dir => SourceKind::Directory,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Warn,
    Drop,
    Fail,
}

impl From<PolicyArg> for ViolationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Warn => ViolationPolicy::Warn,
            PolicyArg::Drop => ViolationPolicy::Drop,
            PolicyArg::Fail => ViolationPolicy::Fail,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("FPLSNAP_COMMIT"),
        ")",
        "\ntarget:  ",
        env!("FPLSNAP_TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet, cli.log_json);
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Run(args) => cmd_run(&args, quiet),
        Commands::Watch { run, at, run_now } => cmd_watch(&run, at, run_now),
        Commands::Validate { tree, json } => cmd_validate(&tree, json),
        Commands::Deltas { tree } => cmd_deltas(&tree, quiet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// `-v`/`-q` win over `RUST_LOG`; otherwise `RUST_LOG`, else `info`.
fn init_tracing(verbose: u8, quiet: bool, json: bool) {
    let filter = match (quiet, verbose) {
        (true, _) => EnvFilter::new("warn"),
        (false, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn source(err: SourceError) -> Self {
        let code = source_exit_code(&err);
        let cli = Self::new(code, err.to_string());
        match code {
            EXIT_FETCH_NOT_AUTH => cli.with_hint(format!(
                "set {URL_ENV} and {KEY_ENV}, or use --source dir --input <DIR>"
            )),
            EXIT_FETCH_AUTH => cli.with_hint(format!("check {KEY_ENV}; the service key needs read access")),
            _ => cli,
        }
    }

    pub fn core(err: CoreError) -> Self {
        let code = core_exit_code(&err);
        let cli = Self::new(code, err.to_string());
        match code {
            EXIT_INTEGRITY => cli.with_hint(
                "nothing was published; rerun with --on-violation drop to remove orphaned rows",
            ),
            EXIT_IO => cli.with_hint("the previous snapshot, if any, was left in place"),
            _ => cli,
        }
    }

    pub fn pipeline(err: PipelineError) -> Self {
        let code = pipeline_exit_code(&err);
        match err {
            PipelineError::Fetch { table, source } => {
                let cli = Self::source(source);
                Self {
                    code,
                    message: format!("fetching '{table}': {}", cli.message),
                    hint: cli.hint,
                }
            }
            PipelineError::Core(e) => Self::core(e),
        }
    }
}

// ============================================================================
// Config resolution
// ============================================================================

fn resolve_config(
    path: Option<&PathBuf>,
    overrides: &ConfigOverrides,
) -> Result<SnapshotConfig, CliError> {
    let (config, used) = load_config(path.map(PathBuf::as_path)).map_err(CliError::core)?;
    if let Some(used) = used {
        info!(config = %used.display(), "using config file");
    }
    apply_overrides(config, overrides).map_err(CliError::core)
}

impl RunArgs {
    fn config_overrides(&self, times: Vec<String>) -> ConfigOverrides {
        ConfigOverrides {
            season: self.season.clone(),
            out: self.out.clone(),
            on_violation: self.on_violation.map(Into::into),
            times,
        }
    }

    fn source_overrides(&self) -> SourceOverrides {
        let kind = self
            .source
            .map(SourceKind::from)
            .or_else(|| self.input.as_ref().map(|_| SourceKind::Directory));
        SourceOverrides {
            kind,
            input_dir: self.input.clone(),
            url: self.supabase_url.clone(),
            key: self.supabase_key.clone(),
        }
    }

    fn prepare(&self, times: Vec<String>) -> Result<(SnapshotConfig, Box<dyn TableSource>), CliError> {
        let config = resolve_config(self.config.as_ref(), &self.config_overrides(times))?;
        let source = open_source(&config.source, &self.source_overrides()).map_err(CliError::source)?;
        Ok((config, source))
    }
}

impl TreeArgs {
    fn config(&self) -> Result<SnapshotConfig, CliError> {
        let overrides = ConfigOverrides {
            season: self.season.clone(),
            out: self.out.clone(),
            ..Default::default()
        };
        resolve_config(self.config.as_ref(), &overrides)
    }
}

// ============================================================================
// Commands
// ============================================================================

fn print_summary(summary: &RunSummary) {
    println!(
        "published {} from {}: {} views, {} files",
        summary.season_dir.display(),
        summary.source,
        summary.views,
        summary.files
    );
    println!(
        "  matches removed: {}, player match rows excluded: {}, orphaned rows {}: {}",
        summary.normalize.matches_removed,
        summary.normalize.playermatchstats_excluded,
        if summary.integrity.total_dropped() > 0 { "dropped" } else { "found" },
        summary.integrity.total_violations()
    );
}

fn cmd_run(args: &RunArgs, quiet: bool) -> Result<(), CliError> {
    let (config, source) = args.prepare(Vec::new())?;
    let summary = fplsnap_pipeline::run(&config, source.as_ref()).map_err(CliError::pipeline)?;
    if !quiet {
        print_summary(&summary);
    }
    Ok(())
}

fn cmd_watch(args: &RunArgs, at: Vec<String>, run_now: bool) -> Result<(), CliError> {
    let (config, source) = args.prepare(at)?;
    let times = config.schedule.parsed_times().map_err(CliError::core)?;
    info!(
        times = ?config.schedule.times,
        season = %config.season,
        "watching; runs are scheduled in UTC"
    );

    schedule::watch_loop(
        &times,
        run_now,
        None,
        || fplsnap_pipeline::run(&config, source.as_ref()).map(|s| print_summary(&s)),
        Utc::now,
        std::thread::sleep,
    );
    Ok(())
}

fn cmd_validate(args: &TreeArgs, json: bool) -> Result<(), CliError> {
    let config = args.config()?;
    let season_dir = config.season_dir();
    let report = validate_tree(&season_dir, &config.keys, &config.catalog()).map_err(CliError::core)?;

    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::core(CoreError::Json(e)))?;
        println!("{text}");
    } else {
        for finding in &report.findings {
            let path = if finding.path.is_empty() { "." } else { finding.path.as_str() };
            println!("{path}: {}", finding.message);
        }
        println!(
            "checked {} views, {} hashed files: {} finding(s)",
            report.views_checked,
            report.files_hashed,
            report.findings.len()
        );
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(CliError::new(
            EXIT_VALIDATION_FINDINGS,
            format!("{} is inconsistent ({} finding(s))", season_dir.display(), report.findings.len()),
        )
        .with_hint("republish with `fplsnap run`"))
    }
}

fn cmd_deltas(args: &TreeArgs, quiet: bool) -> Result<(), CliError> {
    let config = args.config()?;
    let summary = recompute_deltas(&config.season_dir(), &config.keys).map_err(CliError::core)?;
    if !quiet {
        println!(
            "player_gameweek_stats.csv: {} written, {} skipped",
            summary.written, summary.skipped
        );
    }
    Ok(())
}
