//! CLI parsing and orchestration. Parses flags, loads config, lists tagged entries,
//! exports each one to the output folder. Maps errors to exit codes.

use crate::config::{self, ConfigError};
use crate::model::Entry;
use crate::output::{output_path, write_export};
use crate::wallabag::{
    fetch_all_entries, ApiError, ExportFormat, WallabagApi, WallabagClient, DEFAULT_TAG,
};
use clap::{ArgAction, Parser};
use indicatif::HumanBytes;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Long flags that may also be written Go-style with a single dash (`-config`).
const LONG_FLAGS: &[&str] = &[
    "verbose",
    "config",
    "outfolder",
    "format",
    "tag",
    "dry-run",
    "help",
];
/// Short flags that may also be written with a double dash (`--dd`).
const SHORT_FLAGS: &[&str] = &["d", "dd", "v"];

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{failed} of {total} entries could not be exported")]
    EntriesFailed { failed: usize, total: usize },
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::Config(_) => 1,
            CliRunError::Api(_) => 2,
            CliRunError::EntriesFailed { .. } => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "kindlebag")]
#[command(about = "Export wallabag entries tagged for reading to e-reader files")]
#[command(
    after_help = "Flags may also be written with a single dash (-config, -outfolder, -verbose). Config file keys: WallabagURL, ClientId, ClientSecret, UserName, UserPassword, and optionally UserAgent and TimeoutSecs."
)]
pub struct Args {
    /// Get debug output (implies verbose mode). Use -dd for even more debug output like data.
    #[arg(short = 'd', action = ArgAction::Count)]
    pub debug: u8,

    /// Print version and exit.
    #[arg(short = 'v')]
    pub print_version: bool,

    /// Verbose mode.
    #[arg(long)]
    pub verbose: bool,

    /// Config JSON file. Default: ./config.json, then ~/.config/kindlebag/config.json.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Folder the exported files are written to. Must already exist.
    #[arg(long, default_value = "out")]
    pub outfolder: PathBuf,

    /// Export format: epub, mobi, pdf, txt, csv, json, or xml.
    #[arg(long, default_value = "mobi", value_parser = parse_format)]
    pub format: ExportFormat,

    /// Only export entries carrying this tag.
    #[arg(long, default_value = DEFAULT_TAG)]
    pub tag: String,

    /// List entries and print the files that would be written, without exporting.
    #[arg(long)]
    pub dry_run: bool,
}

/// How much to log. Each level implies the ones below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Normal,
    Verbose,
    Debug,
    ExtraDebug,
}

impl Verbosity {
    pub fn is_verbose(self) -> bool {
        self >= Verbosity::Verbose
    }

    pub fn is_debug(self) -> bool {
        self >= Verbosity::Debug
    }

    /// Default `EnvFilter` directives when RUST_LOG is not set.
    pub fn filter_directives(self) -> &'static str {
        match self {
            Verbosity::Normal => "kindlebag=info",
            Verbosity::Verbose => "kindlebag=debug",
            Verbosity::Debug => "kindlebag=debug,reqwest=debug",
            Verbosity::ExtraDebug => "kindlebag=trace,reqwest=trace",
        }
    }
}

impl Args {
    pub fn verbosity(&self) -> Verbosity {
        match self.debug {
            0 if self.verbose => Verbosity::Verbose,
            0 => Verbosity::Normal,
            1 => Verbosity::Debug,
            _ => Verbosity::ExtraDebug,
        }
    }
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    match s.to_lowercase().as_str() {
        "epub" => Ok(ExportFormat::Epub),
        "mobi" => Ok(ExportFormat::Mobi),
        "pdf" => Ok(ExportFormat::Pdf),
        "txt" | "text" => Ok(ExportFormat::Txt),
        "csv" => Ok(ExportFormat::Csv),
        "json" => Ok(ExportFormat::Json),
        "xml" => Ok(ExportFormat::Xml),
        _ => Err(format!(
            "Invalid --format value: '{}'. Use epub, mobi, pdf, txt, csv, json, or xml.",
            s
        )),
    }
}

fn normalize_flag(arg: &str) -> Option<String> {
    if let Some(rest) = arg.strip_prefix("--") {
        if SHORT_FLAGS.contains(&rest) {
            return Some(format!("-{}", rest));
        }
        return None;
    }
    let rest = arg.strip_prefix('-')?;
    let name = rest.split('=').next().unwrap_or(rest);
    if LONG_FLAGS.contains(&name) {
        Some(format!("-{}", arg))
    } else {
        None
    }
}

/// Rewrite Go-style flags (`-config x`, `--dd`) into the form clap expects
/// (`--config x`, `-dd`). Everything after `--` is left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;
    for arg in args {
        let arg: OsString = arg.into();
        if passthrough {
            out.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }
        match arg.to_str().and_then(normalize_flag) {
            Some(normalized) => out.push(OsString::from(normalized)),
            None => out.push(arg),
        }
    }
    out
}

/// Install the stdout fmt subscriber. RUST_LOG, when set, wins over the flags.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directives()));
    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stdout)
        .try_init();

    match verbosity {
        Verbosity::Normal => {}
        Verbosity::Verbose => tracing::info!("verbose mode"),
        Verbosity::Debug => tracing::info!("debug mode"),
        Verbosity::ExtraDebug => tracing::info!("extra debug mode"),
    }
}

/// Counts for one export run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub listed: usize,
    pub written: usize,
    pub failed: usize,
}

/// Export each entry and write it under `out_dir`, one at a time.
///
/// A failed export or write is logged and counted; the loop moves on to the next entry.
pub fn export_entries<A: WallabagApi + ?Sized>(
    api: &mut A,
    entries: &[Entry],
    out_dir: &Path,
    format: ExportFormat,
) -> ExportSummary {
    let mut summary = ExportSummary {
        listed: entries.len(),
        ..ExportSummary::default()
    };
    for (i, entry) in entries.iter().enumerate() {
        tracing::debug!(
            id = entry.id,
            title = entry.title_or_empty(),
            "exporting entry {}/{}",
            i + 1,
            entries.len()
        );
        let bytes = match api.export_entry(entry.id, format) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(id = entry.id, "export failed: {}", e);
                summary.failed += 1;
                continue;
            }
        };
        let path = output_path(out_dir, entry, format);
        match write_export(&path, &bytes) {
            Ok(n) => {
                tracing::info!(
                    "wrote {} bytes ({}) in file {}",
                    n,
                    HumanBytes(n as u64),
                    path.display()
                );
                summary.written += 1;
            }
            Err(e) => {
                tracing::error!(id = entry.id, "{}", e);
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    // version first, before logging or any config and network access
    if args.print_version {
        println!("version {}", VERSION);
        return Ok(());
    }

    let verbosity = args.verbosity();
    init_logging(verbosity);

    if let Some(path) = &args.config {
        tracing::debug!("reading config {}", path.display());
    }
    let (config_path, config) = config::load_config(args.config.as_deref()).map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;
    tracing::debug!("using config {}", config_path.display());
    tracing::trace!(?config, "config loaded");

    let mut client = WallabagClient::from_config(&config)?;
    let entries = fetch_all_entries(&mut client, &args.tag)?;
    tracing::debug!("{} entries tagged '{}'", entries.len(), args.tag);

    if args.dry_run {
        for entry in &entries {
            tracing::info!(
                "would export entry {} to {}",
                entry.id,
                output_path(&args.outfolder, entry, args.format).display()
            );
        }
        return Ok(());
    }

    if !entries.is_empty() && !args.outfolder.is_dir() {
        tracing::warn!(
            "output folder {} does not exist; writes will fail",
            args.outfolder.display()
        );
    }

    let summary = export_entries(&mut client, &entries, &args.outfolder, args.format);
    tracing::debug!(
        listed = summary.listed,
        written = summary.written,
        failed = summary.failed,
        "export finished"
    );
    if summary.failed > 0 {
        return Err(CliRunError::EntriesFailed {
            failed: summary.failed,
            total: summary.listed,
        });
    }
    Ok(())
}
