//! everything-search - query a running Everything instance from the command line.
//!
//! # Usage
//!
//! ```cmd
//! everything-search "*.pdf report"
//! everything-search --regex "^IMG_\d{4}\.jpg$" --fields "SIZE | DATE_CREATED" --json
//! everything-search --max 20 --offset 40 invoice
//! everything-search --index 0 "*.log"
//! ```
//!
//! Requires Everything to be running and the SDK DLL to be installed (see
//! `--dll` and the `EVERYTHING_SDK_DLL` environment variable).

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use everything_ipc::output::RecordSnapshot;
use everything_ipc::{Engine, FieldFlags, LibraryEngine, QuerySession, SdkConfig};

/// Query the Everything search engine over IPC.
#[derive(Parser, Debug)]
#[command(name = "everything-search", version)]
struct Cli {
    /// Search expression in Everything syntax (a regular expression with --regex)
    #[arg(default_value = "")]
    search: String,

    /// Interpret the search as a regular expression
    #[arg(short, long)]
    regex: bool,

    /// Case-sensitive matching
    #[arg(short = 'c', long)]
    match_case: bool,

    /// Match whole words only
    #[arg(short, long)]
    whole_word: bool,

    /// Match against full paths instead of file names
    #[arg(short = 'p', long)]
    match_path: bool,

    /// Maximum number of results
    #[arg(short = 'n', long)]
    max: Option<u32>,

    /// Skip this many results
    #[arg(long, default_value_t = 0)]
    offset: u32,

    /// Fields to request, e.g. "SIZE | DATE_MODIFIED"
    #[arg(short, long, value_parser = parse_fields)]
    fields: Option<FieldFlags>,

    /// Path to Everything32.dll / Everything64.dll
    #[arg(long)]
    dll: Option<PathBuf>,

    /// Configuration file (defaults to the per-user config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Return as soon as the query is sent instead of waiting for results
    #[arg(long)]
    no_wait: bool,

    /// Print one JSON object per result
    #[arg(long)]
    json: bool,

    /// Print only the result at this index
    #[arg(long, allow_hyphen_values = true)]
    index: Option<i64>,
}

/// Parse a `|`-separated list of field names (case-insensitive) or hex values.
fn parse_fields(input: &str) -> Result<FieldFlags, String> {
    let normalized = input
        .split('|')
        .map(|token| {
            let token = token.trim();
            if token.starts_with("0x") {
                token.to_string()
            } else {
                token.to_uppercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" | ");

    bitflags::parser::from_str::<FieldFlags>(&normalized).map_err(|e| format!("{}: {}", input, e))
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "everything_search=info,everything_ipc=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_logging();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => SdkConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => SdkConfig::load(),
    };
    if let Some(dll) = &cli.dll {
        config.dll_path = Some(dll.clone());
    }

    let dll_path = config.resolve_dll_path()?;
    let engine = LibraryEngine::load(&dll_path)?;

    let mut session = QuerySession::with_config(engine, &config);
    session.set_search(cli.search.as_str());
    session.set_regex_enabled(cli.regex || config.regex);
    session.set_match_case(cli.match_case || config.match_case);
    session.set_match_whole_word(cli.whole_word);
    session.set_match_path(cli.match_path);
    session.set_max_results(cli.max.or(config.max_results));
    session.set_offset(cli.offset);
    if let Some(fields) = cli.fields {
        session.set_requested_fields(fields);
    }

    let wait = config.wait && !cli.no_wait;
    if !session.evaluate(wait) {
        let reason = match session.last_error() {
            Ok(code) => code.to_string(),
            Err(e) => e.to_string(),
        };
        error!("Query failed: {}", reason);
        return Ok(ExitCode::FAILURE);
    }

    info!(
        "{} results, available fields: {:?}",
        session.result_count(),
        session.available_fields()
    );

    print_results(&session, &cli)?;
    Ok(ExitCode::SUCCESS)
}

fn print_results<E: Engine>(session: &QuerySession<E>, cli: &Cli) -> anyhow::Result<()> {
    let view = session.results();
    let mut out = io::stdout().lock();

    let snapshots: Vec<RecordSnapshot> = match cli.index {
        Some(index) => vec![RecordSnapshot::from(&view.get_signed(index)?)],
        None => view.iter().map(|record| RecordSnapshot::from(&record)).collect(),
    };

    for snapshot in &snapshots {
        if cli.json {
            writeln!(out, "{}", serde_json::to_string(snapshot)?)?;
        } else {
            writeln!(out, "{}", snapshot.to_row())?;
        }
    }

    Ok(())
}
