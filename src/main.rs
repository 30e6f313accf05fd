//! packet-counter - per-address packet tallies
//!
//! Hosts the tally-and-reply handler: reads invocation payloads of packet
//! observations, counts observations per remote address, and writes one
//! reply per distinct address carrying its encoded count.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (I/O, config, etc.)
//!   2 - At least one invocation failed

mod cli;
mod codec;
mod config;
mod counter;
mod handler;
mod models;
mod runtime;
mod summary;

use anyhow::{Context, Result};
use cli::{is_stdio, Args};
use config::{Config, DEFAULT_CONFIG_FILE};
use counter::SystemClock;
use models::Response;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Where the effective configuration came from.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    BuiltIn,
    /// Default file present but unreadable; built-in defaults used.
    Invalid(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    debug!("packet-counter v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    report_config_source(&source);

    let outcome = if args.summarize {
        run_summarize(&args).await
    } else {
        run_invocations(&args, &config).await
    };

    match outcome {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("packet-counter failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .packet-counter.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr; stdout is reserved for response payloads.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::BuiltIn)),
        Err(e) => Ok((Config::default(), ConfigSource::Invalid(format!("{:#}", e)))),
    }
}

fn report_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
        ConfigSource::DefaultFile => info!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
        ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
        ConfigSource::Invalid(e) => warn!("Failed to load config: {}", e),
    }
}

/// Run invocations from the input. Returns exit code (0 or 2).
async fn run_invocations(args: &Args, config: &Config) -> Result<i32> {
    let reader = open_input(&args.input).await?;
    let mut writer = open_output(&args.output).await?;

    debug!("Runtime mode: {:?}", config.runtime.mode);
    let stats = runtime::run(reader, &mut writer, &SystemClock, config).await?;
    writer.shutdown().await.context("Failed to close output")?;

    if stats.all_succeeded() {
        Ok(0)
    } else {
        warn!(
            "{} of {} invocations failed",
            stats.failures, stats.invocations
        );
        Ok(2)
    }
}

/// Handle --summarize: decode a response payload and print per-tag totals.
async fn run_summarize(args: &Args) -> Result<i32> {
    let mut reader = open_input(&args.input).await?;
    let mut payload = String::new();
    reader
        .read_to_string(&mut payload)
        .await
        .context("Failed to read response payload")?;

    let response: Response =
        serde_json::from_str(&payload).context("Failed to parse response payload")?;
    let summary = summary::summarize(&response);

    let mut writer = open_output(&args.output).await?;
    writer
        .write_all(format!("{}\n", summary::render_text(&summary)).as_bytes())
        .await
        .context("Failed to write summary")?;
    writer.shutdown().await.context("Failed to close output")?;

    Ok(0)
}

async fn open_input(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if is_stdio(path) {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open input: {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

async fn open_output(path: &Path) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
    if is_stdio(path) {
        return Ok(Box::new(tokio::io::stdout()));
    }

    let file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create output: {}", path.display()))?;
    Ok(Box::new(file))
}
