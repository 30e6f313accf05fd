//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::EmptyReplies;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Path value meaning stdin or stdout.
pub const STDIO: &str = "-";

/// packet-counter - per-address packet tallies for batched observations
///
/// Reads invocation payloads ({"Messages": [...]}) and writes one response
/// ({"Replies": [...]}) per invocation, with one reply per distinct remote
/// address carrying that address's packet count.
///
/// Examples:
///   packet-counter < batch.json
///   packet-counter --input batch.json --pretty
///   packet-counter --stream < invocations.ndjson > responses.ndjson
///   packet-counter --summarize --input response.json
///   packet-counter --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Input file ("-" for stdin)
    #[arg(short, long, default_value = STDIO, value_name = "FILE")]
    pub input: PathBuf,

    /// Output file ("-" for stdout)
    #[arg(short, long, default_value = STDIO, value_name = "FILE")]
    pub output: PathBuf,

    /// Treat each input line as a separate invocation
    #[arg(long)]
    pub stream: bool,

    /// Stop a stream at the first failed invocation
    #[arg(long)]
    pub fail_fast: bool,

    /// Pretty-print JSON responses
    #[arg(long)]
    pub pretty: bool,

    /// How to write a response with no replies
    #[arg(long, value_name = "STYLE")]
    pub empty_replies: Option<EmptyReplies>,

    /// Read a response payload and print per-tag packet totals
    #[arg(long)]
    pub summarize: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .packet-counter.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .packet-counter.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.summarize && self.stream {
            return Err("Cannot use both --summarize and --stream".to_string());
        }

        if !is_stdio(&self.input) {
            if !self.input.exists() {
                return Err(format!(
                    "Input file does not exist: {}",
                    self.input.display()
                ));
            }
            if !self.input.is_file() {
                return Err(format!("Input path is not a file: {}", self.input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Returns true if `path` stands for stdin/stdout.
pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}
