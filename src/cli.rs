//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// CyberShield - multi-provider scam detection engine
///
/// Sends a message to two hosted models, then asks a third to merge their
/// verdicts. Provider keys are read from GOOGLE_API_KEY, OPENAI_API_KEY and
/// OPENROUTER_API_KEY.
///
/// Examples:
///   cybershield                                  # job bridge on stdin/stdout
///   cybershield --mode serve --bind 0.0.0.0:3000
///   cybershield --mode once --text "Bạn đã trúng thưởng 500$" --format text
///   cybershield --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// How jobs reach the engine
    #[arg(long, default_value = "bridge", value_name = "MODE", env = "CYBERSHIELD_MODE")]
    pub mode: RunMode,

    /// Message to analyze (required with --mode once)
    #[arg(short, long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Output format for --mode once
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cybershield.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address for the HTTP server (--mode serve)
    #[arg(long, value_name = "ADDR", env = "CYBERSHIELD_BIND")]
    pub bind: Option<String>,

    /// Per-request timeout for provider calls, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log file for the admin log viewer (empty string disables it)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cybershield.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Where jobs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RunMode {
    /// Line-delimited JSON jobs on stdin, results on stdout (default)
    #[default]
    Bridge,
    /// HTTP server with /api/analyze and the admin log viewer
    Serve,
    /// Analyze --text once and exit
    Once,
}

/// Output format for a one-shot analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed verdict JSON (default)
    #[default]
    Json,
    /// Human-readable warning message
    Text,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.mode == RunMode::Once {
            match self.text.as_deref() {
                None => return Err("--mode once requires --text".to_string()),
                Some(text) if text.trim().is_empty() => {
                    return Err("--text must not be empty".to_string())
                }
                Some(_) => {}
            }
        } else if self.text.is_some() {
            return Err("--text is only valid with --mode once".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref bind) = self.bind {
            if bind.parse::<std::net::SocketAddr>().is_err() {
                return Err(format!("Invalid bind address: {}", bind));
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
