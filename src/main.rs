//! CyberShield - multi-provider scam detection engine
//!
//! Forwards a message to two hosted language models, collects their
//! verdicts and asks a third model for the final one. Jobs arrive from a
//! host process over stdin/stdout, over HTTP, or once from the command line.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, credentials, I/O, etc.)
//!   2 - One-shot analysis failed

mod analysis;
mod bridge;
mod cli;
mod config;
mod error;
mod models;
mod provider;
mod report;
mod server;

use analysis::Pipeline;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat, RunMode};
use config::{Config, Credentials};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

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

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging; the guard flushes the log file on drop
    let guard = match init_logging(&args, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("CyberShield v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let exit_code = match run(args, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("Engine failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            1
        }
    };

    drop(guard);
    std::process::exit(exit_code);
}

/// Handle --init-config: generate a default .cybershield.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  .cybershield.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .cybershield.toml")?;

    println!("✅ Created .cybershield.toml with default settings.");
    println!("   Provider keys are read from GOOGLE_API_KEY, OPENAI_API_KEY and OPENROUTER_API_KEY.");
    Ok(())
}

/// Initialize logging: stderr always, plus the log file when configured.
///
/// Stdout is reserved for the job channel, so nothing is logged there.
fn init_logging(args: &Args, config: &Config) -> Result<Option<WorkerGuard>> {
    let level = LevelFilter::from_level(args.log_level());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, guard) = match config.log_file() {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(level)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(guard)
}

fn open_log_file(path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;

    tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load config, using defaults: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Build the pipeline and serve jobs in the selected mode. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let credentials = Credentials::from_env();
    debug!("Loaded {:?}", credentials);

    let pipeline = Arc::new(Pipeline::from_config(&config, &credentials)?);

    match args.mode {
        RunMode::Bridge => {
            info!("Starting job bridge on stdin/stdout");
            bridge::stdio::run(pipeline).await?;
            Ok(0)
        }
        RunMode::Serve => {
            let state = server::AppState {
                handler: pipeline,
                log_file: config.log_file().map(Path::to_path_buf),
            };
            server::run_server(state, &config.server.bind).await?;
            Ok(0)
        }
        RunMode::Once => {
            let text = args.text.as_deref().unwrap_or_default();
            run_once(&pipeline, text, args.format, args.quiet).await
        }
    }
}

/// Analyze a single message and print the verdict to stdout.
async fn run_once(pipeline: &Pipeline, text: &str, format: OutputFormat, quiet: bool) -> Result<i32> {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Analyzing message...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let outcome = pipeline.run(text).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(verdict) => {
            let output = match format {
                OutputFormat::Json => report::render_json(&verdict)?,
                OutputFormat::Text => report::render_text(&verdict),
            };
            println!("{}", output);
            Ok(0)
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("❌ {}", e);
            Ok(2)
        }
    }
}
