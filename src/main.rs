// mcp-harness - Main Entry Point
//
// Connects to an MCP server over Streamable HTTP, lists what it offers and
// runs the smoke-test routines against its tools.
//
// Exit codes: 0 ok, 1 connect/initialize/config failure, 2 failed cases
// with --fail-on-error, 130 cancelled.

use anyhow::Result;
use clap::Parser;
use mcp_harness::config::{parse_header, Config};
use mcp_harness::error::HarnessError;
use mcp_harness::harness::{self, RoutineName};
use mcp_harness::shutdown::ShutdownGuard;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// mcp-harness: smoke tests for Model Context Protocol servers
#[derive(Parser, Debug)]
#[command(name = "mcp-harness")]
#[command(version)]
#[command(about = "Smoke-test harness for MCP servers over Streamable HTTP", long_about = None)]
struct Args {
    /// Server endpoint [default: http://localhost:8080/mcp]
    #[arg(long)]
    url: Option<String>,

    /// Whole-run timeout in seconds, 0 disables it [default: 60]
    #[arg(long)]
    timeout: Option<u64>,

    /// Routine to run [default: all]
    #[arg(long, value_enum)]
    tool: Option<RoutineName>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Exit with status 2 when any case fails
    #[arg(long)]
    fail_on_error: bool,

    /// Handshake and list only, do not call any tool
    #[arg(long)]
    list_only: bool,

    /// Extra request header, repeatable
    #[arg(long = "header", value_name = "KEY=VALUE")]
    headers: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (config, selection) = match resolve(&args) {
        Ok(resolved) => resolved,
        Err(e) => {
            // tracing is not up yet
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.log_level().unwrap_or(Level::INFO)
    };
    init_tracing(level, &config.logging.format);

    info!(
        "mcp-harness v{} starting (server {}, routine {})",
        env!("CARGO_PKG_VERSION"),
        config.server.url,
        selection
    );

    match run(&config, selection, args.list_only).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(level: Level, format: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    match format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
}

/// Load the config file, then layer environment and CLI overrides on top
fn resolve(args: &Args) -> Result<(Config, RoutineName), HarnessError> {
    let config_error = |e: anyhow::Error| HarnessError::Config(format!("{:#}", e));

    let mut config = match &args.config {
        Some(path) if !path.exists() => {
            return Err(HarnessError::Config(format!(
                "config file {} does not exist",
                path.display()
            )))
        }
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .map_err(config_error)?;

    apply_args(&mut config, args).map_err(config_error)?;
    config.validate().map_err(config_error)?;

    let selection = match args.tool {
        Some(tool) => tool,
        None => RoutineName::parse(&config.harness.tool).map_err(config_error)?,
    };
    Ok((config, selection))
}

fn apply_args(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(url) = &args.url {
        config.server.url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.server.timeout_secs = timeout;
    }
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    if args.fail_on_error {
        config.harness.fail_on_error = true;
    }
    for raw in &args.headers {
        let (key, value) = parse_header(raw)?;
        config.server.headers.insert(key, value);
    }
    Ok(())
}

async fn run(config: &Config, selection: RoutineName, list_only: bool) -> Result<(), HarnessError> {
    let guard = ShutdownGuard::spawn(config.run_timeout());

    let mut harness = match harness::connect(config, guard.token()).await {
        Ok(harness) => harness,
        Err(e) => {
            guard.finish().await;
            return Err(e);
        }
    };

    if list_only {
        info!("--list-only given, not calling any tool");
        harness.close().await;
        guard.finish().await;
        return Ok(());
    }

    let mut summary = harness.run(selection).await;
    harness.close().await;

    let cancelled = guard.finish().await;
    summary.cancelled = cancelled.map(|reason| reason.to_string());
    println!("{}", summary.render());

    if let Some(reason) = cancelled {
        return Err(HarnessError::Cancelled(reason.to_string()));
    }
    if config.harness.fail_on_error && summary.failed() > 0 {
        return Err(HarnessError::CasesFailed {
            failed: summary.failed(),
        });
    }
    Ok(())
}
