//! RadioGPIO entry point

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use gpio_config::service::DEFAULT_CONFIG_PATH;
use gpio_config::AppConfig;
use gpio_types::ModuleId;
use radiogpio::{Application, LogFrontend, SupervisorCommand, SupervisorRef};
use std::path::PathBuf;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Bridges GPIO-style network triggers to output commands")]
struct Args {
    /// Configuration file path (JSON or TOML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Run an output command once after start, as MODULE:COMMAND
    #[arg(long = "send", value_name = "MODULE:COMMAND")]
    send: Vec<String>,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    match args.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_thread_names(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_thread_names(true))
            .init(),
    }
}

fn parse_send(value: &str) -> Result<(ModuleId, String)> {
    match value.split_once(':') {
        Some((module, command)) if !module.is_empty() && !command.is_empty() => {
            Ok((ModuleId::new(module), command.to_string()))
        }
        _ => bail!("Invalid --send value \"{}\", expected MODULE:COMMAND", value),
    }
}

/// Post a shutdown to the supervisor once Ctrl-C arrives
fn watch_ctrl_c(supervisor: SupervisorRef) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Err(e) = runtime.block_on(tokio::signal::ctrl_c()) {
                error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            info!("Shutdown signal received");
            if let Err(e) = supervisor.shutdown() {
                warn!("Supervisor already gone: {}", e);
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    if !args.config.exists() {
        AppConfig::default()
            .save(&args.config)
            .with_context(|| format!("Failed to write default config {}", args.config.display()))?;
        warn!(
            "No configuration found, a default one was written to {}. Edit it and start again.",
            args.config.display()
        );
        return Ok(());
    }

    let sends = args
        .send
        .iter()
        .map(String::as_str)
        .map(parse_send)
        .collect::<Result<Vec<_>>>()?;

    let config = AppConfig::load(&args.config)?;
    info!(config = %args.config.display(), "Configuration loaded");

    let app = Application::build(&config, Box::new(LogFrontend::new()))
        .context("RadioGPIO failed to initialize")?;
    let supervisor = app.supervisor();

    watch_ctrl_c(supervisor.clone())?;

    for (module, command) in sends {
        supervisor
            .send(SupervisorCommand::RunOutputCommand { module, command })
            .context("Supervisor mailbox closed")?;
    }

    app.run();
    info!("RadioGPIO stopped");
    Ok(())
}
