mod config_commands;

use std::path::{Path, PathBuf};

use {
    clap::{Parser, Subcommand},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use ticketlog_config::{Severity, TicketlogConfig};

#[derive(Parser)]
#[command(name = "ticketlog", about = "Discord ticket transcripts and message relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and the user config dir).
    #[arg(long, short, global = true, env = "TICKETLOG_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and start tracking (default).
    Run,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit config file, or discover one.
fn load(path: Option<&Path>) -> anyhow::Result<(TicketlogConfig, Option<PathBuf>)> {
    match path {
        Some(path) => Ok((ticketlog_config::load_config(path)?, Some(path.to_path_buf()))),
        None => Ok(ticketlog_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "ticketlog starting");

    match cli.command {
        None | Some(Commands::Run) => {
            let (config, path) = load(cli.config.as_deref())?;
            match &path {
                Some(path) => info!(path = %path.display(), "config loaded"),
                None => warn!("no config file found, using defaults"),
            }

            let result = ticketlog_config::validate(&config);
            for d in &result.diagnostics {
                match d.severity {
                    Severity::Error => tracing::error!(path = %d.path, "{}", d.message),
                    Severity::Warning => warn!(path = %d.path, "{}", d.message),
                }
            }
            if result.has_errors() {
                anyhow::bail!("invalid configuration, run `ticketlog config check`");
            }

            ticketlog_discord::run(config).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
