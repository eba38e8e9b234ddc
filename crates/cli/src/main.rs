mod config_commands;

use std::{path::PathBuf, time::Duration};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    dynstage_config::DynstageConfig,
    dynstage_discord::DiscordConnection,
    dynstage_stages::{CommandTable, CommunityOptions, Dispatcher, Sweeper},
    secrecy::Secret,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "dynstage", about = "Dynstage, per-user Discord stages on demand")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file to use instead of the discovered one.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and manage stages (default).
    Run {
        /// Bot token. Overrides `DISCORD_TOKEN` and the config file.
        #[arg(long)]
        token: Option<String>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "dynstage starting");

    let config = dynstage_config::load(cli.config.as_deref())?;
    match cli.command {
        None => run(config, None).await,
        Some(Commands::Run { token }) => run(config, token).await,
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
    }
}

async fn run(config: DynstageConfig, token: Option<String>) -> anyhow::Result<()> {
    let token = token
        .map(Secret::new)
        .or(config.discord.token)
        .context("no bot token, set DISCORD_TOKEN or pass --token")?;

    let (connection, events) = DiscordConnection::connect(&token).await?;
    let dispatcher = Dispatcher::new(
        connection.gateway(),
        config.community,
        CommandTable::from_config(&config.commands),
        CommunityOptions {
            reconcile_on_startup: config.sweep.reconcile_on_startup,
        },
    );
    let sweeper = Sweeper::new(Duration::from_secs(config.sweep.interval_secs));

    let shutdown = CancellationToken::new();
    let client = connection.spawn(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("ctrl-c received"),
                Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
            }
            shutdown.cancel();
        }
    });

    dispatcher.run(events, sweeper, shutdown.clone()).await;
    shutdown.cancel();
    client.await.context("discord client task failed")?;
    info!("dynstage stopped");
    Ok(())
}
