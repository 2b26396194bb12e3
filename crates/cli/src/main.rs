mod bootstrap;
mod di;

use clap::Parser;
use glory_hole_domain::config::Config;
use glory_hole_infrastructure::listener;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "glory-hole")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Recursive DNS filtering gateway")]
struct Cli {
    /// Configuration file path (defaults to ./glory-hole.toml or /etc/glory-hole/config.toml)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Load and validate configuration, then exit without starting the server
    #[arg(long)]
    health_check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal: failed to load configuration: {e}");
            return ExitCode::from(if cli.health_check { 2 } else { 1 });
        }
    };

    init_logging(&config.logging);

    if cli.health_check {
        info!("configuration is valid");
        return ExitCode::SUCCESS;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal startup or runtime failure");
            ExitCode::from(1)
        }
    }
}

fn init_logging(cfg: &glory_hole_domain::config::LoggingConfig) {
    let level = cfg.level.parse().unwrap_or(tracing::Level::INFO);
    let subscriber = tracing_subscriber::fmt().with_target(true).with_max_level(level);
    if cfg.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting glory-hole");

    let shutdown = CancellationToken::new();

    let pool = bootstrap::database::init_database(&config.database).await?;

    let adapters = di::Adapters::build(&config, pool.clone(), shutdown.clone()).await?;
    let handler = adapters.build_handler(&config);

    let runner = di::jobs::build_runner(&adapters, &config, pool, shutdown.clone());
    tokio::spawn(runner.start());

    let listener_shutdown = shutdown.clone();
    let server_config = config.server.clone();
    let server = tokio::spawn(async move { listener::run(&server_config, handler, listener_shutdown).await });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping listeners");
    shutdown.cancel();

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "listener exited with error"),
        Err(e) => error!(error = %e, "listener task panicked"),
    }

    info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
