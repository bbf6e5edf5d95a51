mod cli;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use syncbot_core::{RelayConfig, SyncBotApp};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _guard = init_logging(&cli);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => error::handle_error(e),
    }
}

/// Install the tracing subscriber. The returned guard flushes the file writer.
fn init_logging(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = if cli.verbose {
        "info,syncbot_core=debug,syncbot=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let log_dir = cli.log_dir.as_deref().filter(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            eprintln!(
                "Warning: cannot create log directory {}: {}; logging to stderr only",
                dir.display(),
                e
            );
            false
        }
    });

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "syncbot.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .with_level(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

/// Run until a signal or a fatal relay failure. Returns whether the exit was clean.
async fn run(cli: Cli) -> Result<bool> {
    let config = RelayConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    let mut app = SyncBotApp::start(config).await?;
    let fatal = app.shutdown_token();
    info!("Syncbot running. Press Ctrl+C to stop.");

    let clean = tokio::select! {
        _ = wait_for_signal() => {
            info!("Received stop signal");
            true
        }
        _ = fatal.cancelled() => {
            error!("Unrecoverable relay failure, stopping");
            false
        }
    };

    app.stop().await?;
    Ok(clean)
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
