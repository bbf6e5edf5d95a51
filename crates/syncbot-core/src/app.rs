//! Application lifecycle: connect, serve, announce, stop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::relay::{GatewayEvent, SyncBot};
use crate::session::{LiveSession, PlatformConnector, SessionConnector};
use crate::webhook;

/// Capacity of the queue between the Discord gateway and the dispatcher
const GATEWAY_QUEUE_SIZE: usize = 256;

/// A running relay: platform session, gateway event pump and webhook server
pub struct SyncBotApp {
    bot: Arc<SyncBot>,
    local_addr: SocketAddr,
    /// Cancelled when the process should exit non-zero
    shutdown: CancellationToken,
    /// Cancelled by [`stop`](Self::stop) to end the pump and the server
    stop: CancellationToken,
    server: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
}

impl SyncBotApp {
    /// Start against the real Discord and GroupMe services.
    ///
    /// A Discord session that drops on its own fires
    /// [`shutdown_token`](Self::shutdown_token).
    pub async fn start(config: RelayConfig) -> Result<Self> {
        let (tx, rx) = mpsc::channel(GATEWAY_QUEUE_SIZE);
        let shutdown = CancellationToken::new();
        let connector = Arc::new(PlatformConnector::new(tx, shutdown.clone()));
        Self::start_with(config, connector, rx, shutdown).await
    }

    /// Start with an explicit connector.
    ///
    /// `events` must receive every [`GatewayEvent`] the connector's sessions
    /// produce, including sessions opened by later reloads. `shutdown` becomes
    /// the [`shutdown_token`](Self::shutdown_token).
    pub async fn start_with(
        config: RelayConfig,
        connector: Arc<dyn SessionConnector>,
        events: mpsc::Receiver<GatewayEvent>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
        let local_addr = listener.local_addr()?;

        let channels = connector
            .connect(&config)
            .await
            .context("Failed to connect to chat platforms")?;

        let webhook_path = config.server.webhook_path.clone();
        let stop = CancellationToken::new();
        let bot = Arc::new(SyncBot::new(
            LiveSession::new(config, channels),
            connector,
            shutdown.clone(),
        ));

        let server = {
            let router = webhook::router(bot.clone(), &webhook_path);
            let stop = stop.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let result = axum::serve(listener, router)
                    .with_graceful_shutdown(async move { stop.cancelled().await })
                    .await;
                if let Err(e) = result {
                    error!("Webhook server failed: {}", e);
                    shutdown.cancel();
                }
            })
        };

        let pump = tokio::spawn(run_event_pump(bot.clone(), events, stop.clone()));

        info!(
            "Listening for GroupMe callbacks on http://{}{}",
            local_addr, webhook_path
        );
        bot.announce_startup().await;

        Ok(Self {
            bot,
            local_addr,
            shutdown,
            stop,
            server: Some(server),
            pump: Some(pump),
        })
    }

    pub fn bot(&self) -> &Arc<SyncBot> {
        &self.bot
    }

    /// Address the webhook server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Token cancelled when the relay hits an unrecoverable failure
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Announce shutdown, close the platform session and stop serving.
    ///
    /// Calling it again is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        let (Some(server), Some(pump)) = (self.server.take(), self.pump.take()) else {
            return Ok(());
        };

        self.bot.shutdown().await;
        self.stop.cancel();

        if let Err(e) = pump.await {
            warn!("Gateway event pump ended abnormally: {}", e);
        }
        server.await.context("Webhook server task panicked")?;

        info!("Syncbot stopped");
        Ok(())
    }
}

async fn run_event_pump(
    bot: Arc<SyncBot>,
    mut events: mpsc::Receiver<GatewayEvent>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => {
                    let outcome = bot.on_gateway_event(&event).await;
                    debug!("Gateway event in {}: {:?}", event.channel_id, outcome);
                }
                None => {
                    debug!("Gateway event queue closed");
                    break;
                }
            },
        }
    }
}
