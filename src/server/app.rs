//! Server application implementation

use anyhow::Result;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use warp::Filter;

use crate::config::ServerConfig;
use crate::models::ServerInfo;
use crate::serial::{PortOpener, SerialBridge, SessionConfig, SessionRegistry, SystemPortOpener};
use crate::services::{ArduinoCli, BuildOrchestrator, OllamaClient, SketchStore, StagingManager};

/// Server application main struct
pub struct ServerApp {
    config: ServerConfig,
    state: Arc<ServerState>,
    /// Handle for the background staging sweeper
    sweeper_task: Option<tokio::task::JoinHandle<()>>,
    /// Cancellation signal for background tasks
    cancel_signal: Arc<AtomicBool>,
}

/// Everything the request handlers share
pub struct ServerState {
    pub config: ServerConfig,
    pub store: SketchStore,
    pub orchestrator: BuildOrchestrator<ArduinoCli>,
    pub bridge: SerialBridge,
    pub ai: OllamaClient,
    pub started_at: DateTime<Local>,
    pub hostname: String,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let opener = Arc::new(SystemPortOpener::new(config.serial_read_timeout()));
        Self::with_port_opener(config, opener)
    }

    /// Build state with a custom serial backend
    pub fn with_port_opener(config: ServerConfig, opener: Arc<dyn PortOpener>) -> Result<Self> {
        config.validate()?;

        let store = SketchStore::new(config.sketches_dir(), config.templates_dir());
        let toolchain = ArduinoCli::new(
            config.toolchain_program.clone(),
            config.max_concurrent_builds,
        );
        let orchestrator = BuildOrchestrator::new(
            store.clone(),
            StagingManager::new(config.uploads_dir()),
            toolchain,
        );

        let registry = Arc::new(SessionRegistry::new(
            opener,
            SessionConfig {
                poll_interval: config.serial_poll_interval(),
                ..SessionConfig::default()
            },
        ));

        let ai = OllamaClient::new(
            &config.ollama_url,
            config.ollama_model.clone(),
            Duration::from_secs(config.ai_probe_timeout_secs),
            Duration::from_secs(config.ai_request_timeout_secs),
        )?;

        let hostname = hostname::get()
            .unwrap_or_else(|_| "sketchbrew-server".into())
            .to_string_lossy()
            .to_string();

        Ok(Self {
            config,
            store,
            orchestrator,
            bridge: SerialBridge::new(registry),
            ai,
            started_at: Local::now(),
            hostname,
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.bridge.registry()
    }

    pub async fn server_info(&self) -> ServerInfo {
        ServerInfo {
            version: crate::VERSION.to_string(),
            hostname: self.hostname.clone(),
            started_at: self.started_at,
            open_sessions: self.registry().len().await,
        }
    }
}

impl ServerApp {
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let state = Arc::new(ServerState::new(config.clone())?);
        state.store.init().await?;

        Ok(Self {
            config,
            state,
            sweeper_task: None,
            cancel_signal: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn get_state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    pub async fn run(mut self) -> Result<()> {
        log::info!(
            "Server starting on {}:{}",
            self.config.bind_address,
            self.config.port
        );

        let state = self.get_state();

        let toolchain = state.orchestrator.invoker().status().await;
        match (toolchain.available, &toolchain.version) {
            (true, Some(version)) => log::info!("Using {} ({})", toolchain.program, version),
            (true, None) => log::info!("Using {}", toolchain.program),
            (false, _) => log::warn!(
                "{} is not available; full functionality requires arduino-cli",
                toolchain.program
            ),
        }

        // Sweep once now, then on every interval
        let sweeper_state = state.clone();
        let sweeper_cancel = self.cancel_signal.clone();
        let sweep_interval = Duration::from_secs(self.config.staging_sweep_interval_secs.max(1));
        self.sweeper_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);

            loop {
                interval.tick().await;

                if sweeper_cancel.load(Ordering::Relaxed) {
                    log::debug!("Staging sweeper shutting down");
                    break;
                }

                let retention = sweeper_state.config.staging_retention();
                let staging = sweeper_state.orchestrator.staging();
                match staging.sweep_expired(retention).await {
                    Ok(0) => {}
                    Ok(removed) => log::info!(
                        "Removed {} expired staging workspaces from {}",
                        removed,
                        staging.root().display()
                    ),
                    Err(e) => log::warn!(
                        "Staging sweep of {} failed: {}",
                        staging.root().display(),
                        e
                    ),
                }
            }
        }));

        let cors = warp::cors()
            .allow_any_origin()
            .allow_headers(vec!["content-type", "authorization"])
            .allow_methods(vec!["GET", "POST", "DELETE", "OPTIONS"]);
        let logging = crate::server::middleware::logging::with_request_logging();

        let routes = crate::server::routes::create_routes(state.clone())
            .with(logging)
            .with(cors);

        let bind_addr: std::net::SocketAddr =
            format!("{}:{}", self.config.bind_address, self.config.port)
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

        let cancel_signal = self.cancel_signal.clone();
        let (addr, server) =
            warp::serve(routes).try_bind_with_graceful_shutdown(bind_addr, async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
                log::info!("Received shutdown signal (Ctrl+C)...");

                cancel_signal.store(true, Ordering::Relaxed);
            })?;

        log::info!("Server listening on http://{}", addr);
        log::info!("sketchbrew server ready");

        server.await;

        log::info!("Cleaning up background tasks...");
        if let Some(sweeper_task) = self.sweeper_task.take() {
            sweeper_task.abort();
            match sweeper_task.await {
                Err(e) if e.is_panic() => log::warn!("Staging sweeper task panicked: {}", e),
                _ => log::debug!("Staging sweeper stopped"),
            }
        }

        state.registry().close_all().await;

        log::info!("Server shut down gracefully");
        Ok(())
    }
}
