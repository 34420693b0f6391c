//! # SessionGrid Server
//!
//! The admin/routing API binary: an Axum server exposing interface and
//! binding resolution, session statistics, affinity route location, SSO
//! logout, and managed-server lifecycle operations.
//!
//! The listener itself is bound through the sockets slice: the configured
//! `server.binding` resolves to an address via the declared interface
//! criteria, so the server exercises the same selection path it serves.
//!
//! ## Example
//! ```no_run
//! use sgrid_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow};
use axum_server::Handle;
use sgrid::domain::config::GridConfig;
use sgrid::kernel::server::GridState;
use sgrid_events::ClusterEvents;
use sgrid_routing::seed_topology;
use sgrid_sessions::Sessions;
use sgrid_sockets::Sockets;
use sgrid_sso::Sso;
use sgrid_store::{Compression, Store};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: GridConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: GridConfig) -> Self {
        self.cfg = cfg;
        self
    }

    async fn init_store(&self) -> Result<Store> {
        let store_cfg = &self.cfg.store;
        let compression =
            if store_cfg.compression { Compression::Lz4 } else { Compression::None };

        Store::builder()
            .root(&store_cfg.data_dir)
            .compression(compression)
            .connect()
            .await
            .context("Failed to initialize the passivation store")
    }

    fn validate_ssl_config(&self) -> Result<()> {
        if let Some(ssl) = &self.cfg.server.ssl {
            if !ssl.cert.exists() {
                anyhow::bail!("SSL certificate not found at: {}", ssl.cert.display());
            }
            if !ssl.key.exists() {
                anyhow::bail!("SSL key not found at: {}", ssl.key.display());
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let metadata = ssl.key.metadata()?;
                if metadata.permissions().mode() & 0o077 != 0 {
                    tracing::warn!(
                        "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                        ssl.key.display()
                    );
                }
            }
        }
        Ok(())
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Validates the TLS configuration
    /// 2. Connects the passivation store
    /// 3. Seeds the cluster event hub with the configured topology
    /// 4. Initializes every provider slice (sockets resolve first)
    /// 5. Resolves the API listener address through the sockets slice
    ///
    /// # Errors
    /// Returns an error if:
    /// * A declared interface or socket binding does not resolve
    /// * The passivation store root cannot be created
    /// * SSL certificate/key files cannot be read
    pub async fn build(self) -> Result<Server> {
        // 1. Validate SSL Configuration
        self.validate_ssl_config()?;

        // 2. Passivation store
        let store = self.init_store().await?;

        // 3. Cluster event hub, seeded from configuration
        let events = ClusterEvents::new(seed_topology(&self.cfg));

        // 4. Orchestrate provider slices
        let slices = sgrid::init(&self.cfg, &events, &store)
            .map_err(|e| anyhow!("Platform bootstrap failed: {e}"))?;

        let state = slices
            .into_iter()
            .fold(
                GridState::builder().config(self.cfg).events(events).store(store),
                |builder, slice| builder.register_slice(slice),
            )
            .build()
            .context("Failed to finalize grid state registry")?;

        // 5. Resolve the listener address through the sockets slice
        let sockets = state
            .try_get_slice::<Sockets>()
            .map_err(|e| anyhow!("Sockets slice missing: {e}"))?;
        let binding = &state.config.server.binding;
        let address = sockets
            .binding(binding)
            .map(|b| b.addr)
            .ok_or_else(|| anyhow!("Server binding '{binding}' is not declared"))?;

        info!(
            %address,
            binding = %binding,
            "Initializing server"
        );

        Ok(Server { state, address })
    }
}

/// A fully initialized server instance ready to run.
///
/// This struct is returned by [`ServerBuilder::build`] and contains
/// all necessary runtime state.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: GridState,
    address: SocketAddr,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Starts the server and runs until the shutdown signal is received.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the resolved address
    /// or if SSL/TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let cfg = self.state.config.clone();
        let address = self.address;

        info!(
            %address,
            ssl = cfg.server.ssl.is_some(),
            "Starting server"
        );

        // 1. Background sweeps for sessions and SSO
        let mut sweepers = Vec::new();
        if let Ok(sessions) = self.state.try_get_slice::<Sessions>() {
            sweepers.extend(sessions.spawn_sweepers());
        }
        if let Ok(sso) = self.state.try_get_slice::<Sso>()
            && let Some(handle) = sso.spawn_sweeper()
        {
            sweepers.push(handle);
        }

        let app = router::init(self.state);

        // 2. Set up Graceful Shutdown
        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();

        // Spawn shutdown signal listener
        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(30)));
        });

        // 3. Start Server (HTTP or HTTPS)
        if let Some(ssl_config) = &cfg.server.ssl {
            info!("Starting HTTPS server on https://{address}");

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &ssl_config.cert,
                &ssl_config.key,
            )
            .await
            .context("Failed to load SSL/TLS certificates")?;

            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        } else {
            info!("Starting HTTP server on http://{address}");

            axum_server::bind(address)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTP server failed")?;
        }

        for sweeper in sweepers {
            sweeper.abort();
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub const fn state(&self) -> &GridState {
        &self.state
    }

    /// The address the server will listen on.
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
