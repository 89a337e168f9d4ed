//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::BridgeError;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the job bridge until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BridgeError> {
    info!("Initializing job bridge...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, &mut shutdown_manager, shutdown_tx.subscribe()).await {
        error!("Failed to start job bridge: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), BridgeError> {
    let app_state = AppState::init(options)?;

    info!("Initializing HTTP server...");
    let server_state = ServerState::new(app_state.jobs.clone(), app_state.analytics.clone());

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    server_handle: Option<JoinHandle<Result<(), BridgeError>>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            server_handle: None,
        }
    }

    fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), BridgeError>>,
    ) -> Result<(), BridgeError> {
        if self.server_handle.is_some() {
            return Err(BridgeError::Shutdown("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    /// In-flight requests, including blocking runs, get `max_shutdown_delay` to drain
    async fn shutdown(&mut self) -> Result<(), BridgeError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, abandoning in-flight requests",
                    self.lifecycle_options.max_shutdown_delay
                );
                Err(BridgeError::Shutdown(format!(
                    "timed out after {:?}",
                    self.lifecycle_options.max_shutdown_delay
                )))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), BridgeError> {
        info!("Shutting down job bridge...");

        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| BridgeError::Shutdown(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
