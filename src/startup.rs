//! Application startup and lifecycle management.
//!
//! Binds the listener up front (port 0 allowed, so tests can grab a random
//! port) and separates building from running.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use crate::services::{ExpenseService, MemoryTokenStore, RedisTokenStore, SplitwiseClient, TokenStore};
use crate::{build_router, AppState};

pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let store: Arc<dyn TokenStore> = match config.store.backend {
            StoreBackend::Memory => {
                tracing::info!("Using in-memory token store");
                Arc::new(MemoryTokenStore::new())
            }
            StoreBackend::Redis => {
                let url = config.store.redis_url.as_deref().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "REDIS_URL is required when TOKEN_STORE=redis"
                    ))
                })?;
                Arc::new(
                    RedisTokenStore::new(url)
                        .await
                        .map_err(AppError::StoreError)?,
                )
            }
        };

        let splitwise = SplitwiseClient::new(config.splitwise.clone());
        let expense_service = ExpenseService::new(store.clone(), splitwise.clone());

        let state = AppState {
            config: config.clone(),
            store,
            splitwise,
            expense_service,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        let app = build_router(self.state);

        tracing::info!(port = self.port, "Listening");

        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
