//! Core filtering server implementation.
//!
//! This module contains the `FilterServer` struct, which owns the rectangle
//! log, builds the HTTP router and runs the accept loop until shutdown.

use crate::{
    config::ServerConfig,
    error::ServerError,
    server::handlers::{self, AppState},
    storage::{CsvRectangleLog, RectangleLog},
};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The filtering server.
///
/// Holds the configuration and the shared rectangle log. The log is
/// injected once at construction and handed to every request through router
/// state, so tests can substitute an in-memory store.
pub struct FilterServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Log that matched rectangles are appended to
    store: Arc<dyn RectangleLog>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl FilterServer {
    /// Creates a server whose log is the CSV file named in `config`.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(CsvRectangleLog::new(config.data_file.clone()));
        Self::with_store(config, store)
    }

    /// Creates a server backed by the given store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn RectangleLog>) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        Self {
            config,
            store,
            shutdown_sender,
        }
    }

    /// Builds the HTTP router.
    ///
    /// `GET /` lists stored rectangles, `POST /` submits a filter request.
    /// Any other method on `/` is answered with `405 Method Not Allowed`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list).post(handlers::submit))
            .route("/health", get(handlers::health))
            .layer(TraceLayer::new_for_http())
            .with_state(AppState {
                store: self.store.clone(),
            })
    }

    /// Binds the listener and serves requests until [`shutdown`] is called.
    ///
    /// [`shutdown`]: FilterServer::shutdown
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        self.serve(listener).await
    }

    /// Serves requests on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(format!("Listener address unavailable: {e}")))?;
        info!("🚀 Filtering server listening on {}", local_addr);
        info!("📂 Rectangle log: {}", self.config.data_file.display());

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_receiver.recv().await;
                info!("Shutdown signal received");
            })
            .await
            .map_err(|e| ServerError::Network(format!("Server error: {e}")))?;

        info!("Server stopped");
        Ok(())
    }

    /// Initiates server shutdown.
    ///
    /// In-flight requests are allowed to finish before `start` returns.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    /// Gets the configuration the server was created with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
