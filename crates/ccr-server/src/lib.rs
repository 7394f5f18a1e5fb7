// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ccr_openai::{unix_now, ModelInfo, ModelList, MODEL_IDS};
use ccr_sessions::{SessionStore, SessionStoreError};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tracing::{error, info};

/// The response dispatcher.
pub mod dispatch;
/// HTTP-facing error type.
pub mod error;
/// Request logging and CORS.
pub mod middleware;
/// Response-builder projections.
pub mod respond;

pub use error::ApiError;

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Executable name or path of the upstream CLI.
    pub claude_bin: String,
    /// Per-request subprocess timeout.
    pub timeout: Duration,
    /// The conversation → CLI session mapping.
    pub sessions: Arc<SessionStore>,
}

/// Build the relay router with all routes and layers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(dispatch::chat_completions))
        .route("/v1/models", get(list_models))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::request_logger))
        .layer(middleware::cors_layer())
        .layer(DefaultBodyLimit::max(middleware::BODY_LIMIT))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "provider": "claude-code-cli",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn list_models() -> impl IntoResponse {
    let created = unix_now();
    Json(ModelList {
        object: "list".into(),
        data: MODEL_IDS
            .iter()
            .map(|id| ModelInfo {
                id: (*id).to_string(),
                object: "model".into(),
                created,
                owned_by: "anthropic".into(),
            })
            .collect(),
    })
}

async fn not_found() -> impl IntoResponse {
    ApiError::not_found()
}

// ---------------------------------------------------------------------------
// Server lifecycle
// ---------------------------------------------------------------------------

/// Configuration for [`RelayServer::start`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind address (loopback unless overridden).
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Upstream CLI executable.
    pub claude_bin: String,
    /// Per-request subprocess timeout.
    pub timeout: Duration,
    /// Session-file override (defaults to the store's `$HOME` location).
    pub sessions_path: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            claude_bin: "claude".into(),
            timeout: ccr_driver::DEFAULT_TIMEOUT,
            sessions_path: None,
        }
    }
}

/// Errors from starting the relay server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The requested address is already bound by another process.
    #[error("{host}:{port} is already in use; is another relay running?")]
    AddrInUse {
        /// Requested host.
        host: String,
        /// Requested port.
        port: u16,
    },

    /// Any other bind failure.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The session store could not be located.
    #[error(transparent)]
    Sessions(#[from] SessionStoreError),
}

/// The relay server entry point.
pub struct RelayServer;

/// Handle to a running relay: its bound address and a stop switch.
pub struct RelayHandle {
    addr: std::net::SocketAddr,
    shutdown: watch::Sender<bool>,
    serve_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    cleanup_task: tokio::task::JoinHandle<()>,
}

impl RelayServer {
    /// Bind and start serving. Returns once the listener is live.
    pub async fn start(config: RelayConfig) -> Result<RelayHandle, ServerError> {
        let sessions = Arc::new(match &config.sessions_path {
            Some(path) => SessionStore::with_path(path.clone()),
            None => SessionStore::new()?,
        });
        let cleanup_task = sessions.spawn_cleanup_task();

        let state = AppState {
            claude_bin: config.claude_bin.clone(),
            timeout: config.timeout,
            sessions,
        };
        let app = build_app(state);

        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::AddrInUse {
                ServerError::AddrInUse {
                    host: config.host.clone(),
                    port: config.port,
                }
            } else {
                ServerError::Bind { addr: addr.clone(), source: err }
            }
        })?;
        let local_addr = listener.local_addr().map_err(|err| ServerError::Bind {
            addr: addr.clone(),
            source: err,
        })?;

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let serve_task = tokio::spawn(async move {
            let graceful = async move {
                let _ = shutdown_rx.wait_for(|stopped| *stopped).await;
            };
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!(target: "ccr.http", %err, "server error");
            }
        });

        info!(target: "ccr.http", addr = %local_addr, "relay listening");

        Ok(RelayHandle {
            addr: local_addr,
            shutdown,
            serve_task: Mutex::new(Some(serve_task)),
            cleanup_task,
        })
    }
}

impl RelayHandle {
    /// The address the relay is actually bound to.
    #[must_use]
    pub fn addr(&self) -> std::net::SocketAddr {
        self.addr
    }

    /// Stop serving gracefully and cancel the session cleanup sweep.
    /// Idempotent.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.serve_task.lock().await.take() {
            let _ = task.await;
        }
        self.cleanup_task.abort();
        info!(target: "ccr.http", addr = %self.addr, "relay stopped");
    }
}

// ---------------------------------------------------------------------------
// Process-wide control surface
// ---------------------------------------------------------------------------

fn server_slot() -> &'static Mutex<Option<Arc<RelayHandle>>> {
    static SLOT: OnceLock<Mutex<Option<Arc<RelayHandle>>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

/// Start the process-wide relay, or return the already-running instance.
pub async fn start_server(config: RelayConfig) -> Result<Arc<RelayHandle>, ServerError> {
    let mut slot = server_slot().lock().await;
    if let Some(handle) = slot.as_ref() {
        return Ok(Arc::clone(handle));
    }
    let handle = Arc::new(RelayServer::start(config).await?);
    *slot = Some(Arc::clone(&handle));
    Ok(handle)
}

/// Stop the process-wide relay, if one is running.
pub async fn stop_server() {
    let handle = server_slot().lock().await.take();
    if let Some(handle) = handle {
        handle.stop().await;
    }
}

/// The running process-wide relay, if any.
pub async fn get_server() -> Option<Arc<RelayHandle>> {
    server_slot().lock().await.clone()
}
