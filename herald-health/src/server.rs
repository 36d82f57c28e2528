//! Probe endpoints served over axum

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use herald_common::{Signal, internal};
use tokio::{
    net::TcpListener,
    sync::broadcast::{self, error::RecvError},
};
use tower_http::timeout::TimeoutLayer;

use crate::{HealthChecker, HealthConfig, HealthError, HealthStatus};

pub const LIVE_PATH: &str = "/health/live";
pub const READY_PATH: &str = "/health/ready";

/// A probe slower than this is reported as failed
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

type Probe = (StatusCode, Json<HealthStatus>);

/// Routes for both probes, sharing one checker
pub fn router(checker: Arc<HealthChecker>) -> Router {
    Router::new()
        .route(LIVE_PATH, get(live))
        .route(READY_PATH, get(ready))
        .with_state(checker)
        .layer(TimeoutLayer::new(PROBE_TIMEOUT))
}

/// Both probes answer with the current status snapshot; only the code differs
async fn live(State(checker): State<Arc<HealthChecker>>) -> Probe {
    let code = if checker.is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(checker.status()))
}

async fn ready(State(checker): State<Arc<HealthChecker>>) -> Probe {
    let status = checker.status();
    if status.ready {
        return (StatusCode::OK, Json(status));
    }

    tracing::warn!(
        store_ready = status.store_ready,
        dispatcher_ready = status.dispatcher_ready,
        queue_depth = status.queue_depth,
        max_queue_depth = status.max_queue_depth,
        "Readiness probe failed"
    );
    (StatusCode::SERVICE_UNAVAILABLE, Json(status))
}

/// A bound probe listener, started with [`HealthServer::serve`]
pub struct HealthServer {
    listener: TcpListener,
    checker: Arc<HealthChecker>,
}

impl HealthServer {
    /// # Errors
    /// If the configured address cannot be bound
    pub async fn new(
        config: &HealthConfig,
        checker: Arc<HealthChecker>,
    ) -> Result<Self, HealthError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|source| HealthError::Bind {
                address: config.listen_address.clone(),
                source,
            })?;

        internal!(level = INFO, "Health probes listening on {}", config.listen_address);

        Ok(Self { listener, checker })
    }

    /// The address actually bound, useful when binding port 0
    ///
    /// # Errors
    /// If the socket has no local address
    pub fn local_addr(&self) -> Result<SocketAddr, HealthError> {
        self.listener
            .local_addr()
            .map_err(|e| HealthError::Server(e.to_string()))
    }

    /// Answer probes until `Signal::Shutdown` arrives or every sender is gone
    ///
    /// # Errors
    /// If the server fails while running
    pub async fn serve(self, mut signals: broadcast::Receiver<Signal>) -> Result<(), HealthError> {
        let shutdown = async move {
            loop {
                match signals.recv().await {
                    Ok(Signal::Shutdown) | Err(RecvError::Closed) => break,
                    Ok(Signal::Finalised) | Err(RecvError::Lagged(_)) => {}
                }
            }
            internal!(level = INFO, "Health probes shutting down");
        };

        axum::serve(self.listener, router(self.checker))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| HealthError::Server(e.to_string()))
    }
}
