//! # REST Facade
//!
//! Minimal HTTP API over one contract connection:
//! - `GET /` liveness with the bound channel and contract
//! - `POST /setData` submits a ledger-mutating transaction
//! - `GET /getData/:key` evaluates a read-only query

pub mod api;

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use shared::config::FacadeConfig;
use wallet_client::ConnectionHandle;

/// Application state shared across handlers
pub struct AppState {
    /// Configuration
    pub config: FacadeConfig,
    /// Open contract connection
    pub connection: ConnectionHandle,
}

/// Serve the API on `listener` until `shutdown` resolves, then close the
/// connection whatever the server's outcome
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = api::create_router(state.clone());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    info!("Shutting down");
    if let Err(e) = state.connection.close().await {
        warn!(error = %e, "Gateway connection did not close cleanly");
    }

    served
}
