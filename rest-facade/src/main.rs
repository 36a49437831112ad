//! # REST Facade Service
//!
//! Connects one wallet identity to one contract and serves it over HTTP.
//!
//! ## Running
//!
//! ```bash
//! export WALLET_PATH=../wallet
//! export CONNECTION_PROFILE=../network/connection-org1.json
//! export FABRIC_IDENTITY=userHsc
//! export FABRIC_CHANNEL=mychannel
//! export FABRIC_CONTRACT=mycc
//!
//! rest-facade
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /` - Liveness
//! - `POST /setData` - Submit a transaction
//! - `GET /getData/:key` - Query a key

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rest_facade::AppState;
use shared::{config::FacadeConfig, profile::ConnectionProfile};
use wallet_client::{FileSystemWallet, HttpGatewayTransport, NetworkConnector};

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting REST facade");
    info!("Version: {}", shared::VERSION);

    let config = FacadeConfig::from_env()?;
    config.validate()?;

    info!(
        wallet = %config.wallet.path.display(),
        profile = %config.gateway.profile_path.display(),
        identity = %config.gateway.identity,
        channel = %config.gateway.channel,
        contract = %config.gateway.contract,
        "Configuration loaded"
    );

    let profile = ConnectionProfile::from_file(&config.gateway.profile_path)?;
    let wallet = FileSystemWallet::new(&config.wallet).await?;

    // Bind before connecting so a busy port never strands an open session
    let bind_addr = config.api.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;

    let transport = HttpGatewayTransport::new(Duration::from_secs(config.gateway.timeout_secs));
    let connector = NetworkConnector::from_config(Arc::new(transport), &config.gateway);
    let connection = connector
        .connect(
            &profile,
            &wallet,
            &config.gateway.identity,
            &config.gateway.channel,
            &config.gateway.contract,
        )
        .await
        .with_context(|| {
            format!(
                "cannot connect as '{}' (run 'wallet-client register-user' first if it is missing)",
                config.gateway.identity
            )
        })?;

    let state = Arc::new(AppState { config, connection });

    info!("Server running at http://{}", bind_addr);

    rest_facade::serve(listener, state, shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
