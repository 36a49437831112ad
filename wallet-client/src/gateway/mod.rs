//! # Network Connector
//!
//! Opens a gateway session as a wallet identity and hands back a
//! [`ConnectionHandle`] bound to one contract on one channel:
//! 1. Identity lookup in the credential store (no network I/O on a miss)
//! 2. Session open against the profile's bootstrap peers
//! 3. Peer discovery (optionally rewritten to localhost)
//! 4. Contract resolution on the channel
//!
//! A failure after step 2 closes the session before the error is returned.

pub mod discovery;
pub mod http;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use shared::{
    config::{DiscoveryConfig, GatewayConfig},
    error::{WalletError, WalletResult},
    profile::{ConnectionProfile, PeerEndpoint},
    types::Identity,
};

use crate::storage::CredentialStore;

pub use discovery::rewrite_as_localhost;
pub use http::HttpGatewayTransport;

// =============================================================================
// TRANSPORT SEAM
// =============================================================================

/// A contract call as sent over a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Channel name
    pub channel: String,

    /// Contract name
    pub contract: String,

    /// Contract function
    pub function: String,

    /// Function arguments
    pub args: Vec<String>,

    /// URLs of the peers to route the call to
    pub peers: Vec<String>,
}

/// Opens sessions to a ledger network
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Open a session authenticated as `identity` via the bootstrap peers
    ///
    /// Peers are tried in order. The connector allows one call timeout per
    /// peer, so implementations should bound each attempt by that timeout.
    async fn open(
        &self,
        identity: &Identity,
        bootstrap: &[PeerEndpoint],
    ) -> WalletResult<Box<dyn GatewaySession>>;
}

/// One open gateway session
#[async_trait]
pub trait GatewaySession: Send + Sync {
    /// Session identifier
    fn id(&self) -> &str;

    /// Peers the network reports for `channel`
    async fn discover(&self, channel: &str) -> WalletResult<Vec<PeerEndpoint>>;

    /// Check that `contract` is deployed on `channel`
    async fn resolve_contract(&self, channel: &str, contract: &str) -> WalletResult<()>;

    /// Submit a ledger-mutating transaction
    async fn submit(&self, request: &TransactionRequest) -> WalletResult<String>;

    /// Evaluate a read-only query
    async fn evaluate(&self, request: &TransactionRequest) -> WalletResult<String>;

    /// Release the session
    async fn close(&self) -> WalletResult<()>;
}

async fn bounded<T>(
    timeout: Duration,
    endpoint: &str,
    call: impl Future<Output = WalletResult<T>>,
) -> WalletResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(WalletError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_secs: timeout.as_secs(),
        }),
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Connects wallet identities to contracts
pub struct NetworkConnector {
    transport: Arc<dyn GatewayTransport>,
    discovery: DiscoveryConfig,
    timeout: Duration,
}

impl NetworkConnector {
    /// Create a new NetworkConnector
    pub fn new(transport: Arc<dyn GatewayTransport>, discovery: DiscoveryConfig, timeout: Duration) -> Self {
        Self {
            transport,
            discovery,
            timeout,
        }
    }

    /// Create a connector with the discovery and timeout settings of `config`
    pub fn from_config(transport: Arc<dyn GatewayTransport>, config: &GatewayConfig) -> Self {
        Self::new(
            transport,
            config.discovery,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Open a connection to `contract` on `channel` as the identity stored
    /// under `label`
    pub async fn connect(
        &self,
        profile: &ConnectionProfile,
        store: &dyn CredentialStore,
        label: &str,
        channel: &str,
        contract: &str,
    ) -> WalletResult<ConnectionHandle> {
        let identity = store.get(label).await?;
        let bootstrap = profile.bootstrap_peers()?;
        let endpoint = bootstrap
            .first()
            .map(|peer| peer.url.clone())
            .unwrap_or_default();

        info!(
            label = %label,
            channel = %channel,
            contract = %contract,
            peers = bootstrap.len(),
            "Opening gateway session"
        );

        // Each bootstrap peer gets its own timeout
        let open_budget = self.timeout * bootstrap.len().max(1) as u32;
        let session: Arc<dyn GatewaySession> = Arc::from(
            bounded(open_budget, &endpoint, self.transport.open(&identity, &bootstrap)).await?,
        );

        match self
            .resolve(session.as_ref(), &endpoint, channel, contract, bootstrap)
            .await
        {
            Ok(peers) => {
                info!(
                    session = %session.id(),
                    channel = %channel,
                    contract = %contract,
                    peers = peers.len(),
                    "Gateway connection established"
                );
                Ok(ConnectionHandle {
                    session: Mutex::new(Some(session)),
                    endpoint,
                    channel: channel.to_string(),
                    contract: contract.to_string(),
                    peers,
                    timeout: self.timeout,
                })
            }
            Err(e) => {
                warn!(session = %session.id(), error = %e, "Connection failed, closing session");
                if let Err(close_err) = bounded(self.timeout, &endpoint, session.close()).await {
                    warn!(session = %session.id(), error = %close_err, "Session close failed");
                }
                Err(e)
            }
        }
    }

    /// Discovery then contract resolution on an open session
    async fn resolve(
        &self,
        session: &dyn GatewaySession,
        endpoint: &str,
        channel: &str,
        contract: &str,
        bootstrap: Vec<PeerEndpoint>,
    ) -> WalletResult<Vec<PeerEndpoint>> {
        let peers = if self.discovery.enabled {
            let discovered = bounded(self.timeout, endpoint, session.discover(channel)).await?;
            if discovered.is_empty() {
                return Err(WalletError::network(
                    endpoint,
                    format!("discovery found no peers on channel '{}'", channel),
                ));
            }
            if self.discovery.as_localhost {
                rewrite_as_localhost(discovered)
            } else {
                discovered
            }
        } else {
            bootstrap
        };

        bounded(self.timeout, endpoint, session.resolve_contract(channel, contract)).await?;

        Ok(peers)
    }
}

// =============================================================================
// CONNECTION HANDLE
// =============================================================================

/// An open connection to one contract
///
/// Call [`ConnectionHandle::close`] when done. A handle dropped while still
/// open schedules a best-effort close on the current runtime.
pub struct ConnectionHandle {
    session: Mutex<Option<Arc<dyn GatewaySession>>>,
    endpoint: String,
    channel: String,
    contract: String,
    peers: Vec<PeerEndpoint>,
    timeout: Duration,
}

impl ConnectionHandle {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn contract_name(&self) -> &str {
        &self.contract
    }

    /// Peers calls are routed to
    pub fn peers(&self) -> &[PeerEndpoint] {
        &self.peers
    }

    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Submit `function(args)` as a ledger-mutating transaction
    pub async fn submit_transaction(&self, function: &str, args: &[String]) -> WalletResult<String> {
        let session = self.open_session()?;
        let request = self.request(function, args);
        debug!(function = %function, args = args.len(), "Submitting transaction");
        bounded(self.timeout, &self.endpoint, session.submit(&request)).await
    }

    /// Evaluate `function(args)` as a read-only query
    pub async fn evaluate_transaction(&self, function: &str, args: &[String]) -> WalletResult<String> {
        let session = self.open_session()?;
        let request = self.request(function, args);
        debug!(function = %function, args = args.len(), "Evaluating transaction");
        bounded(self.timeout, &self.endpoint, session.evaluate(&request)).await
    }

    /// Close the session; later calls fail and a second close is a no-op
    pub async fn close(&self) -> WalletResult<()> {
        let session = self.session.lock().take();
        match session {
            Some(session) => {
                info!(session = %session.id(), "Closing gateway connection");
                bounded(self.timeout, &self.endpoint, session.close()).await
            }
            None => Ok(()),
        }
    }

    fn open_session(&self) -> WalletResult<Arc<dyn GatewaySession>> {
        self.session.lock().clone().ok_or_else(|| {
            WalletError::TransactionError(format!(
                "connection to '{}' on '{}' is closed",
                self.contract, self.channel
            ))
        })
    }

    fn request(&self, function: &str, args: &[String]) -> TransactionRequest {
        TransactionRequest {
            channel: self.channel.clone(),
            contract: self.contract.clone(),
            function: function.to_string(),
            args: args.to_vec(),
            peers: self.peers.iter().map(|peer| peer.url.clone()).collect(),
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        let Some(session) = self.session.get_mut().take() else {
            return;
        };

        warn!(session = %session.id(), "Connection handle dropped without close");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let timeout = self.timeout;
                let endpoint = std::mem::take(&mut self.endpoint);
                runtime.spawn(async move {
                    if let Err(e) = bounded(timeout, &endpoint, session.close()).await {
                        warn!(session = %session.id(), error = %e, "Background session close failed");
                    }
                });
            }
            Err(_) => warn!(session = %session.id(), "No runtime to close session on"),
        }
    }
}
