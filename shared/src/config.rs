//! # Configuration for the Ledger Wallet System
//!
//! Immutable configuration structs passed explicitly to each component.
//! Values come from defaults, then environment variables, then CLI flags.

use crate::constants::*;
use crate::error::{WalletError, WalletResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// WALLET CONFIGURATION
// =============================================================================

/// Location of the file-based wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Wallet directory
    pub path: PathBuf,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_WALLET_PATH),
        }
    }
}

// =============================================================================
// CERTIFICATE AUTHORITY CONFIGURATION
// =============================================================================

/// Which CA to talk to and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaConfig {
    /// Name of the CA entry in the connection profile
    pub name: String,

    /// Override the profile's `httpOptions.verify`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,

    /// Timeout for a single CA call in seconds
    pub timeout_secs: u64,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CA_NAME.into(),
            verify_tls: None,
            timeout_secs: CA_TIMEOUT_SECS,
        }
    }
}

/// Pre-shared bootstrap credential of the CA administrator
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    /// Enrollment ID (also used as the wallet label)
    pub enrollment_id: String,

    /// Enrollment secret
    #[serde(skip_serializing)]
    pub enrollment_secret: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            enrollment_id: ADMIN_LABEL.into(),
            enrollment_secret: DEFAULT_ADMIN_SECRET.into(),
        }
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("enrollment_id", &self.enrollment_id)
            .field("enrollment_secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// GATEWAY CONFIGURATION
// =============================================================================

/// Peer discovery settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Ask the network for the channel's peers
    pub enabled: bool,

    /// Rewrite discovered hosts to localhost (for a network running in
    /// local containers)
    pub as_localhost: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            as_localhost: true,
        }
    }
}

/// How to open a contract connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Connection profile path
    pub profile_path: PathBuf,

    /// Wallet label to connect as
    pub identity: String,

    /// Channel name
    pub channel: String,

    /// Contract name
    pub contract: String,

    /// Discovery settings
    pub discovery: DiscoveryConfig,

    /// Timeout for a single gateway call in seconds
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            profile_path: PathBuf::from(DEFAULT_PROFILE_PATH),
            identity: DEFAULT_USER_LABEL.into(),
            channel: DEFAULT_CHANNEL.into(),
            contract: DEFAULT_CONTRACT.into(),
            discovery: DiscoveryConfig::default(),
            timeout_secs: GATEWAY_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    /// Validate the gateway configuration
    pub fn validate(&self) -> WalletResult<()> {
        if self.identity.trim().is_empty() {
            return Err(WalletError::ConfigurationError("gateway identity is empty".into()));
        }
        if self.channel.trim().is_empty() {
            return Err(WalletError::ConfigurationError("channel name is empty".into()));
        }
        if self.contract.trim().is_empty() {
            return Err(WalletError::ConfigurationError("contract name is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(WalletError::ConfigurationError(
                "gateway timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// CLIENT (CLI) CONFIGURATION
// =============================================================================

/// Configuration for the provisioning CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Wallet configuration
    pub wallet: WalletConfig,

    /// Connection profile path (source of the CA endpoint)
    pub profile_path: PathBuf,

    /// MSP ID stamped on provisioned identities
    pub msp_id: String,

    /// CA configuration
    pub ca: CaConfig,

    /// Bootstrap administrator
    pub admin: AdminCredentials,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            wallet: WalletConfig::default(),
            profile_path: PathBuf::from(DEFAULT_PROFILE_PATH),
            msp_id: DEFAULT_MSP_ID.into(),
            ca: CaConfig::default(),
            admin: AdminCredentials::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> WalletResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = env::var(ENV_WALLET_PATH) {
            config.wallet.path = PathBuf::from(path);
        }
        if let Ok(path) = env::var(ENV_CONNECTION_PROFILE) {
            config.profile_path = PathBuf::from(path);
        }
        if let Ok(msp_id) = env::var(ENV_MSP_ID) {
            config.msp_id = msp_id;
        }
        if let Ok(name) = env::var(ENV_CA_NAME) {
            config.ca.name = name;
        }
        if let Ok(id) = env::var(ENV_ADMIN_ID) {
            config.admin.enrollment_id = id;
        }
        if let Ok(secret) = env::var(ENV_ADMIN_SECRET) {
            config.admin.enrollment_secret = secret;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> WalletResult<()> {
        if self.msp_id.trim().is_empty() {
            return Err(WalletError::ConfigurationError("MSP ID is empty".into()));
        }
        if self.admin.enrollment_id.trim().is_empty() {
            return Err(WalletError::ConfigurationError("admin enrollment ID is empty".into()));
        }
        if self.admin.enrollment_secret.is_empty() {
            return Err(WalletError::MissingEnvVar(ENV_ADMIN_SECRET.into()));
        }
        if self.ca.timeout_secs == 0 {
            return Err(WalletError::ConfigurationError(
                "CA timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// REST FACADE CONFIGURATION
// =============================================================================

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: FACADE_PORT,
            max_body_size: MAX_REQUEST_BODY_SIZE,
        }
    }
}

impl ApiConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for the REST facade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacadeConfig {
    /// HTTP server
    pub api: ApiConfig,

    /// Wallet holding the connecting identity
    pub wallet: WalletConfig,

    /// Contract connection
    pub gateway: GatewayConfig,

    /// Transaction submitted by `POST /setData`
    pub submit_function: String,

    /// Transaction evaluated by `GET /getData/:key`
    pub query_function: String,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            wallet: WalletConfig::default(),
            gateway: GatewayConfig::default(),
            submit_function: DEFAULT_SUBMIT_FUNCTION.into(),
            query_function: DEFAULT_QUERY_FUNCTION.into(),
        }
    }
}

impl FacadeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> WalletResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = env::var(ENV_WALLET_PATH) {
            config.wallet.path = PathBuf::from(path);
        }
        if let Ok(path) = env::var(ENV_CONNECTION_PROFILE) {
            config.gateway.profile_path = PathBuf::from(path);
        }
        if let Ok(identity) = env::var(ENV_IDENTITY) {
            config.gateway.identity = identity;
        }
        if let Ok(channel) = env::var(ENV_CHANNEL) {
            config.gateway.channel = channel;
        }
        if let Ok(contract) = env::var(ENV_CONTRACT) {
            config.gateway.contract = contract;
        }
        if let Ok(port) = env::var(ENV_FACADE_PORT) {
            config.api.port = port.parse().map_err(|_| {
                WalletError::ConfigurationError(format!("invalid {}: '{}'", ENV_FACADE_PORT, port))
            })?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> WalletResult<()> {
        self.gateway.validate()?;
        if self.submit_function.trim().is_empty() || self.query_function.trim().is_empty() {
            return Err(WalletError::ConfigurationError(
                "transaction function names must not be empty".into(),
            ));
        }
        Ok(())
    }
}
