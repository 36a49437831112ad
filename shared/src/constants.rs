//! # Constants for the Ledger Wallet System
//!
//! Defaults for the wallet, the certificate authority and the gateway
//! connection, matching the layout of a local two-organization test network.

// =============================================================================
// IDENTITY DEFAULTS
// =============================================================================

/// MSP ID of the default organization
pub const DEFAULT_MSP_ID: &str = "Org1MSP";

/// Label under which the bootstrap administrator is stored
pub const ADMIN_LABEL: &str = "admin";

/// Label of the default application user
pub const DEFAULT_USER_LABEL: &str = "userHsc";

/// Pre-shared enrollment secret of the bootstrap administrator
pub const DEFAULT_ADMIN_SECRET: &str = "adminpw";

/// Affiliation new users are registered under
pub const DEFAULT_AFFILIATION: &str = "org1.department1";

/// Role new users are registered with
pub const DEFAULT_USER_ROLE: &str = "client";

/// Identity type written into every wallet entry
pub const IDENTITY_TYPE_X509: &str = "X.509";

/// Version of the on-disk identity format
pub const IDENTITY_FORMAT_VERSION: u32 = 1;

// =============================================================================
// WALLET STORAGE
// =============================================================================

/// Default wallet directory (relative to the working directory)
pub const DEFAULT_WALLET_PATH: &str = "../wallet";

/// File extension of a stored identity
pub const IDENTITY_FILE_EXTENSION: &str = "id";

/// Prefix of in-flight temporary files inside the wallet directory
pub const TEMP_FILE_PREFIX: &str = ".tmp-";

/// Longest accepted label in bytes, so `<label>.id` fits common file name limits
pub const MAX_LABEL_LENGTH: usize = 200;

// =============================================================================
// CERTIFICATE AUTHORITY
// =============================================================================

/// Name of the default CA entry in the connection profile
pub const DEFAULT_CA_NAME: &str = "ca.org1.example.com";

/// Fabric CA enroll endpoint
pub const CA_ENROLL_PATH: &str = "/api/v1/enroll";

/// Fabric CA register endpoint
pub const CA_REGISTER_PATH: &str = "/api/v1/register";

/// Enrollment count for newly registered identities (-1 = unlimited)
pub const CA_DEFAULT_MAX_ENROLLMENTS: i32 = -1;

/// Timeout for a single CA call (seconds)
pub const CA_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// GATEWAY
// =============================================================================

/// Default connection profile path
pub const DEFAULT_PROFILE_PATH: &str = "../network/connection-org1.json";

/// Default channel
pub const DEFAULT_CHANNEL: &str = "mychannel";

/// Default contract (chaincode) name
pub const DEFAULT_CONTRACT: &str = "mycc";

/// Timeout for a single gateway call (seconds)
pub const GATEWAY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// REST FACADE
// =============================================================================

/// Default REST facade port
pub const FACADE_PORT: u16 = 3000;

/// Transaction invoked by `POST /setData`
pub const DEFAULT_SUBMIT_FUNCTION: &str = "invoke";

/// Transaction evaluated by `GET /getData/:key`
pub const DEFAULT_QUERY_FUNCTION: &str = "query";

/// Maximum request body size (64 KB)
pub const MAX_REQUEST_BODY_SIZE: usize = 64 * 1024;

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

/// Wallet directory
pub const ENV_WALLET_PATH: &str = "WALLET_PATH";

/// Connection profile path
pub const ENV_CONNECTION_PROFILE: &str = "CONNECTION_PROFILE";

/// MSP ID for provisioned identities
pub const ENV_MSP_ID: &str = "FABRIC_MSP_ID";

/// CA entry name in the connection profile
pub const ENV_CA_NAME: &str = "FABRIC_CA_NAME";

/// Admin enrollment ID
pub const ENV_ADMIN_ID: &str = "FABRIC_ADMIN_ID";

/// Admin enrollment secret
pub const ENV_ADMIN_SECRET: &str = "FABRIC_ADMIN_SECRET";

/// Channel name
pub const ENV_CHANNEL: &str = "FABRIC_CHANNEL";

/// Contract name
pub const ENV_CONTRACT: &str = "FABRIC_CONTRACT";

/// Wallet label used to connect to the gateway
pub const ENV_IDENTITY: &str = "FABRIC_IDENTITY";

/// REST facade port
pub const ENV_FACADE_PORT: &str = "FACADE_PORT";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// File name of the identity stored under `label`
pub fn identity_file_name(label: &str) -> String {
    format!("{}.{}", label, IDENTITY_FILE_EXTENSION)
}
