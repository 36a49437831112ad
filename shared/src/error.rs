//! # Error Types for the Ledger Wallet System
//!
//! A single error taxonomy shared by the wallet, the CA client, the
//! gateway connector and the REST facade. Components return these errors
//! to their caller; only binaries decide whether to log and exit.

use thiserror::Error;

/// Main error type for the entire system
#[derive(Error, Debug)]
pub enum WalletError {
    // =========================================================================
    // WALLET ERRORS
    // =========================================================================

    /// No identity is stored under the label
    #[error("Identity not found: {0}")]
    NotFound(String),

    /// The label (or CA enrollment ID) is already taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Label is empty or cannot be used as a storage key
    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    /// Identity fields failed validation
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Local file read/write failure
    #[error("I/O error: {0}")]
    Io(String),

    // =========================================================================
    // CERTIFICATE AUTHORITY ERRORS
    // =========================================================================

    /// CA rejected the enrollment ID/secret
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Acting identity lacks registrar rights
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// CA enrollment succeeded but the identity could not be stored
    #[error("Partial provisioning of '{label}': {reason}")]
    PartialProvisioning { label: String, reason: String },

    // =========================================================================
    // NETWORK ERRORS
    // =========================================================================

    /// Transport failure talking to the CA or the ledger network
    #[error("Network error at '{endpoint}': {reason}")]
    Network { endpoint: String, reason: String },

    /// A CA or gateway call did not complete in time
    #[error("Request to '{endpoint}' timed out after {timeout_secs} seconds")]
    Timeout { endpoint: String, timeout_secs: u64 },

    /// Contract invocation was rejected by the network
    #[error("Transaction failed: {0}")]
    TransactionError(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================

    /// Connection profile is unreadable or incomplete
    #[error("Connection profile error: {0}")]
    ProfileError(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Missing required environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // =========================================================================
    // GENERIC ERRORS
    // =========================================================================

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias using WalletError
pub type WalletResult<T> = Result<T, WalletError>;

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::Io(err.to_string())
    }
}

impl From<base64::DecodeError> for WalletError {
    fn from(err: base64::DecodeError) -> Self {
        WalletError::SerializationError(err.to_string())
    }
}

// =============================================================================
// ERROR CATEGORIES (for logging)
// =============================================================================

impl WalletError {
    /// Build a network error for `endpoint`
    pub fn network(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        WalletError::Network {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            WalletError::NotFound(_)
            | WalletError::AlreadyExists(_)
            | WalletError::InvalidLabel { .. }
            | WalletError::InvalidIdentity(_)
            | WalletError::Io(_) => "wallet",

            WalletError::Authentication(_)
            | WalletError::Authorization(_)
            | WalletError::PartialProvisioning { .. } => "ca",

            WalletError::Network { .. }
            | WalletError::Timeout { .. }
            | WalletError::TransactionError(_) => "network",

            WalletError::ProfileError(_)
            | WalletError::ConfigurationError(_)
            | WalletError::MissingEnvVar(_) => "config",

            WalletError::SerializationError(_) | WalletError::InternalError(_) => "internal",
        }
    }

    /// Network-class failure (a timeout counts as one)
    pub fn is_network(&self) -> bool {
        matches!(self, WalletError::Network { .. } | WalletError::Timeout { .. })
    }

    /// Check if the error is worth retrying by the caller
    ///
    /// Nothing in this workspace retries automatically.
    pub fn is_retryable(&self) -> bool {
        self.is_network()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = WalletError::NotFound("admin".into());
        assert_eq!(err.category(), "wallet");

        let err = WalletError::Authorization("not a registrar".into());
        assert_eq!(err.category(), "ca");

        let err = WalletError::Timeout {
            endpoint: "https://localhost:7054".into(),
            timeout_secs: 30,
        };
        assert_eq!(err.category(), "network");
    }

    #[test]
    fn test_timeout_is_network_error() {
        let err = WalletError::Timeout {
            endpoint: "peer0".into(),
            timeout_secs: 5,
        };
        assert!(err.is_network());
        assert!(err.is_retryable());

        let err = WalletError::AlreadyExists("admin".into());
        assert!(!err.is_network());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing cert");
        let err: WalletError = io.into();
        assert!(matches!(err, WalletError::Io(_)));
    }
}
