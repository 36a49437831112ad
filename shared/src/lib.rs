//! # Shared Module for the Ledger Wallet System
//!
//! Common types, errors and configuration used by the wallet client
//! (identity provisioning and gateway connection) and the REST facade.
//!
//! ## Architecture
//!
//! - **Identities** are X.509 certificate + private key pairs tagged with
//!   the MSP ID of the issuing organization
//! - **Wallets** persist identities by label
//! - **Connection profiles** describe the CA and peer endpoints of the
//!   network an application connects to

pub mod config;
pub mod constants;
pub mod error;
pub mod profile;
pub mod types;

// Re-exports for convenience
pub use config::*;
pub use constants::*;
pub use error::*;
pub use profile::*;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
