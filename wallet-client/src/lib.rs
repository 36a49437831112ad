//! # Fabric Wallet Client
//!
//! Client-side identity management for a Hyperledger Fabric network:
//! - Label-keyed credential store (directory wallet or in-memory)
//! - Identity provisioning from PEM files or CA enrollments
//! - Fabric CA enroll and register
//! - Admin bootstrap and user onboarding pipelines
//! - Gateway connections bound to one contract on one channel

pub mod ca;
pub mod gateway;
pub mod identity;
pub mod registration;
pub mod storage;

// Re-export commonly used types
pub use ca::{CaClient, FabricCaClient};
pub use gateway::{
    ConnectionHandle, GatewaySession, GatewayTransport, HttpGatewayTransport, NetworkConnector,
    TransactionRequest,
};
pub use identity::IdentityProvisioner;
pub use registration::{ProvisionOutcome, Registrar};
pub use storage::{CredentialStore, FileSystemWallet, InMemoryWallet};
