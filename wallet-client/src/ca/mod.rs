//! # Certificate Authority Client
//!
//! The two CA operations provisioning depends on:
//! - `enroll`: exchange an enrollment ID/secret for a signed certificate
//! - `register`: create a new enrollment ID under a registrar's authority
//!
//! [`FabricCaClient`] talks to a Fabric CA server over its REST API.

mod fabric;
mod token;

use async_trait::async_trait;

use shared::{
    error::WalletResult,
    types::{Enrollment, Identity, RegistrationRequest},
};

pub use fabric::FabricCaClient;
pub use token::authorization_token;

/// Enrollment and registration against a certificate authority
#[async_trait]
pub trait CaClient: Send + Sync {
    /// Exchange an enrollment secret for a certificate and private key
    ///
    /// Fails with `Authentication` for a wrong secret and with a
    /// network-class error for transport failures or timeouts.
    async fn enroll(&self, enrollment_id: &str, enrollment_secret: &str)
        -> WalletResult<Enrollment>;

    /// Register a new enrollment ID, returning its enrollment secret
    ///
    /// `registrar` must hold registrar rights at the CA (`Authorization`
    /// otherwise). A taken enrollment ID fails with `AlreadyExists`.
    async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &Identity,
    ) -> WalletResult<String>;
}
