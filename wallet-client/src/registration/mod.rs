//! # Identity Registration
//!
//! Provisioning pipelines built on the CA client and the provisioner:
//! 1. Admin bootstrap: enroll with the pre-shared admin secret, store
//! 2. User onboarding: register (as admin) → enroll with the returned
//!    secret → store
//!
//! Each step consumes the previous step's output. An identity already in
//! the wallet short-circuits the pipeline with [`ProvisionOutcome::AlreadyPresent`].

use std::sync::Arc;
use tracing::{info, warn};

use shared::{
    config::AdminCredentials,
    error::{WalletError, WalletResult},
    types::{Enrollment, Identity, RegistrationRequest},
};

use crate::ca::CaClient;
use crate::identity::IdentityProvisioner;

/// Result of a provisioning pipeline that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The label was already in the wallet; nothing was done
    AlreadyPresent(String),

    /// A new identity was enrolled and stored
    Provisioned(Identity),
}

impl ProvisionOutcome {
    pub fn is_provisioned(&self) -> bool {
        matches!(self, ProvisionOutcome::Provisioned(_))
    }
}

/// Enrolls the bootstrap admin and registers users
pub struct Registrar {
    /// Writes identities into the wallet
    provisioner: IdentityProvisioner,

    /// Certificate authority
    ca: Arc<dyn CaClient>,

    /// MSP ID stamped on every provisioned identity
    msp_id: String,
}

impl Registrar {
    /// Create a new Registrar
    pub fn new(provisioner: IdentityProvisioner, ca: Arc<dyn CaClient>, msp_id: impl Into<String>) -> Self {
        Self {
            provisioner,
            ca,
            msp_id: msp_id.into(),
        }
    }

    /// Enroll the admin with its pre-shared secret and store it under its
    /// enrollment ID
    pub async fn enroll_admin(&self, admin: &AdminCredentials) -> WalletResult<ProvisionOutcome> {
        let label = admin.enrollment_id.as_str();
        let store = self.provisioner.store();

        if store.exists(label).await? {
            info!(label = %label, "Admin identity already in wallet");
            return Ok(ProvisionOutcome::AlreadyPresent(label.to_string()));
        }

        let enrollment = self
            .ca
            .enroll(&admin.enrollment_id, &admin.enrollment_secret)
            .await?;

        let identity = self.store_enrollment(label, &enrollment).await?;

        info!(label = %label, "Admin enrolled");
        Ok(ProvisionOutcome::Provisioned(identity))
    }

    /// Register `request.enrollment_id` acting as `admin_label`, enroll it
    /// and store it under the enrollment ID
    ///
    /// Fails with `NotFound` if the admin identity is not in the wallet.
    pub async fn register_user(
        &self,
        request: &RegistrationRequest,
        admin_label: &str,
    ) -> WalletResult<ProvisionOutcome> {
        let label = request.enrollment_id.as_str();
        let store = self.provisioner.store();

        if store.exists(label).await? {
            info!(label = %label, "User identity already in wallet");
            return Ok(ProvisionOutcome::AlreadyPresent(label.to_string()));
        }

        let admin = match store.get(admin_label).await {
            Ok(admin) => admin,
            Err(WalletError::NotFound(_)) => {
                return Err(WalletError::NotFound(format!(
                    "{} (enroll the admin before registering users)",
                    admin_label
                )));
            }
            Err(e) => return Err(e),
        };

        let secret = self.ca.register(request, &admin).await?;

        // The ID now exists at the CA; from here on a failure needs manual cleanup
        let enrollment = match self.ca.enroll(label, &secret).await {
            Ok(enrollment) => enrollment,
            Err(e) => {
                warn!(label = %label, error = %e, "Registered at the CA but enrollment failed");
                return Err(WalletError::PartialProvisioning {
                    label: label.to_string(),
                    reason: format!("registered at the CA but not enrolled: {}", e),
                });
            }
        };
        let identity = self.store_enrollment(label, &enrollment).await?;

        info!(
            label = %label,
            affiliation = %request.affiliation,
            role = %request.role,
            "User registered and enrolled"
        );
        Ok(ProvisionOutcome::Provisioned(identity))
    }

    /// Store a fresh enrollment; any failure other than a lost race on the
    /// label leaves a CA-side enrollment without a local identity
    async fn store_enrollment(&self, label: &str, enrollment: &Enrollment) -> WalletResult<Identity> {
        match self
            .provisioner
            .provision_from_enrollment(label, &self.msp_id, enrollment)
            .await
        {
            Ok(identity) => Ok(identity),
            Err(WalletError::AlreadyExists(label)) => Err(WalletError::AlreadyExists(label)),
            Err(e) => {
                warn!(label = %label, error = %e, "Enrolled at the CA but could not store identity");
                Err(WalletError::PartialProvisioning {
                    label: label.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
