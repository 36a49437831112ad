//! Fabric CA REST client.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use shared::{
    config::CaConfig,
    constants::{CA_ENROLL_PATH, CA_REGISTER_PATH},
    error::{WalletError, WalletResult},
    profile::ConnectionProfile,
    types::{Enrollment, Identity, RegistrationRequest},
};

use super::{token::authorization_token, CaClient};

/// Client for a Fabric CA server
pub struct FabricCaClient {
    /// CA base URL without trailing slash
    url: String,

    /// CA name inside the server (multi-CA servers)
    ca_name: Option<String>,

    /// HTTP client
    http_client: reqwest::Client,

    /// Per-call timeout
    timeout: Duration,
}

#[derive(Serialize)]
struct EnrollBody<'a> {
    certificate_request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caname: Option<&'a str>,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    id: &'a str,
    affiliation: &'a str,
    #[serde(rename = "type")]
    role: &'a str,
    max_enrollments: i32,
    attrs: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caname: Option<&'a str>,
}

/// Envelope of every Fabric CA response
#[derive(Deserialize)]
struct CaResponse<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CaMessage>,
}

#[derive(Deserialize)]
struct CaMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct EnrollResult {
    #[serde(rename = "Cert")]
    cert: String,
}

#[derive(Deserialize)]
struct RegisterResult {
    secret: String,
}

/// Which CA operation a failed response belongs to
#[derive(Clone, Copy)]
enum Operation {
    Enroll,
    Register,
}

impl FabricCaClient {
    /// Create a client for the CA at `url`
    ///
    /// `tls_roots` are trusted PEM certificates; with `verify_tls` false the
    /// server certificate is not checked.
    pub fn new(
        url: &str,
        ca_name: Option<String>,
        tls_roots: &[&str],
        verify_tls: bool,
        config: &CaConfig,
    ) -> WalletResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!verify_tls);

        for pem in tls_roots {
            let cert = reqwest::Certificate::from_pem(pem.as_bytes()).map_err(|e| {
                WalletError::ProfileError(format!("invalid CA TLS root certificate: {}", e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http_client = builder
            .build()
            .map_err(|e| WalletError::InternalError(e.to_string()))?;

        info!(url = %url, ca_name = ?ca_name, verify_tls, "CA client created");

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            ca_name,
            http_client,
            timeout,
        })
    }

    /// Create a client for the profile's CA entry named in `config`
    pub fn from_profile(profile: &ConnectionProfile, config: &CaConfig) -> WalletResult<Self> {
        let ca = profile.certificate_authority(&config.name)?;
        let verify_tls = config.verify_tls.unwrap_or_else(|| ca.verify_tls());

        Self::new(
            &ca.url,
            ca.ca_name.clone(),
            &ca.tls_roots(),
            verify_tls,
            config,
        )
    }

    /// CA base URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run `call` under the per-call timeout
    async fn bounded<T>(&self, call: impl Future<Output = WalletResult<T>>) -> WalletResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error()),
        }
    }

    fn timeout_error(&self) -> WalletError {
        WalletError::Timeout {
            endpoint: self.url.clone(),
            timeout_secs: self.timeout.as_secs(),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> WalletError {
        if err.is_timeout() {
            self.timeout_error()
        } else {
            WalletError::network(&self.url, err)
        }
    }

    /// Decode a CA response, mapping failures onto the error taxonomy
    async fn read_response<T: DeserializeOwned>(
        &self,
        operation: Operation,
        subject: &str,
        response: reqwest::Response,
    ) -> WalletResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        let parsed: Option<CaResponse<T>> = serde_json::from_str(&body).ok();
        let message = parsed
            .as_ref()
            .map(|r| {
                r.errors
                    .iter()
                    .map(|m| format!("[{}] {}", m.code, m.message))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        if status.is_success() {
            if let Some(CaResponse {
                success: true,
                result: Some(result),
                ..
            }) = parsed
            {
                return Ok(result);
            }
        }

        warn!(status = %status, subject = %subject, error = %message, "CA request failed");
        Err(classify_failure(operation, status, subject, &self.url, message))
    }
}

fn classify_failure(
    operation: Operation,
    status: StatusCode,
    subject: &str,
    endpoint: &str,
    message: String,
) -> WalletError {
    if message.to_lowercase().contains("already registered") {
        return WalletError::AlreadyExists(format!("enrollment ID '{}' at the CA", subject));
    }

    match (operation, status) {
        (Operation::Enroll, StatusCode::UNAUTHORIZED) => {
            WalletError::Authentication(format!("enrollment of '{}' rejected: {}", subject, message))
        }
        (Operation::Register, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            WalletError::Authorization(format!(
                "registration of '{}' rejected: {}",
                subject, message
            ))
        }
        _ => WalletError::Network {
            endpoint: endpoint.to_string(),
            reason: format!("CA returned {}: {}", status, message),
        },
    }
}

/// Fresh P-256 key pair and a PKCS#10 request for `common_name`
fn generate_csr(common_name: &str) -> WalletResult<(KeyPair, String)> {
    let key_pair = KeyPair::generate().map_err(|e| WalletError::InternalError(e.to_string()))?;

    let mut params = CertificateParams::new(Vec::<String>::new())
        .map_err(|e| WalletError::InternalError(e.to_string()))?;
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    params.distinguished_name = name;

    let csr = params
        .serialize_request(&key_pair)
        .and_then(|request| request.pem())
        .map_err(|e| WalletError::InternalError(format!("CSR generation failed: {}", e)))?;

    Ok((key_pair, csr))
}

#[async_trait]
impl CaClient for FabricCaClient {
    async fn enroll(
        &self,
        enrollment_id: &str,
        enrollment_secret: &str,
    ) -> WalletResult<Enrollment> {
        info!(enrollment_id = %enrollment_id, ca = %self.url, "Enrolling");

        let (key_pair, csr) = generate_csr(enrollment_id)?;
        let body = EnrollBody {
            certificate_request: &csr,
            caname: self.ca_name.as_deref(),
        };

        let result: EnrollResult = self
            .bounded(async {
                let response = self
                    .http_client
                    .post(format!("{}{}", self.url, CA_ENROLL_PATH))
                    .basic_auth(enrollment_id, Some(enrollment_secret))
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| self.transport_error(e))?;

                self.read_response(Operation::Enroll, enrollment_id, response)
                    .await
            })
            .await?;

        let certificate = String::from_utf8(STANDARD.decode(result.cert.trim())?)
            .map_err(|_| WalletError::SerializationError("CA certificate is not PEM text".into()))?;

        debug!(enrollment_id = %enrollment_id, "Enrollment certificate received");

        Ok(Enrollment {
            certificate,
            private_key: key_pair.serialize_pem(),
        })
    }

    async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &Identity,
    ) -> WalletResult<String> {
        info!(
            enrollment_id = %request.enrollment_id,
            affiliation = %request.affiliation,
            role = %request.role,
            registrar = %registrar.label(),
            "Registering"
        );

        let body = serde_json::to_vec(&RegisterBody {
            id: &request.enrollment_id,
            affiliation: &request.affiliation,
            role: &request.role,
            max_enrollments: request.max_enrollments,
            attrs: Vec::new(),
            caname: self.ca_name.as_deref(),
        })?;
        let token = authorization_token("POST", CA_REGISTER_PATH, &body, registrar)?;

        let result: RegisterResult = self
            .bounded(async {
                let response = self
                    .http_client
                    .post(format!("{}{}", self.url, CA_REGISTER_PATH))
                    .header(reqwest::header::AUTHORIZATION, token)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body)
                    .send()
                    .await
                    .map_err(|e| self.transport_error(e))?;

                self.read_response(Operation::Register, &request.enrollment_id, response)
                    .await
            })
            .await?;

        Ok(result.secret)
    }
}
