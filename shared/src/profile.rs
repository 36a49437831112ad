//! # Connection Profile
//!
//! Read-only description of the network an application connects to: the
//! client organization, its MSP ID, certificate authorities and peers.
//! The JSON layout follows the common connection profile format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{WalletError, WalletResult};

/// Parsed connection profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Profile name
    #[serde(default)]
    pub name: String,

    /// Profile version
    #[serde(default)]
    pub version: String,

    /// Which organization this client acts for
    #[serde(default)]
    pub client: Option<ClientSection>,

    /// Organizations keyed by name
    #[serde(default)]
    pub organizations: BTreeMap<String, Organization>,

    /// Peers keyed by name
    #[serde(default)]
    pub peers: BTreeMap<String, Peer>,

    /// Certificate authorities keyed by name
    #[serde(default, rename = "certificateAuthorities")]
    pub certificate_authorities: BTreeMap<String, CertificateAuthority>,

    /// Channels keyed by name (optional, peers may be discovered instead)
    #[serde(default)]
    pub channels: BTreeMap<String, serde_json::Value>,
}

/// `client` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    pub organization: String,
}

/// Organization entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// MSP ID of the organization
    pub mspid: String,

    /// Names of the organization's peers
    #[serde(default)]
    pub peers: Vec<String>,

    /// Names of the organization's certificate authorities
    #[serde(default, rename = "certificateAuthorities")]
    pub certificate_authorities: Vec<String>,
}

/// Peer entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    pub url: String,

    #[serde(default, rename = "tlsCACerts")]
    pub tls_ca_certs: Option<TlsCaCerts>,

    #[serde(default, rename = "grpcOptions")]
    pub grpc_options: BTreeMap<String, serde_json::Value>,
}

/// Certificate authority entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateAuthority {
    /// Base URL of the CA (e.g., "https://localhost:7054")
    pub url: String,

    /// Name of the CA inside the CA server
    #[serde(default, rename = "caName")]
    pub ca_name: Option<String>,

    #[serde(default, rename = "tlsCACerts")]
    pub tls_ca_certs: Option<TlsCaCerts>,

    #[serde(default, rename = "httpOptions")]
    pub http_options: Option<HttpOptions>,
}

/// `httpOptions` of a CA entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpOptions {
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

/// `tlsCACerts` block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsCaCerts {
    #[serde(default)]
    pub pem: Option<PemSet>,

    #[serde(default)]
    pub path: Option<String>,
}

/// One PEM string or a list of them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PemSet {
    One(String),
    Many(Vec<String>),
}

impl TlsCaCerts {
    /// Inline PEM certificates, in profile order
    pub fn pems(&self) -> Vec<&str> {
        match &self.pem {
            Some(PemSet::One(pem)) => vec![pem.as_str()],
            Some(PemSet::Many(pems)) => pems.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }
}

/// A peer resolved for connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEndpoint {
    pub name: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca_pem: Option<String>,
}

impl ConnectionProfile {
    /// Load a profile from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> WalletResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            WalletError::ProfileError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Parse a profile from JSON text
    pub fn from_json(json: &str) -> WalletResult<Self> {
        serde_json::from_str(json).map_err(|e| WalletError::ProfileError(e.to_string()))
    }

    /// Name and entry of the client organization
    ///
    /// Falls back to the only organization when `client` is absent.
    pub fn client_organization(&self) -> WalletResult<(&str, &Organization)> {
        match &self.client {
            Some(client) => self
                .organizations
                .get_key_value(&client.organization)
                .map(|(name, org)| (name.as_str(), org))
                .ok_or_else(|| {
                    WalletError::ProfileError(format!(
                        "client organization '{}' is not defined",
                        client.organization
                    ))
                }),
            None if self.organizations.len() == 1 => self
                .organizations
                .iter()
                .next()
                .map(|(name, org)| (name.as_str(), org))
                .ok_or_else(|| WalletError::ProfileError("no organizations defined".into())),
            None => Err(WalletError::ProfileError(
                "no client organization and more than one organization defined".into(),
            )),
        }
    }

    /// MSP ID of the client organization
    pub fn msp_id(&self) -> WalletResult<&str> {
        self.client_organization().map(|(_, org)| org.mspid.as_str())
    }

    /// Certificate authority entry by name
    pub fn certificate_authority(&self, name: &str) -> WalletResult<&CertificateAuthority> {
        self.certificate_authorities.get(name).ok_or_else(|| {
            WalletError::ProfileError(format!("certificate authority '{}' is not defined", name))
        })
    }

    /// Bootstrap peers of the client organization
    pub fn bootstrap_peers(&self) -> WalletResult<Vec<PeerEndpoint>> {
        let (org_name, org) = self.client_organization()?;

        let peers: Vec<PeerEndpoint> = org
            .peers
            .iter()
            .filter_map(|name| {
                self.peers.get(name).map(|peer| PeerEndpoint {
                    name: name.clone(),
                    url: peer.url.clone(),
                    tls_ca_pem: peer
                        .tls_ca_certs
                        .as_ref()
                        .and_then(|certs| certs.pems().first().map(|pem| pem.to_string())),
                })
            })
            .collect();

        if peers.is_empty() {
            return Err(WalletError::ProfileError(format!(
                "organization '{}' has no resolvable peers",
                org_name
            )));
        }
        Ok(peers)
    }
}

impl CertificateAuthority {
    /// Whether the CA's TLS certificate should be verified
    pub fn verify_tls(&self) -> bool {
        self.http_options.as_ref().map(|o| o.verify).unwrap_or(true)
    }

    /// Trusted root PEMs for the CA
    pub fn tls_roots(&self) -> Vec<&str> {
        self.tls_ca_certs
            .as_ref()
            .map(TlsCaCerts::pems)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "name": "first-network-org1",
        "version": "1.0.0",
        "client": { "organization": "Org1" },
        "organizations": {
            "Org1": {
                "mspid": "Org1MSP",
                "peers": ["peer0.org1.example.com", "peer1.org1.example.com"],
                "certificateAuthorities": ["ca.org1.example.com"]
            }
        },
        "peers": {
            "peer0.org1.example.com": {
                "url": "grpcs://localhost:7051",
                "tlsCACerts": { "pem": "-----BEGIN CERTIFICATE-----\nPEER\n-----END CERTIFICATE-----\n" },
                "grpcOptions": { "ssl-target-name-override": "peer0.org1.example.com" }
            }
        },
        "certificateAuthorities": {
            "ca.org1.example.com": {
                "url": "https://localhost:7054",
                "caName": "ca.org1.example.com",
                "tlsCACerts": { "pem": ["-----BEGIN CERTIFICATE-----\nCA\n-----END CERTIFICATE-----\n"] },
                "httpOptions": { "verify": false }
            }
        }
    }"#;

    #[test]
    fn test_parse_profile() {
        let profile = ConnectionProfile::from_json(PROFILE).unwrap();

        assert_eq!(profile.name, "first-network-org1");
        assert_eq!(profile.msp_id().unwrap(), "Org1MSP");

        let ca = profile.certificate_authority("ca.org1.example.com").unwrap();
        assert_eq!(ca.url, "https://localhost:7054");
        assert_eq!(ca.ca_name.as_deref(), Some("ca.org1.example.com"));
        assert!(!ca.verify_tls());
        assert_eq!(ca.tls_roots().len(), 1);
    }

    #[test]
    fn test_bootstrap_peers_skip_undefined() {
        let profile = ConnectionProfile::from_json(PROFILE).unwrap();
        let peers = profile.bootstrap_peers().unwrap();

        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].name, "peer0.org1.example.com");
        assert_eq!(peers[0].url, "grpcs://localhost:7051");
        assert!(peers[0].tls_ca_pem.as_deref().unwrap().contains("PEER"));
    }

    #[test]
    fn test_missing_ca() {
        let profile = ConnectionProfile::from_json(PROFILE).unwrap();
        assert!(matches!(
            profile.certificate_authority("ca.org2.example.com"),
            Err(WalletError::ProfileError(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ConnectionProfile::from_json("{ not json"),
            Err(WalletError::ProfileError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connection-org1.json");
        std::fs::write(&path, PROFILE).unwrap();

        let profile = ConnectionProfile::from_file(&path).unwrap();
        assert_eq!(profile.msp_id().unwrap(), "Org1MSP");

        assert!(matches!(
            ConnectionProfile::from_file(dir.path().join("missing.json")),
            Err(WalletError::ProfileError(_))
        ));
    }
}
