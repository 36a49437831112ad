//! Fabric CA request authorization tokens.
//!
//! A token is `base64(cert) "." base64(signature)`, where the signature is a
//! low-S, DER-encoded ECDSA P-256/SHA-256 signature over
//! `METHOD "." base64(uri) "." base64(body) "." base64(cert)`.

use base64::{engine::general_purpose::STANDARD, Engine};
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;

use shared::{
    error::{WalletError, WalletResult},
    types::Identity,
};

/// Build the `Authorization` header value for a CA request made as `identity`
pub fn authorization_token(
    method: &str,
    uri: &str,
    body: &[u8],
    identity: &Identity,
) -> WalletResult<String> {
    let signing_key = SigningKey::from_pkcs8_pem(identity.private_key()).map_err(|e| {
        WalletError::InvalidIdentity(format!(
            "private key of '{}' is not a PKCS#8 P-256 key: {}",
            identity.label(),
            e
        ))
    })?;

    let cert_b64 = STANDARD.encode(identity.certificate().as_bytes());
    let payload = format!(
        "{}.{}.{}.{}",
        method,
        STANDARD.encode(uri.as_bytes()),
        STANDARD.encode(body),
        cert_b64
    );

    let signature: Signature = signing_key.sign(payload.as_bytes());
    let signature = signature.normalize_s().unwrap_or(signature);

    Ok(format!(
        "{}.{}",
        cert_b64,
        STANDARD.encode(signature.to_der().as_bytes())
    ))
}
