//! HTTP gateway adapter.
//!
//! Fabric peers do not serve this protocol. It targets a small HTTP gateway
//! service deployed next to the network, listening on a bootstrap peer's
//! address (`grpc` maps to `http`, `grpcs` to `https`):
//!
//! - `POST /sessions` opens a session, signed with the identity's key the
//!   same way Fabric CA requests are
//! - `GET /channels/{channel}/peers` lists the channel's peers
//! - `GET /channels/{channel}/contracts/{contract}` checks a contract exists
//! - `POST /channels/{channel}/contracts/{contract}/{submit|evaluate}` runs a
//!   transaction
//! - `DELETE /sessions/{id}` closes the session
//!
//! Reaching a network through the peers' native gRPC gateway needs another
//! [`GatewayTransport`] implementation.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use shared::{
    error::{WalletError, WalletResult},
    profile::PeerEndpoint,
    types::Identity,
};

use super::{GatewaySession, GatewayTransport, TransactionRequest};
use crate::ca::authorization_token;

const SESSIONS_PATH: &str = "/sessions";
const SESSION_HEADER: &str = "x-session-id";

/// Opens sessions on an HTTP gateway
pub struct HttpGatewayTransport {
    timeout: Duration,
    verify_tls: bool,
}

impl HttpGatewayTransport {
    /// Create a new HttpGatewayTransport
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            verify_tls: true,
        }
    }

    /// Accept any server certificate
    pub fn insecure(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    fn client_for(&self, peer: &PeerEndpoint) -> WalletResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(!self.verify_tls);

        if let Some(pem) = &peer.tls_ca_pem {
            let cert = reqwest::Certificate::from_pem(pem.as_bytes()).map_err(|e| {
                WalletError::ProfileError(format!("invalid TLS root for {}: {}", peer.name, e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| WalletError::InternalError(e.to_string()))
    }

    async fn open_on(
        &self,
        identity: &Identity,
        peer: &PeerEndpoint,
        peer_urls: &[String],
    ) -> WalletResult<HttpGatewaySession> {
        let base_url = gateway_base_url(&peer.url)?;
        let client = self.client_for(peer)?;

        let body = serde_json::to_vec(&OpenSessionBody {
            msp_id: identity.msp_id(),
            certificate: identity.certificate(),
            peers: peer_urls,
        })?;
        let token = authorization_token("POST", SESSIONS_PATH, &body, identity)?;

        let response = client
            .post(format!("{}{}", base_url, SESSIONS_PATH))
            .header(reqwest::header::AUTHORIZATION, token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(&base_url, self.timeout, e))?;

        let opened: OpenSessionResult =
            read_json(&base_url, CallKind::Session, response).await?;

        Ok(HttpGatewaySession {
            client,
            base_url,
            session_id: opened.session_id,
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl GatewayTransport for HttpGatewayTransport {
    async fn open(
        &self,
        identity: &Identity,
        bootstrap: &[PeerEndpoint],
    ) -> WalletResult<Box<dyn GatewaySession>> {
        let peer_urls: Vec<String> = bootstrap.iter().map(|peer| peer.url.clone()).collect();
        let mut last_error = WalletError::ProfileError("no bootstrap peers".into());

        for peer in bootstrap {
            let attempt = tokio::time::timeout(self.timeout, self.open_on(identity, peer, &peer_urls))
                .await
                .unwrap_or_else(|_| {
                    Err(WalletError::Timeout {
                        endpoint: peer.url.clone(),
                        timeout_secs: self.timeout.as_secs(),
                    })
                });

            match attempt {
                Ok(session) => {
                    info!(
                        peer = %peer.name,
                        session = %session.session_id,
                        label = %identity.label(),
                        "Gateway session opened"
                    );
                    return Ok(Box::new(session));
                }
                Err(e) if e.is_network() => {
                    warn!(peer = %peer.name, error = %e, "Bootstrap peer unreachable, trying next");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Session on an HTTP gateway
pub struct HttpGatewaySession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenSessionBody<'a> {
    msp_id: &'a str,
    certificate: &'a str,
    peers: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenSessionResult {
    session_id: String,
}

#[derive(Deserialize)]
struct PeersResult {
    peers: Vec<PeerEndpoint>,
}

#[derive(Serialize)]
struct InvokeBody<'a> {
    function: &'a str,
    args: &'a [String],
    peers: &'a [String],
}

#[derive(Deserialize)]
struct InvokeResult {
    #[serde(default)]
    result: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// What a request was for, used to classify failures
#[derive(Clone, Copy)]
enum CallKind {
    Session,
    Lookup,
    Transaction,
}

impl HttpGatewaySession {
    fn contract_path(channel: &str, contract: &str) -> String {
        format!(
            "/channels/{}/contracts/{}",
            urlencoding::encode(channel),
            urlencoding::encode(contract)
        )
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> WalletResult<reqwest::Response> {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(SESSION_HEADER, &self.session_id);

        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        request
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, self.timeout, e))
    }

    async fn invoke(&self, request: &TransactionRequest, action: &str) -> WalletResult<String> {
        let path = format!(
            "{}/{}",
            Self::contract_path(&request.channel, &request.contract),
            action
        );
        let body = serde_json::to_vec(&InvokeBody {
            function: &request.function,
            args: &request.args,
            peers: &request.peers,
        })?;

        let response = self.send(Method::POST, &path, Some(body)).await?;
        let result: InvokeResult = read_json(&self.base_url, CallKind::Transaction, response).await?;
        Ok(result.result)
    }
}

#[async_trait]
impl GatewaySession for HttpGatewaySession {
    fn id(&self) -> &str {
        &self.session_id
    }

    async fn discover(&self, channel: &str) -> WalletResult<Vec<PeerEndpoint>> {
        let path = format!("/channels/{}/peers", urlencoding::encode(channel));
        let response = self.send(Method::GET, &path, None).await?;
        let result: PeersResult = read_json(&self.base_url, CallKind::Lookup, response).await?;

        debug!(channel = %channel, peers = result.peers.len(), "Peers discovered");
        Ok(result.peers)
    }

    async fn resolve_contract(&self, channel: &str, contract: &str) -> WalletResult<()> {
        let response = self
            .send(Method::GET, &Self::contract_path(channel, contract), None)
            .await?;
        check_status(&self.base_url, CallKind::Lookup, response).await?;
        Ok(())
    }

    async fn submit(&self, request: &TransactionRequest) -> WalletResult<String> {
        self.invoke(request, "submit").await
    }

    async fn evaluate(&self, request: &TransactionRequest) -> WalletResult<String> {
        self.invoke(request, "evaluate").await
    }

    async fn close(&self) -> WalletResult<()> {
        let path = format!("{}/{}", SESSIONS_PATH, urlencoding::encode(&self.session_id));
        let response = self.send(Method::DELETE, &path, None).await?;
        check_status(&self.base_url, CallKind::Session, response).await?;

        debug!(session = %self.session_id, "Gateway session closed");
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// HTTP base URL of the gateway on a peer address
fn gateway_base_url(peer_url: &str) -> WalletResult<String> {
    let url = Url::parse(peer_url)
        .map_err(|e| WalletError::ProfileError(format!("invalid peer URL '{}': {}", peer_url, e)))?;

    let scheme = match url.scheme() {
        "grpcs" | "https" => "https",
        "grpc" | "http" => "http",
        other => {
            return Err(WalletError::ProfileError(format!(
                "unsupported peer URL scheme '{}'",
                other
            )))
        }
    };
    let host = url
        .host_str()
        .ok_or_else(|| WalletError::ProfileError(format!("peer URL '{}' has no host", peer_url)))?;

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    })
}

fn transport_error(endpoint: &str, timeout: Duration, err: reqwest::Error) -> WalletError {
    if err.is_timeout() {
        WalletError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        WalletError::network(endpoint, err)
    }
}

async fn check_status(
    endpoint: &str,
    kind: CallKind,
    response: reqwest::Response,
) -> WalletResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| WalletError::network(endpoint, e))?;

    if status.is_success() {
        return Ok(body);
    }

    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string());

    warn!(endpoint = %endpoint, status = %status, error = %message, "Gateway request failed");
    Err(classify_failure(endpoint, kind, status, message))
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    kind: CallKind,
    response: reqwest::Response,
) -> WalletResult<T> {
    let body = check_status(endpoint, kind, response).await?;
    serde_json::from_str(&body).map_err(|e| {
        WalletError::SerializationError(format!("unexpected gateway response: {}", e))
    })
}

fn classify_failure(endpoint: &str, kind: CallKind, status: StatusCode, message: String) -> WalletError {
    match (kind, status) {
        (_, StatusCode::UNAUTHORIZED) => WalletError::Authentication(message),
        (_, StatusCode::FORBIDDEN) => WalletError::Authorization(message),
        (CallKind::Lookup, StatusCode::NOT_FOUND) => WalletError::NotFound(message),
        (CallKind::Transaction, s) if s.is_client_error() || s.is_server_error() => {
            WalletError::TransactionError(message)
        }
        _ => WalletError::Network {
            endpoint: endpoint.to_string(),
            reason: format!("gateway returned {}: {}", status, message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{delete, get, post},
        Json, Router,
    };
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    async fn open_session(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if !headers.contains_key("authorization") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unsigned" })));
        }
        log.lock().push(format!("open:{}", body["mspId"].as_str().unwrap_or_default()));
        (StatusCode::OK, Json(json!({ "sessionId": "s-42" })))
    }

    async fn peers(Path(channel): Path<String>) -> Json<Value> {
        Json(json!({ "peers": [{ "name": format!("peer0.{}", channel), "url": "grpcs://peer0.org1.example.com:7051" }] }))
    }

    async fn contract(Path((_channel, contract)): Path<(String, String)>) -> (StatusCode, Json<Value>) {
        if contract == "mycc" {
            (StatusCode::OK, Json(json!({})))
        } else {
            (StatusCode::NOT_FOUND, Json(json!({ "error": format!("no contract {}", contract) })))
        }
    }

    async fn invoke(
        State(log): State<Log>,
        headers: HeaderMap,
        Path((_channel, _contract, action)): Path<(String, String, String)>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let session = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        log.lock().push(format!("{}:{}:{}", action, session, body["function"]));
        if body["function"] == "fail" {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "chaincode error" })));
        }
        (StatusCode::OK, Json(json!({ "result": format!("{}", body["args"]) })))
    }

    async fn close_session(State(log): State<Log>, Path(id): Path<String>) -> StatusCode {
        log.lock().push(format!("close:{}", id));
        StatusCode::NO_CONTENT
    }

    async fn spawn_gateway() -> (String, Log) {
        let log: Log = Arc::default();
        let app = Router::new()
            .route("/sessions", post(open_session))
            .route("/sessions/:id", delete(close_session))
            .route("/channels/:channel/peers", get(peers))
            .route("/channels/:channel/contracts/:contract", get(contract))
            .route("/channels/:channel/contracts/:contract/:action", post(invoke))
            .with_state(log.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("grpc://{}", addr), log)
    }

    fn identity() -> Identity {
        let key = rcgen::KeyPair::generate().unwrap();
        Identity::new(
            "userHsc",
            "Org1MSP",
            "-----BEGIN CERTIFICATE-----\nMIIC\n-----END CERTIFICATE-----\n",
            key.serialize_pem(),
        )
        .unwrap()
    }

    fn peer(url: &str) -> PeerEndpoint {
        PeerEndpoint {
            name: "peer0.org1.example.com".into(),
            url: url.into(),
            tls_ca_pem: None,
        }
    }

    fn request(function: &str) -> TransactionRequest {
        TransactionRequest {
            channel: "mychannel".into(),
            contract: "mycc".into(),
            function: function.into(),
            args: vec!["a".into(), "b".into()],
            peers: vec![],
        }
    }

    #[test]
    fn test_gateway_base_url() {
        assert_eq!(
            gateway_base_url("grpcs://localhost:7051").unwrap(),
            "https://localhost:7051"
        );
        assert_eq!(gateway_base_url("grpc://peer0:7051").unwrap(), "http://peer0:7051");
        assert!(gateway_base_url("ftp://peer0:21").is_err());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (url, log) = spawn_gateway().await;
        let transport = HttpGatewayTransport::new(Duration::from_secs(5));

        let session = transport.open(&identity(), &[peer(&url)]).await.unwrap();
        assert_eq!(session.id(), "s-42");

        let peers = session.discover("mychannel").await.unwrap();
        assert_eq!(peers[0].name, "peer0.mychannel");

        session.resolve_contract("mychannel", "mycc").await.unwrap();
        let result = session.evaluate(&request("query")).await.unwrap();
        assert_eq!(result, r#"["a","b"]"#);
        session.submit(&request("invoke")).await.unwrap();
        session.close().await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "open:Org1MSP",
                r#"evaluate:s-42:"query""#,
                r#"submit:s-42:"invoke""#,
                "close:s-42",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_contract_is_not_found() {
        let (url, _log) = spawn_gateway().await;
        let transport = HttpGatewayTransport::new(Duration::from_secs(5));
        let session = transport.open(&identity(), &[peer(&url)]).await.unwrap();

        let result = session.resolve_contract("mychannel", "other").await;
        assert!(matches!(result, Err(WalletError::NotFound(ref m)) if m.contains("other")));
    }

    #[tokio::test]
    async fn test_chaincode_failure_is_transaction_error() {
        let (url, _log) = spawn_gateway().await;
        let transport = HttpGatewayTransport::new(Duration::from_secs(5));
        let session = transport.open(&identity(), &[peer(&url)]).await.unwrap();

        let result = session.submit(&request("fail")).await;
        assert!(matches!(result, Err(WalletError::TransactionError(ref m)) if m == "chaincode error"));
    }

    #[tokio::test]
    async fn test_open_falls_through_unreachable_peer() {
        let (url, _log) = spawn_gateway().await;
        let transport = HttpGatewayTransport::new(Duration::from_secs(5));

        let session = transport
            .open(&identity(), &[peer("grpc://127.0.0.1:1"), peer(&url)])
            .await
            .unwrap();
        assert_eq!(session.id(), "s-42");
    }

    #[tokio::test]
    async fn test_open_skips_unresponsive_peer() {
        // Accepts connections and never answers
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let silent_url = format!("grpc://{}", silent.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = silent.accept().await {
                held.push(stream);
            }
        });

        let (url, _log) = spawn_gateway().await;
        let transport = HttpGatewayTransport::new(Duration::from_secs(1));

        let session = transport
            .open(&identity(), &[peer(&silent_url), peer(&url)])
            .await
            .unwrap();
        assert_eq!(session.id(), "s-42");
    }

    #[tokio::test]
    async fn test_open_all_unreachable() {
        let transport = HttpGatewayTransport::new(Duration::from_secs(2));
        let result = transport.open(&identity(), &[peer("grpc://127.0.0.1:1")]).await;
        assert!(matches!(result, Err(ref e) if e.is_network()));
    }
}
