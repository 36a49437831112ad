//! Peer endpoint rewriting for networks running in local containers.

use reqwest::Url;
use tracing::{debug, warn};

use shared::profile::PeerEndpoint;

/// Rewrite the host of every endpoint to `localhost`, keeping scheme and port
///
/// Endpoints whose URL cannot be parsed are returned unchanged.
pub fn rewrite_as_localhost(peers: Vec<PeerEndpoint>) -> Vec<PeerEndpoint> {
    peers.into_iter().map(localhost_endpoint).collect()
}

fn localhost_endpoint(mut peer: PeerEndpoint) -> PeerEndpoint {
    let mut url = match Url::parse(&peer.url) {
        Ok(url) if url.host_str().is_some() => url,
        _ => {
            warn!(peer = %peer.name, url = %peer.url, "Cannot rewrite peer URL");
            return peer;
        }
    };

    if url.set_host(Some("localhost")).is_err() {
        warn!(peer = %peer.name, url = %peer.url, "Cannot rewrite peer URL");
        return peer;
    }

    let rewritten = url.as_str().trim_end_matches('/').to_string();
    debug!(peer = %peer.name, from = %peer.url, to = %rewritten, "Peer rewritten to localhost");
    peer.url = rewritten;
    peer
}
