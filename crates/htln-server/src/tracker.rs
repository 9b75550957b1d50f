//! Periodic tracker announcements: a UDP datagram naming this server's
//! address and session count, sent to each configured tracker on a fixed
//! interval. Failures are logged and never interrupt serving.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::server::Server;

const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(300);

/// Encode a single announce datagram: server name, description, current
/// session count, and control port, each length-prefixed.
fn encode_announce(server: &Server, session_count: u16) -> Vec<u8> {
    let name = server.config.name.as_bytes();
    let description = server.config.description.as_bytes();

    let mut buf = Vec::with_capacity(2 + name.len() + 2 + description.len() + 4);
    buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(&(description.len() as u16).to_be_bytes());
    buf.extend_from_slice(description);
    buf.extend_from_slice(&server.config.control_port.to_be_bytes());
    buf.extend_from_slice(&session_count.to_be_bytes());
    buf
}

/// Run the tracker-announce loop forever. Returns only if the server's
/// configuration disables tracker registration (`register_with_trackers
/// == false` or an empty `trackers` list), since there is then nothing to
/// do.
pub async fn run(server: Arc<Server>) {
    if !server.config.register_with_trackers || server.config.trackers.is_empty() {
        debug!("tracker announcements disabled");
        return;
    }

    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to bind tracker-announce socket; announcements disabled");
            return;
        }
    };

    let mut interval = tokio::time::interval(ANNOUNCE_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let session_count = server.registry.session_count().await as u16;
        let datagram = encode_announce(&server, session_count);

        for tracker in &server.config.trackers {
            match socket.send_to(&datagram, tracker).await {
                Ok(_) => debug!(%tracker, "announced to tracker"),
                Err(e) => warn!(%tracker, error = %e, "tracker announce failed"),
            }
        }
    }
}
