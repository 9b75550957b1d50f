//! The control-port accept loop: handshake, the per-session read/write
//! multiplex, and teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use htln_proto::Transaction;

use crate::dispatch::dispatch;
use crate::error::Error;
use crate::handlers;
use crate::server::Server;
use crate::session::{ClientSession, SessionState};

/// Client's handshake magic: `TRTP`, sub-protocol `HOTL`, version 1.0.
const HANDSHAKE_REQUEST: [u8; 12] = *b"TRTPHOTL\x00\x01\x00\x02";
/// Server's handshake reply: `TRTP`, error code 0.
const HANDSHAKE_REPLY: [u8; 8] = *b"TRTP\x00\x00\x00\x00";

const READ_BUF_GROWTH: usize = 4096;

/// Run the control-port accept loop forever, spawning one task per
/// connection.
///
/// # Errors
///
/// Returns `Error::Transport` if the listener itself cannot be bound.
pub async fn run(server: Arc<Server>) -> Result<(), Error> {
    let addr = server.config.control_listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::transport(format!("cannot bind control port {addr}: {e}")))?;
    info!(%addr, "control port listening");

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "control port accept failed");
                continue;
            }
        };
        debug!(%peer, "connection accepted");
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(&server, socket, peer).await {
                debug!(%peer, error = %e, "connection ended with an error");
            }
        });
    }
}

/// Background idle-timer tick: advances every session's idle counter and
/// broadcasts `notifyChangeUser` for any session whose away flag flips.
pub async fn run_idle_ticker(server: Arc<Server>) {
    let tick_secs = 30;
    let mut interval = tokio::time::interval(Duration::from_secs(tick_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let changed = server
            .registry
            .tick_idle(tick_secs as u32, server.config.idle_seconds)
            .await;
        for session_id in changed {
            handlers::notify_idle_cleared(&server, session_id).await;
        }
    }
}

async fn handshake(socket: &mut TcpStream) -> Result<(), Error> {
    let mut buf = [0u8; HANDSHAKE_REQUEST.len()];
    socket
        .read_exact(&mut buf)
        .await
        .map_err(|e| Error::transport(e.to_string()))?;
    if buf != HANDSHAKE_REQUEST {
        return Err(Error::protocol("malformed handshake"));
    }
    socket
        .write_all(&HANDSHAKE_REPLY)
        .await
        .map_err(|e| Error::transport(e.to_string()))?;
    Ok(())
}

async fn handle_connection(
    server: &Server,
    mut socket: TcpStream,
    peer: std::net::SocketAddr,
) -> Result<(), Error> {
    handshake(&mut socket).await?;

    let session_id = server.allocate_session_id().await?;
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let mut session = ClientSession::new(session_id, peer, outbox_tx);
    session.state = SessionState::Handshaken;
    server.registry.insert(session).await;

    let result = run_session_loop(server, &mut socket, session_id, &mut outbox_rx).await;

    server.registry.remove(session_id).await;
    handlers::broadcast_presence_delete(server, session_id).await;
    let _ = socket.shutdown().await;

    result
}

async fn run_session_loop(
    server: &Server,
    socket: &mut TcpStream,
    session_id: u16,
    outbox_rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
) -> Result<(), Error> {
    let mut buf = Vec::new();
    let mut read_chunk = [0u8; READ_BUF_GROWTH];

    loop {
        tokio::select! {
            biased;

            outgoing = outbox_rx.recv() => {
                match outgoing {
                    Some(bytes) => socket
                        .write_all(&bytes)
                        .await
                        .map_err(|e| Error::transport(e.to_string()))?,
                    None => return Ok(()),
                }
            }

            read = socket.read(&mut read_chunk) => {
                let n = read.map_err(|e| Error::transport(e.to_string()))?;
                if n == 0 {
                    return Ok(());
                }
                buf.extend_from_slice(&read_chunk[..n]);

                let (txns, consumed) = Transaction::decode_all(&buf)?;
                buf.drain(..consumed);

                for req in &txns {
                    match dispatch(server, session_id, req).await {
                        Ok(Some(reply)) => socket
                            .write_all(&reply.encode())
                            .await
                            .map_err(|e| Error::transport(e.to_string()))?,
                        Ok(None) => {}
                        Err(e) => return Err(e),
                    }

                    // A handler (e.g. a failed Login) may mark the session
                    // Closed directly after queuing its own error reply,
                    // rather than via a Transport error, so that the
                    // client still receives the reply before the
                    // connection drops.
                    let closed = server
                        .registry
                        .with_session(session_id, |s| s.state == SessionState::Closed)
                        .await
                        .unwrap_or(true);
                    if closed {
                        return Ok(());
                    }
                }
            }
        }
    }
}
