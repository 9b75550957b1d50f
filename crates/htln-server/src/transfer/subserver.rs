//! The transfer-port accept loop: reads the reference number off a
//! freshly accepted connection, looks it up in the pending-transfer
//! table, and hands the socket to the matching transfer-kind handler.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::pending::TransferKind;
use super::{file_download, file_upload, folder_download, folder_upload};
use crate::error::Error;
use crate::server::Server;

/// Run the transfer subserver's accept loop forever, spawning one task
/// per connection.
///
/// # Errors
///
/// Returns `Error::Transport` if the listener itself cannot be bound.
pub async fn run(server: Arc<Server>) -> Result<(), Error> {
    let addr = server.config.transfer_listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::transport(format!("cannot bind transfer port {addr}: {e}")))?;
    info!(%addr, "transfer subserver listening");

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "transfer subserver accept failed");
                continue;
            }
        };
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(&server, socket).await {
                debug!(%peer, error = %e, "transfer connection ended with an error");
            }
        });
    }
}

async fn handle_connection(server: &Server, mut socket: TcpStream) -> Result<(), Error> {
    let mut reference_buf = [0u8; 4];
    socket
        .read_exact(&mut reference_buf)
        .await
        .map_err(|e| Error::transport(e.to_string()))?;
    let reference = u32::from_be_bytes(reference_buf);

    let Some(pending) = server.transfers.take(reference) else {
        debug!(reference, "unknown or already-consumed transfer reference");
        return Err(Error::protocol("unknown transfer reference"));
    };

    let name = String::from_utf8_lossy(&pending.name).into_owned();
    let mut path: Vec<String> = pending
        .path
        .iter()
        .map(|seg| String::from_utf8_lossy(seg).into_owned())
        .collect();

    match pending.kind {
        TransferKind::FileDownload => {
            path.push(name.clone());
            let abs_path = server.fs.resolve_segments(&path)?;
            file_download::send_file(&mut socket, &abs_path, &name).await?;
        }
        TransferKind::FileUpload => {
            path.push(name);
            let abs_path = server.fs.resolve_segments(&path)?;
            file_upload::receive_file(&mut socket, &abs_path).await?;
        }
        TransferKind::FolderDownload => {
            path.push(name);
            folder_download::send_folder(&mut socket, &server.fs, &path).await?;
        }
        TransferKind::FolderUpload => {
            path.push(name);
            let item_count = pending.declared_item_count.unwrap_or(0);
            folder_upload::receive_folder(&mut socket, &server.fs, &path, item_count).await?;
        }
    }

    socket
        .shutdown()
        .await
        .map_err(|e| Error::transport(e.to_string()))?;
    Ok(())
}
