//! Folder download: walk a directory depth-first and, for each entry,
//! let the client choose to receive, skip, or (eventually) resume it.
//! Each header carries the entry's full sub-path from the download
//! root (e.g. `foo/bar/b.txt`), not just its leaf name, so the client
//! can rebuild the tree structure from a flat stream of records.

use htln_proto::creator_type_for;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::file_download::send_file;
use crate::error::Error;
use crate::fs_namespace::{FsNamespace, WalkEntry};

/// Next-action codes the client sends after each file-header record.
mod next_action {
    /// Receive the file's contents now.
    pub const SEND_FILE: u16 = 0x0001;
    /// Resume a partially received file; treated identically to
    /// [`SEND_FILE`] (no partial-transfer bookkeeping is kept on the
    /// server side).
    pub const RESUME_FILE: u16 = 0x0002;
    /// Skip this entry and move to the next.
    pub const NEXT_FILE: u16 = 0x0003;
}

fn encode_header(entry: &WalkEntry, sub_path: &str) -> Vec<u8> {
    let name_bytes = sub_path.as_bytes();
    let mut buf = Vec::with_capacity(4 + name_bytes.len());
    buf.extend_from_slice(&(name_bytes.len() as u16).to_be_bytes());
    buf.extend_from_slice(&(u16::from(entry.is_dir)).to_be_bytes());
    buf.extend_from_slice(name_bytes);
    buf
}

/// Stream a folder download: walk `root_rel` under `fs`, sending a
/// file-header record per entry and honoring the client's per-entry
/// next-action response.
///
/// # Errors
///
/// Returns `Error::NotFound` if `root_rel` does not resolve, or
/// `Error::Transport` on any I/O failure against the connection.
pub async fn send_folder(
    conn: &mut (impl AsyncRead + AsyncWrite + Unpin),
    fs: &FsNamespace,
    root_rel: &[String],
) -> Result<(), Error> {
    let entries = fs.walk_depth_first(root_rel)?;

    for entry in &entries {
        let sub_path = entry.rel_path.join("/");
        let leaf_name = entry.rel_path.last().map_or("/", String::as_str);

        conn.write_all(&encode_header(entry, &sub_path))
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let mut action_buf = [0u8; 2];
        conn.read_exact(&mut action_buf)
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        if entry.is_dir {
            // Directories carry no content; the client still answers
            // with a next-action (expected to be next-file) to stay in
            // lockstep with the header stream.
            continue;
        }

        let action = u16::from_be_bytes(action_buf);
        match action {
            next_action::SEND_FILE | next_action::RESUME_FILE => {
                let _ = creator_type_for(leaf_name);
                send_file(conn, &entry.abs_path, leaf_name).await?;
            }
            next_action::NEXT_FILE => {}
            other => {
                return Err(Error::protocol(format!(
                    "unknown folder-download next-action {other:#06x}"
                )));
            }
        }
    }
    Ok(())
}
