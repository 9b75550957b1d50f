//! Single-file download: write the flattened-file-object header, then
//! stream the file's bytes in fixed-size chunks.

use std::path::Path;

use htln_proto::{creator_type_for, FlatFileObject, InfoFork};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{date_stamp_from_systemtime, CHUNK_SIZE};
use crate::error::Error;

/// Serve a single file download on an already-accepted transfer
/// connection: the flattened-file-object header, then the raw bytes in
/// `CHUNK_SIZE` chunks.
///
/// # Errors
///
/// Returns `Error::NotFound` if `abs_path` does not exist, or
/// `Error::Transport` if writing to `out` fails.
pub async fn send_file(
    out: &mut (impl AsyncWrite + Unpin),
    abs_path: &Path,
    file_name: &str,
) -> Result<(), Error> {
    let metadata = tokio::fs::metadata(abs_path)
        .await
        .map_err(|_| Error::not_found("No such file."))?;

    let (creator, file_type) = creator_type_for(file_name);
    let modified = metadata.modified().unwrap_or_else(|_| std::time::SystemTime::now());
    let created = metadata.created().unwrap_or(modified);

    let object = FlatFileObject {
        info: InfoFork {
            creator,
            file_type,
            create_date: date_stamp_from_systemtime(created),
            modify_date: date_stamp_from_systemtime(modified),
            name: file_name.to_string(),
            comment: None,
        },
        data_size: metadata.len() as u32,
    };

    out.write_all(&object.header_bytes())
        .await
        .map_err(|e| Error::transport(e.to_string()))?;

    let mut file = File::open(abs_path)
        .await
        .map_err(|_| Error::not_found("No such file."))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
    }
    Ok(())
}
