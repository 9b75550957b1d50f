//! Folder upload: the server drives the client through one item at a
//! time (directory or file), receiving each in turn.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::file_upload::receive_file;
use crate::error::Error;
use crate::fs_namespace::FsNamespace;

mod action {
    /// Tell the client to send its next queued item.
    pub const NEXT_FILE: u16 = 0x0003;
    /// Tell the client to stream the file it just announced.
    pub const SEND_FILE: u16 = 0x0001;
}

/// Trailing marker the client appends after each uploaded file's bytes;
/// read and discarded.
const TRAILING_MARKER: &[u8; 4] = b"MACR";

/// Drive a folder upload of `item_count` declared items into
/// `dest_root_rel` (already resolved to the destination directory via
/// `fs`).
///
/// # Errors
///
/// Returns `Error::Protocol` on a malformed record, or
/// `Error::Transport`/`Error::Io` on I/O failure.
pub async fn receive_folder(
    conn: &mut (impl AsyncRead + AsyncWrite + Unpin),
    fs: &FsNamespace,
    dest_root_rel: &[String],
    item_count: u32,
) -> Result<(), Error> {
    conn.write_all(&action::NEXT_FILE.to_be_bytes())
        .await
        .map_err(|e| Error::transport(e.to_string()))?;

    for _ in 0..item_count {
        let mut prefix = [0u8; 6];
        conn.read_exact(&mut prefix)
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        let data_size = u16::from_be_bytes([prefix[0], prefix[1]]);
        let is_folder = u16::from_be_bytes([prefix[2], prefix[3]]) != 0;
        let path_item_count = u16::from_be_bytes([prefix[4], prefix[5]]);

        let mut segments = Vec::with_capacity(path_item_count as usize);
        for _ in 0..path_item_count {
            let mut len_buf = [0u8; 2];
            conn.read_exact(&mut len_buf)
                .await
                .map_err(|e| Error::transport(e.to_string()))?;
            let len = u16::from_be_bytes(len_buf) as usize;
            let mut name_buf = vec![0u8; len];
            conn.read_exact(&mut name_buf)
                .await
                .map_err(|e| Error::transport(e.to_string()))?;
            segments.push(
                String::from_utf8(name_buf)
                    .map_err(|_| Error::protocol("non-UTF-8 path segment"))?,
            );
        }
        let _ = data_size;

        let mut full_path = dest_root_rel.to_vec();
        full_path.extend(segments);
        let abs_path = fs.resolve_segments(&full_path)?;

        if is_folder {
            tokio::fs::create_dir_all(&abs_path)
                .await
                .map_err(Error::from)?;
            conn.write_all(&action::NEXT_FILE.to_be_bytes())
                .await
                .map_err(|e| Error::transport(e.to_string()))?;
            continue;
        }

        conn.write_all(&action::SEND_FILE.to_be_bytes())
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        let mut size_buf = [0u8; 4];
        conn.read_exact(&mut size_buf)
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        let _declared_size = u32::from_be_bytes(size_buf);

        let mut marker = receive_file(conn, &abs_path).await?;
        while marker.len() < TRAILING_MARKER.len() {
            let mut extra = [0u8; 4];
            let n = conn
                .read(&mut extra)
                .await
                .map_err(|e| Error::transport(e.to_string()))?;
            if n == 0 {
                return Err(Error::transport(
                    "connection closed before trailing marker",
                ));
            }
            marker.extend_from_slice(&extra[..n]);
        }
        if marker[..TRAILING_MARKER.len()] != TRAILING_MARKER[..] {
            trace!(?marker, "unexpected folder-upload trailing marker");
        }

        conn.write_all(&action::NEXT_FILE.to_be_bytes())
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receives_one_folder_item_and_one_file_item() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FsNamespace::new(dir.path());

        let (mut server, mut client) = tokio::io::duplex(64 * 1024);

        let server_task = tokio::spawn(async move {
            receive_folder(&mut server, &fs, &[], 2).await
        });

        // Server primes with NEXT_FILE.
        let mut next = [0u8; 2];
        client.read_exact(&mut next).await.unwrap();
        assert_eq!(u16::from_be_bytes(next), action::NEXT_FILE);

        // Item 1: a folder named "sub".
        let mut record = Vec::new();
        record.extend_from_slice(&0u16.to_be_bytes()); // dataSize
        record.extend_from_slice(&1u16.to_be_bytes()); // isFolder
        record.extend_from_slice(&1u16.to_be_bytes()); // pathItemCount
        record.extend_from_slice(&3u16.to_be_bytes());
        record.extend_from_slice(b"sub");
        client.write_all(&record).await.unwrap();

        let mut next = [0u8; 2];
        client.read_exact(&mut next).await.unwrap();
        assert_eq!(u16::from_be_bytes(next), action::NEXT_FILE);

        // Item 2: a file named "sub/a.txt".
        let mut record = Vec::new();
        record.extend_from_slice(&0u16.to_be_bytes());
        record.extend_from_slice(&0u16.to_be_bytes()); // not a folder
        record.extend_from_slice(&2u16.to_be_bytes());
        record.extend_from_slice(&3u16.to_be_bytes());
        record.extend_from_slice(b"sub");
        record.extend_from_slice(&5u16.to_be_bytes());
        record.extend_from_slice(b"a.txt");
        client.write_all(&record).await.unwrap();

        let mut send = [0u8; 2];
        client.read_exact(&mut send).await.unwrap();
        assert_eq!(u16::from_be_bytes(send), action::SEND_FILE);

        client.write_all(&4u32.to_be_bytes()).await.unwrap();

        let object = htln_proto::FlatFileObject {
            info: htln_proto::InfoFork {
                creator: *b"TTXT",
                file_type: *b"TEXT",
                create_date: htln_proto::DateStamp::default(),
                modify_date: htln_proto::DateStamp::default(),
                name: "a.txt".to_string(),
                comment: None,
            },
            data_size: 4,
        };
        let mut header = object.header_bytes();
        header.extend_from_slice(b"data");
        client.write_all(&header).await.unwrap();
        client.write_all(TRAILING_MARKER).await.unwrap();

        let mut next = [0u8; 2];
        client.read_exact(&mut next).await.unwrap();
        assert_eq!(u16::from_be_bytes(next), action::NEXT_FILE);

        server_task.await.unwrap().unwrap();
        assert_eq!(
            tokio::fs::read(dir.path().join("sub/a.txt")).await.unwrap(),
            b"data"
        );
    }
}
