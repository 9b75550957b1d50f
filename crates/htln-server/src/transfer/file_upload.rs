//! Single-file upload: receive a flattened-file-object header followed
//! by exactly `data_size` bytes, and write the DATA fork to disk.

use std::path::Path;

use htln_proto::FlatFileObject;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use super::CHUNK_SIZE;
use crate::error::Error;

/// How large a prefix to read before attempting to parse the
/// flattened-file-object header. Large enough for any realistic name and
/// comment, small enough to read in one shot without knowing the header
/// length up front.
const HEADER_PROBE_SIZE: usize = 4096;

/// Receive a single file upload: parse the header, create `dest_path`,
/// and copy the declared DATA fork bytes.
///
/// Returns whatever bytes were read past the end of the DATA fork — a
/// single `read` can return more than one logical record's worth, and
/// the caller (e.g. the folder-upload loop) needs those bytes fed back
/// in rather than dropped.
///
/// # Errors
///
/// Returns `Error::Protocol` if the header cannot be parsed, or
/// `Error::Io`/`Error::Transport` if reading or writing fails.
pub async fn receive_file(
    input: &mut (impl AsyncRead + Unpin),
    dest_path: &Path,
) -> Result<Vec<u8>, Error> {
    let mut probe = vec![0u8; HEADER_PROBE_SIZE];
    let mut filled = 0;
    loop {
        let n = input
            .read(&mut probe[filled..])
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        if n == 0 {
            break;
        }
        filled += n;
        if let Ok((object, consumed)) = FlatFileObject::decode_header(&probe[..filled]) {
            let data_size = object.data_size as usize;
            let available = filled - consumed;
            let take = available.min(data_size);
            let body_end = consumed + take;
            let tail = &probe[consumed..body_end];

            let mut file = File::create(dest_path).await.map_err(Error::from)?;
            file.write_all(tail)
                .await
                .map_err(|e| Error::transport(e.to_string()))?;

            let mut remaining = data_size - take;
            let mut buf = vec![0u8; CHUNK_SIZE];
            while remaining > 0 {
                let want = remaining.min(buf.len());
                let n = input
                    .read(&mut buf[..want])
                    .await
                    .map_err(|e| Error::transport(e.to_string()))?;
                if n == 0 {
                    return Err(Error::transport("connection closed mid-upload"));
                }
                file.write_all(&buf[..n])
                    .await
                    .map_err(|e| Error::transport(e.to_string()))?;
                remaining -= n;
            }
            return Ok(probe[body_end..filled].to_vec());
        }
        if filled == probe.len() {
            return Err(Error::protocol("flattened-file header too large"));
        }
    }
    Err(Error::protocol("connection closed before header arrived"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use htln_proto::{DateStamp, InfoFork};

    fn sample_header(data_size: u32) -> Vec<u8> {
        FlatFileObject {
            info: InfoFork {
                creator: *b"TTXT",
                file_type: *b"TEXT",
                create_date: DateStamp::default(),
                modify_date: DateStamp::default(),
                name: "upload.txt".to_string(),
                comment: None,
            },
            data_size,
        }
        .header_bytes()
    }

    #[tokio::test]
    async fn receives_header_and_exact_declared_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("upload.txt");

        let mut input = sample_header(5);
        input.extend_from_slice(b"hello");

        let leftover = receive_file(&mut input.as_slice(), &dest).await.unwrap();
        assert!(leftover.is_empty());
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn returns_bytes_read_past_the_declared_data_size() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("upload.txt");

        let mut input = sample_header(5);
        input.extend_from_slice(b"helloEXTRA");

        let leftover = receive_file(&mut input.as_slice(), &dest).await.unwrap();
        assert_eq!(leftover, b"EXTRA");
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn truncated_stream_is_a_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("upload.txt");

        let mut input = sample_header(10);
        input.extend_from_slice(b"short");

        let result = receive_file(&mut input.as_slice(), &dest).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
