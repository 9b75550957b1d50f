//! The flattened-file object: the on-wire envelope used by single-file
//! transfers, carrying an INFO fork (metadata) and a DATA fork (raw
//! bytes).
//!
//! The DATA fork's bytes are never held in memory here — callers stream
//! them directly to/from the transfer socket once [`FlatFileObject::decode_header`]
//! or [`FlatFileObject::header_bytes`] has handled the fixed-size preamble.

use crate::error::FlatFileError;

const MAGIC: [u8; 4] = *b"FILP";
const FORMAT_VERSION: u16 = 1;

/// An 8-byte date stamp: year, a reserved millisecond field, and seconds
/// since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateStamp {
    /// Calendar year.
    pub year: u16,
    /// Reserved/milliseconds field, passed through unchanged.
    pub ms: u16,
    /// Seconds since local midnight.
    pub seconds: u32,
}

impl DateStamp {
    /// Decode from 8 big-endian bytes.
    #[must_use]
    pub fn decode(buf: &[u8; 8]) -> Self {
        Self {
            year: u16::from_be_bytes([buf[0], buf[1]]),
            ms: u16::from_be_bytes([buf[2], buf[3]]),
            seconds: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }

    /// Encode to 8 big-endian bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..2].copy_from_slice(&self.year.to_be_bytes());
        out[2..4].copy_from_slice(&self.ms.to_be_bytes());
        out[4..8].copy_from_slice(&self.seconds.to_be_bytes());
        out
    }
}

/// Default creator/type codes used when no extension override applies.
pub const DEFAULT_CREATOR: [u8; 4] = *b"TTXT";
/// Default creator/type codes used when no extension override applies.
pub const DEFAULT_TYPE: [u8; 4] = *b"TEXT";

/// Look up the extension-indexed creator/type override table.
///
/// Matching is case-insensitive on the extension (without the leading dot).
#[must_use]
pub fn extension_override(extension: &str) -> Option<([u8; 4], [u8; 4])> {
    match extension.to_ascii_lowercase().as_str() {
        "sit" => Some((*b"SIT!", *b"SIT!")),
        "jpg" | "jpeg" => Some((*b"ogle", *b"JPEG")),
        "gif" => Some((*b"ogle", *b"GIFf")),
        "txt" => Some((DEFAULT_CREATOR, DEFAULT_TYPE)),
        "zip" => Some((*b"ZIP ", *b"ZIP ")),
        _ => None,
    }
}

/// Resolve the creator/type codes to use for `file_name`.
#[must_use]
pub fn creator_type_for(file_name: &str) -> ([u8; 4], [u8; 4]) {
    file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| extension_override(ext))
        .unwrap_or((DEFAULT_CREATOR, DEFAULT_TYPE))
}

/// The INFO fork: file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoFork {
    /// 4-byte creator code.
    pub creator: [u8; 4],
    /// 4-byte type code.
    pub file_type: [u8; 4],
    /// Creation timestamp.
    pub create_date: DateStamp,
    /// Last-modified timestamp.
    pub modify_date: DateStamp,
    /// File name as it should appear to the client.
    pub name: String,
    /// Optional free-text comment.
    pub comment: Option<String>,
}

impl InfoFork {
    /// Encode the fork body (not including the outer fork type/size header).
    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        let name_bytes = self.name.as_bytes();
        let comment_bytes = self.comment.as_deref().unwrap_or("").as_bytes();

        let mut buf = Vec::with_capacity(8 + 16 + 2 + name_bytes.len() + 2 + comment_bytes.len());
        buf.extend_from_slice(&self.creator);
        buf.extend_from_slice(&self.file_type);
        buf.extend_from_slice(&self.create_date.encode());
        buf.extend_from_slice(&self.modify_date.encode());
        buf.extend_from_slice(&(name_bytes.len() as u16).to_be_bytes());
        buf.extend_from_slice(name_bytes);
        buf.extend_from_slice(&(comment_bytes.len() as u16).to_be_bytes());
        buf.extend_from_slice(comment_bytes);
        buf
    }

    /// Decode a fork body produced by [`Self::encode_body`].
    ///
    /// # Errors
    ///
    /// Returns `FlatFileError::Truncated` if `buf` ends before a declared
    /// field is fully present.
    pub fn decode_body(buf: &[u8]) -> Result<Self, FlatFileError> {
        if buf.len() < 24 {
            return Err(FlatFileError::Truncated("info fork fixed fields"));
        }
        let mut creator = [0u8; 4];
        creator.copy_from_slice(&buf[0..4]);
        let mut file_type = [0u8; 4];
        file_type.copy_from_slice(&buf[4..8]);
        let create_date = DateStamp::decode(buf[8..16].try_into().unwrap());
        let modify_date = DateStamp::decode(buf[16..24].try_into().unwrap());

        let mut cursor = 24;
        if cursor + 2 > buf.len() {
            return Err(FlatFileError::Truncated("info fork name length"));
        }
        let name_len = u16::from_be_bytes([buf[cursor], buf[cursor + 1]]) as usize;
        cursor += 2;
        if cursor + name_len > buf.len() {
            return Err(FlatFileError::Truncated("info fork name"));
        }
        let name = String::from_utf8_lossy(&buf[cursor..cursor + name_len]).into_owned();
        cursor += name_len;

        if cursor + 2 > buf.len() {
            return Err(FlatFileError::Truncated("info fork comment length"));
        }
        let comment_len = u16::from_be_bytes([buf[cursor], buf[cursor + 1]]) as usize;
        cursor += 2;
        if cursor + comment_len > buf.len() {
            return Err(FlatFileError::Truncated("info fork comment"));
        }
        let comment_bytes = &buf[cursor..cursor + comment_len];
        let comment = if comment_bytes.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(comment_bytes).into_owned())
        };

        Ok(Self {
            creator,
            file_type,
            create_date,
            modify_date,
            name,
            comment,
        })
    }
}

/// A flattened-file object header: magic, version, INFO fork, and the
/// DATA fork's declared size (the DATA fork's bytes are streamed
/// separately by the transfer subserver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatFileObject {
    /// File metadata.
    pub info: InfoFork,
    /// Declared size of the DATA fork, in bytes.
    pub data_size: u32,
}

impl FlatFileObject {
    /// Encode the header: magic, version, INFO fork (type+size+body), and
    /// the DATA fork's type+size (no body — the caller streams that).
    #[must_use]
    pub fn header_bytes(&self) -> Vec<u8> {
        let info_body = self.info.encode_body();

        let mut buf = Vec::with_capacity(8 + 8 + info_body.len() + 8);
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        buf.extend_from_slice(&2u16.to_be_bytes()); // fork count: INFO + DATA

        buf.extend_from_slice(b"INFO");
        buf.extend_from_slice(&(info_body.len() as u32).to_be_bytes());
        buf.extend_from_slice(&info_body);

        buf.extend_from_slice(b"DATA");
        buf.extend_from_slice(&self.data_size.to_be_bytes());

        buf
    }

    /// Decode the header from `buf`, returning the object and the number
    /// of header bytes consumed. The DATA fork's body is *not* consumed —
    /// the caller reads exactly `data_size` further bytes from the
    /// transfer stream.
    ///
    /// # Errors
    ///
    /// Returns `FlatFileError::BadMagic` if the leading 4 bytes are not
    /// `FILP`, or `FlatFileError::Truncated` if a fork header/body runs
    /// past the buffer.
    pub fn decode_header(buf: &[u8]) -> Result<(Self, usize), FlatFileError> {
        if buf.len() < 8 {
            return Err(FlatFileError::Truncated("fixed header"));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if magic != MAGIC {
            return Err(FlatFileError::BadMagic(magic));
        }
        // buf[4..6] is the format version; not currently branched on.
        let fork_count = u16::from_be_bytes([buf[6], buf[7]]);

        let mut cursor = 8;
        let mut info: Option<InfoFork> = None;
        let mut data_size: Option<u32> = None;

        for _ in 0..fork_count {
            if cursor + 8 > buf.len() {
                return Err(FlatFileError::Truncated("fork header"));
            }
            let fork_type = &buf[cursor..cursor + 4];
            let fork_size = u32::from_be_bytes(buf[cursor + 4..cursor + 8].try_into().unwrap());
            cursor += 8;

            match fork_type {
                b"INFO" => {
                    let size = fork_size as usize;
                    if cursor + size > buf.len() {
                        return Err(FlatFileError::Truncated("info fork body"));
                    }
                    info = Some(InfoFork::decode_body(&buf[cursor..cursor + size])?);
                    cursor += size;
                }
                b"DATA" => {
                    // Body is streamed separately; only the header is consumed here.
                    data_size = Some(fork_size);
                }
                _ => {
                    // Unknown fork: skip its declared body if present within buf.
                    let size = fork_size as usize;
                    if cursor + size > buf.len() {
                        return Err(FlatFileError::Truncated("unknown fork body"));
                    }
                    cursor += size;
                }
            }
        }

        let info = info.ok_or(FlatFileError::Truncated("missing INFO fork"))?;
        let data_size = data_size.ok_or(FlatFileError::Truncated("missing DATA fork"))?;

        Ok((Self { info, data_size }, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_object(data_size: u32) -> FlatFileObject {
        FlatFileObject {
            info: InfoFork {
                creator: DEFAULT_CREATOR,
                file_type: DEFAULT_TYPE,
                create_date: DateStamp {
                    year: 2026,
                    ms: 0,
                    seconds: 3600,
                },
                modify_date: DateStamp {
                    year: 2026,
                    ms: 0,
                    seconds: 7200,
                },
                name: "hello.txt".to_string(),
                comment: Some("a test file".to_string()),
            },
            data_size,
        }
    }

    #[test]
    fn header_roundtrip() {
        let obj = sample_object(1024);
        let bytes = obj.header_bytes();
        let (decoded, consumed) = FlatFileObject::decode_header(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, obj);
    }

    #[test]
    fn header_roundtrip_without_comment() {
        let mut obj = sample_object(0);
        obj.info.comment = None;
        let bytes = obj.header_bytes();
        let (decoded, _) = FlatFileObject::decode_header(&bytes).unwrap();
        assert_eq!(decoded.info.comment, None);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_object(0).header_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            FlatFileObject::decode_header(&bytes),
            Err(FlatFileError::BadMagic(_))
        ));
    }

    #[test]
    fn extension_overrides_apply() {
        assert_eq!(creator_type_for("archive.sit"), (*b"SIT!", *b"SIT!"));
        assert_eq!(creator_type_for("photo.JPG"), (*b"ogle", *b"JPEG"));
        assert_eq!(
            creator_type_for("readme"),
            (DEFAULT_CREATOR, DEFAULT_TYPE)
        );
    }

    #[test]
    fn date_stamp_roundtrip() {
        let stamp = DateStamp {
            year: 1999,
            ms: 42,
            seconds: 86399,
        };
        assert_eq!(DateStamp::decode(&stamp.encode()), stamp);
    }
}
