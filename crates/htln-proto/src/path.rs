//! On-wire file-path lists and path safety.
//!
//! Wire layout: `itemCount(2)` then `itemCount` items of
//! `reserved(2, zero) len(1) bytes(len)`. Decoding yields an ordered list
//! of path segments that the server joins relative to a configured files
//! root — and the root must never be escaped.

use crate::error::PathError;
use std::path::{Component, Path, PathBuf};

/// An ordered, as-received list of path segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathList {
    /// Segments in wire order (outermost first).
    pub segments: Vec<Vec<u8>>,
}

impl PathList {
    /// Build a path list from already-decoded segments.
    #[must_use]
    pub fn new(segments: Vec<Vec<u8>>) -> Self {
        Self { segments }
    }

    /// Decode a path list from its on-wire bytes.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Truncated` if the declared item count runs past
    /// the end of the buffer.
    pub fn decode(buf: &[u8]) -> Result<Self, PathError> {
        if buf.len() < 2 {
            return Err(PathError::Truncated {
                declared: 0,
                parsed: 0,
            });
        }
        let item_count = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        let mut cursor = 2;
        let mut segments = Vec::with_capacity(item_count);

        for parsed in 0..item_count {
            if cursor + 3 > buf.len() {
                return Err(PathError::Truncated {
                    declared: item_count,
                    parsed,
                });
            }
            // buf[cursor..cursor+2] is the reserved zero field; not validated.
            let len = buf[cursor + 2] as usize;
            cursor += 3;
            if cursor + len > buf.len() {
                return Err(PathError::Truncated {
                    declared: item_count,
                    parsed,
                });
            }
            segments.push(buf[cursor..cursor + len].to_vec());
            cursor += len;
        }

        Ok(Self { segments })
    }

    /// Encode this path list to its on-wire bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.segments.len() as u16).to_be_bytes());
        for seg in &self.segments {
            buf.extend_from_slice(&[0, 0]);
            buf.push(seg.len() as u8);
            buf.extend_from_slice(seg);
        }
        buf
    }

    /// Resolve this path list against `root`, rejecting any segment that
    /// contains the host path separator, `..`, or a NUL byte.
    ///
    /// # Errors
    ///
    /// Returns `PathError::Unsafe` if any segment is not a plain,
    /// single-level name, or if the segment bytes are not valid UTF-8.
    pub fn resolve(&self, root: &Path) -> Result<PathBuf, PathError> {
        let mut resolved = root.to_path_buf();
        for seg in &self.segments {
            let name = std::str::from_utf8(seg)
                .map_err(|_| PathError::Unsafe("non-UTF-8 path segment".to_string()))?;
            validate_segment(name)?;
            resolved.push(name);
        }
        Ok(resolved)
    }
}

/// Reject a single path segment containing a separator, `..`, or NUL.
///
/// # Errors
///
/// Returns `PathError::Unsafe` describing the offending segment.
pub fn validate_segment(name: &str) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::Unsafe("empty path segment".to_string()));
    }
    if name.contains('\0') {
        return Err(PathError::Unsafe(format!("NUL byte in segment {name:?}")));
    }
    if name == ".." {
        return Err(PathError::Unsafe("'..' path segment".to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(PathError::Unsafe(format!(
            "path separator in segment {name:?}"
        )));
    }
    // Guard against a single segment sneaking in multiple components
    // (e.g. platform-specific prefixes) via std::path::Component parsing.
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(PathError::Unsafe(format!("unsafe path segment {name:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let list = PathList::new(vec![b"foo".to_vec(), b"bar.txt".to_vec()]);
        let bytes = list.encode();
        let decoded = PathList::decode(&bytes).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn rejects_dotdot_segment() {
        let list = PathList::new(vec![b"..".to_vec()]);
        assert!(list.resolve(Path::new("/srv/files")).is_err());
    }

    #[test]
    fn rejects_separator_in_segment() {
        let list = PathList::new(vec![b"a/b".to_vec()]);
        assert!(list.resolve(Path::new("/srv/files")).is_err());
    }

    #[test]
    fn rejects_nul_byte() {
        let list = PathList::new(vec![b"a\0b".to_vec()]);
        assert!(list.resolve(Path::new("/srv/files")).is_err());
    }

    #[test]
    fn resolves_nested_path_under_root() {
        let list = PathList::new(vec![b"foo".to_vec(), b"bar".to_vec()]);
        let resolved = list.resolve(Path::new("/srv/files")).unwrap();
        assert_eq!(resolved, Path::new("/srv/files/foo/bar"));
    }

    #[test]
    fn decode_rejects_truncated_buffer() {
        let buf = [0u8, 1]; // claims 1 item, no item bytes follow
        assert!(matches!(
            PathList::decode(&buf),
            Err(PathError::Truncated { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_parse_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
                let _ = PathList::decode(&data);
            }

            #[test]
            fn prop_segment_with_separator_is_always_unsafe(
                prefix in "[a-z]{1,4}",
                suffix in "[a-z]{1,4}",
            ) {
                let segment = format!("{prefix}/{suffix}");
                prop_assert!(validate_segment(&segment).is_err());
            }
        }
    }
}
