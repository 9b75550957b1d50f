//! Error types for the Hotline wire protocol.

use thiserror::Error;

/// Frame and field-level parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer than the fixed 22-byte transaction prefix was available.
    #[error("transaction prefix too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Minimum required bytes.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The declared `dataSize` runs past the end of the supplied buffer.
    #[error("declared data size {data_size} exceeds available buffer ({available} bytes)")]
    Incomplete {
        /// Declared `dataSize`.
        data_size: usize,
        /// Bytes available after the header.
        available: usize,
    },

    /// The field section's total encoded length did not equal `dataSize - 2`.
    #[error("field section length mismatch: frame declares {declared}, fields occupy {actual}")]
    FieldSectionMismatch {
        /// Declared field-section length.
        declared: usize,
        /// Actual length consumed by decoded fields.
        actual: usize,
    },

    /// A field's declared size reaches past the remaining buffer.
    #[error("field {field_id} declares size {size} but only {available} bytes remain")]
    FieldOverflow {
        /// The field's 16-bit tag.
        field_id: u16,
        /// The field's declared size.
        size: usize,
        /// Bytes actually remaining in the buffer.
        available: usize,
    },
}

/// Path-list parsing and path-safety errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The on-wire item count claims more items than the buffer can hold.
    #[error("path list declares {declared} items but buffer is exhausted after {parsed}")]
    Truncated {
        /// Declared item count.
        declared: usize,
        /// Items successfully parsed before running out of bytes.
        parsed: usize,
    },

    /// A path segment attempted to escape the configured file root.
    #[error("path segment is unsafe: {0}")]
    Unsafe(String),
}

/// Flattened-file object parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlatFileError {
    /// The 4-byte format magic did not match `FILP`.
    #[error("bad flattened-file magic: {0:?}")]
    BadMagic([u8; 4]),

    /// A fork header or body ran past the end of the buffer.
    #[error("flattened-file object truncated while reading {0}")]
    Truncated(&'static str),
}
