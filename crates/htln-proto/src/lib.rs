//! The Hotline wire protocol: framing, fields, access control, path
//! safety, and the flattened-file object.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Transaction (transaction.rs)                                 │
//! │   header: flags/isReply/type/id/errorCode/totalSize/dataSize │
//! │   fields: Vec<Field> (field.rs)                               │
//! └─────────────────────────────────────────────────────────────┘
//!                │                              │
//!                ▼                              ▼
//!     access.rs: AccessBits              path.rs: PathList
//!     (64-bit permission bitmap)         (on-wire path segments,
//!                                         root-escape checks)
//!
//! flat_file.rs: FlatFileObject — the INFO/DATA fork envelope streamed
//! ahead of a single file's bytes on the transfer connection.
//! ```
//!
//! Callers (`htln-server`) read bytes off a TCP socket, hand them to
//! [`Transaction::decode_all`], and get back zero or more complete
//! transactions plus the byte offset of any partial tail to carry into
//! the next read.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod error;
pub mod field;
pub mod flat_file;
pub mod path;
pub mod transaction;
pub mod txn_type;

pub use access::{AccessBit, AccessBits, RequiredAccess};
pub use error::{FlatFileError, FrameError, PathError};
pub use field::{obfuscate_user_string, Field};
pub use flat_file::{
    creator_type_for, extension_override, DateStamp, FlatFileObject, InfoFork, DEFAULT_CREATOR,
    DEFAULT_TYPE,
};
pub use path::{validate_segment, PathList};
pub use transaction::Transaction;
