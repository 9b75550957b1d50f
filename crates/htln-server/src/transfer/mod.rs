//! The file-transfer subserver: a second listener on `controlPort + 1`
//! that consummates transfers set up on the control connection.

pub mod file_download;
pub mod file_upload;
pub mod folder_download;
pub mod folder_upload;
pub mod pending;
pub mod subserver;

pub use pending::{PendingTransfer, PendingTransferTable, TransferKind};

/// Chunk size used when streaming file bytes over the transfer
/// connection.
pub const CHUNK_SIZE: usize = 1024;

use chrono::{Datelike, Local, Timelike};
use htln_proto::DateStamp;
use std::time::SystemTime;

/// Convert a filesystem timestamp into the protocol's 8-byte date stamp
/// (local calendar year, seconds since local midnight).
#[must_use]
pub fn date_stamp_from_systemtime(time: SystemTime) -> DateStamp {
    let datetime: chrono::DateTime<Local> = time.into();
    let seconds_since_midnight =
        datetime.hour() * 3600 + datetime.minute() * 60 + datetime.second();
    DateStamp {
        year: datetime.year().clamp(0, i32::from(u16::MAX)) as u16,
        ms: 0,
        seconds: seconds_since_midnight,
    }
}

