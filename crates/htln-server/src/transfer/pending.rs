//! The pending-transfer table: reference-number-keyed transfer setup
//! records, consumed when the client opens the transfer connection.

use dashmap::DashMap;
use rand::RngCore;

/// What kind of transfer a reference number was allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Client is downloading a single file.
    FileDownload,
    /// Client is uploading a single file.
    FileUpload,
    /// Client is downloading a directory tree.
    FolderDownload,
    /// Client is uploading a directory tree.
    FolderUpload,
}

/// A transfer awaiting its matching transfer-connection.
#[derive(Debug, Clone)]
pub struct PendingTransfer {
    /// The 4-byte reference number the client will present.
    pub reference: u32,
    /// Which transfer state machine handles this reference.
    pub kind: TransferKind,
    /// File or folder name, as sent by the client (raw bytes).
    pub name: Vec<u8>,
    /// Path segments locating the target relative to the file root.
    pub path: Vec<Vec<u8>>,
    /// Session that set up this transfer, for logging.
    pub session_id: u16,
    /// For folder uploads: total bytes the client declared up front.
    pub declared_size: Option<u64>,
    /// For folder uploads: total item count the client declared up front.
    pub declared_item_count: Option<u32>,
}

/// Allocates and tracks pending transfers, keyed by a random, unique
/// 4-byte reference number.
///
/// A `DashMap` is appropriate here (unlike the session table): no
/// ordering guarantee is required, only that a reference is present at
/// most once and removal is atomic.
#[derive(Debug, Default)]
pub struct PendingTransferTable {
    transfers: DashMap<u32, PendingTransfer>,
}

impl PendingTransferTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, currently-unused reference number and record
    /// `transfer` under it.
    #[must_use]
    pub fn insert(
        &self,
        kind: TransferKind,
        name: Vec<u8>,
        path: Vec<Vec<u8>>,
        session_id: u16,
        declared_size: Option<u64>,
        declared_item_count: Option<u32>,
    ) -> u32 {
        loop {
            let reference = rand::thread_rng().next_u32();
            if reference == 0 {
                continue;
            }
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.transfers.entry(reference) {
                slot.insert(PendingTransfer {
                    reference,
                    kind,
                    name,
                    path,
                    session_id,
                    declared_size,
                    declared_item_count,
                });
                return reference;
            }
        }
    }

    /// Atomically remove and return the transfer registered under
    /// `reference`, if any.
    pub fn take(&self, reference: u32) -> Option<PendingTransfer> {
        self.transfers.remove(&reference).map(|(_, v)| v)
    }

    /// Number of transfers currently pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    /// Whether no transfers are currently pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }
}
