//! Transaction fields: the typed, length-prefixed payload units that make up
//! a transaction's data section.
//!
//! A field is `id(2) size(2) data(size)`, all big-endian. The tag space is a
//! flat `u16` enumeration; unknown tags are preserved by the framing layer
//! but ignored by handlers (see `Transaction::field` lookups in
//! `htln-server`).

/// Well-known field tags.
///
/// Only the tags the handler set actually reads or writes are named
/// here; any other tag still round-trips through [`Field`] untouched.
pub mod tag {
    /// Error message text on a denied/failed reply.
    pub const ERROR_TEXT: u16 = 100;
    /// Obfuscated login name.
    pub const LOGIN: u16 = 105;
    /// Obfuscated password.
    pub const PASSWORD: u16 = 106;
    /// Display name (user name).
    pub const USER_NAME: u16 = 102;
    /// 16-bit session ID of a user-list entry or target.
    pub const USER_ID: u16 = 103;
    /// 2-byte icon ID.
    pub const USER_ICON_ID: u16 = 104;
    /// 2-byte per-session flags bitmap (away/admin/refuse PM/refuse chat).
    pub const USER_FLAGS: u16 = 112;
    /// Client version bytes.
    pub const VERSION: u16 = 160;
    /// Auto-reply text for instant messages.
    pub const AUTOMATIC_RESPONSE: u16 = 215;
    /// Options bitmap sent with Agreed/SetClientUserInfo.
    pub const OPTIONS: u16 = 113;
    /// Chat or instant-message body text.
    pub const DATA: u16 = 101;
    /// Private-chat ID.
    pub const CHAT_ID: u16 = 114;
    /// Chat subject string.
    pub const CHAT_SUBJECT: u16 = 115;
    /// Presence of this field marks a ChatSend as an emote.
    pub const CHAT_OPTIONS: u16 = 109;
    /// 8-byte big-endian access bitmap, pushed at login and carried by
    /// user-admin get/set transactions.
    pub const USER_ACCESS: u16 = 110;
    /// File name, as raw on-wire bytes.
    pub const FILE_NAME: u16 = 201;
    /// File path list, as raw on-wire bytes (see [`crate::path`]).
    pub const FILE_PATH: u16 = 202;
    /// Resulting new name for a rename operation.
    pub const FILE_NEW_NAME: u16 = 204;
    /// Destination path for a move operation.
    pub const FILE_NEW_PATH: u16 = 205;
    /// File/transfer type code (creator/type 4-byte codes).
    pub const FILE_TYPE_STRING: u16 = 206;
    /// File comment text.
    pub const FILE_COMMENT: u16 = 210;
    /// A single flattened-file-list entry (name + type + size + comment).
    pub const FILE_NAME_WITH_INFO: u16 = 200;
    /// 4-byte reference number binding a setup transaction to a transfer
    /// connection.
    pub const REFERENCE_NUMBER: u16 = 250;
    /// Declared transfer size in bytes.
    pub const TRANSFER_SIZE: u16 = 251;
    /// File size in bytes.
    pub const FILE_SIZE: u16 = 252;
    /// Number of items in a folder transfer.
    pub const FOLDER_ITEM_COUNT: u16 = 220;
    /// Queued-ahead transfer count on a folder-download reply.
    pub const WAITING_COUNT: u16 = 221;
    /// Banner/server graphic reference ID.
    pub const BANNER_ID: u16 = 161;
    /// Server name, pushed on login reply.
    pub const SERVER_NAME: u16 = 162;
    /// News category/bundle path list, as raw on-wire bytes.
    pub const NEWS_PATH: u16 = 325;
    /// News article ID.
    pub const NEWS_ARTICLE_ID: u16 = 326;
    /// News article title.
    pub const NEWS_ARTICLE_TITLE: u16 = 327;
    /// News article poster name.
    pub const NEWS_ARTICLE_POSTER: u16 = 328;
    /// News article body/data.
    pub const NEWS_ARTICLE_DATA: u16 = 329;
    /// News article MIME flavor string.
    pub const NEWS_ARTICLE_FLAVOR: u16 = 330;
    /// Parent article ID to post a reply under.
    pub const NEWS_ARTICLE_PARENT_ID: u16 = 331;
    /// Target path used for create/delete category or folder.
    pub const NEWS_CATEGORY_NAME: u16 = 322;
}

/// One `id(2) size(2) data(size)` field inside a transaction's data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field's 16-bit tag; see [`tag`] for known values.
    pub id: u16,
    /// The field's raw payload bytes.
    pub data: Vec<u8>,
}

impl Field {
    /// Build a field from raw bytes.
    #[must_use]
    pub fn new(id: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Build a field carrying a big-endian `u16`.
    #[must_use]
    pub fn u16(id: u16, value: u16) -> Self {
        Self::new(id, value.to_be_bytes().to_vec())
    }

    /// Build a field carrying a big-endian `u32`.
    #[must_use]
    pub fn u32(id: u16, value: u32) -> Self {
        Self::new(id, value.to_be_bytes().to_vec())
    }

    /// Interpret the payload as a big-endian `u16`, if long enough.
    #[must_use]
    pub fn as_u16(&self) -> Option<u16> {
        self.data
            .get(0..2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    /// Interpret the payload as a big-endian `u32`, if long enough.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        self.data
            .get(0..4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// On-wire encoded length: `2 (id) + 2 (size) + data.len()`.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        4 + self.data.len()
    }

    /// Write this field's wire bytes into `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_be_bytes());
        out.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.data);
    }
}

/// Apply the per-byte login/password obfuscation transform.
///
/// `encoded = 255 - cleartext`. This is an involution: applying it twice
/// returns the original bytes.
#[must_use]
pub fn obfuscate_user_string(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| 255 - b).collect()
}
