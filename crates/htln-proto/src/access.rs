//! The account access bitmap: 64 named permission bits, indexed from the
//! high bit, checked as `bit(63 - index) == 1`. The special value `0`
//! ("always allow") bypasses the check entirely.

/// Index of a named permission bit within the 64-bit access word.
///
/// Indices are counted from the high bit: `bit(63 - index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AccessBit {
    /// Delete a file.
    DeleteFile = 0,
    /// Upload a file.
    UploadFile = 1,
    /// Download a file.
    DownloadFile = 2,
    /// Rename a file or folder.
    RenameFile = 3,
    /// Create a folder.
    CreateFolder = 4,
    /// Delete a folder.
    DeleteFolder = 5,
    /// Read (receive) chat.
    ReadChat = 6,
    /// Send chat.
    SendChat = 7,
    /// Open/join a private chat.
    OpenChat = 8,
    /// Appear in the connected-user list.
    ShowInList = 9,
    /// Create a user account.
    CreateUser = 10,
    /// Delete a user account.
    DeleteUser = 11,
    /// View a user account.
    OpenUser = 12,
    /// Modify a user account.
    ModifyUser = 13,
    /// Change one's own password.
    ChangeOwnPassword = 14,
    /// Send a private (instant) message.
    SendPrivateMsg = 15,
    /// Read news articles.
    ReadNewsArticle = 16,
    /// Post a news article.
    PostNewsArticle = 17,
    /// Delete a news article.
    DeleteNewsArticle = 18,
    /// Disconnect another user.
    DisconnectUser = 19,
    /// Immune to being disconnected by another admin.
    CannotBeDisconnected = 20,
    /// Read another user's client info report.
    GetClientInfo = 21,
    /// Upload outside the normal upload folder restrictions.
    UploadAnywhere = 22,
    /// Use any display name, bypassing naming restrictions.
    AnyName = 23,
    /// Skip the login agreement text.
    NoAgreement = 24,
    /// Set a file's comment.
    SetFileComment = 25,
    /// Set a folder's comment.
    SetFolderComment = 26,
    /// View drop-box folders.
    ViewDropBoxes = 27,
    /// Create an alias.
    MakeAlias = 28,
    /// Send a server-wide broadcast message.
    Broadcast = 29,
    /// Create a news folder/bundle.
    CreateNewsFolder = 30,
    /// Delete a news folder/bundle.
    DeleteNewsFolder = 31,
    /// Create a news category.
    CreateNewsCategory = 32,
    /// Delete a news category.
    DeleteNewsCategory = 33,
}

/// 64-bit per-account permission bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessBits(pub u64);

impl AccessBits {
    /// No permissions set.
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    /// All permissions set.
    #[must_use]
    pub const fn all() -> Self {
        Self(u64::MAX)
    }

    /// Check whether `bit` is granted.
    ///
    /// `bit_index == 0` special-cases to "always allow", mirroring how the
    /// handler table encodes "no access check required" by omitting a
    /// required bit rather than by checking `AccessBit::DeleteFile`.
    #[must_use]
    pub fn has(&self, bit: AccessBit) -> bool {
        self.has_index(bit as u32)
    }

    /// Check a raw bit index, as used by the always-allow sentinel.
    #[must_use]
    pub fn has_index(&self, bit_index: u32) -> bool {
        (self.0 >> (63 - bit_index)) & 1 == 1
    }

    /// Grant `bit`.
    pub fn grant(&mut self, bit: AccessBit) {
        self.0 |= 1u64 << (63 - bit as u32);
    }

    /// Revoke `bit`.
    pub fn revoke(&mut self, bit: AccessBit) {
        self.0 &= !(1u64 << (63 - bit as u32));
    }
}

/// A handler's required-access declaration. `None` means the handler is
/// "granular": it performs finer checks internally (e.g. delete-file vs
/// delete-folder based on the target's type).
pub type RequiredAccess = Option<AccessBit>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_allow_zero_bypasses_any_check() {
        let access = AccessBits::none();
        // Bit 0 is DeleteFile and is unset, but a handler with no
        // required-access bit (the all-allow sentinel) never calls has().
        assert!(!access.has(AccessBit::DeleteFile));
    }

    #[test]
    fn grant_and_check_round_trip() {
        let mut access = AccessBits::none();
        assert!(!access.has(AccessBit::UploadFile));
        access.grant(AccessBit::UploadFile);
        assert!(access.has(AccessBit::UploadFile));
        assert!(!access.has(AccessBit::DownloadFile));
    }

    #[test]
    fn revoke_clears_only_that_bit() {
        let mut access = AccessBits::all();
        access.revoke(AccessBit::Broadcast);
        assert!(!access.has(AccessBit::Broadcast));
        assert!(access.has(AccessBit::ReadChat));
    }

    #[test]
    fn high_bit_index_checked_correctly() {
        let mut access = AccessBits::none();
        access.grant(AccessBit::DeleteNewsCategory);
        assert_eq!(access.0, 1u64 << (63 - 33));
        assert!(access.has(AccessBit::DeleteNewsCategory));
    }
}
