//! Account storage errors.

use thiserror::Error;

/// Errors returned by [`crate::store::AccountStore`].
#[derive(Debug, Error)]
pub enum AccountError {
    /// No account file exists for the given login.
    #[error("no account for login {0:?}")]
    NotFound(String),

    /// An account file already exists for the given login.
    #[error("account {0:?} already exists")]
    AlreadyExists(String),

    /// The login contains characters unsafe to use as a file name.
    #[error("login {0:?} is not a valid file name component")]
    InvalidLogin(String),

    /// Reading or writing an account file failed.
    #[error("account file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// An account file failed to parse, or an in-memory account failed to
    /// serialize.
    #[error("account file is malformed: {0}")]
    Serde(#[from] serde_yaml::Error),

    /// Password hashing or verification failed.
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}
