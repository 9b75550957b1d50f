//! The server-level error taxonomy: what a handler returns, and how the
//! dispatcher turns it into a reply or a torn-down session.

use thiserror::Error;

/// A handler- or connection-level failure, categorized by how the
/// dispatcher must react to it.
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// Malformed frame or path list.
    #[error("{0}")]
    Protocol(String),

    /// Bad login, missing account, or insufficient access.
    #[error("{0}")]
    Auth(String),

    /// File, folder, article, or target session does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An account already exists under the requested login.
    #[error("{0}")]
    Conflict(String),

    /// A filesystem operation failed.
    #[error("{0}")]
    Io(String),

    /// The connection itself is no longer usable.
    #[error("{0}")]
    Transport(String),
}

impl Error {
    /// Build a `Protocol` error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build an `Auth` error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Build a `NotFound` error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a `Conflict` error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Build a `Transport` error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// The human-readable message to surface to the client as an `error`
    /// field, or `None` if this error kind never reaches the wire.
    ///
    /// `IOError` is deliberately generic here: filesystem failures reach
    /// the client as "cannot complete" rather than leaking path or OS
    /// error detail.
    #[must_use]
    pub fn client_message(&self) -> Option<&str> {
        match self {
            Self::Protocol(m) | Self::Auth(m) | Self::NotFound(m) | Self::Conflict(m) => {
                Some(m.as_str())
            }
            Self::Io(_) => Some("Cannot complete operation."),
            Self::Transport(_) => None,
        }
    }

    /// Whether this error requires closing the session: a transport
    /// failure always does, since the connection itself is no longer
    /// usable.
    #[must_use]
    pub fn closes_session(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<htln_proto::FrameError> for Error {
    fn from(e: htln_proto::FrameError) -> Self {
        Self::Protocol(e.to_string())
    }
}

impl From<htln_proto::PathError> for Error {
    fn from(e: htln_proto::PathError) -> Self {
        Self::NotFound(e.to_string())
    }
}

impl From<htln_accounts::AccountError> for Error {
    fn from(e: htln_accounts::AccountError) -> Self {
        match e {
            htln_accounts::AccountError::NotFound(_) => Self::Auth("Incorrect login.".to_string()),
            htln_accounts::AccountError::AlreadyExists(login) => {
                Self::Conflict(format!("Account {login:?} already exists."))
            }
            other => Self::Io(other.to_string()),
        }
    }
}

impl From<htln_news::NewsError> for Error {
    fn from(e: htln_news::NewsError) -> Self {
        match e {
            htln_news::NewsError::NotFound(_)
            | htln_news::NewsError::ArticleNotFound(_)
            | htln_news::NewsError::NotABundle(_)
            | htln_news::NewsError::NotACategory(_) => Self::NotFound(e.to_string()),
            htln_news::NewsError::AlreadyExists(_) => Self::Conflict(e.to_string()),
            htln_news::NewsError::Io(_) | htln_news::NewsError::Serde(_) => {
                Self::Io(e.to_string())
            }
        }
    }
}
