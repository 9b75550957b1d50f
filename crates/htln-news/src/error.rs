//! News storage errors.

use thiserror::Error;

/// Errors returned by [`crate::threaded::ThreadedNews`] and
/// [`crate::flat::FlatNewsStore`].
#[derive(Debug, Error)]
pub enum NewsError {
    /// No bundle or category exists at the given path.
    #[error("no news node named {0:?} at this path")]
    NotFound(String),

    /// A bundle or category already exists with this name at this path.
    #[error("news node {0:?} already exists at this path")]
    AlreadyExists(String),

    /// The path names a category where a bundle was expected.
    #[error("{0:?} is a category, not a bundle")]
    NotABundle(String),

    /// The path names a bundle where a category was expected.
    #[error("{0:?} is a bundle, not a category")]
    NotACategory(String),

    /// No article exists with the given ID in this category.
    #[error("no article with id {0}")]
    ArticleNotFound(u32),

    /// Reading or writing a news file failed.
    #[error("news file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A news file failed to parse, or an in-memory tree failed to
    /// serialize.
    #[error("news file is malformed: {0}")]
    Serde(#[from] serde_yaml::Error),
}
