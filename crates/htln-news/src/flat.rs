//! Flat news: a single newest-first, append-only text blob, the way
//! classic Hotline servers keep `MessageBoard.txt`.
//!
//! Posts are stored newest-first in memory and on disk, separated by a
//! fixed delimiter line. The whole file is read and rewritten on every
//! post, mirroring `Config::save`'s whole-file write.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::NewsError;

const POST_SEPARATOR: &str =
    "\r-------------------------------------------------------------------\r";

/// A flat, newest-first news board backed by a single text file.
#[derive(Debug, Clone)]
pub struct FlatNewsStore {
    path: PathBuf,
    /// Posts in display order: index 0 is the newest.
    posts: Vec<String>,
}

impl FlatNewsStore {
    /// Open the store backed by `path`, loading any existing posts.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::Io` if `path` exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, NewsError> {
        let path = path.into();
        let posts = match fs::read_to_string(&path) {
            Ok(contents) if contents.is_empty() => Vec::new(),
            Ok(contents) => contents
                .split(POST_SEPARATOR)
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, posts })
    }

    /// Prepend a new post and persist the updated board.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::Io` if the file cannot be written.
    pub fn post(&mut self, text: impl Into<String>) -> Result<(), NewsError> {
        self.posts.insert(0, text.into());
        self.save()
    }

    fn save(&self) -> Result<(), NewsError> {
        fs::write(&self.path, self.posts.join(POST_SEPARATOR))?;
        Ok(())
    }

    /// The full board contents, newest post first, ready to send as a
    /// single `DATA` field.
    #[must_use]
    pub fn contents(&self) -> String {
        self.posts.join(POST_SEPARATOR)
    }

    /// Number of posts currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Whether the board has no posts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// The file this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
