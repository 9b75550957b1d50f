//! On-disk account storage: one YAML file per login under a `Users/`
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::account::Account;
use crate::error::AccountError;

const FILE_EXTENSION: &str = "yaml";

/// Loads and persists [`Account`]s as individual YAML files under a
/// configured root directory.
///
/// Account files are read and written whole, the same way
/// `htln-cli`'s server config round-trips its YAML file: no partial
/// updates, no journaling.
#[derive(Debug, Clone)]
pub struct AccountStore {
    root: PathBuf,
}

impl AccountStore {
    /// Open a store rooted at `root`. The directory is created if it does
    /// not already exist.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Io` if `root` cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, AccountError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, login: &str) -> Result<PathBuf, AccountError> {
        htln_proto::validate_segment(login)
            .map_err(|_| AccountError::InvalidLogin(login.to_string()))?;
        Ok(self.root.join(format!("{login}.{FILE_EXTENSION}")))
    }

    /// Load the account for `login`.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if no file exists, or
    /// `AccountError::Serde` if the file is malformed.
    pub fn load(&self, login: &str) -> Result<Account, AccountError> {
        let path = self.path_for(login)?;
        let contents = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AccountError::NotFound(login.to_string())
            } else {
                AccountError::Io(e)
            }
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Persist `account`, overwriting any existing file for its login.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Io` or `AccountError::Serde` on failure.
    pub fn save(&self, account: &Account) -> Result<(), AccountError> {
        let path = self.path_for(&account.login)?;
        let yaml = serde_yaml::to_string(account)?;
        fs::write(&path, yaml)?;
        debug!(login = %account.login, "wrote account file");
        Ok(())
    }

    /// Create a new account, failing if one already exists for this login.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::AlreadyExists` if a file for this login is
    /// already present.
    pub fn create(&self, account: &Account) -> Result<(), AccountError> {
        let path = self.path_for(&account.login)?;
        if path.exists() {
            return Err(AccountError::AlreadyExists(account.login.clone()));
        }
        self.save(account)
    }

    /// Delete the account for `login`.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if no file exists for this login.
    pub fn delete(&self, login: &str) -> Result<(), AccountError> {
        let path = self.path_for(login)?;
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AccountError::NotFound(login.to_string())
            } else {
                AccountError::Io(e)
            }
        })?;
        debug!(login = %login, "deleted account file");
        Ok(())
    }

    /// Whether an account file exists for `login`.
    #[must_use]
    pub fn exists(&self, login: &str) -> bool {
        self.path_for(login)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    /// List every login currently stored, in directory-listing order (not
    /// guaranteed sorted).
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Io` if the root directory cannot be read.
    pub fn list_logins(&self) -> Result<Vec<String>, AccountError> {
        let mut logins = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => logins.push(stem.to_string()),
                None => warn!(path = %path.display(), "skipping account file with non-UTF-8 name"),
            }
        }
        Ok(logins)
    }

    /// The directory this store reads and writes.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htln_proto::AccessBits;

    #[test]
    fn create_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::open(dir.path()).unwrap();
        let account = Account::new("alice", "Alice", "hunter2", AccessBits::all()).unwrap();

        store.create(&account).unwrap();
        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded, account);
    }

    #[test]
    fn create_rejects_duplicate_login() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::open(dir.path()).unwrap();
        let account = Account::new("alice", "Alice", "hunter2", AccessBits::none()).unwrap();

        store.create(&account).unwrap();
        assert!(matches!(
            store.create(&account),
            Err(AccountError::AlreadyExists(_))
        ));
    }

    #[test]
    fn load_missing_login_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.load("nobody"),
            Err(AccountError::NotFound(_))
        ));
    }

    #[test]
    fn rejects_unsafe_login_as_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.load("../escape"),
            Err(AccountError::InvalidLogin(_))
        ));
    }

    #[test]
    fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::open(dir.path()).unwrap();
        let account = Account::new("alice", "Alice", "hunter2", AccessBits::none()).unwrap();
        store.create(&account).unwrap();

        store.delete("alice").unwrap();
        assert!(!store.exists("alice"));
    }

    #[test]
    fn list_logins_reflects_created_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::open(dir.path()).unwrap();
        store
            .create(&Account::new("alice", "Alice", "pw", AccessBits::none()).unwrap())
            .unwrap();
        store
            .create(&Account::new("bob", "Bob", "pw", AccessBits::none()).unwrap())
            .unwrap();

        let mut logins = store.list_logins().unwrap();
        logins.sort();
        assert_eq!(logins, vec!["alice".to_string(), "bob".to_string()]);
    }
}
