//! The on-disk config root: where `config.yaml` and its sibling files
//! live, and the `-init` logic that scaffolds a fresh one.

use std::fs;
use std::path::{Path, PathBuf};

use htln_server::Config;

/// File names fixed relative to a config root.
pub const CONFIG_FILE: &str = "config.yaml";
const AGREEMENT_FILE: &str = "Agreement.txt";
const MESSAGE_BOARD_FILE: &str = "MessageBoard.txt";
const THREADED_NEWS_FILE: &str = "ThreadedNews.yaml";
const USERS_DIR: &str = "Users";
const FILES_DIR: &str = "Files";
const BANNER_FILE: &str = "banner.jpg";

/// A config root: a directory holding `config.yaml` plus the server's
/// other on-disk state.
pub struct ConfigRoot {
    root: PathBuf,
}

impl ConfigRoot {
    /// Reference an existing (or not-yet-created) config root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The default config root: `./htln-data` relative to the current
    /// working directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from("htln-data")
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Load `config.yaml` from this root.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let contents = fs::read_to_string(self.config_path())?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Scaffold a fresh config root: `config.yaml` with defaults plus
    /// empty sibling files and directories, refusing to overwrite an
    /// existing `config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config.yaml` already exists, or if any file
    /// or directory cannot be created.
    pub fn init(&self, server_name: Option<String>) -> anyhow::Result<Config> {
        fs::create_dir_all(&self.root)?;
        if self.config_path().exists() {
            anyhow::bail!("{} already exists; refusing to overwrite", self.config_path().display());
        }

        let mut config = Config {
            banner_path: self.root.join(BANNER_FILE),
            agreement_path: self.root.join(AGREEMENT_FILE),
            file_root: self.root.join(FILES_DIR),
            ..Config::default()
        };
        if let Some(name) = server_name {
            config.name = name;
        }

        fs::write(self.config_path(), serde_yaml::to_string(&config)?)?;
        fs::write(self.root.join(AGREEMENT_FILE), "Welcome. By connecting you agree to the house rules.\n")?;
        fs::write(self.root.join(MESSAGE_BOARD_FILE), "")?;
        fs::write(
            self.root.join(THREADED_NEWS_FILE),
            serde_yaml::to_string(&htln_news::ThreadedNews::new())?,
        )?;
        fs::create_dir_all(self.root.join(USERS_DIR))?;
        fs::create_dir_all(&config.file_root)?;

        Ok(config)
    }

    /// Path to the per-login account directory.
    #[must_use]
    pub fn users_dir(&self) -> PathBuf {
        self.root.join(USERS_DIR)
    }

    /// Path to the flat-news board file.
    #[must_use]
    pub fn message_board_path(&self) -> PathBuf {
        self.root.join(MESSAGE_BOARD_FILE)
    }

    /// Path to the threaded-news tree file.
    #[must_use]
    pub fn threaded_news_path(&self) -> PathBuf {
        self.root.join(THREADED_NEWS_FILE)
    }

    /// Whether `config.yaml` exists at this root.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().exists()
    }

    /// The root directory itself.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_scaffolds_every_sibling_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = ConfigRoot::new(dir.path().join("data"));

        let config = root.init(Some("Test Server".to_string())).unwrap();
        assert_eq!(config.name, "Test Server");
        assert!(root.config_path().exists());
        assert!(dir.path().join("data").join(AGREEMENT_FILE).exists());
        assert!(dir.path().join("data").join(MESSAGE_BOARD_FILE).exists());
        assert!(dir.path().join("data").join(THREADED_NEWS_FILE).exists());
        assert!(root.users_dir().is_dir());
        assert!(config.file_root.is_dir());
    }

    #[test]
    fn init_refuses_to_overwrite_an_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = ConfigRoot::new(dir.path().join("data"));
        root.init(None).unwrap();

        assert!(root.init(None).is_err());
    }

    #[test]
    fn load_config_round_trips_what_init_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let root = ConfigRoot::new(dir.path().join("data"));
        let written = root.init(None).unwrap();

        let loaded = root.load_config().unwrap();
        assert_eq!(loaded, written);
    }
}
