//! Server-wide configuration: the in-memory form of `config.yaml`.
//!
//! The config *root layout* (where the YAML file lives, `-init` defaults,
//! CLI flag overlays) is `htln-cli`'s concern; this struct is the shape
//! both sides agree on: a nested `serde` struct with a
//! `#[serde(default = "...")]` per field.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Server-wide configuration, loaded once at startup and held behind an
/// `Arc` on [`crate::server::Server`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Server name, announced at login and to trackers.
    #[serde(default = "default_name")]
    pub name: String,

    /// Short server description, announced to trackers.
    #[serde(default = "default_description")]
    pub description: String,

    /// Path to the banner image served via the banner transaction.
    #[serde(default = "default_banner_path")]
    pub banner_path: PathBuf,

    /// Path to the login-agreement text pushed after a successful login.
    #[serde(default = "default_agreement_path")]
    pub agreement_path: PathBuf,

    /// Root directory the file namespace is served from.
    #[serde(default = "default_file_root")]
    pub file_root: PathBuf,

    /// Whether to announce this server to the trackers in `trackers`.
    #[serde(default)]
    pub register_with_trackers: bool,

    /// `host:port` addresses of UDP trackers to announce to.
    #[serde(default)]
    pub trackers: Vec<String>,

    /// Glob-like patterns of file names to hide from directory listings.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// `strftime`-style format used when prefixing flat-news posts.
    #[serde(default = "default_news_date_format")]
    pub news_date_format: String,

    /// Whether to preserve macOS resource forks on upload (metadata-only
    /// passthrough; this server does not execute resource-fork content).
    #[serde(default)]
    pub preserve_resource_forks: bool,

    /// Whether to advertise via Bonjour/mDNS.
    #[serde(default)]
    pub bonjour: bool,

    /// Maximum concurrent downloads permitted for a single account.
    #[serde(default = "default_max_downloads_per_user")]
    pub max_downloads_per_user: u32,

    /// Maximum concurrent downloads permitted server-wide.
    #[serde(default = "default_max_downloads_total")]
    pub max_downloads_total: u32,

    /// Interface to bind the control and transfer listeners on.
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Control-port number; the transfer port is always this plus one.
    #[serde(default = "default_control_port")]
    pub control_port: u16,

    /// Optional log file path; stderr is always also used.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// `tracing` env-filter directive string.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `host:port` to bind the optional administrative HTTP endpoint on.
    #[serde(default)]
    pub stats_addr: Option<String>,

    /// Seconds of non-keepalive inactivity before a session is marked away.
    #[serde(default = "default_idle_seconds")]
    pub idle_seconds: u32,
}

fn default_name() -> String {
    "Hotline Server".to_string()
}

fn default_description() -> String {
    "A Hotline-protocol chat and file server".to_string()
}

fn default_banner_path() -> PathBuf {
    PathBuf::from("banner.jpg")
}

fn default_agreement_path() -> PathBuf {
    PathBuf::from("Agreement.txt")
}

fn default_file_root() -> PathBuf {
    PathBuf::from("Files")
}

fn default_news_date_format() -> String {
    "%b %e, %Y %H:%M".to_string()
}

fn default_max_downloads_per_user() -> u32 {
    2
}

fn default_max_downloads_total() -> u32 {
    25
}

fn default_interface() -> String {
    "0.0.0.0".to_string()
}

fn default_control_port() -> u16 {
    5500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_idle_seconds() -> u32 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: default_description(),
            banner_path: default_banner_path(),
            agreement_path: default_agreement_path(),
            file_root: default_file_root(),
            register_with_trackers: false,
            trackers: Vec::new(),
            ignore_patterns: Vec::new(),
            news_date_format: default_news_date_format(),
            preserve_resource_forks: false,
            bonjour: false,
            max_downloads_per_user: default_max_downloads_per_user(),
            max_downloads_total: default_max_downloads_total(),
            interface: default_interface(),
            control_port: default_control_port(),
            log_file: None,
            log_level: default_log_level(),
            stats_addr: None,
            idle_seconds: default_idle_seconds(),
        }
    }
}

impl Config {
    /// The transfer-port number: always `control_port + 1`.
    #[must_use]
    pub fn transfer_port(&self) -> u16 {
        self.control_port + 1
    }

    /// `interface:control_port`, ready for `TcpListener::bind`.
    #[must_use]
    pub fn control_listen_addr(&self) -> String {
        format!("{}:{}", self.interface, self.control_port)
    }

    /// `interface:transfer_port`, ready for `TcpListener::bind`.
    #[must_use]
    pub fn transfer_listen_addr(&self) -> String {
        format!("{}:{}", self.interface, self.transfer_port())
    }
}
