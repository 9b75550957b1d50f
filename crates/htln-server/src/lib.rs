//! The Hotline server: process-wide state, the control and transfer
//! listeners, request dispatch, and the optional admin HTTP/tracker
//! sidecars.
//!
//! `htln-cli` owns process startup (config loading, logging init,
//! spawning the pieces below); this crate is the library they drive.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod admin_http;
pub mod chat;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod fs_namespace;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod session;
pub mod tracker;
pub mod transfer;

pub use config::Config;
pub use error::Error;
pub use server::Server;
