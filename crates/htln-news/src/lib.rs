//! News storage for the Hotline server: a threaded (tree) store for the
//! News window, and a flat append-only board for the legacy message
//! board.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod flat;
pub mod threaded;

pub use error::NewsError;
pub use flat::FlatNewsStore;
pub use threaded::{Article, Bundle, Category, NewsNode, ThreadedNews};
