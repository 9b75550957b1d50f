//! User account storage for the Hotline server: one YAML file per login,
//! bcrypt-hashed passwords, and the 64-bit access bitmap defined in
//! `htln-proto`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod error;
pub mod store;

pub use account::Account;
pub use error::AccountError;
pub use store::AccountStore;
