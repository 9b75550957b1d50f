//! A single user account: login, display name, password hash, and
//! permission bitmap.

use htln_proto::AccessBits;
use serde::{Deserialize, Serialize};

use crate::error::AccountError;

const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// A persisted user account.
///
/// The login is the account's key (and the stem of its YAML file on
/// disk); it is immutable once created. Everything else can be edited
/// via [`crate::store::AccountStore::update`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Login name used to authenticate. Never shown to other users.
    pub login: String,
    /// Display name shown to other users when no per-session name is set.
    pub name: String,
    /// Bcrypt hash of the account's password.
    pub password_hash: String,
    /// 64-bit permission bitmap.
    #[serde(with = "access_bits_as_u64")]
    pub access: AccessBits,
}

impl Account {
    /// Build a new account, hashing `password` with bcrypt.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Hash` if bcrypt hashing fails.
    pub fn new(
        login: impl Into<String>,
        name: impl Into<String>,
        password: &str,
        access: AccessBits,
    ) -> Result<Self, AccountError> {
        let password_hash = bcrypt::hash(password, BCRYPT_COST)?;
        Ok(Self {
            login: login.into(),
            name: name.into(),
            password_hash,
            access,
        })
    }

    /// Check `password` against this account's stored hash.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Hash` if the stored hash is malformed (never
    /// true for hashes produced by [`Account::new`] or
    /// [`Account::set_password`]).
    pub fn verify_password(&self, password: &str) -> Result<bool, AccountError> {
        Ok(bcrypt::verify(password, &self.password_hash)?)
    }

    /// Replace this account's password.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Hash` if bcrypt hashing fails.
    pub fn set_password(&mut self, password: &str) -> Result<(), AccountError> {
        self.password_hash = bcrypt::hash(password, BCRYPT_COST)?;
        Ok(())
    }
}

/// Serialize/deserialize `AccessBits` as a plain `u64` so the YAML file
/// reads as a single integer field instead of a nested struct.
mod access_bits_as_u64 {
    use htln_proto::AccessBits;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bits: &AccessBits, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(bits.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<AccessBits, D::Error> {
        Ok(AccessBits(u64::deserialize(d)?))
    }
}
