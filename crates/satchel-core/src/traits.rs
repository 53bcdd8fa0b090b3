//! Collaborator interfaces for the wallet.
//!
//! - [`Preferences`]: persistent per-field key/value storage
//! - [`Ledger`]: block-explorer reads and transaction broadcast
//!
//! Both are asynchronous and fallible; the wallet propagates their errors
//! unchanged and never retries.

use async_trait::async_trait;

use crate::error::{LedgerError, PreferencesError};
use crate::types::UnspentSet;

/// Persistent storage of the wallet's four fields.
///
/// Each getter returns the field's default (empty string, `false`, `0`) when
/// nothing has been stored yet. Each setter either completes or fails; there
/// is no multi-field transaction.
#[async_trait]
pub trait Preferences: Send + Sync {
    async fn address(&self) -> Result<String, PreferencesError>;
    async fn set_address(&self, address: &str) -> Result<(), PreferencesError>;

    /// Stored key material: a WIF string or a ciphertext string, depending
    /// on [`is_encrypted`](Self::is_encrypted).
    async fn private_key(&self) -> Result<String, PreferencesError>;
    async fn set_private_key(&self, key: &str) -> Result<(), PreferencesError>;

    async fn is_encrypted(&self) -> Result<bool, PreferencesError>;
    async fn set_is_encrypted(&self, encrypted: bool) -> Result<(), PreferencesError>;

    /// Last balance seen on the ledger, in satoshis.
    async fn last_balance(&self) -> Result<u64, PreferencesError>;
    async fn set_last_balance(&self, balance: u64) -> Result<(), PreferencesError>;
}

/// Remote view of the blockchain for one address.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Unspent outputs of `address`, confirmed and unconfirmed.
    async fn unspent_outputs(&self, address: &str) -> Result<UnspentSet, LedgerError>;

    /// Confirmed balance of `address` in satoshis.
    async fn balance(&self, address: &str) -> Result<u64, LedgerError>;

    /// Submit a hex-encoded signed transaction. Returns the transaction hash
    /// reported by the ledger.
    async fn broadcast(&self, tx_hex: &str) -> Result<String, LedgerError>;
}
