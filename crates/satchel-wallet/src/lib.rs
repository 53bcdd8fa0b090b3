//! # satchel-wallet: single-address Bitcoin wallet.
//!
//! Keeps one P2PKH keypair, optionally encrypted under a password, tracks
//! its balance through a [`Ledger`](satchel_core::traits::Ledger), and pays
//! prioritized payment requests with a fixed-fee transaction that spends
//! every unspent output.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`encryption`]: AES-256-GCM with an argon2id password KDF
//! - [`cipher`]: storable string formats for encrypted keys
//! - [`keys`]: keypair, WIF, address derivation, input signing
//! - [`vault`]: password-gated key storage
//! - [`balance`]: cached balance and listener
//! - [`allocation`]: fit payment requests to available inputs
//! - [`builder`]: transaction planning, building and signing
//! - [`preferences`]: in-memory and JSON file preference stores
//! - [`config`]: wallet configuration
//! - [`wallet`]: high-level wallet composition

pub mod allocation;
pub mod balance;
pub mod builder;
pub mod cipher;
pub mod config;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod preferences;
pub mod vault;
pub mod wallet;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use allocation::allocate;
pub use balance::{BalanceListener, BalanceTracker};
pub use builder::{PlannedOutput, SendPlan, TransactionAssembler};
pub use cipher::{CipherFormat, CipherFormatKind};
pub use config::{FeeBoundPolicy, WalletConfig};
pub use error::WalletError;
pub use keys::KeyPair;
pub use preferences::{JsonFilePreferences, MemoryPreferences, StoredPreferences};
pub use vault::{KeyMaterial, KeyVault};
pub use wallet::Wallet;
