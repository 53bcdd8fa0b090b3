//! Wallet error types.

use satchel_core::error::{LedgerError, PreferencesError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The password does not decrypt the stored private key.
    #[error("incorrect password")]
    IncorrectPassword,

    /// The supplied private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// A send was requested with no payable outputs.
    #[error("no outputs")]
    NoOutputs,

    /// Available funds cannot cover the mining fee plus one above-dust output.
    #[error(
        "available funds [{have}] must exceed the mining fee plus minimum output [{need}]"
    )]
    InsufficientFunds {
        /// Total value of the wallet's unspent outputs in satoshis.
        have: u64,
        /// Minimum spendable amount in satoshis.
        need: u64,
    },

    /// The assembled transaction would pay more than the allowed fee.
    #[error("transaction malformed, excessive fee: {fee} > {max}")]
    MalformedTransaction {
        /// Effective fee (inputs minus outputs) in satoshis.
        fee: u64,
        /// Maximum allowed fee in satoshis.
        max: u64,
    },

    /// No wallet address has been generated or imported.
    #[error("no address")]
    NoAddress,

    /// Invalid destination address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Encryption failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Ciphertext could not be decoded or authenticated.
    #[error("decryption: {0}")]
    Decryption(String),

    /// Transaction signing failure.
    #[error("signing: {0}")]
    Signing(String),

    /// Persistence failure from the preferences store.
    #[error(transparent)]
    Preferences(#[from] PreferencesError),

    /// Network failure from the ledger API.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
