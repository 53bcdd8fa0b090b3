//! Shared test helpers for end-to-end wallet tests.

use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::Transaction;
use bitcoin::consensus::encode::deserialize_hex;
use parking_lot::Mutex;
use satchel_core::error::LedgerError;
use satchel_core::traits::Ledger;
use satchel_core::types::{UnspentOutput, UnspentSet};
use satchel_wallet::{MemoryPreferences, Wallet, WalletConfig};

/// Private key 1 (compressed, mainnet).
pub const WIF_ONE: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
/// Address of [`WIF_ONE`].
pub const ADDR_ONE: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";
/// An unrelated mainnet destination.
pub const DEST_A: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";
/// A second unrelated mainnet destination.
pub const DEST_B: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

/// Ledger with scripted answers that records every broadcast.
#[derive(Default)]
pub struct MockLedger {
    unspent: Mutex<UnspentSet>,
    balance: Mutex<u64>,
    broadcast_error: Mutex<Option<LedgerError>>,
    broadcasts: Mutex<Vec<String>>,
    queried: Mutex<Vec<String>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unspent(&self, set: UnspentSet) {
        *self.unspent.lock() = set;
    }

    pub fn set_confirmed(&self, outputs: Vec<UnspentOutput>) {
        self.unspent.lock().confirmed = outputs;
    }

    pub fn set_balance(&self, balance: u64) {
        *self.balance.lock() = balance;
    }

    /// Make the next broadcasts fail with `error`.
    pub fn reject_broadcasts(&self, error: LedgerError) {
        *self.broadcast_error.lock() = Some(error);
    }

    /// Raw hex of every accepted broadcast.
    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().clone()
    }

    /// Every accepted broadcast, decoded.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.broadcasts
            .lock()
            .iter()
            .map(|hex| deserialize_hex(hex).expect("broadcast is a valid transaction"))
            .collect()
    }

    /// Addresses passed to `unspent_outputs`.
    pub fn queried_addresses(&self) -> Vec<String> {
        self.queried.lock().clone()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn unspent_outputs(&self, address: &str) -> Result<UnspentSet, LedgerError> {
        self.queried.lock().push(address.to_string());
        Ok(self.unspent.lock().clone())
    }

    async fn balance(&self, _address: &str) -> Result<u64, LedgerError> {
        Ok(*self.balance.lock())
    }

    async fn broadcast(&self, tx_hex: &str) -> Result<String, LedgerError> {
        if let Some(e) = self.broadcast_error.lock().clone() {
            return Err(e);
        }
        self.broadcasts.lock().push(tx_hex.to_string());
        let tx: Transaction =
            deserialize_hex(tx_hex).map_err(|e| LedgerError::Rejected(e.to_string()))?;
        Ok(tx.compute_txid().to_string())
    }
}

/// Unspent output with a transaction hash derived from `tag`.
pub fn utxo(tag: u8, vout: u32, value: u64) -> UnspentOutput {
    UnspentOutput {
        tx_hash: format!("{tag:02x}").repeat(32),
        output_index: vout,
        script: "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac".into(),
        value,
    }
}

/// Confirmed outputs with distinct transaction hashes.
pub fn confirmed(values: &[u64]) -> Vec<UnspentOutput> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| utxo(i as u8 + 1, 0, value))
        .collect()
}

/// A wallet holding [`WIF_ONE`] with the given confirmed outputs.
pub async fn funded_wallet(
    values: &[u64],
) -> (Wallet, Arc<MockLedger>, Arc<MemoryPreferences>) {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_confirmed(confirmed(values));
    let prefs = Arc::new(MemoryPreferences::new());
    let mut wallet = Wallet::new(WalletConfig::default(), prefs.clone(), ledger.clone());
    wallet
        .import_address("", WIF_ONE)
        .await
        .expect("import known key");
    (wallet, ledger, prefs)
}
