//! In-crate test doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use satchel_core::error::LedgerError;
use satchel_core::traits::Ledger;
use satchel_core::types::{UnspentOutput, UnspentSet};

/// Ledger returning fixed answers and recording broadcasts.
#[derive(Default)]
pub struct StaticLedger {
    pub unspent: UnspentSet,
    pub balance: u64,
    pub failure: Option<LedgerError>,
    pub broadcasts: Mutex<Vec<String>>,
}

impl StaticLedger {
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    pub fn with_confirmed(values: &[u64]) -> Self {
        Self {
            unspent: UnspentSet {
                confirmed: values
                    .iter()
                    .enumerate()
                    .map(|(i, &value)| utxo(i as u8, value))
                    .collect(),
                unconfirmed: vec![],
            },
            ..Self::default()
        }
    }

    pub fn failing(error: LedgerError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), LedgerError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Unspent output with a transaction hash derived from `tag`.
pub fn utxo(tag: u8, value: u64) -> UnspentOutput {
    UnspentOutput {
        tx_hash: format!("{tag:02x}").repeat(32),
        output_index: 0,
        script: String::new(),
        value,
    }
}

#[async_trait]
impl Ledger for StaticLedger {
    async fn unspent_outputs(&self, _address: &str) -> Result<UnspentSet, LedgerError> {
        self.check()?;
        Ok(self.unspent.clone())
    }

    async fn balance(&self, _address: &str) -> Result<u64, LedgerError> {
        self.check()?;
        Ok(self.balance)
    }

    async fn broadcast(&self, tx_hex: &str) -> Result<String, LedgerError> {
        self.check()?;
        self.broadcasts.lock().push(tx_hex.to_string());
        Ok("00".repeat(32))
    }
}
