//! Wallet data types: unspent outputs, payment requests, allocation results.
//!
//! All monetary values are in satoshis.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A spendable output belonging to the wallet address, as reported by the
/// ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnspentOutput {
    /// Hex transaction hash of the transaction that created the output.
    pub tx_hash: String,
    /// Index of the output within that transaction.
    pub output_index: u32,
    /// Hex locking script of the output.
    pub script: String,
    /// Output value in satoshis.
    pub value: u64,
}

/// Unspent outputs for one address, split by confirmation status.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UnspentSet {
    pub confirmed: Vec<UnspentOutput>,
    pub unconfirmed: Vec<UnspentOutput>,
}

impl UnspentSet {
    /// Flatten into one list, unconfirmed outputs first, keeping only the
    /// first output seen for each transaction hash.
    ///
    /// Because unconfirmed entries come first they win collisions with
    /// confirmed entries. Later outputs of an already-seen transaction are
    /// dropped as well.
    pub fn deduped(self) -> Vec<UnspentOutput> {
        let mut seen = HashSet::new();
        self.unconfirmed
            .into_iter()
            .chain(self.confirmed)
            .filter(|utxo| seen.insert(utxo.tx_hash.clone()))
            .collect()
    }

    /// Total number of outputs before deduplication.
    pub fn len(&self) -> usize {
        self.confirmed.len() + self.unconfirmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A payment the caller wants made. Requests are processed in order; earlier
/// entries have priority over later ones.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Destination address string.
    pub destination: String,
    /// Requested amount in satoshis.
    pub amount: u64,
}

impl PaymentRequest {
    pub fn new(destination: impl Into<String>, amount: u64) -> Self {
        Self {
            destination: destination.into(),
            amount,
        }
    }
}

/// Outcome of output allocation: the inputs consumed and the (possibly
/// truncated) payments they fund.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationResult {
    /// Inputs consumed, in the order they were taken.
    pub selected_inputs: Vec<UnspentOutput>,
    /// Prefix of the requested payments, the last one possibly reduced.
    pub satisfied_outputs: Vec<PaymentRequest>,
    /// Sum of `selected_inputs` values.
    pub total_inputs: u64,
    /// Sum of `satisfied_outputs` amounts.
    pub total_outputs: u64,
}

impl AllocationResult {
    pub fn is_empty(&self) -> bool {
        self.selected_inputs.is_empty() && self.satisfied_outputs.is_empty()
    }

    /// Value left for fee and change.
    pub fn surplus(&self) -> u64 {
        self.total_inputs.saturating_sub(self.total_outputs)
    }
}
