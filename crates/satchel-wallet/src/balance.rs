//! Cached balance with a single change listener.

use std::fmt;
use std::sync::Arc;

use satchel_core::traits::{Ledger, Preferences};
use tracing::debug;

use crate::error::WalletError;

/// Callback invoked with the balance in satoshis whenever it is set.
pub type BalanceListener = Box<dyn FnMut(u64) + Send + Sync>;

/// Reconciles the persisted last-known balance with the ledger.
pub struct BalanceTracker {
    prefs: Arc<dyn Preferences>,
    ledger: Arc<dyn Ledger>,
    balance: u64,
    listener: Option<BalanceListener>,
}

impl BalanceTracker {
    pub fn new(prefs: Arc<dyn Preferences>, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            prefs,
            ledger,
            balance: 0,
            listener: None,
        }
    }

    /// Last value seen, in satoshis.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Replace the registered listener.
    pub fn set_listener(&mut self, listener: impl FnMut(u64) + Send + Sync + 'static) {
        self.listener = Some(Box::new(listener));
    }

    fn set(&mut self, balance: u64) {
        self.balance = balance;
        if let Some(listener) = self.listener.as_mut() {
            listener(balance);
        }
    }

    /// Seed the in-memory balance from the persisted value and notify.
    pub async fn load_cached(&mut self) -> Result<u64, WalletError> {
        let cached = self.prefs.last_balance().await?;
        self.set(cached);
        Ok(cached)
    }

    /// Publish the cached balance, then fetch the live one, persist it and
    /// publish again. The listener sees both values even when they match.
    ///
    /// Returns `Ok(None)` without touching anything when `address` is `None`.
    /// `confirmations` is accepted for future use and does not change the
    /// query.
    pub async fn refresh(
        &mut self,
        address: Option<&str>,
        confirmations: u32,
    ) -> Result<Option<u64>, WalletError> {
        let Some(address) = address else {
            return Ok(None);
        };
        let cached = self.load_cached().await?;

        let live = self.ledger.balance(address).await?;
        self.prefs.set_last_balance(live).await?;
        self.set(live);

        debug!(%address, cached, live, confirmations, "balance refreshed");
        Ok(Some(live))
    }

    /// Zero the balance, persist it and notify.
    pub async fn reset(&mut self) -> Result<(), WalletError> {
        self.prefs.set_last_balance(0).await?;
        self.set(0);
        Ok(())
    }
}

impl fmt::Debug for BalanceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalanceTracker")
            .field("balance", &self.balance)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}
