//! Wallet composition: key vault, balance tracking and sending.
//!
//! The [`Wallet`] owns all wallet state. Mutating operations take
//! `&mut self`; callers sharing a wallet across tasks wrap it themselves.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bitcoin::Txid;
use bitcoin::consensus::encode::serialize_hex;
use satchel_core::traits::{Ledger, Preferences};
use satchel_core::types::{PaymentRequest, UnspentOutput};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::balance::BalanceTracker;
use crate::builder::{SendPlan, TransactionAssembler};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::keys::parse_address;
use crate::vault::KeyVault;

/// A single-address wallet backed by a preferences store and a ledger.
pub struct Wallet {
    config: WalletConfig,
    ledger: Arc<dyn Ledger>,
    vault: KeyVault,
    balance: BalanceTracker,
    assembler: TransactionAssembler,
}

impl Wallet {
    /// Create a wallet with no address. Use [`restore`](Self::restore),
    /// [`generate_address`](Self::generate_address) or
    /// [`import_address`](Self::import_address) next.
    pub fn new(config: WalletConfig, prefs: Arc<dyn Preferences>, ledger: Arc<dyn Ledger>) -> Self {
        let vault = KeyVault::new(prefs.clone(), config.cipher_format, config.network);
        let balance = BalanceTracker::new(prefs, ledger.clone());
        let assembler = TransactionAssembler::new(config.network, config.fee_policy);
        Self {
            config,
            ledger,
            vault,
            balance,
            assembler,
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn address(&self) -> Option<&str> {
        self.vault.address()
    }

    /// Last known balance in satoshis.
    pub fn balance(&self) -> u64 {
        self.balance.balance()
    }

    pub fn is_encrypted(&self) -> bool {
        self.vault.is_encrypted()
    }

    /// Register the single balance listener, replacing any previous one.
    pub fn set_balance_listener(&mut self, listener: impl FnMut(u64) + Send + Sync + 'static) {
        self.balance.set_listener(listener);
    }

    /// Load the saved address and key, and publish the cached balance.
    /// Does not contact the ledger.
    pub async fn restore(&mut self) -> Result<(), WalletError> {
        self.vault.restore().await?;
        self.balance.load_cached().await?;
        Ok(())
    }

    /// Replace the wallet with a freshly generated key.
    pub async fn generate_address(&mut self) -> Result<String, WalletError> {
        let address = self.vault.generate().await?;
        self.balance.reset().await?;
        Ok(address)
    }

    /// Replace the wallet key with an imported WIF key.
    pub async fn import_address(&mut self, password: &str, wif: &str) -> Result<String, WalletError> {
        let address = self.vault.import(password, wif).await?;
        self.balance.reset().await?;
        Ok(address)
    }

    pub fn validate_password(&self, password: &str) -> bool {
        self.vault.validate_password(password)
    }

    pub fn decrypt(&self, password: &str) -> Option<Zeroizing<String>> {
        self.vault.decrypt(password)
    }

    pub async fn update_password(
        &mut self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), WalletError> {
        self.vault.update_password(old_password, new_password).await
    }

    /// Publish the cached balance, then fetch, persist and publish the live
    /// one. `Ok(None)` when there is no address yet.
    pub async fn refresh_balance(&mut self) -> Result<Option<u64>, WalletError> {
        self.balance
            .refresh(self.vault.address(), self.config.confirmations)
            .await
    }

    /// Unspent outputs of the wallet address, unconfirmed first, one per
    /// transaction hash.
    pub async fn unspent_outputs(&self) -> Result<Vec<UnspentOutput>, WalletError> {
        let address = self.vault.address().ok_or(WalletError::NoAddress)?;
        Ok(self.ledger.unspent_outputs(address).await?.deduped())
    }

    /// Work out what [`send`](Self::send) would do, without a password and
    /// without broadcasting.
    pub async fn plan_send(&self, payments: &[PaymentRequest]) -> Result<SendPlan, WalletError> {
        if payments.is_empty() {
            return Err(WalletError::NoOutputs);
        }
        let address = self.vault.address().ok_or(WalletError::NoAddress)?;
        let change_address = parse_address(address, self.config.network)?;
        let unspent = self.unspent_outputs().await?;
        self.assembler.plan(payments, unspent, &change_address)
    }

    /// Pay `payments` in priority order from the wallet's unspent outputs.
    ///
    /// An empty `payments` list is rejected before any future is created.
    /// The returned future resolves to the id of the broadcast transaction.
    pub fn send<'a>(
        &'a self,
        payments: Vec<PaymentRequest>,
        password: &'a str,
    ) -> Result<impl Future<Output = Result<Txid, WalletError>> + 'a, WalletError> {
        if payments.is_empty() {
            return Err(WalletError::NoOutputs);
        }
        Ok(self.sign_and_broadcast(payments, password))
    }

    async fn sign_and_broadcast(
        &self,
        payments: Vec<PaymentRequest>,
        password: &str,
    ) -> Result<Txid, WalletError> {
        if self.vault.address().is_none() {
            return Err(WalletError::NoAddress);
        }
        let keypair = self.vault.keypair(password)?;
        let own_address = keypair.address();

        let unspent = self
            .ledger
            .unspent_outputs(&own_address.to_string())
            .await?
            .deduped();
        let plan = self.assembler.plan(&payments, unspent, &own_address)?;
        let tx = TransactionAssembler::sign(self.assembler.build(&plan)?, &keypair)?;
        let txid = tx.compute_txid();

        let reported = self.ledger.broadcast(&serialize_hex(&tx)).await?;
        if reported != txid.to_string() {
            warn!(%txid, %reported, "ledger reported a different transaction hash");
        }
        info!(
            %txid,
            inputs = plan.inputs.len(),
            payments = plan.payments.len(),
            change = plan.change.as_ref().map_or(0, |c| c.amount),
            fee = plan.fee,
            "transaction broadcast"
        );
        Ok(txid)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("config", &self.config)
            .field("vault", &self.vault)
            .field("balance", &self.balance)
            .finish()
    }
}
