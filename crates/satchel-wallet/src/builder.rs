//! Fixed-fee transaction assembly and signing.
//!
//! Assembly happens in three steps:
//! 1. [`TransactionAssembler::plan`] spends every unspent output, pays the
//!    requests that fit after the fixed fee, and attaches change
//! 2. [`TransactionAssembler::build`] turns the plan into an unsigned
//!    transaction
//! 3. [`TransactionAssembler::sign`] signs every input with the wallet key

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use satchel_core::constants::{DUST_THRESHOLD, FIXED_FEE, MAX_EFFECTIVE_FEE, MIN_SPENDABLE};
use satchel_core::error::LedgerError;
use satchel_core::types::{PaymentRequest, UnspentOutput};
use tracing::{debug, warn};

use crate::config::FeeBoundPolicy;
use crate::error::WalletError;
use crate::keys::{KeyPair, parse_address};

/// A transaction output to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub address: Address,
    /// Amount in satoshis.
    pub amount: u64,
}

/// Everything decided about a send before signing.
#[derive(Debug, Clone)]
pub struct SendPlan {
    /// Outputs being spent, in input order.
    pub inputs: Vec<UnspentOutput>,
    /// Payments that fit, in request order.
    pub payments: Vec<PlannedOutput>,
    /// Change back to the wallet, if above dust.
    pub change: Option<PlannedOutput>,
    /// Miner fee: inputs minus outputs.
    pub fee: u64,
}

impl SendPlan {
    pub fn total_inputs(&self) -> u64 {
        self.inputs.iter().map(|u| u.value).sum()
    }

    pub fn total_outputs(&self) -> u64 {
        self.outputs().map(|o| o.amount).sum()
    }

    /// Payments followed by change.
    pub fn outputs(&self) -> impl Iterator<Item = &PlannedOutput> {
        self.payments.iter().chain(self.change.iter())
    }
}

/// Builds and signs transactions for one network under a fee-bound policy.
#[derive(Debug, Clone, Copy)]
pub struct TransactionAssembler {
    network: Network,
    fee_policy: FeeBoundPolicy,
}

impl TransactionAssembler {
    pub fn new(network: Network, fee_policy: FeeBoundPolicy) -> Self {
        Self {
            network,
            fee_policy,
        }
    }

    /// Decide inputs, payments and change for `requests`.
    ///
    /// Every entry of `unspent` becomes an input. After the fixed fee,
    /// requests at or below the dust threshold are dropped and the rest are
    /// paid in order until one would overdraw; that one and all later ones
    /// are skipped. Change at or below dust is left to the miner. When no
    /// request is payable the plan sends everything after the fee back as
    /// change; only a plan with no outputs at all is rejected.
    pub fn plan(
        &self,
        requests: &[PaymentRequest],
        unspent: Vec<UnspentOutput>,
        change_address: &Address,
    ) -> Result<SendPlan, WalletError> {
        let total_available: u64 = unspent.iter().map(|u| u.value).sum();
        if total_available < MIN_SPENDABLE {
            return Err(WalletError::InsufficientFunds {
                have: total_available,
                need: MIN_SPENDABLE,
            });
        }
        let spendable = total_available - FIXED_FEE;

        let mut payments = Vec::new();
        let mut spent: u64 = 0;
        for request in requests.iter().filter(|r| r.amount > DUST_THRESHOLD) {
            let Some(next) = spent.checked_add(request.amount).filter(|&n| n <= spendable) else {
                debug!(
                    amount = request.amount,
                    spent, spendable, "request would overdraw, stopping"
                );
                break;
            };
            payments.push(PlannedOutput {
                address: parse_address(&request.destination, self.network)?,
                amount: request.amount,
            });
            spent = next;
        }

        let change_value = spendable - spent;
        let change = (change_value > DUST_THRESHOLD).then(|| PlannedOutput {
            address: change_address.clone(),
            amount: change_value,
        });
        if payments.is_empty() && change.is_none() {
            return Err(WalletError::NoOutputs);
        }

        let outputs_total = spent + change.as_ref().map_or(0, |c| c.amount);
        let fee = total_available - outputs_total;
        self.check_fee_bound(fee)?;

        Ok(SendPlan {
            inputs: unspent,
            payments,
            change,
            fee,
        })
    }

    /// Reject or warn about a fee above [`MAX_EFFECTIVE_FEE`], per policy.
    pub fn check_fee_bound(&self, fee: u64) -> Result<(), WalletError> {
        if fee <= MAX_EFFECTIVE_FEE {
            return Ok(());
        }
        match self.fee_policy {
            FeeBoundPolicy::Enforce => Err(WalletError::MalformedTransaction {
                fee,
                max: MAX_EFFECTIVE_FEE,
            }),
            FeeBoundPolicy::Advisory => {
                warn!(fee, max = MAX_EFFECTIVE_FEE, "fee exceeds bound, sending anyway");
                Ok(())
            }
        }
    }

    /// Unsigned version 1 transaction for `plan`.
    pub fn build(&self, plan: &SendPlan) -> Result<Transaction, WalletError> {
        let input = plan
            .inputs
            .iter()
            .map(|utxo| -> Result<TxIn, WalletError> {
                let txid = Txid::from_str(&utxo.tx_hash).map_err(|e| {
                    LedgerError::InvalidResponse(format!("tx hash {}: {e}", utxo.tx_hash))
                })?;
                Ok(TxIn {
                    previous_output: OutPoint {
                        txid,
                        vout: utxo.output_index,
                    },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = plan
            .outputs()
            .map(|o| TxOut {
                value: Amount::from_sat(o.amount),
                script_pubkey: o.address.script_pubkey(),
            })
            .collect();

        Ok(Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input,
            output,
        })
    }

    /// Sign every input with `keypair`.
    pub fn sign(mut tx: Transaction, keypair: &KeyPair) -> Result<Transaction, WalletError> {
        for index in 0..tx.input.len() {
            keypair.sign_input(&mut tx, index)?;
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::utxo;

    const WIF_ONE: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
    const DEST: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

    fn assembler() -> TransactionAssembler {
        TransactionAssembler::new(Network::Bitcoin, FeeBoundPolicy::Enforce)
    }

    fn own_address() -> Address {
        KeyPair::from_wif(WIF_ONE).unwrap().address()
    }

    fn unspent(values: &[u64]) -> Vec<UnspentOutput> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| utxo(i as u8 + 1, v))
            .collect()
    }

    #[test]
    fn exact_payment_no_change() {
        let plan = assembler()
            .plan(&[PaymentRequest::new(DEST, 10_000)], unspent(&[20_000]), &own_address())
            .unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.payments.len(), 1);
        assert!(plan.change.is_none());
        assert_eq!(plan.fee, FIXED_FEE);
    }

    #[test]
    fn below_fee_plus_dust_is_insufficient() {
        let err = assembler()
            .plan(&[PaymentRequest::new(DEST, 10_000)], unspent(&[15_000]), &own_address())
            .unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientFunds {
                have: 15_000,
                need: 15_430
            }
        );
    }

    #[test]
    fn overdrawing_request_skipped_and_change_returned() {
        let requests = [
            PaymentRequest::new(DEST, 50_000),
            PaymentRequest::new(DEST, 60_000),
        ];
        let plan = assembler()
            .plan(&requests, unspent(&[100_000]), &own_address())
            .unwrap();
        assert_eq!(plan.payments.len(), 1);
        assert_eq!(plan.payments[0].amount, 50_000);
        let change = plan.change.as_ref().unwrap();
        assert_eq!(change.amount, 40_000);
        assert_eq!(change.address, own_address());
        assert_eq!(plan.fee, FIXED_FEE);
    }

    #[test]
    fn stops_at_first_overdraw() {
        let requests = [
            PaymentRequest::new(DEST, 90_000),
            PaymentRequest::new(DEST, 6_000),
        ];
        let plan = assembler()
            .plan(&requests, unspent(&[100_000]), &own_address())
            .unwrap();
        assert_eq!(plan.payments.len(), 1);
        assert!(plan.change.is_none());
    }

    #[test]
    fn dust_requests_dropped() {
        let requests = [
            PaymentRequest::new(DEST, DUST_THRESHOLD),
            PaymentRequest::new(DEST, 20_000),
        ];
        let plan = assembler()
            .plan(&requests, unspent(&[50_000]), &own_address())
            .unwrap();
        assert_eq!(plan.payments.len(), 1);
        assert_eq!(plan.payments[0].amount, 20_000);
    }

    #[test]
    fn only_dust_becomes_change_only() {
        let plan = assembler()
            .plan(&[PaymentRequest::new(DEST, 1_000)], unspent(&[50_000]), &own_address())
            .unwrap();
        assert!(plan.payments.is_empty());
        assert_eq!(plan.change.as_ref().unwrap().amount, 40_000);
        assert_eq!(plan.fee, FIXED_FEE);
    }

    #[test]
    fn nothing_payable_becomes_change_only() {
        let plan = assembler()
            .plan(&[PaymentRequest::new(DEST, 45_000)], unspent(&[50_000]), &own_address())
            .unwrap();
        assert!(plan.payments.is_empty());
        assert_eq!(plan.change.as_ref().unwrap().amount, 40_000);
    }

    #[test]
    fn no_payment_and_dust_change_is_no_outputs() {
        let err = assembler()
            .plan(&[PaymentRequest::new(DEST, 1_000)], unspent(&[MIN_SPENDABLE]), &own_address())
            .unwrap_err();
        assert_eq!(err, WalletError::NoOutputs);
    }

    #[test]
    fn dust_change_left_to_miner() {
        let plan = assembler()
            .plan(&[PaymentRequest::new(DEST, 35_000)], unspent(&[50_000]), &own_address())
            .unwrap();
        assert!(plan.change.is_none());
        assert_eq!(plan.fee, FIXED_FEE + 5_000);
    }

    #[test]
    fn invalid_destination() {
        let err = assembler()
            .plan(&[PaymentRequest::new("nope", 20_000)], unspent(&[50_000]), &own_address())
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(_)));
    }

    #[test]
    fn wrong_network_destination() {
        let err = TransactionAssembler::new(Network::Testnet, FeeBoundPolicy::Enforce)
            .plan(&[PaymentRequest::new(DEST, 20_000)], unspent(&[50_000]), &own_address())
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(_)));
    }

    #[test]
    fn fee_bound_policies() {
        let over = MAX_EFFECTIVE_FEE + 1;
        assert_eq!(
            assembler().check_fee_bound(over).unwrap_err(),
            WalletError::MalformedTransaction {
                fee: over,
                max: MAX_EFFECTIVE_FEE
            }
        );
        let advisory = TransactionAssembler::new(Network::Bitcoin, FeeBoundPolicy::Advisory);
        assert!(advisory.check_fee_bound(over).is_ok());
        assert!(assembler().check_fee_bound(MAX_EFFECTIVE_FEE).is_ok());
    }

    #[test]
    fn build_and_sign_spends_all_inputs() {
        let keypair = KeyPair::from_wif(WIF_ONE).unwrap();
        let requests = [PaymentRequest::new(DEST, 30_000)];
        let plan = assembler()
            .plan(&requests, unspent(&[20_000, 25_000, 15_000]), &keypair.address())
            .unwrap();

        let tx = assembler().build(&plan).unwrap();
        assert_eq!(tx.input.len(), 3);
        assert_eq!(tx.output.len(), 2);
        assert_eq!(tx.output[0].value, Amount::from_sat(30_000));
        assert_eq!(tx.output[1].value, Amount::from_sat(20_000));
        assert_eq!(tx.output[1].script_pubkey, keypair.script_pubkey());
        assert_eq!(tx.input[1].previous_output.vout, 0);

        let signed = TransactionAssembler::sign(tx, &keypair).unwrap();
        for i in 0..signed.input.len() {
            assert!(keypair.verify_input(&signed, i));
        }
        assert_eq!(plan.total_inputs() - plan.total_outputs(), plan.fee);
    }

    #[test]
    fn build_rejects_bad_tx_hash() {
        let mut inputs = unspent(&[50_000]);
        inputs[0].tx_hash = "zz".into();
        let plan = assembler()
            .plan(&[PaymentRequest::new(DEST, 20_000)], inputs, &own_address())
            .unwrap();
        let err = assembler().build(&plan).unwrap_err();
        assert!(matches!(
            err,
            WalletError::Ledger(LedgerError::InvalidResponse(_))
        ));
    }
}
