//! Wallet constants. All monetary values in satoshis (1 BTC = 10^8 satoshis).

pub const COIN: u64 = 100_000_000;

/// Mining fee deducted from every transaction the wallet assembles.
pub const FIXED_FEE: u64 = 10_000;

/// Outputs at or below this value are never created.
///
/// Payment requests at or below it are dropped, and change at or below it is
/// left to the miner.
pub const DUST_THRESHOLD: u64 = 5_430;

/// Smallest wallet balance that can fund a transaction: the fee plus one
/// above-dust output.
pub const MIN_SPENDABLE: u64 = FIXED_FEE + DUST_THRESHOLD;

/// Upper bound on the effective fee (inputs minus outputs) of an assembled
/// transaction. The remainder below dust may be left to the miner on top of
/// the fixed fee, nothing more.
pub const MAX_EFFECTIVE_FEE: u64 = FIXED_FEE + DUST_THRESHOLD;

/// Confirmation depth assumed by balance refreshes when none is given.
pub const DEFAULT_CONFIRMATIONS: u32 = 6;

/// Estimated serialized size of one signed P2PKH input, in bytes.
pub const INPUT_SIZE_BYTES: u64 = 181;

/// Estimated serialized size of one P2PKH output, in bytes.
pub const OUTPUT_SIZE_BYTES: u64 = 34;

/// Fixed transaction overhead (version, counts, lock time), in bytes.
pub const TX_OVERHEAD_BYTES: u64 = 10;

/// Fee charged per started kilobyte by the estimator.
pub const FEE_PER_KB: u64 = 10_000;

/// Fee estimates are only meaningful below this many inputs or outputs,
/// where the var-int counts stay one byte wide.
pub const MAX_ESTIMATE_ITEMS: usize = 253;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_spendable_is_fee_plus_dust() {
        assert_eq!(MIN_SPENDABLE, 15_430);
    }

    #[test]
    fn dust_below_fee() {
        assert!(DUST_THRESHOLD < FIXED_FEE);
    }
}
