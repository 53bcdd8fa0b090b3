//! Size-based fee estimation.
//!
//! The assembler charges [`FIXED_FEE`](crate::constants::FIXED_FEE) on every
//! transaction; [`estimate_fee`] is the size-based figure the fixed fee was
//! derived from, kept as a pure function for dynamic-fee callers.

use crate::constants::{
    FEE_PER_KB, INPUT_SIZE_BYTES, OUTPUT_SIZE_BYTES, TX_OVERHEAD_BYTES,
};

/// Estimated size in bytes of a P2PKH transaction.
pub fn estimate_size(num_inputs: usize, num_outputs: usize) -> u64 {
    (num_inputs as u64)
        .saturating_mul(INPUT_SIZE_BYTES)
        .saturating_add((num_outputs as u64).saturating_mul(OUTPUT_SIZE_BYTES))
        .saturating_add(TX_OVERHEAD_BYTES)
}

/// Estimated fee in satoshis: [`FEE_PER_KB`] for every started kilobyte.
///
/// Only valid for transactions with fewer than
/// [`MAX_ESTIMATE_ITEMS`](crate::constants::MAX_ESTIMATE_ITEMS) inputs and
/// outputs spending single-signature scripts. Larger transactions get an
/// underestimate; callers are expected to stay within the bound.
pub fn estimate_fee(num_inputs: usize, num_outputs: usize) -> u64 {
    estimate_size(num_inputs, num_outputs)
        .div_ceil(1000)
        .saturating_mul(FEE_PER_KB)
}
