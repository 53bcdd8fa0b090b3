//! Output allocation: fit prioritized payment requests to available inputs.
//!
//! The fee is funded first. Requests are then funded in order, pulling in
//! inputs as needed. When the inputs run out, the request being funded gets
//! whatever is left (if anything) and every later request is dropped.

use satchel_core::constants::FIXED_FEE;
use satchel_core::types::{AllocationResult, PaymentRequest, UnspentOutput};

/// Decide which `inputs` to consume and how much of each request to pay.
///
/// `requests` are in descending priority. `inputs` are consumed in the order
/// given. The returned outputs are a prefix of `requests`, minus zero-amount
/// entries, in which only the last entry may have a reduced amount.
pub fn allocate(requests: &[PaymentRequest], inputs: &[UnspentOutput]) -> AllocationResult {
    let mut remaining = inputs.iter();
    let mut selected: Vec<UnspentOutput> = Vec::new();
    let mut accumulated: u64 = 0;

    // Fee first: at least one input when any exist.
    for input in remaining.by_ref() {
        accumulated = accumulated.saturating_add(input.value);
        selected.push(input.clone());
        if accumulated >= FIXED_FEE {
            break;
        }
    }

    let mut satisfied = Vec::with_capacity(requests.len());
    let mut required = FIXED_FEE;
    'requests: for request in requests {
        let already_committed = required;
        required = required.saturating_add(request.amount);

        while accumulated < required {
            match remaining.next() {
                Some(input) => {
                    accumulated = accumulated.saturating_add(input.value);
                    selected.push(input.clone());
                }
                None => {
                    let fundable = accumulated.saturating_sub(already_committed);
                    if fundable > 0 {
                        satisfied.push(PaymentRequest {
                            destination: request.destination.clone(),
                            amount: fundable,
                        });
                    }
                    break 'requests;
                }
            }
        }
        if request.amount > 0 {
            satisfied.push(request.clone());
        }
    }

    let total_inputs = selected.iter().map(|u| u.value).sum();
    let total_outputs = satisfied.iter().map(|r| r.amount).sum();
    AllocationResult {
        selected_inputs: selected,
        satisfied_outputs: satisfied,
        total_inputs,
        total_outputs,
    }
}
