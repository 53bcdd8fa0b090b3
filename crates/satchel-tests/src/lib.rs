//! End-to-end wallet scenarios for Satchel.
//!
//! The tests drive a complete [`Wallet`](satchel_wallet::Wallet) against a
//! scripted ledger and check the transactions it would put on the network.

pub mod helpers;
