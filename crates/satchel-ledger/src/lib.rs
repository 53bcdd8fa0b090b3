//! # satchel-ledger: block-explorer access for the Satchel wallet.
//!
//! [`BlockCypher`] implements [`Ledger`](satchel_core::traits::Ledger)
//! against the BlockCypher REST API.

pub mod blockcypher;

pub use blockcypher::BlockCypher;
