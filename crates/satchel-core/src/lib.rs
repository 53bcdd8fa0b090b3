//! # satchel-core
//! Foundation types, constants and collaborator traits for the Satchel wallet.

pub mod constants;
pub mod error;
pub mod fee;
pub mod traits;
pub mod types;
