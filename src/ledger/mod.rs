//! Ledger module containing account management and settlement processing

pub mod account;
pub mod core;
pub mod settlement;

pub use account::*;
pub use core::*;
pub use settlement::*;
