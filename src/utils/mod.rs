//! Utility modules

pub mod coerce;
pub mod memory_store;
pub mod validation;

pub use memory_store::*;
pub use validation::*;
