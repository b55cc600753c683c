//! # Billing Core
//!
//! A billing and credit-ledger library for small retail shops, providing
//! GST-aware bill calculation, customer and supplier due tracking, and
//! tax settlement reporting.
//!
//! ## Features
//!
//! - **Bill calculation**: Line-level discounts and GST with CGST/SGST splits
//! - **Rupee rounding**: Payable totals floor to whole rupees with the difference retained
//! - **Credit ledger**: Per-party running dues carried forward onto credit bills
//! - **Settlements**: Full and partial payments with overpayment absorption
//! - **Reporting**: GST rate summaries, daily and monthly totals, party statements
//! - **Storage abstraction**: Database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use billing_core::{BillingEngine, BillDraft, LineItem, PartyRef};
//! use billing_core::utils::MemoryStore;
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! // This example shows basic usage - any BillingStore implementation works
//! // let mut engine = BillingEngine::new(MemoryStore::new());
//! // let bill = engine.create_bill(draft).await?;
//! ```

pub mod ledger;
pub mod report;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use ledger::*;
pub use report::*;
pub use tax::gst::*;
pub use traits::*;
pub use types::*;
