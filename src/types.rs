//! Core types and data structures for the billing engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a ledger party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub Uuid);

impl PartyId {
    /// Generate a fresh random party identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for PartyId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role a party plays in the shop's books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyKind {
    /// Buys from the shop and may owe money on credit bills
    Customer,
    /// Supplies the shop; outstanding amounts are what the shop owes them
    Supplier,
}

/// Party details as captured on a bill
///
/// The `id` is optional so a bill can be drafted for a walk-in party before
/// a ledger account exists; the engine resolves or creates the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyRef {
    /// Ledger account identifier, if the party is already known
    pub id: Option<PartyId>,
    /// Party name as printed on the bill
    pub name: String,
    /// Contact phone number, used as a secondary lookup key
    pub phone: Option<String>,
    /// Customer or supplier
    pub kind: PartyKind,
}

impl PartyRef {
    /// Reference a customer by name
    pub fn customer(name: String) -> Self {
        Self {
            id: None,
            name,
            phone: None,
            kind: PartyKind::Customer,
        }
    }

    /// Reference a supplier by name
    pub fn supplier(name: String) -> Self {
        Self {
            id: None,
            name,
            phone: None,
            kind: PartyKind::Supplier,
        }
    }

    /// Attach a known ledger account identifier
    pub fn with_id(mut self, id: PartyId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach a contact phone number
    pub fn with_phone(mut self, phone: String) -> Self {
        self.phone = Some(phone);
        self
    }
}

/// Whether a ledger account currently carries outstanding dues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountState {
    /// Nothing outstanding
    Clear,
    /// A positive balance remains to be settled
    Owing,
}

/// Single line on a bill
///
/// The numeric fields accept sloppy input (strings, nulls, missing keys)
/// when deserialized and coerce it to zero rather than failing the bill.
/// Derived amounts are never stored here; see [`crate::tax::LineAmounts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item description as printed on the bill
    pub name: String,
    /// Quantity sold, fractional quantities allowed
    #[serde(default, deserialize_with = "crate::utils::coerce::lenient_decimal")]
    pub quantity: BigDecimal,
    /// Price per unit
    #[serde(default, deserialize_with = "crate::utils::coerce::lenient_decimal")]
    pub unit_price: BigDecimal,
    /// Unit of measure as printed on the bill, e.g. "kg" or "pcs"
    #[serde(default)]
    pub unit: Option<String>,
    /// Discount percentage applied to the line subtotal
    #[serde(default, deserialize_with = "crate::utils::coerce::lenient_decimal")]
    pub discount_percent: BigDecimal,
    /// GST rate percentage for this item
    #[serde(default, deserialize_with = "crate::utils::coerce::lenient_decimal")]
    pub gst_percent: BigDecimal,
    /// Whether GST is charged on this line
    #[serde(default)]
    pub apply_gst: bool,
    /// HSN classification code carried through to GST filings
    #[serde(default)]
    pub hsn_code: Option<String>,
}

impl LineItem {
    /// Create a line with no discount and no GST
    pub fn new(name: String, quantity: BigDecimal, unit_price: BigDecimal) -> Self {
        Self {
            name,
            quantity,
            unit_price,
            unit: None,
            discount_percent: BigDecimal::from(0),
            gst_percent: BigDecimal::from(0),
            apply_gst: false,
            hsn_code: None,
        }
    }

    /// Set the unit of measure
    pub fn with_unit(mut self, unit: String) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the discount percentage
    pub fn with_discount(mut self, percent: BigDecimal) -> Self {
        self.discount_percent = percent;
        self
    }

    /// Set the GST rate and mark the line as taxable
    pub fn with_gst(mut self, percent: BigDecimal) -> Self {
        self.gst_percent = percent;
        self.apply_gst = true;
        self
    }

    /// Set the HSN classification code
    pub fn with_hsn_code(mut self, code: String) -> Self {
        self.hsn_code = Some(code);
        self
    }
}

/// Input for creating a bill, before totals are computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDraft {
    /// Who the bill is for
    pub party: PartyRef,
    /// Explicit bill number; generated when absent
    pub bill_number: Option<String>,
    /// Bill date
    pub date: NaiveDate,
    /// Line items
    pub items: Vec<LineItem>,
    /// Credit bills post their total to the party ledger instead of being
    /// paid at the counter
    pub is_credit: bool,
    /// Whether GST lines are charged on this bill at all
    pub show_gst: bool,
    /// Amount paid at the counter against a credit bill
    pub partial_payment: Option<BigDecimal>,
}

impl BillDraft {
    /// Draft a cash bill, settled in full at the counter
    pub fn cash(party: PartyRef, date: NaiveDate, items: Vec<LineItem>) -> Self {
        Self {
            party,
            bill_number: None,
            date,
            items,
            is_credit: false,
            show_gst: true,
            partial_payment: None,
        }
    }

    /// Draft a credit bill whose total lands on the party ledger
    pub fn credit(party: PartyRef, date: NaiveDate, items: Vec<LineItem>) -> Self {
        Self {
            party,
            bill_number: None,
            date,
            items,
            is_credit: true,
            show_gst: true,
            partial_payment: None,
        }
    }

    /// Use an explicit bill number instead of a generated one
    pub fn with_bill_number(mut self, bill_number: String) -> Self {
        self.bill_number = Some(bill_number);
        self
    }

    /// Suppress GST on the whole bill regardless of per-line flags
    pub fn without_gst(mut self) -> Self {
        self.show_gst = false;
        self
    }

    /// Record an amount paid at the counter against this credit bill
    pub fn with_partial_payment(mut self, amount: BigDecimal) -> Self {
        self.partial_payment = Some(amount);
        self
    }

    /// Validate the draft before totals are computed
    pub fn validate(&self) -> BillingResult<()> {
        if self.party.name.trim().is_empty() {
            return Err(BillingError::InvalidBill(
                "Bill must name a party".to_string(),
            ));
        }

        if self.items.is_empty() {
            return Err(BillingError::InvalidBill(
                "Bill must have at least one line item".to_string(),
            ));
        }

        if !self.is_credit && self.partial_payment.is_some() {
            return Err(BillingError::InvalidBill(
                "Cash bills are settled in full; partial payment applies to credit bills only"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Finalized bill with computed totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    /// Unique identifier for the bill
    pub id: Uuid,
    /// Human-facing bill number, unique per shop
    pub bill_number: String,
    /// Who the bill is for
    pub party: PartyRef,
    /// Bill date
    pub date: NaiveDate,
    /// Line items
    pub items: Vec<LineItem>,
    /// Whether the total was posted to the party ledger
    pub is_credit: bool,
    /// Whether GST lines were charged on this bill
    pub show_gst: bool,
    /// Outstanding balance carried onto this bill at creation time
    pub previous_due: BigDecimal,
    /// Amount paid at the counter against a credit bill
    pub partial_payment: Option<BigDecimal>,
    /// Exact total before rounding, including any carried-forward due
    pub raw_total: BigDecimal,
    /// Whole-rupee total actually charged
    pub rounded_total: BigDecimal,
    /// Fraction dropped by rounding; kept for the audit trail
    pub rounding_diff: BigDecimal,
    /// When the bill was created
    pub created_at: NaiveDateTime,
    /// When the bill was last updated
    pub updated_at: NaiveDateTime,
}

impl Bill {
    /// Fresh debt this bill posts to the party ledger
    ///
    /// The carried-forward due is already on the account, so only the
    /// portion above it is posted. Cash bills post nothing.
    pub fn ledger_charge(&self) -> BigDecimal {
        if !self.is_credit {
            return BigDecimal::from(0);
        }

        let charge = &self.rounded_total - &self.previous_due;
        if charge < BigDecimal::from(0) {
            BigDecimal::from(0)
        } else {
            charge
        }
    }
}

/// Running balance a party owes (customer) or is owed (supplier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// Identifier shared with every bill and settlement for this party
    pub party_id: PartyId,
    /// Party name
    pub party_name: String,
    /// Contact phone number, used as a secondary lookup key
    pub phone: Option<String>,
    /// Customer or supplier
    pub kind: PartyKind,
    /// Outstanding balance; never negative
    pub total_due: BigDecimal,
    /// Date of the last charge or settlement
    pub last_activity: NaiveDate,
    /// Optimistic concurrency counter, bumped on every versioned write
    pub version: i64,
    /// When the account was created
    pub created_at: NaiveDateTime,
    /// When the account was last updated
    pub updated_at: NaiveDateTime,
}

impl LedgerAccount {
    /// Create a new account with a clear balance
    pub fn new(party_id: PartyId, party_name: String, kind: PartyKind) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            party_id,
            party_name,
            phone: None,
            kind,
            total_due: BigDecimal::from(0),
            last_activity: now.date(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a contact phone number
    pub fn with_phone(mut self, phone: String) -> Self {
        self.phone = Some(phone);
        self
    }

    /// Current state derived from the outstanding balance
    pub fn state(&self) -> AccountState {
        if self.total_due == BigDecimal::from(0) {
            AccountState::Clear
        } else {
            AccountState::Owing
        }
    }

    /// Add a charge to the outstanding balance
    ///
    /// Charges only ever grow the balance; a non-positive amount leaves
    /// the account untouched.
    pub fn apply_charge(&mut self, amount: &BigDecimal, on: NaiveDate) {
        if *amount <= BigDecimal::from(0) {
            return;
        }

        self.total_due += amount;
        self.last_activity = on;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Shift the balance by a signed delta when a bill is edited
    ///
    /// Unlike charges this may reduce the balance, but it still clamps
    /// at zero.
    pub(crate) fn apply_adjustment(&mut self, delta: &BigDecimal, on: NaiveDate) {
        let shifted = &self.total_due + delta;
        self.total_due = if shifted < BigDecimal::from(0) {
            BigDecimal::from(0)
        } else {
            shifted
        };
        self.last_activity = on;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Absorb a payment into the outstanding balance
    ///
    /// The balance never goes below zero; paying more than is owed clears
    /// the account and the excess is not tracked as a refund.
    pub fn apply_settlement(&mut self, amount: &BigDecimal, on: NaiveDate) -> SettlementKind {
        let remaining = &self.total_due - amount;
        self.total_due = if remaining < BigDecimal::from(0) {
            BigDecimal::from(0)
        } else {
            remaining
        };
        self.last_activity = on;
        self.updated_at = chrono::Utc::now().naive_utc();

        if self.total_due == BigDecimal::from(0) {
            SettlementKind::Full
        } else {
            SettlementKind::Partial
        }
    }
}

/// How a settlement left the account balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementKind {
    /// The balance reached zero
    Full,
    /// A positive balance remains
    Partial,
}

/// Record of a payment applied against a party's outstanding balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Unique identifier for the settlement
    pub id: Uuid,
    /// Party whose balance was settled
    pub party_id: PartyId,
    /// Bill number this payment was taken against, if any
    pub bill_ref: Option<String>,
    /// Amount paid
    pub amount: BigDecimal,
    /// Full or partial, judged against the balance at settlement time
    pub kind: SettlementKind,
    /// Outstanding balance immediately after this settlement
    pub resulting_balance: BigDecimal,
    /// When the payment was taken
    pub settled_at: NaiveDateTime,
}

/// Errors that can occur in the billing engine
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid bill: {0}")]
    InvalidBill(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Party not found: {0}")]
    PartyNotFound(String),
    #[error("Bill not found: {0}")]
    BillNotFound(String),
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for billing operations
pub type BillingResult<T> = Result<T, BillingError>;
