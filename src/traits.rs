//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for the billing engine
///
/// This trait allows the billing core to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
/// Ledger balances are written through the versioned methods so concurrent
/// writers cannot silently overwrite each other.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Save a new ledger account
    async fn save_account(&mut self, account: &LedgerAccount) -> BillingResult<()>;

    /// Get a ledger account by party ID
    async fn get_account(&self, party_id: &PartyId) -> BillingResult<Option<LedgerAccount>>;

    /// Find a ledger account of the given kind by contact phone number
    ///
    /// The lookup is scoped by kind because a customer and a supplier can
    /// legitimately share a phone number.
    async fn find_account_by_phone(
        &self,
        kind: PartyKind,
        phone: &str,
    ) -> BillingResult<Option<LedgerAccount>>;

    /// List all ledger accounts, optionally filtered by party kind
    async fn list_accounts(&self, kind: Option<PartyKind>) -> BillingResult<Vec<LedgerAccount>>;

    /// Write an updated account if its stored version still matches
    ///
    /// Returns the new version on success and [`BillingError::Conflict`]
    /// when another writer got there first. The version field on the
    /// written record is managed by the store, not the caller.
    async fn update_account_versioned(
        &mut self,
        account: &LedgerAccount,
        expected_version: i64,
    ) -> BillingResult<i64>;

    /// Delete a ledger account
    async fn delete_account(&mut self, party_id: &PartyId) -> BillingResult<()>;

    /// Save a finalized bill
    async fn save_bill(&mut self, bill: &Bill) -> BillingResult<()>;

    /// Get a bill by ID
    async fn get_bill(&self, bill_id: &Uuid) -> BillingResult<Option<Bill>>;

    /// Find a bill by its human-facing bill number
    async fn find_bill_by_number(&self, bill_number: &str) -> BillingResult<Option<Bill>>;

    /// Update a stored bill
    async fn update_bill(&mut self, bill: &Bill) -> BillingResult<()>;

    /// List bills for a specific party within a date range
    async fn get_party_bills(
        &self,
        party_id: &PartyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Bill>>;

    /// List all bills within a date range
    async fn get_bills(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Bill>>;

    /// Atomically write a settled account and append its settlement record
    ///
    /// Both writes land together or not at all. Returns the new account
    /// version on success and [`BillingError::Conflict`] when the account
    /// changed since it was read.
    async fn commit_settlement(
        &mut self,
        account: &LedgerAccount,
        expected_version: i64,
        settlement: &Settlement,
    ) -> BillingResult<i64>;

    /// List settlements for a specific party within a date range
    async fn get_party_settlements(
        &self,
        party_id: &PartyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Settlement>>;

    /// List all settlements within a date range
    async fn get_settlements(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Settlement>>;
}

/// Trait for implementing custom ledger account validation rules
pub trait PartyValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &LedgerAccount) -> BillingResult<()>;

    /// Validate account deletion
    fn validate_account_deletion(&self, account: &LedgerAccount) -> BillingResult<()>;
}

/// Trait for implementing custom bill validation rules
pub trait BillValidator: Send + Sync {
    /// Validate a draft before totals are computed
    fn validate_draft(&self, draft: &BillDraft) -> BillingResult<()>;

    /// Validate a single line item
    fn validate_line_item(&self, item: &LineItem) -> BillingResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultPartyValidator;

impl PartyValidator for DefaultPartyValidator {
    fn validate_account(&self, account: &LedgerAccount) -> BillingResult<()> {
        if account.party_name.trim().is_empty() {
            return Err(BillingError::Validation(
                "Party name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_account_deletion(&self, account: &LedgerAccount) -> BillingResult<()> {
        if account.state() == AccountState::Owing {
            return Err(BillingError::Validation(format!(
                "Account {} still owes {}",
                account.party_id, account.total_due
            )));
        }

        Ok(())
    }
}

/// Default bill validator with basic rules
pub struct DefaultBillValidator;

impl BillValidator for DefaultBillValidator {
    fn validate_draft(&self, draft: &BillDraft) -> BillingResult<()> {
        draft.validate()?;

        for item in &draft.items {
            self.validate_line_item(item)?;
        }

        Ok(())
    }

    fn validate_line_item(&self, item: &LineItem) -> BillingResult<()> {
        if item.name.trim().is_empty() {
            return Err(BillingError::Validation(
                "Line item name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
