//! Main billing engine that coordinates bills, ledgers, and settlements

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::{AccountManager, SettlementProcessor};
use crate::report::{
    DailyTotals, GstSummary, MonthlyTotals, PartyStatement, PartyTotals, RoundingAudit,
};
use crate::tax::BillTotals;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_bill_number;

/// Main billing engine that orchestrates billing operations
pub struct BillingEngine<S: BillingStore> {
    accounts: AccountManager<S>,
    settlements: SettlementProcessor<S>,
    store: S,
    bill_validator: Box<dyn BillValidator>,
}

impl<S: BillingStore + Clone> BillingEngine<S> {
    /// Create a new billing engine with the given store backend
    pub fn new(store: S) -> Self {
        Self {
            accounts: AccountManager::new(store.clone()),
            settlements: SettlementProcessor::new(store.clone()),
            bill_validator: Box::new(DefaultBillValidator),
            store,
        }
    }

    /// Create a new billing engine with custom validators
    pub fn with_validators(
        store: S,
        party_validator: Box<dyn PartyValidator>,
        bill_validator: Box<dyn BillValidator>,
    ) -> Self {
        Self {
            accounts: AccountManager::with_validator(store.clone(), party_validator),
            settlements: SettlementProcessor::new(store.clone()),
            bill_validator,
            store,
        }
    }

    /// Cap the number of retries after concurrent-update conflicts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.accounts = self.accounts.with_max_retries(max_retries);
        self.settlements = self.settlements.with_max_retries(max_retries);
        self
    }

    // Account operations
    /// Open a ledger account for a party
    pub async fn open_account(&mut self, party: PartyRef) -> BillingResult<LedgerAccount> {
        self.accounts.open_account(party).await
    }

    /// Open a ledger account that starts with an outstanding balance
    pub async fn open_account_with_due(
        &mut self,
        party: PartyRef,
        opening_due: &BigDecimal,
    ) -> BillingResult<LedgerAccount> {
        self.accounts.open_account_with_due(party, opening_due).await
    }

    /// Get a ledger account by party ID
    pub async fn get_account(&self, party_id: &PartyId) -> BillingResult<Option<LedgerAccount>> {
        self.accounts.get_account(party_id).await
    }

    /// Find an account of the given kind by contact phone number
    pub async fn find_account_by_phone(
        &self,
        kind: PartyKind,
        phone: &str,
    ) -> BillingResult<Option<LedgerAccount>> {
        self.accounts.find_account_by_phone(kind, phone).await
    }

    /// List all ledger accounts
    pub async fn list_accounts(&self) -> BillingResult<Vec<LedgerAccount>> {
        self.accounts.list_accounts().await
    }

    /// List ledger accounts by party kind
    pub async fn list_accounts_by_kind(
        &self,
        kind: PartyKind,
    ) -> BillingResult<Vec<LedgerAccount>> {
        self.accounts.list_accounts_by_kind(kind).await
    }

    /// Get the outstanding balance for a party
    pub async fn get_balance(&self, party_id: &PartyId) -> BillingResult<BigDecimal> {
        self.accounts.get_balance(party_id).await
    }

    /// Post a standalone charge to a party's ledger
    ///
    /// Covers corrections and old dues keyed in after the account was
    /// opened; bill charges are posted by [`create_bill`](Self::create_bill).
    pub async fn post_charge(
        &mut self,
        party_id: &PartyId,
        amount: &BigDecimal,
        on: NaiveDate,
    ) -> BillingResult<LedgerAccount> {
        self.accounts.post_charge(party_id, amount, on).await
    }

    /// Update a party's contact details
    pub async fn update_contact(
        &mut self,
        party_id: &PartyId,
        name: Option<String>,
        phone: Option<String>,
    ) -> BillingResult<LedgerAccount> {
        self.accounts.update_contact(party_id, name, phone).await
    }

    /// Delete a ledger account
    pub async fn delete_account(&mut self, party_id: &PartyId) -> BillingResult<()> {
        self.accounts.delete_account(party_id).await
    }

    // Bill operations
    /// Create a bill from a draft
    ///
    /// Resolves the party's ledger account, computes totals, and stores
    /// the bill. A credit bill then posts its fresh charge to the ledger,
    /// and any counter payment taken with it is settled immediately
    /// against the new balance.
    pub async fn create_bill(&mut self, draft: BillDraft) -> BillingResult<Bill> {
        // Validate the draft
        self.bill_validator.validate_draft(&draft)?;

        // Settle on a bill number before touching any account
        let bill_number = match &draft.bill_number {
            Some(number) => {
                validate_bill_number(number)?;
                if self.store.find_bill_by_number(number).await?.is_some() {
                    return Err(BillingError::Validation(format!(
                        "Bill number '{}' is already taken",
                        number
                    )));
                }
                number.clone()
            }
            None => self.generate_bill_number(draft.date).await?,
        };

        // Resolve the party's ledger account
        let account = self.accounts.resolve_account(&draft.party).await?;

        // Carried-forward dues appear on credit bills only
        let previous_due = if draft.is_credit {
            account.total_due.clone()
        } else {
            BigDecimal::from(0)
        };

        let totals = BillTotals::compute(&draft.items, draft.show_gst, &previous_due);

        let mut party = draft.party;
        party.id = Some(account.party_id);

        let now = chrono::Utc::now().naive_utc();
        let mut bill = Bill {
            id: Uuid::new_v4(),
            bill_number,
            party,
            date: draft.date,
            items: draft.items,
            is_credit: draft.is_credit,
            show_gst: draft.show_gst,
            previous_due,
            partial_payment: draft.partial_payment,
            raw_total: BigDecimal::from(0),
            rounded_total: BigDecimal::from(0),
            rounding_diff: BigDecimal::from(0),
            created_at: now,
            updated_at: now,
        };
        totals.apply_to(&mut bill);

        self.store.save_bill(&bill).await?;
        info!(
            bill = %bill.bill_number,
            total = %bill.rounded_total,
            credit = bill.is_credit,
            "Created bill"
        );

        if bill.is_credit {
            let charge = bill.ledger_charge();
            if charge > BigDecimal::from(0) {
                self.accounts
                    .post_charge(&account.party_id, &charge, bill.date)
                    .await?;
            }

            if let Some(partial) = &bill.partial_payment {
                if *partial > BigDecimal::from(0) {
                    self.settlements
                        .settle(&account.party_id, partial, Some(bill.bill_number.clone()))
                        .await?;
                } else {
                    warn!(bill = %bill.bill_number, "Ignoring non-positive counter payment");
                }
            }
        }

        Ok(bill)
    }

    /// Get a bill by ID
    pub async fn get_bill(&self, bill_id: &Uuid) -> BillingResult<Option<Bill>> {
        self.store.get_bill(bill_id).await
    }

    /// Get a bill by ID, returning an error if not found
    pub async fn get_bill_required(&self, bill_id: &Uuid) -> BillingResult<Bill> {
        self.store
            .get_bill(bill_id)
            .await?
            .ok_or_else(|| BillingError::BillNotFound(bill_id.to_string()))
    }

    /// Find a bill by its human-facing bill number
    pub async fn find_bill_by_number(&self, bill_number: &str) -> BillingResult<Option<Bill>> {
        self.store.find_bill_by_number(bill_number).await
    }

    /// List all bills within a date range
    pub async fn list_bills(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Bill>> {
        self.store.get_bills(start_date, end_date).await
    }

    /// List bills for a specific party within a date range
    pub async fn get_party_bills(
        &self,
        party_id: &PartyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Bill>> {
        self.store
            .get_party_bills(party_id, start_date, end_date)
            .await
    }

    /// Append a line item to a stored bill
    pub async fn add_line_item(&mut self, bill_id: &Uuid, item: LineItem) -> BillingResult<Bill> {
        self.bill_validator.validate_line_item(&item)?;

        let mut bill = self.get_bill_required(bill_id).await?;
        bill.items.push(item);

        self.recompute_and_store(bill).await
    }

    /// Replace a line item on a stored bill
    pub async fn edit_line_item(
        &mut self,
        bill_id: &Uuid,
        index: usize,
        item: LineItem,
    ) -> BillingResult<Bill> {
        self.bill_validator.validate_line_item(&item)?;

        let mut bill = self.get_bill_required(bill_id).await?;
        if index >= bill.items.len() {
            return Err(BillingError::InvalidBill(format!(
                "Bill {} has no line item at index {}",
                bill.bill_number, index
            )));
        }

        bill.items[index] = item;
        self.recompute_and_store(bill).await
    }

    /// Remove a line item from a stored bill
    pub async fn remove_line_item(&mut self, bill_id: &Uuid, index: usize) -> BillingResult<Bill> {
        let mut bill = self.get_bill_required(bill_id).await?;
        if index >= bill.items.len() {
            return Err(BillingError::InvalidBill(format!(
                "Bill {} has no line item at index {}",
                bill.bill_number, index
            )));
        }
        if bill.items.len() == 1 {
            return Err(BillingError::InvalidBill(
                "Bills must keep at least one line item".to_string(),
            ));
        }

        bill.items.remove(index);
        self.recompute_and_store(bill).await
    }

    /// Recompute totals after an edit and keep the ledger in step
    async fn recompute_and_store(&mut self, mut bill: Bill) -> BillingResult<Bill> {
        let old_rounded = bill.rounded_total.clone();

        let totals = BillTotals::compute(&bill.items, bill.show_gst, &bill.previous_due);
        totals.apply_to(&mut bill);
        bill.updated_at = chrono::Utc::now().naive_utc();

        self.store.update_bill(&bill).await?;

        if bill.is_credit {
            let delta = &bill.rounded_total - &old_rounded;
            if let Some(party_id) = bill.party.id {
                self.accounts
                    .post_adjustment(&party_id, &delta, bill.date)
                    .await?;
            }
        }

        info!(bill = %bill.bill_number, total = %bill.rounded_total, "Reworked bill");
        Ok(bill)
    }

    async fn generate_bill_number(&self, on: NaiveDate) -> BillingResult<String> {
        loop {
            let fragment = Uuid::new_v4().simple().to_string();
            let candidate = format!("{}-{}", on.format("%Y%m%d"), &fragment[..8]);
            if self.store.find_bill_by_number(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
    }

    // Settlement operations
    /// Apply a payment against a party's outstanding balance
    pub async fn settle_due(
        &mut self,
        party_id: &PartyId,
        amount: &BigDecimal,
        bill_ref: Option<String>,
    ) -> BillingResult<Settlement> {
        self.settlements.settle(party_id, amount, bill_ref).await
    }

    /// Apply a payment recorded on a specific date
    pub async fn settle_due_on(
        &mut self,
        party_id: &PartyId,
        amount: &BigDecimal,
        bill_ref: Option<String>,
        on: NaiveDate,
    ) -> BillingResult<Settlement> {
        self.settlements
            .settle_on(party_id, amount, bill_ref, on)
            .await
    }

    /// List settlements for a party within a date range
    pub async fn get_party_settlements(
        &self,
        party_id: &PartyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Settlement>> {
        self.settlements
            .get_party_settlements(party_id, start_date, end_date)
            .await
    }

    /// List all settlements within a date range
    pub async fn get_settlements(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Settlement>> {
        self.settlements.get_settlements(start_date, end_date).await
    }

    // Reporting operations
    /// GST collections grouped by rate bucket for a date range
    pub async fn gst_summary(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<GstSummary> {
        let bills = self.store.get_bills(start_date, end_date).await?;
        Ok(GstSummary::from_bills(start_date, end_date, &bills))
    }

    /// Sales rollup for a single day
    pub async fn daily_totals(&self, date: NaiveDate) -> BillingResult<DailyTotals> {
        let bills = self.store.get_bills(Some(date), Some(date)).await?;
        Ok(DailyTotals::from_bills(date, &bills))
    }

    /// Sales rollup for a calendar month
    pub async fn monthly_totals(&self, year: i32, month: u32) -> BillingResult<MonthlyTotals> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| BillingError::Validation(format!("Invalid month: {year}-{month}")))?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| BillingError::Validation(format!("Invalid month: {year}-{month}")))?;
        let last = next_first
            .pred_opt()
            .ok_or_else(|| BillingError::Validation(format!("Invalid month: {year}-{month}")))?;

        let bills = self.store.get_bills(Some(first), Some(last)).await?;
        Ok(MonthlyTotals::from_bills(year, month, &bills))
    }

    /// Sales rollups grouped by calendar month, keyed "YYYY-MM"
    pub async fn monthly_breakdown(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<BTreeMap<String, MonthlyTotals>> {
        let bills = self.store.get_bills(start_date, end_date).await?;
        Ok(MonthlyTotals::breakdown(&bills))
    }

    /// Outstanding balances rolled up across parties
    pub async fn party_totals(&self, kind: Option<PartyKind>) -> BillingResult<PartyTotals> {
        let accounts = self.store.list_accounts(None).await?;
        Ok(PartyTotals::from_accounts(kind, &accounts))
    }

    /// Audit of rounding differences across a date range
    pub async fn rounding_audit(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<RoundingAudit> {
        let bills = self.store.get_bills(start_date, end_date).await?;
        Ok(RoundingAudit::from_bills(start_date, end_date, &bills))
    }

    /// Chronological replay of a party's ledger
    pub async fn party_statement(&self, party_id: &PartyId) -> BillingResult<PartyStatement> {
        let account = self.accounts.get_account_required(party_id).await?;
        let bills = self.store.get_party_bills(party_id, None, None).await?;
        let settlements = self
            .store
            .get_party_settlements(party_id, None, None)
            .await?;

        Ok(PartyStatement::build(account, &bills, &settlements))
    }

    /// Validate the integrity of everything in the store
    pub async fn validate_integrity(&self) -> BillingResult<BillingIntegrityReport> {
        let accounts = self.store.list_accounts(None).await?;
        let bills = self.store.get_bills(None, None).await?;
        let settlements = self.store.get_settlements(None, None).await?;

        let mut issues = Vec::new();

        // Check account invariants
        for account in &accounts {
            if account.total_due < BigDecimal::from(0) {
                issues.push(format!(
                    "Account {} has a negative balance: {}",
                    account.party_id, account.total_due
                ));
            }
            if account.version < 0 {
                issues.push(format!(
                    "Account {} has a negative version",
                    account.party_id
                ));
            }
        }

        // Check stored bills against their own line items
        for bill in &bills {
            if &bill.rounded_total + &bill.rounding_diff != bill.raw_total {
                issues.push(format!(
                    "Bill {} breaks the rounding identity",
                    bill.bill_number
                ));
            }
            if bill.rounding_diff < BigDecimal::from(0) || bill.rounding_diff >= BigDecimal::from(1)
            {
                issues.push(format!(
                    "Bill {} has rounding difference {} outside [0, 1)",
                    bill.bill_number, bill.rounding_diff
                ));
            }

            let recomputed = BillTotals::compute(&bill.items, bill.show_gst, &bill.previous_due);
            if recomputed.raw_total != bill.raw_total {
                issues.push(format!(
                    "Bill {} stored totals do not match its line items",
                    bill.bill_number
                ));
            }

            match bill.party.id {
                Some(party_id) => {
                    if bill.is_credit && !accounts.iter().any(|a| a.party_id == party_id) {
                        issues.push(format!(
                            "Bill {} references missing account {}",
                            bill.bill_number, party_id
                        ));
                    }
                }
                None => issues.push(format!(
                    "Bill {} was stored without a resolved party",
                    bill.bill_number
                )),
            }
        }

        // Check settlement records
        for settlement in &settlements {
            if settlement.amount <= BigDecimal::from(0) {
                issues.push(format!(
                    "Settlement {} has non-positive amount {}",
                    settlement.id, settlement.amount
                ));
            }
            if settlement.resulting_balance < BigDecimal::from(0) {
                issues.push(format!(
                    "Settlement {} left a negative balance",
                    settlement.id
                ));
            }

            let cleared = settlement.resulting_balance == BigDecimal::from(0);
            let kind_matches = match settlement.kind {
                SettlementKind::Full => cleared,
                SettlementKind::Partial => !cleared,
            };
            if !kind_matches {
                issues.push(format!(
                    "Settlement {} is marked {:?} but left balance {}",
                    settlement.id, settlement.kind, settlement.resulting_balance
                ));
            }

            if !accounts
                .iter()
                .any(|a| a.party_id == settlement.party_id)
            {
                issues.push(format!(
                    "Settlement {} references missing account {}",
                    settlement.id, settlement.party_id
                ));
            }
        }

        Ok(BillingIntegrityReport {
            is_valid: issues.is_empty(),
            issues,
            accounts_checked: accounts.len(),
            bills_checked: bills.len(),
            settlements_checked: settlements.len(),
        })
    }
}

/// Report on store-wide invariant checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingIntegrityReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub accounts_checked: usize,
    pub bills_checked: usize,
    pub settlements_checked: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_store::MemoryStore;

    fn april(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    fn notebook_line() -> LineItem {
        LineItem::new(
            "Notebook".to_string(),
            BigDecimal::from(2),
            BigDecimal::from(100),
        )
        .with_discount(BigDecimal::from(10))
        .with_gst(BigDecimal::from(18))
    }

    #[tokio::test]
    async fn cash_bill_keeps_ledger_clear() {
        let mut engine = BillingEngine::new(MemoryStore::new());

        let bill = engine
            .create_bill(BillDraft::cash(
                PartyRef::customer("Asha Stores".to_string()),
                april(1),
                vec![notebook_line()],
            ))
            .await
            .unwrap();

        assert_eq!(bill.raw_total, "212.4".parse().unwrap());
        assert_eq!(bill.rounded_total, BigDecimal::from(212));
        assert_eq!(bill.rounding_diff, "0.4".parse().unwrap());

        let party_id = bill.party.id.unwrap();
        let account = engine.get_account(&party_id).await.unwrap().unwrap();
        assert_eq!(account.state(), AccountState::Clear);
        assert_eq!(account.total_due, BigDecimal::from(0));
    }

    #[tokio::test]
    async fn credit_bill_carries_due_and_posts_charge() {
        let mut engine = BillingEngine::new(MemoryStore::new());

        let account = engine
            .open_account(PartyRef::customer("Asha Stores".to_string()))
            .await
            .unwrap();
        engine
            .post_charge(&account.party_id, &BigDecimal::from(50), april(1))
            .await
            .unwrap();

        let bill = engine
            .create_bill(BillDraft::credit(
                PartyRef::customer("Asha Stores".to_string()).with_id(account.party_id),
                april(2),
                vec![notebook_line()],
            ))
            .await
            .unwrap();

        assert_eq!(bill.previous_due, BigDecimal::from(50));
        assert_eq!(bill.raw_total, "262.4".parse().unwrap());
        assert_eq!(bill.rounded_total, BigDecimal::from(262));
        assert_eq!(bill.rounding_diff, "0.4".parse().unwrap());

        // The account ends up at the bill's bottom line
        let balance = engine.get_balance(&account.party_id).await.unwrap();
        assert_eq!(balance, BigDecimal::from(262));
    }

    #[tokio::test]
    async fn opening_due_seeds_the_ledger() {
        let mut engine = BillingEngine::new(MemoryStore::new());

        let party = PartyRef::customer("Asha Stores".to_string())
            .with_phone("9876543210".to_string());
        let account = engine
            .open_account_with_due(party, &BigDecimal::from(150))
            .await
            .unwrap();
        assert_eq!(account.total_due, BigDecimal::from(150));
        assert_eq!(account.state(), AccountState::Owing);

        // The phone now routes to the same account
        let found = engine
            .find_account_by_phone(PartyKind::Customer, "9876543210")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.party_id, account.party_id);

        // A second account of the same kind cannot claim the phone
        let duplicate = engine
            .open_account(
                PartyRef::customer("Someone Else".to_string())
                    .with_phone("9876543210".to_string()),
            )
            .await;
        assert!(matches!(duplicate, Err(BillingError::Validation(_))));

        // A supplier can share it
        let supplier = engine
            .open_account(
                PartyRef::supplier("Asha Traders".to_string())
                    .with_phone("9876543210".to_string()),
            )
            .await;
        assert!(supplier.is_ok());
    }

    #[tokio::test]
    async fn counter_payment_settles_against_fresh_charge() {
        let mut engine = BillingEngine::new(MemoryStore::new());

        let draft = BillDraft::credit(
            PartyRef::customer("Asha Stores".to_string()),
            april(1),
            vec![LineItem::new(
                "Rice 25kg".to_string(),
                BigDecimal::from(1),
                BigDecimal::from(500),
            )],
        )
        .with_partial_payment(BigDecimal::from(150));

        let bill = engine.create_bill(draft).await.unwrap();
        let party_id = bill.party.id.unwrap();

        assert_eq!(
            engine.get_balance(&party_id).await.unwrap(),
            BigDecimal::from(350)
        );

        let settlements = engine
            .get_party_settlements(&party_id, None, None)
            .await
            .unwrap();
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].amount, BigDecimal::from(150));
        assert_eq!(settlements[0].kind, SettlementKind::Partial);
        assert_eq!(settlements[0].bill_ref.as_deref(), Some(bill.bill_number.as_str()));
    }

    #[tokio::test]
    async fn settle_due_clamps_overpayment() {
        let mut engine = BillingEngine::new(MemoryStore::new());
        let account = engine
            .open_account(PartyRef::customer("Asha Stores".to_string()))
            .await
            .unwrap();
        engine
            .post_charge(&account.party_id, &BigDecimal::from(1000), april(1))
            .await
            .unwrap();

        let partial = engine
            .settle_due(&account.party_id, &BigDecimal::from(400), None)
            .await
            .unwrap();
        assert_eq!(partial.kind, SettlementKind::Partial);
        assert_eq!(partial.resulting_balance, BigDecimal::from(600));

        let full = engine
            .settle_due(&account.party_id, &BigDecimal::from(700), None)
            .await
            .unwrap();
        assert_eq!(full.kind, SettlementKind::Full);
        assert_eq!(full.resulting_balance, BigDecimal::from(0));

        let account = engine.get_account(&account.party_id).await.unwrap().unwrap();
        assert_eq!(account.state(), AccountState::Clear);
    }

    #[tokio::test]
    async fn zero_amount_settlement_is_rejected() {
        let mut engine = BillingEngine::new(MemoryStore::new());
        let account = engine
            .open_account(PartyRef::customer("Asha Stores".to_string()))
            .await
            .unwrap();

        let result = engine
            .settle_due(&account.party_id, &BigDecimal::from(0), None)
            .await;
        assert!(matches!(result, Err(BillingError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn editing_a_line_keeps_the_ledger_in_step() {
        let mut engine = BillingEngine::new(MemoryStore::new());

        let bill = engine
            .create_bill(BillDraft::credit(
                PartyRef::customer("Asha Stores".to_string()),
                april(1),
                vec![LineItem::new(
                    "Soap".to_string(),
                    BigDecimal::from(1),
                    BigDecimal::from(100),
                )],
            ))
            .await
            .unwrap();
        let party_id = bill.party.id.unwrap();
        assert_eq!(
            engine.get_balance(&party_id).await.unwrap(),
            BigDecimal::from(100)
        );

        let edited = engine
            .edit_line_item(
                &bill.id,
                0,
                LineItem::new(
                    "Soap".to_string(),
                    BigDecimal::from(2),
                    BigDecimal::from(100),
                ),
            )
            .await
            .unwrap();

        assert_eq!(edited.rounded_total, BigDecimal::from(200));
        assert_eq!(
            engine.get_balance(&party_id).await.unwrap(),
            BigDecimal::from(200)
        );
    }

    #[tokio::test]
    async fn duplicate_bill_numbers_are_rejected() {
        let mut engine = BillingEngine::new(MemoryStore::new());
        let draft = BillDraft::cash(
            PartyRef::customer("Asha Stores".to_string()),
            april(1),
            vec![notebook_line()],
        )
        .with_bill_number("B-100".to_string());

        engine.create_bill(draft.clone()).await.unwrap();
        let result = engine.create_bill(draft).await;
        assert!(matches!(result, Err(BillingError::Validation(_))));
    }

    #[tokio::test]
    async fn integrity_report_is_clean_after_normal_use() {
        let mut engine = BillingEngine::new(MemoryStore::new());

        let bill = engine
            .create_bill(
                BillDraft::credit(
                    PartyRef::customer("Asha Stores".to_string()),
                    april(1),
                    vec![notebook_line()],
                )
                .with_partial_payment(BigDecimal::from(100)),
            )
            .await
            .unwrap();
        engine
            .settle_due(&bill.party.id.unwrap(), &BigDecimal::from(50), None)
            .await
            .unwrap();

        let report = engine.validate_integrity().await.unwrap();
        assert!(report.is_valid, "unexpected issues: {:?}", report.issues);
        assert_eq!(report.accounts_checked, 1);
        assert_eq!(report.bills_checked, 1);
        assert_eq!(report.settlements_checked, 2);
    }
}
