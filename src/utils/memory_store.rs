//! In-memory store implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory store implementation for testing and development
///
/// Clones share the same underlying maps, so a cloned handle can stand in
/// for a second concurrent writer in tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    accounts: Arc<RwLock<HashMap<PartyId, LedgerAccount>>>,
    bills: Arc<RwLock<HashMap<Uuid, Bill>>>,
    settlements: Arc<RwLock<Vec<Settlement>>>,
}

impl MemoryStore {
    /// Create a new memory store instance
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            bills: Arc::new(RwLock::new(HashMap::new())),
            settlements: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.accounts.write().unwrap().clear();
        self.bills.write().unwrap().clear();
        self.settlements.write().unwrap().clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn within_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    if let Some(start) = start {
        if date < start {
            return false;
        }
    }
    if let Some(end) = end {
        if date > end {
            return false;
        }
    }
    true
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn save_account(&mut self, account: &LedgerAccount) -> BillingResult<()> {
        self.accounts
            .write()
            .unwrap()
            .insert(account.party_id, account.clone());
        Ok(())
    }

    async fn get_account(&self, party_id: &PartyId) -> BillingResult<Option<LedgerAccount>> {
        Ok(self.accounts.read().unwrap().get(party_id).cloned())
    }

    async fn find_account_by_phone(
        &self,
        kind: PartyKind,
        phone: &str,
    ) -> BillingResult<Option<LedgerAccount>> {
        let accounts = self.accounts.read().unwrap();
        Ok(accounts
            .values()
            .find(|account| account.kind == kind && account.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn list_accounts(&self, kind: Option<PartyKind>) -> BillingResult<Vec<LedgerAccount>> {
        let accounts = self.accounts.read().unwrap();
        let filtered: Vec<LedgerAccount> = accounts
            .values()
            .filter(|account| kind.is_none_or(|k| account.kind == k))
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn update_account_versioned(
        &mut self,
        account: &LedgerAccount,
        expected_version: i64,
    ) -> BillingResult<i64> {
        let mut accounts = self.accounts.write().unwrap();
        let stored = accounts
            .get_mut(&account.party_id)
            .ok_or_else(|| BillingError::PartyNotFound(account.party_id.to_string()))?;

        if stored.version != expected_version {
            return Err(BillingError::Conflict(format!(
                "Account {} was updated concurrently",
                account.party_id
            )));
        }

        let mut updated = account.clone();
        updated.version = expected_version + 1;
        *stored = updated;
        Ok(expected_version + 1)
    }

    async fn delete_account(&mut self, party_id: &PartyId) -> BillingResult<()> {
        if self.accounts.write().unwrap().remove(party_id).is_some() {
            Ok(())
        } else {
            Err(BillingError::PartyNotFound(party_id.to_string()))
        }
    }

    async fn save_bill(&mut self, bill: &Bill) -> BillingResult<()> {
        self.bills.write().unwrap().insert(bill.id, bill.clone());
        Ok(())
    }

    async fn get_bill(&self, bill_id: &Uuid) -> BillingResult<Option<Bill>> {
        Ok(self.bills.read().unwrap().get(bill_id).cloned())
    }

    async fn find_bill_by_number(&self, bill_number: &str) -> BillingResult<Option<Bill>> {
        let bills = self.bills.read().unwrap();
        Ok(bills
            .values()
            .find(|bill| bill.bill_number == bill_number)
            .cloned())
    }

    async fn update_bill(&mut self, bill: &Bill) -> BillingResult<()> {
        if self.bills.read().unwrap().contains_key(&bill.id) {
            self.bills.write().unwrap().insert(bill.id, bill.clone());
            Ok(())
        } else {
            Err(BillingError::BillNotFound(bill.id.to_string()))
        }
    }

    async fn get_party_bills(
        &self,
        party_id: &PartyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Bill>> {
        let bills = self.bills.read().unwrap();
        let filtered: Vec<Bill> = bills
            .values()
            .filter(|bill| {
                bill.party.id == Some(*party_id) && within_range(bill.date, start_date, end_date)
            })
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn get_bills(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Bill>> {
        let bills = self.bills.read().unwrap();
        let filtered: Vec<Bill> = bills
            .values()
            .filter(|bill| within_range(bill.date, start_date, end_date))
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn commit_settlement(
        &mut self,
        account: &LedgerAccount,
        expected_version: i64,
        settlement: &Settlement,
    ) -> BillingResult<i64> {
        // Hold the account lock across the settlement append so the pair
        // lands atomically.
        let mut accounts = self.accounts.write().unwrap();
        let stored = accounts
            .get_mut(&account.party_id)
            .ok_or_else(|| BillingError::PartyNotFound(account.party_id.to_string()))?;

        if stored.version != expected_version {
            return Err(BillingError::Conflict(format!(
                "Account {} was updated concurrently",
                account.party_id
            )));
        }

        let mut updated = account.clone();
        updated.version = expected_version + 1;
        *stored = updated;
        self.settlements.write().unwrap().push(settlement.clone());
        Ok(expected_version + 1)
    }

    async fn get_party_settlements(
        &self,
        party_id: &PartyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Settlement>> {
        let settlements = self.settlements.read().unwrap();
        let filtered: Vec<Settlement> = settlements
            .iter()
            .filter(|settlement| {
                settlement.party_id == *party_id
                    && within_range(settlement.settled_at.date(), start_date, end_date)
            })
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn get_settlements(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Settlement>> {
        let settlements = self.settlements.read().unwrap();
        let filtered: Vec<Settlement> = settlements
            .iter()
            .filter(|settlement| within_range(settlement.settled_at.date(), start_date, end_date))
            .cloned()
            .collect();
        Ok(filtered)
    }
}
