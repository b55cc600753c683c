//! Payment settlement processing against party ledgers

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

/// Settlement processor for applying payments to outstanding balances
///
/// Each settlement is applied atomically: the reduced balance and the
/// settlement record land together or not at all. When another writer
/// updates the account mid-flight, the payment is reapplied to the fresh
/// balance rather than a stale one, so amounts are never double-deducted
/// or lost.
pub struct SettlementProcessor<S: BillingStore> {
    pub(crate) store: S,
    max_retries: u32,
}

impl<S: BillingStore> SettlementProcessor<S> {
    /// Create a new settlement processor
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_retries: 5,
        }
    }

    /// Cap the number of retries after concurrent-update conflicts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Apply a payment against a party's outstanding balance
    ///
    /// The amount must be positive. Payments beyond the outstanding
    /// balance clear the account; the excess is absorbed, not refunded.
    /// The settlement is full when the balance reaches zero and partial
    /// otherwise.
    pub async fn settle(
        &mut self,
        party_id: &PartyId,
        amount: &BigDecimal,
        bill_ref: Option<String>,
    ) -> BillingResult<Settlement> {
        let settled_at = chrono::Utc::now().naive_utc();
        self.settle_at(party_id, amount, bill_ref, settled_at).await
    }

    /// Apply a payment recorded on a specific date
    ///
    /// Used for backdated entries when paper records are keyed in later.
    pub async fn settle_on(
        &mut self,
        party_id: &PartyId,
        amount: &BigDecimal,
        bill_ref: Option<String>,
        on: NaiveDate,
    ) -> BillingResult<Settlement> {
        self.settle_at(party_id, amount, bill_ref, on.and_time(NaiveTime::MIN))
            .await
    }

    async fn settle_at(
        &mut self,
        party_id: &PartyId,
        amount: &BigDecimal,
        bill_ref: Option<String>,
        settled_at: NaiveDateTime,
    ) -> BillingResult<Settlement> {
        validate_positive_amount(amount)?;

        let mut attempts = 0;
        loop {
            let mut account = self
                .store
                .get_account(party_id)
                .await?
                .ok_or_else(|| BillingError::PartyNotFound(party_id.to_string()))?;
            let expected = account.version;
            let balance_before = account.total_due.clone();

            let kind = account.apply_settlement(amount, settled_at.date());

            if *amount > balance_before {
                let excess = amount - &balance_before;
                warn!(%party_id, %excess, "Absorbing payment beyond outstanding balance");
            }

            let settlement = Settlement {
                id: Uuid::new_v4(),
                party_id: *party_id,
                bill_ref: bill_ref.clone(),
                amount: amount.clone(),
                kind,
                resulting_balance: account.total_due.clone(),
                settled_at,
            };

            match self
                .store
                .commit_settlement(&account, expected, &settlement)
                .await
            {
                Ok(_) => {
                    info!(
                        %party_id,
                        %amount,
                        kind = ?settlement.kind,
                        balance = %settlement.resulting_balance,
                        "Settled payment"
                    );
                    return Ok(settlement);
                }
                Err(BillingError::Conflict(reason)) => {
                    attempts += 1;
                    if attempts > self.max_retries {
                        return Err(BillingError::Conflict(reason));
                    }
                    debug!(%party_id, attempts, "Retrying settlement after concurrent update");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// List settlements for a party within a date range
    pub async fn get_party_settlements(
        &self,
        party_id: &PartyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Settlement>> {
        self.store
            .get_party_settlements(party_id, start_date, end_date)
            .await
    }

    /// List all settlements within a date range
    pub async fn get_settlements(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> BillingResult<Vec<Settlement>> {
        self.store.get_settlements(start_date, end_date).await
    }
}
