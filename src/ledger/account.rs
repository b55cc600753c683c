//! Party ledger account management

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::traits::*;
use crate::types::*;
use crate::utils::coerce;

/// Account manager for party credit ledgers
pub struct AccountManager<S: BillingStore> {
    pub(crate) store: S,
    validator: Box<dyn PartyValidator>,
    max_retries: u32,
}

impl<S: BillingStore> AccountManager<S> {
    /// Create a new account manager
    pub fn new(store: S) -> Self {
        Self {
            store,
            validator: Box::new(DefaultPartyValidator),
            max_retries: 5,
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(store: S, validator: Box<dyn PartyValidator>) -> Self {
        Self {
            store,
            validator,
            max_retries: 5,
        }
    }

    /// Cap the number of retries after concurrent-update conflicts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Open a ledger account for a party
    pub async fn open_account(&mut self, party: PartyRef) -> BillingResult<LedgerAccount> {
        self.open_account_with_due(party, &BigDecimal::from(0))
            .await
    }

    /// Open a ledger account that starts with an outstanding balance
    ///
    /// Covers migrating a party whose dues predate these books. A
    /// negative opening due is clamped to zero.
    pub async fn open_account_with_due(
        &mut self,
        party: PartyRef,
        opening_due: &BigDecimal,
    ) -> BillingResult<LedgerAccount> {
        let party_id = party.id.unwrap_or_else(PartyId::new);

        // Check if the account already exists
        if self.store.get_account(&party_id).await?.is_some() {
            return Err(BillingError::Validation(format!(
                "Account for party '{}' already exists",
                party_id
            )));
        }

        // A phone number identifies one party per kind
        if let Some(phone) = &party.phone {
            if let Some(existing) = self.store.find_account_by_phone(party.kind, phone).await? {
                return Err(BillingError::Validation(format!(
                    "Phone {} already belongs to account {}",
                    phone, existing.party_id
                )));
            }
        }

        let mut account = LedgerAccount::new(party_id, party.name, party.kind);
        account.phone = party.phone;
        account.total_due = coerce::non_negative(opening_due);

        // Validate the account
        self.validator.validate_account(&account)?;

        self.store.save_account(&account).await?;
        debug!(
            %party_id,
            name = %account.party_name,
            total_due = %account.total_due,
            "Opened ledger account"
        );

        Ok(account)
    }

    /// Find an account of the given kind by contact phone number
    pub async fn find_account_by_phone(
        &self,
        kind: PartyKind,
        phone: &str,
    ) -> BillingResult<Option<LedgerAccount>> {
        self.store.find_account_by_phone(kind, phone).await
    }

    /// Find the account a bill's party refers to, creating one if needed
    ///
    /// Resolution order: explicit party ID, then phone number, then a
    /// fresh account for the given details.
    pub async fn resolve_account(&mut self, party: &PartyRef) -> BillingResult<LedgerAccount> {
        if let Some(id) = party.id {
            return self.get_account_required(&id).await;
        }

        if let Some(phone) = &party.phone {
            if let Some(account) = self.store.find_account_by_phone(party.kind, phone).await? {
                return Ok(account);
            }
        }

        self.open_account(party.clone()).await
    }

    /// Get an account by party ID
    pub async fn get_account(&self, party_id: &PartyId) -> BillingResult<Option<LedgerAccount>> {
        self.store.get_account(party_id).await
    }

    /// Get an account by party ID, returning an error if not found
    pub async fn get_account_required(&self, party_id: &PartyId) -> BillingResult<LedgerAccount> {
        self.store
            .get_account(party_id)
            .await?
            .ok_or_else(|| BillingError::PartyNotFound(party_id.to_string()))
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> BillingResult<Vec<LedgerAccount>> {
        self.store.list_accounts(None).await
    }

    /// List accounts by party kind
    pub async fn list_accounts_by_kind(
        &self,
        kind: PartyKind,
    ) -> BillingResult<Vec<LedgerAccount>> {
        self.store.list_accounts(Some(kind)).await
    }

    /// Get the outstanding balance for a party
    pub async fn get_balance(&self, party_id: &PartyId) -> BillingResult<BigDecimal> {
        Ok(self.get_account_required(party_id).await?.total_due)
    }

    /// Post a charge to a party's ledger
    ///
    /// Charges never decrease the balance. A non-positive amount is
    /// ignored and the account is returned unchanged.
    pub async fn post_charge(
        &mut self,
        party_id: &PartyId,
        amount: &BigDecimal,
        on: NaiveDate,
    ) -> BillingResult<LedgerAccount> {
        if *amount <= BigDecimal::from(0) {
            warn!(%party_id, %amount, "Ignoring non-positive charge");
            return self.get_account_required(party_id).await;
        }

        let account = self
            .write_versioned(party_id, |account| account.apply_charge(amount, on))
            .await?;
        debug!(%party_id, total_due = %account.total_due, "Posted charge");

        Ok(account)
    }

    /// Shift a party's balance after a bill edit
    ///
    /// The delta is signed but the balance still clamps at zero.
    pub(crate) async fn post_adjustment(
        &mut self,
        party_id: &PartyId,
        delta: &BigDecimal,
        on: NaiveDate,
    ) -> BillingResult<LedgerAccount> {
        if *delta == BigDecimal::from(0) {
            return self.get_account_required(party_id).await;
        }

        let account = self
            .write_versioned(party_id, |account| account.apply_adjustment(delta, on))
            .await?;
        debug!(%party_id, %delta, total_due = %account.total_due, "Adjusted balance");

        Ok(account)
    }

    /// Update a party's contact details
    pub async fn update_contact(
        &mut self,
        party_id: &PartyId,
        name: Option<String>,
        phone: Option<String>,
    ) -> BillingResult<LedgerAccount> {
        // Validate against a preview so a bad name never reaches storage
        let mut preview = self.get_account_required(party_id).await?;
        if let Some(name) = &name {
            preview.party_name = name.clone();
        }
        if let Some(phone) = &phone {
            preview.phone = Some(phone.clone());
        }
        self.validator.validate_account(&preview)?;

        self.write_versioned(party_id, |account| {
            if let Some(name) = &name {
                account.party_name = name.clone();
            }
            if let Some(phone) = &phone {
                account.phone = Some(phone.clone());
            }
            account.updated_at = chrono::Utc::now().naive_utc();
        })
        .await
    }

    /// Delete a ledger account
    pub async fn delete_account(&mut self, party_id: &PartyId) -> BillingResult<()> {
        let account = self.get_account_required(party_id).await?;

        // Validate deletion
        self.validator.validate_account_deletion(&account)?;

        self.store.delete_account(party_id).await
    }

    /// Read-modify-write an account, retrying when another writer wins
    ///
    /// The mutation is reapplied to the freshly read account on every
    /// attempt, so a retried charge lands on the latest balance instead
    /// of resurrecting a stale one.
    async fn write_versioned<F>(
        &mut self,
        party_id: &PartyId,
        mut apply: F,
    ) -> BillingResult<LedgerAccount>
    where
        F: FnMut(&mut LedgerAccount),
    {
        let mut attempts = 0;
        loop {
            let mut account = self.get_account_required(party_id).await?;
            let expected = account.version;
            apply(&mut account);

            match self
                .store
                .update_account_versioned(&account, expected)
                .await
            {
                Ok(version) => {
                    account.version = version;
                    return Ok(account);
                }
                Err(BillingError::Conflict(reason)) => {
                    attempts += 1;
                    if attempts > self.max_retries {
                        return Err(BillingError::Conflict(reason));
                    }
                    debug!(%party_id, attempts, "Retrying ledger write after concurrent update");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
