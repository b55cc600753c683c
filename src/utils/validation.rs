//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> BillingResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(BillingError::InvalidAmount(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a party name is valid
pub fn validate_party_name(name: &str) -> BillingResult<()> {
    if name.trim().is_empty() {
        return Err(BillingError::Validation(
            "Party name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(BillingError::Validation(
            "Party name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a bill number is valid
pub fn validate_bill_number(bill_number: &str) -> BillingResult<()> {
    if bill_number.trim().is_empty() {
        return Err(BillingError::Validation(
            "Bill number cannot be empty".to_string(),
        ));
    }

    if bill_number.len() > 50 {
        return Err(BillingError::Validation(
            "Bill number cannot exceed 50 characters".to_string(),
        ));
    }

    // Check for valid characters (alphanumeric, dashes, underscores, slashes)
    if !bill_number
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '/')
    {
        return Err(BillingError::Validation(
            "Bill number can only contain alphanumeric characters, dashes, underscores, and slashes"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate that a phone number is plausible
pub fn validate_phone(phone: &str) -> BillingResult<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(BillingError::Validation(
            "Phone number can only contain digits and an optional leading +".to_string(),
        ));
    }

    if digits.len() < 6 || digits.len() > 15 {
        return Err(BillingError::Validation(
            "Phone number must be between 6 and 15 digits".to_string(),
        ));
    }

    Ok(())
}

/// Enhanced bill validator that rejects sloppy input instead of coercing it
pub struct EnhancedBillValidator;

impl BillValidator for EnhancedBillValidator {
    fn validate_draft(&self, draft: &BillDraft) -> BillingResult<()> {
        // Basic validation
        draft.validate()?;

        if let Some(bill_number) = &draft.bill_number {
            validate_bill_number(bill_number)?;
        }

        if let Some(partial) = &draft.partial_payment {
            validate_positive_amount(partial)?;
        }

        // Validate each line
        for item in &draft.items {
            self.validate_line_item(item)?;
        }

        // Check for duplicate line names
        let mut names = std::collections::HashSet::new();
        for item in &draft.items {
            if !names.insert(item.name.trim()) {
                return Err(BillingError::Validation(format!(
                    "Line item '{}' appears multiple times on the bill",
                    item.name
                )));
            }
        }

        Ok(())
    }

    fn validate_line_item(&self, item: &LineItem) -> BillingResult<()> {
        if item.name.trim().is_empty() {
            return Err(BillingError::Validation(
                "Line item name cannot be empty".to_string(),
            ));
        }

        if item.quantity < BigDecimal::from(0) {
            return Err(BillingError::Validation(format!(
                "Quantity cannot be negative for '{}'",
                item.name
            )));
        }

        if item.unit_price < BigDecimal::from(0) {
            return Err(BillingError::Validation(format!(
                "Unit price cannot be negative for '{}'",
                item.name
            )));
        }

        if item.discount_percent < BigDecimal::from(0)
            || item.discount_percent > BigDecimal::from(100)
        {
            return Err(BillingError::Validation(format!(
                "Discount for '{}' must be between 0 and 100 percent",
                item.name
            )));
        }

        if item.gst_percent < BigDecimal::from(0) || item.gst_percent > BigDecimal::from(100) {
            return Err(BillingError::Validation(format!(
                "GST rate for '{}' must be between 0 and 100 percent",
                item.name
            )));
        }

        Ok(())
    }
}

/// Enhanced account validator with detailed checks
pub struct EnhancedPartyValidator;

impl PartyValidator for EnhancedPartyValidator {
    fn validate_account(&self, account: &LedgerAccount) -> BillingResult<()> {
        validate_party_name(&account.party_name)?;

        if let Some(phone) = &account.phone {
            validate_phone(phone)?;
        }

        Ok(())
    }

    fn validate_account_deletion(&self, account: &LedgerAccount) -> BillingResult<()> {
        if account.total_due > BigDecimal::from(0) {
            return Err(BillingError::Validation(format!(
                "Account {} still owes {}",
                account.party_id, account.total_due
            )));
        }

        Ok(())
    }
}
