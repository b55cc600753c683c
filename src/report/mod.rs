//! Sales and GST reporting over stored bills and settlements

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tax::{GstRateKey, LineAmounts};
use crate::types::*;

/// Turnover and tax collected within one GST rate bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GstBucket {
    /// Number of bill lines in this bucket
    pub item_count: usize,
    /// Net taxable value of the lines in this bucket
    pub taxable_value: BigDecimal,
    /// Total GST charged
    pub gst_amount: BigDecimal,
    /// State GST half
    pub sgst: BigDecimal,
    /// Central GST half
    pub cgst: BigDecimal,
    /// Taxable value plus GST
    pub total_amount: BigDecimal,
}

/// GST collections grouped by rate bucket
///
/// Lines sold without GST (bill- or line-level opt-out) are reported as
/// exempt turnover in the zero bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstSummary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub buckets: BTreeMap<GstRateKey, GstBucket>,
    pub total_taxable: BigDecimal,
    pub total_gst: BigDecimal,
}

impl GstSummary {
    /// Build a GST summary from bills
    pub fn from_bills(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        bills: &[Bill],
    ) -> Self {
        let mut buckets: BTreeMap<GstRateKey, GstBucket> = BTreeMap::new();

        for bill in bills {
            for item in &bill.items {
                let amounts = LineAmounts::calculate(item, bill.show_gst);
                let key = if bill.show_gst && item.apply_gst {
                    GstRateKey::for_rate(&item.gst_percent)
                } else {
                    GstRateKey::Zero
                };

                let bucket = buckets.entry(key).or_default();
                bucket.item_count += 1;
                bucket.taxable_value += &amounts.net_amount;
                bucket.gst_amount += &amounts.gst_amount;
                bucket.sgst += &amounts.sgst;
                bucket.cgst += &amounts.cgst;
                bucket.total_amount += &amounts.line_total;
            }
        }

        let total_taxable: BigDecimal = buckets.values().map(|b| &b.taxable_value).sum();
        let total_gst: BigDecimal = buckets.values().map(|b| &b.gst_amount).sum();

        Self {
            start_date,
            end_date,
            buckets,
            total_taxable,
            total_gst,
        }
    }
}

/// Sales rollup for a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    /// Counter sales settled on the spot
    pub cash_total: BigDecimal,
    /// Fresh credit extended, excluding carried-forward dues
    pub credit_total: BigDecimal,
    /// Amounts collected at the counter against credit bills
    pub partial_payment_total: BigDecimal,
    /// Cash plus fresh credit
    pub sales_total: BigDecimal,
    pub bill_count: usize,
}

impl DailyTotals {
    /// Build the rollup for one day from bills
    ///
    /// The carried-forward due on a credit bill is old debt reappearing
    /// on paper, not new turnover, so credit sales count only the charge
    /// the bill actually posted.
    pub fn from_bills(date: NaiveDate, bills: &[Bill]) -> Self {
        let mut cash_total = BigDecimal::from(0);
        let mut credit_total = BigDecimal::from(0);
        let mut partial_payment_total = BigDecimal::from(0);
        let mut bill_count = 0;

        for bill in bills.iter().filter(|bill| bill.date == date) {
            bill_count += 1;

            if bill.is_credit {
                credit_total += bill.ledger_charge();
            } else {
                cash_total += &bill.rounded_total;
            }

            if let Some(partial) = &bill.partial_payment {
                partial_payment_total += partial;
            }
        }

        let sales_total = &cash_total + &credit_total;

        Self {
            date,
            cash_total,
            credit_total,
            partial_payment_total,
            sales_total,
            bill_count,
        }
    }
}

/// Sales rollup for a calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub year: i32,
    pub month: u32,
    pub cash_total: BigDecimal,
    pub credit_total: BigDecimal,
    pub partial_payment_total: BigDecimal,
    pub sales_total: BigDecimal,
    pub bill_count: usize,
}

impl MonthlyTotals {
    /// Build the rollup for one month from bills
    pub fn from_bills(year: i32, month: u32, bills: &[Bill]) -> Self {
        let mut cash_total = BigDecimal::from(0);
        let mut credit_total = BigDecimal::from(0);
        let mut partial_payment_total = BigDecimal::from(0);
        let mut bill_count = 0;

        for bill in bills
            .iter()
            .filter(|bill| bill.date.year() == year && bill.date.month() == month)
        {
            bill_count += 1;

            if bill.is_credit {
                credit_total += bill.ledger_charge();
            } else {
                cash_total += &bill.rounded_total;
            }

            if let Some(partial) = &bill.partial_payment {
                partial_payment_total += partial;
            }
        }

        let sales_total = &cash_total + &credit_total;

        Self {
            year,
            month,
            cash_total,
            credit_total,
            partial_payment_total,
            sales_total,
            bill_count,
        }
    }

    /// Group bills into per-month rollups, keyed "YYYY-MM"
    pub fn breakdown(bills: &[Bill]) -> BTreeMap<String, MonthlyTotals> {
        let mut months = BTreeMap::new();

        for bill in bills {
            let key = format!("{:04}-{:02}", bill.date.year(), bill.date.month());
            months
                .entry(key)
                .or_insert_with(|| Self::from_bills(bill.date.year(), bill.date.month(), bills));
        }

        months
    }
}

/// Outstanding balances rolled up across parties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyTotals {
    /// Party kind this rollup covers, or all parties when `None`
    pub kind: Option<PartyKind>,
    /// Number of accounts considered
    pub account_count: usize,
    /// Number of accounts with a balance outstanding
    pub owing_count: usize,
    /// Sum of all outstanding balances
    pub total_due: BigDecimal,
    /// Mean outstanding balance across owing accounts, to two decimals
    pub average_due: BigDecimal,
}

impl PartyTotals {
    /// Build the rollup from ledger accounts
    pub fn from_accounts(kind: Option<PartyKind>, accounts: &[LedgerAccount]) -> Self {
        let matching: Vec<&LedgerAccount> = accounts
            .iter()
            .filter(|account| kind.is_none_or(|k| account.kind == k))
            .collect();

        let owing_count = matching
            .iter()
            .filter(|account| account.state() == AccountState::Owing)
            .count();

        let total_due: BigDecimal = matching.iter().map(|account| &account.total_due).sum();
        let average_due = if owing_count == 0 {
            BigDecimal::from(0)
        } else {
            (&total_due / BigDecimal::from(owing_count as i64))
                .with_scale_round(2, RoundingMode::HalfUp)
        };

        Self {
            kind,
            account_count: matching.len(),
            owing_count,
            total_due,
            average_due,
        }
    }
}

/// Audit of rounding differences across a set of bills
///
/// The dropped fractions are never discarded from the books; this report
/// adds them back up and checks the identity raw = rounded + diff over
/// the whole range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundingAudit {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bill_count: usize,
    pub raw_total: BigDecimal,
    pub rounded_total: BigDecimal,
    pub rounding_diff_total: BigDecimal,
    /// Whether every bill's stored totals satisfy the rounding identity
    pub consistent: bool,
}

impl RoundingAudit {
    /// Build the audit from bills
    pub fn from_bills(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        bills: &[Bill],
    ) -> Self {
        let raw_total: BigDecimal = bills.iter().map(|bill| &bill.raw_total).sum();
        let rounded_total: BigDecimal = bills.iter().map(|bill| &bill.rounded_total).sum();
        let rounding_diff_total: BigDecimal = bills.iter().map(|bill| &bill.rounding_diff).sum();

        let consistent = bills
            .iter()
            .all(|bill| &bill.rounded_total + &bill.rounding_diff == bill.raw_total);

        Self {
            start_date,
            end_date,
            bill_count: bills.len(),
            raw_total,
            rounded_total,
            rounding_diff_total,
            consistent,
        }
    }
}

/// What a statement entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementEventKind {
    /// A credit bill posted a charge
    Charge,
    /// A payment settled part or all of the balance
    Settlement,
}

/// One movement on a party's statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementEntry {
    pub occurred_at: NaiveDateTime,
    pub kind: StatementEventKind,
    /// Bill number for charges; referenced bill for settlements, if any
    pub reference: Option<String>,
    /// Charge posted or payment amount
    pub amount: BigDecimal,
    /// Running balance after this entry
    pub balance: BigDecimal,
}

/// Chronological replay of a party's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyStatement {
    pub account: LedgerAccount,
    pub entries: Vec<StatementEntry>,
    pub closing_balance: BigDecimal,
    /// Whether the replayed closing balance matches the live account
    pub reconciles: bool,
}

impl PartyStatement {
    /// Replay a party's bills and settlements in order
    ///
    /// Charges advance the running balance by what the bill posted.
    /// Settlement entries snap the balance to the recorded
    /// `resulting_balance`, which is authoritative for how the payment
    /// actually landed.
    pub fn build(account: LedgerAccount, bills: &[Bill], settlements: &[Settlement]) -> Self {
        enum Event<'a> {
            Charge(&'a Bill),
            Payment(&'a Settlement),
        }

        impl Event<'_> {
            fn occurred_at(&self) -> NaiveDateTime {
                match self {
                    Event::Charge(bill) => bill.created_at,
                    Event::Payment(settlement) => settlement.settled_at,
                }
            }
        }

        let mut events: Vec<Event> = bills
            .iter()
            .filter(|bill| bill.is_credit)
            .map(Event::Charge)
            .collect();
        events.extend(settlements.iter().map(Event::Payment));
        events.sort_by_key(|event| event.occurred_at());

        let mut balance = BigDecimal::from(0);
        let mut entries = Vec::with_capacity(events.len());

        for event in events {
            let entry = match event {
                Event::Charge(bill) => {
                    let amount = bill.ledger_charge();
                    balance = &balance + &amount;
                    StatementEntry {
                        occurred_at: bill.created_at,
                        kind: StatementEventKind::Charge,
                        reference: Some(bill.bill_number.clone()),
                        amount,
                        balance: balance.clone(),
                    }
                }
                Event::Payment(settlement) => {
                    balance = settlement.resulting_balance.clone();
                    StatementEntry {
                        occurred_at: settlement.settled_at,
                        kind: StatementEventKind::Settlement,
                        reference: settlement.bill_ref.clone(),
                        amount: settlement.amount.clone(),
                        balance: balance.clone(),
                    }
                }
            };
            entries.push(entry);
        }

        let reconciles = balance == account.total_due;

        Self {
            account,
            entries,
            closing_balance: balance,
            reconciles,
        }
    }
}
