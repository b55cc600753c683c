//! GST line math and whole-bill totals for Indian retail billing

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};

use crate::types::{Bill, LineItem};
use crate::utils::coerce;

/// Standard GST rate buckets used on Indian retail bills
///
/// Reports group taxable turnover by these buckets; anything outside the
/// common rates lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GstRateKey {
    /// Exempt and zero-rated items - 0%
    Zero,
    /// Reduced rate items - 5%
    Five,
    /// Standard rate items - 12%
    Twelve,
    /// Higher rate items - 18%
    Eighteen,
    /// Any other rate (28%, legacy rates, typos)
    Other,
}

impl GstRateKey {
    /// Classify a rate percentage into its bucket
    pub fn for_rate(percent: &BigDecimal) -> Self {
        if *percent == BigDecimal::from(0) {
            GstRateKey::Zero
        } else if *percent == BigDecimal::from(5) {
            GstRateKey::Five
        } else if *percent == BigDecimal::from(12) {
            GstRateKey::Twelve
        } else if *percent == BigDecimal::from(18) {
            GstRateKey::Eighteen
        } else {
            GstRateKey::Other
        }
    }

    /// Human-readable bucket label for report rows
    pub fn label(&self) -> &'static str {
        match self {
            GstRateKey::Zero => "0%",
            GstRateKey::Five => "5%",
            GstRateKey::Twelve => "12%",
            GstRateKey::Eighteen => "18%",
            GstRateKey::Other => "other",
        }
    }
}

/// Derived money amounts for a single bill line
///
/// All fields are computed, never stored on the line item itself, so a
/// stored bill can always be re-derived from its raw inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAmounts {
    /// Quantity times unit price
    pub subtotal: BigDecimal,
    /// Discount carved out of the subtotal
    pub discount_amount: BigDecimal,
    /// Subtotal minus discount; the taxable value
    pub net_amount: BigDecimal,
    /// Total GST charged on the net amount
    pub gst_amount: BigDecimal,
    /// State GST, half of the total GST
    pub sgst: BigDecimal,
    /// Central GST, half of the total GST
    pub cgst: BigDecimal,
    /// Net amount plus GST
    pub line_total: BigDecimal,
}

impl LineAmounts {
    /// Calculate the money amounts for one line
    ///
    /// Quantity and unit price are clamped to zero when negative.
    /// Discount and GST percentages are taken as keyed in; a discount
    /// over 100% legitimately drives the net amount negative. GST is
    /// charged only when both the line and the bill ask for it.
    pub fn calculate(item: &LineItem, gst_enabled: bool) -> Self {
        let quantity = coerce::non_negative(&item.quantity);
        let unit_price = coerce::non_negative(&item.unit_price);

        let subtotal = &quantity * &unit_price;
        let discount_amount = (&subtotal * &item.discount_percent) / BigDecimal::from(100);
        let net_amount = &subtotal - &discount_amount;

        let gst_amount = if gst_enabled && item.apply_gst {
            (&net_amount * &item.gst_percent) / BigDecimal::from(100)
        } else {
            BigDecimal::from(0)
        };

        let half = &gst_amount / BigDecimal::from(2);
        let sgst = half.clone();
        let cgst = half;
        let line_total = &net_amount + &gst_amount;

        Self {
            subtotal,
            discount_amount,
            net_amount,
            gst_amount,
            sgst,
            cgst,
            line_total,
        }
    }
}

/// Whole-bill totals with the rounding difference tracked explicitly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillTotals {
    /// Exact sum of line totals plus any carried-forward due
    pub raw_total: BigDecimal,
    /// Raw total floored to the whole rupee
    pub rounded_total: BigDecimal,
    /// Fraction dropped by flooring; always in [0, 1)
    pub rounding_diff: BigDecimal,
}

impl BillTotals {
    /// Compute bill totals from line items and the carried-forward due
    ///
    /// The raw total is never discarded: `raw_total == rounded_total +
    /// rounding_diff` holds exactly, including when the raw total is
    /// negative.
    pub fn compute(items: &[LineItem], gst_enabled: bool, previous_due: &BigDecimal) -> Self {
        let lines_total: BigDecimal = items
            .iter()
            .map(|item| LineAmounts::calculate(item, gst_enabled).line_total)
            .sum();

        let raw_total = &lines_total + previous_due;
        let rounded_total = raw_total.with_scale_round(0, RoundingMode::Floor);
        let rounding_diff = &raw_total - &rounded_total;

        Self {
            raw_total,
            rounded_total,
            rounding_diff,
        }
    }

    /// Write these totals onto a bill
    pub fn apply_to(&self, bill: &mut Bill) {
        bill.raw_total = self.raw_total.clone();
        bill.rounded_total = self.rounded_total.clone();
        bill.rounding_diff = self.rounding_diff.clone();
    }
}
