//! GST line math and rounding examples

use bigdecimal::BigDecimal;
use billing_core::{BillTotals, GstRateKey, LineAmounts, LineItem};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Billing Core - GST Billing Examples\n");

    // 1. Rate buckets used for GST reporting
    println!("📊 GST Rate Buckets:");
    for rate in [0, 5, 12, 18, 28] {
        let key = GstRateKey::for_rate(&BigDecimal::from(rate));
        println!("  {}% files under '{}'", rate, key.label());
    }
    println!();

    // 2. Line-level breakdown with discount and GST
    println!("🧮 Line Breakdown (2 x ₹100, 10% discount, 18% GST):");
    let notebook = LineItem::new(
        "Notebook".to_string(),
        BigDecimal::from(2),
        BigDecimal::from(100),
    )
    .with_unit("pcs".to_string())
    .with_discount(BigDecimal::from(10))
    .with_gst(BigDecimal::from(18))
    .with_hsn_code("4820".to_string());

    let amounts = LineAmounts::calculate(&notebook, true);
    println!("  Subtotal:    ₹{}", amounts.subtotal);
    println!("  Discount:    ₹{}", amounts.discount_amount);
    println!("  Net Amount:  ₹{}", amounts.net_amount);
    println!("  GST (18%):   ₹{}", amounts.gst_amount);
    println!("  CGST (9%):   ₹{}", amounts.cgst);
    println!("  SGST (9%):   ₹{}", amounts.sgst);
    println!("  Line Total:  ₹{}", amounts.line_total);
    println!();

    // 3. The same line on a bill that suppresses GST
    println!("🚫 Same Line with GST Suppressed:");
    let plain = LineAmounts::calculate(&notebook, false);
    println!("  GST:         ₹{}", plain.gst_amount);
    println!("  Line Total:  ₹{}", plain.line_total);
    println!();

    // 4. Bill totals with a carried-forward due and rupee rounding
    println!("🧾 Bill Totals with Carried Due:");
    let items = vec![
        notebook,
        LineItem::new(
            "Sugar 1kg".to_string(),
            BigDecimal::from(2),
            BigDecimal::from(25),
        )
        .with_unit("kg".to_string())
        .with_gst(BigDecimal::from(5)),
        LineItem::new(
            "Khata book".to_string(),
            BigDecimal::from(1),
            BigDecimal::from(50),
        ),
    ];

    let previous_due = BigDecimal::from(50);
    let totals = BillTotals::compute(&items, true, &previous_due);

    println!("  Previous Due:   ₹{}", previous_due);
    println!("  Raw Total:      ₹{}", totals.raw_total);
    println!("  Payable:        ₹{}", totals.rounded_total);
    println!("  Rounding Diff:  ₹{}", totals.rounding_diff);
    println!(
        "  Identity holds: {}",
        if &totals.rounded_total + &totals.rounding_diff == totals.raw_total {
            "✅ Yes"
        } else {
            "❌ No"
        }
    );

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
