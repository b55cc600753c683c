//! Basic credit ledger usage example

use bigdecimal::BigDecimal;
use billing_core::utils::MemoryStore;
use billing_core::{BillDraft, BillingEngine, LineItem, PartyRef, StatementEventKind};
use chrono::NaiveDate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Engine events (charges, settlements, conflicts) show up under RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🧾 Billing Core - Credit Ledger Example\n");

    // Create a new billing engine with in-memory storage
    let store = MemoryStore::new();
    let mut engine = BillingEngine::new(store);

    // 1. Open a ledger account for a regular customer
    println!("📒 Opening a customer account...");
    let account = engine
        .open_account(
            PartyRef::customer("Asha Stores".to_string()).with_phone("9876543210".to_string()),
        )
        .await?;
    println!(
        "  ✓ Opened account for {} ({})",
        account.party_name, account.party_id
    );
    println!();

    // 2. Raise a credit bill
    println!("💰 Raising a credit bill...");
    let bill = engine
        .create_bill(BillDraft::credit(
            PartyRef::customer("Asha Stores".to_string()).with_id(account.party_id),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            vec![LineItem::new(
                "Notebook".to_string(),
                BigDecimal::from(2),
                BigDecimal::from(100),
            )
            .with_discount(BigDecimal::from(10))
            .with_gst(BigDecimal::from(18))],
        ))
        .await?;

    println!("  Bill Number:   {}", bill.bill_number);
    println!("  Raw Total:     ₹{}", bill.raw_total);
    println!("  Payable:       ₹{}", bill.rounded_total);
    println!("  Rounding Diff: ₹{}", bill.rounding_diff);
    println!(
        "  Outstanding:   ₹{}",
        engine.get_balance(&account.party_id).await?
    );
    println!();

    // 3. A later bill carries the due forward, with a counter payment
    println!("💰 Raising a second bill with a counter payment...");
    let second = engine
        .create_bill(
            BillDraft::credit(
                PartyRef::customer("Asha Stores".to_string()).with_id(account.party_id),
                NaiveDate::from_ymd_opt(2025, 4, 5).unwrap(),
                vec![LineItem::new(
                    "Rice 25kg".to_string(),
                    BigDecimal::from(1),
                    BigDecimal::from(500),
                )],
            )
            .with_partial_payment(BigDecimal::from(100)),
        )
        .await?;

    println!("  Previous Due:  ₹{}", second.previous_due);
    println!("  Payable:       ₹{}", second.rounded_total);
    println!("  Paid Now:      ₹100");
    println!(
        "  Outstanding:   ₹{}",
        engine.get_balance(&account.party_id).await?
    );
    println!();

    // 4. The customer pays down part of the balance
    println!("💵 Settling part of the due...");
    let settlement = engine
        .settle_due(&account.party_id, &BigDecimal::from(300), None)
        .await?;
    println!(
        "  ✓ Recorded {:?} settlement of ₹{}, balance now ₹{}",
        settlement.kind, settlement.amount, settlement.resulting_balance
    );
    println!();

    // 5. Print the party statement
    println!("📜 Statement for {}:", account.party_name);
    let statement = engine.party_statement(&account.party_id).await?;
    for entry in &statement.entries {
        let label = match entry.kind {
            StatementEventKind::Charge => "Charge ",
            StatementEventKind::Settlement => "Payment",
        };
        println!(
            "  {}  ₹{:>8}  balance ₹{}",
            label, entry.amount, entry.balance
        );
    }
    println!("  Closing Balance: ₹{}", statement.closing_balance);
    println!(
        "  Reconciles: {}",
        if statement.reconciles { "✅ Yes" } else { "❌ No" }
    );
    println!();

    // 6. Roll up dues across all parties
    let totals = engine.party_totals(None).await?;
    println!("📈 Party Totals:");
    println!("  Accounts:     {}", totals.account_count);
    println!("  Owing:        {}", totals.owing_count);
    println!("  Total Due:    ₹{}", totals.total_due);
    println!("  Average Due:  ₹{}", totals.average_due);
    println!();

    // 7. Validate ledger integrity
    println!("🔍 Validating Ledger Integrity...");
    let report = engine.validate_integrity().await?;
    if report.is_valid {
        println!("  ✅ Ledger integrity check passed!");
    } else {
        println!("  ❌ Ledger integrity check failed:");
        for issue in &report.issues {
            println!("    - {}", issue);
        }
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
