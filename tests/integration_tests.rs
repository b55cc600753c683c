//! Integration tests for billing-core

use bigdecimal::BigDecimal;
use billing_core::{
    utils::{EnhancedBillValidator, EnhancedPartyValidator, MemoryStore},
    AccountManager, AccountState, BillDraft, BillingEngine, BillingError, BillingStore,
    GstRateKey, LineItem, PartyKind, PartyRef, SettlementKind, SettlementProcessor,
    StatementEventKind,
};
use chrono::NaiveDate;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[tokio::test]
async fn test_complete_billing_workflow() {
    let store = MemoryStore::new();
    let mut engine = BillingEngine::new(store);

    // First credit bill for a new customer
    let bill = engine
        .create_bill(BillDraft::credit(
            PartyRef::customer("Asha Stores".to_string()).with_phone("9876543210".to_string()),
            date(2025, 4, 1),
            vec![LineItem::new(
                "Notebook".to_string(),
                BigDecimal::from(2),
                BigDecimal::from(100),
            )
            .with_discount(BigDecimal::from(10))
            .with_gst(BigDecimal::from(18))],
        ))
        .await
        .unwrap();

    assert_eq!(bill.raw_total, "212.4".parse().unwrap());
    assert_eq!(bill.rounded_total, BigDecimal::from(212));
    assert_eq!(bill.rounding_diff, "0.4".parse().unwrap());

    let party_id = bill.party.id.unwrap();
    assert_eq!(
        engine.get_balance(&party_id).await.unwrap(),
        BigDecimal::from(212)
    );

    // Customer pays down part of the due
    let settlement = engine
        .settle_due(&party_id, &BigDecimal::from(12), None)
        .await
        .unwrap();
    assert_eq!(settlement.kind, SettlementKind::Partial);
    assert_eq!(settlement.resulting_balance, BigDecimal::from(200));

    // Second credit bill carries the remaining due forward
    let second = engine
        .create_bill(BillDraft::credit(
            PartyRef::customer("Asha Stores".to_string()).with_id(party_id),
            date(2025, 4, 2),
            vec![LineItem::new(
                "Khata entry".to_string(),
                BigDecimal::from(1),
                BigDecimal::from(50),
            )],
        ))
        .await
        .unwrap();

    assert_eq!(second.previous_due, BigDecimal::from(200));
    assert_eq!(second.rounded_total, BigDecimal::from(250));
    assert_eq!(
        engine.get_balance(&party_id).await.unwrap(),
        BigDecimal::from(250)
    );

    // Statement replays to the live balance
    let statement = engine.party_statement(&party_id).await.unwrap();
    assert_eq!(statement.entries.len(), 3);
    assert_eq!(statement.entries[0].kind, StatementEventKind::Charge);
    assert_eq!(statement.closing_balance, BigDecimal::from(250));
    assert!(statement.reconciles);

    // Daily totals count only the fresh charge, not the carried due
    let daily = engine.daily_totals(date(2025, 4, 2)).await.unwrap();
    assert_eq!(daily.bill_count, 1);
    assert_eq!(daily.credit_total, BigDecimal::from(50));
    assert_eq!(daily.cash_total, BigDecimal::from(0));
    assert_eq!(daily.sales_total, BigDecimal::from(50));

    // Monthly totals fold both bills
    let monthly = engine.monthly_totals(2025, 4).await.unwrap();
    assert_eq!(monthly.bill_count, 2);
    assert_eq!(monthly.credit_total, BigDecimal::from(262));
    assert_eq!(monthly.sales_total, BigDecimal::from(262));

    // Rounding differences stay on the books
    let audit = engine.rounding_audit(None, None).await.unwrap();
    assert_eq!(audit.bill_count, 2);
    assert_eq!(audit.rounding_diff_total, "0.4".parse().unwrap());
    assert!(audit.consistent);

    // Outstanding balances roll up per party
    let totals = engine.party_totals(None).await.unwrap();
    assert_eq!(totals.account_count, 1);
    assert_eq!(totals.owing_count, 1);
    assert_eq!(totals.total_due, BigDecimal::from(250));
    assert_eq!(totals.average_due, BigDecimal::from(250));

    // Validate integrity
    let report = engine.validate_integrity().await.unwrap();
    assert!(report.is_valid, "unexpected issues: {:?}", report.issues);
    assert_eq!(report.accounts_checked, 1);
    assert_eq!(report.bills_checked, 2);
    assert_eq!(report.settlements_checked, 1);
}

#[tokio::test]
async fn test_gst_summary_with_mixed_rates() {
    let mut engine = BillingEngine::new(MemoryStore::new());

    // Cash bill mixing 18%, 5%, and untaxed lines
    let bill = engine
        .create_bill(BillDraft::cash(
            PartyRef::customer("Walk-in".to_string()),
            date(2025, 4, 10),
            vec![
                LineItem::new(
                    "Steel bottle".to_string(),
                    BigDecimal::from(1),
                    BigDecimal::from(300),
                )
                .with_gst(BigDecimal::from(18)),
                LineItem::new(
                    "Sugar 1kg".to_string(),
                    BigDecimal::from(2),
                    BigDecimal::from(25),
                )
                .with_gst(BigDecimal::from(5)),
                LineItem::new(
                    "Khata book".to_string(),
                    BigDecimal::from(1),
                    BigDecimal::from(50),
                ),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(bill.raw_total, "456.5".parse().unwrap());
    assert_eq!(bill.rounded_total, BigDecimal::from(456));
    assert_eq!(bill.rounding_diff, "0.5".parse().unwrap());

    // Cash sales never touch the ledger
    let account = engine
        .get_account(&bill.party.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.state(), AccountState::Clear);

    let summary = engine.gst_summary(None, None).await.unwrap();

    let eighteen = summary.buckets.get(&GstRateKey::Eighteen).unwrap();
    assert_eq!(eighteen.item_count, 1);
    assert_eq!(eighteen.taxable_value, BigDecimal::from(300));
    assert_eq!(eighteen.gst_amount, BigDecimal::from(54));
    assert_eq!(eighteen.sgst, BigDecimal::from(27));
    assert_eq!(eighteen.cgst, BigDecimal::from(27));
    assert_eq!(eighteen.total_amount, BigDecimal::from(354));

    let five = summary.buckets.get(&GstRateKey::Five).unwrap();
    assert_eq!(five.taxable_value, BigDecimal::from(50));
    assert_eq!(five.gst_amount, "2.5".parse().unwrap());
    assert_eq!(five.total_amount, "52.5".parse().unwrap());

    // Untaxed turnover lands in the zero bucket
    let zero = summary.buckets.get(&GstRateKey::Zero).unwrap();
    assert_eq!(zero.item_count, 1);
    assert_eq!(zero.taxable_value, BigDecimal::from(50));
    assert_eq!(zero.gst_amount, BigDecimal::from(0));

    assert_eq!(summary.total_taxable, BigDecimal::from(400));
    assert_eq!(summary.total_gst, "56.5".parse().unwrap());
}

#[tokio::test]
async fn test_enhanced_validation_and_account_deletion() {
    let mut engine = BillingEngine::with_validators(
        MemoryStore::new(),
        Box::new(EnhancedPartyValidator),
        Box::new(EnhancedBillValidator),
    );

    // Duplicate line names are rejected
    let duplicate = BillDraft::cash(
        PartyRef::customer("Asha Stores".to_string()),
        date(2025, 4, 1),
        vec![
            LineItem::new("Soap".to_string(), BigDecimal::from(1), BigDecimal::from(30)),
            LineItem::new("Soap".to_string(), BigDecimal::from(2), BigDecimal::from(30)),
        ],
    );
    assert!(matches!(
        engine.create_bill(duplicate).await,
        Err(BillingError::Validation(_))
    ));

    // Discounts beyond 100% are rejected
    let overdiscounted = BillDraft::cash(
        PartyRef::customer("Asha Stores".to_string()),
        date(2025, 4, 1),
        vec![LineItem::new(
            "Soap".to_string(),
            BigDecimal::from(1),
            BigDecimal::from(30),
        )
        .with_discount(BigDecimal::from(150))],
    );
    assert!(matches!(
        engine.create_bill(overdiscounted).await,
        Err(BillingError::Validation(_))
    ));

    // An owing account cannot be deleted
    let bill = engine
        .create_bill(BillDraft::credit(
            PartyRef::customer("Asha Stores".to_string()),
            date(2025, 4, 1),
            vec![LineItem::new(
                "Rice 25kg".to_string(),
                BigDecimal::from(1),
                BigDecimal::from(1200),
            )],
        ))
        .await
        .unwrap();
    let party_id = bill.party.id.unwrap();

    assert!(engine.delete_account(&party_id).await.is_err());

    // Clearing the due unlocks deletion
    engine
        .settle_due(&party_id, &BigDecimal::from(1200), None)
        .await
        .unwrap();
    engine.delete_account(&party_id).await.unwrap();
    assert!(engine.get_account(&party_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_overpayment_is_absorbed() {
    let mut engine = BillingEngine::new(MemoryStore::new());

    // Credit bill with a counter payment taken on the spot
    let bill = engine
        .create_bill(
            BillDraft::credit(
                PartyRef::customer("Binu Traders".to_string()),
                date(2025, 4, 5),
                vec![LineItem::new(
                    "Cement bag".to_string(),
                    BigDecimal::from(2),
                    BigDecimal::from(500),
                )],
            )
            .with_partial_payment(BigDecimal::from(400)),
        )
        .await
        .unwrap();
    let party_id = bill.party.id.unwrap();

    assert_eq!(
        engine.get_balance(&party_id).await.unwrap(),
        BigDecimal::from(600)
    );

    // Paying more than the due clamps the balance at zero
    let settlement = engine
        .settle_due(&party_id, &BigDecimal::from(700), None)
        .await
        .unwrap();
    assert_eq!(settlement.kind, SettlementKind::Full);
    assert_eq!(settlement.resulting_balance, BigDecimal::from(0));

    let account = engine.get_account(&party_id).await.unwrap().unwrap();
    assert_eq!(account.state(), AccountState::Clear);
    assert_eq!(account.total_due, BigDecimal::from(0));

    // The statement replays both payments against the charge
    let statement = engine.party_statement(&party_id).await.unwrap();
    assert_eq!(statement.entries.len(), 3);
    assert_eq!(statement.closing_balance, BigDecimal::from(0));
    assert!(statement.reconciles);
}

#[tokio::test]
async fn test_date_range_filtering() {
    let mut engine = BillingEngine::new(MemoryStore::new());

    // Bills in different months
    engine
        .create_bill(
            BillDraft::cash(
                PartyRef::customer("Walk-in".to_string()),
                date(2025, 1, 1),
                vec![LineItem::new(
                    "Soap".to_string(),
                    BigDecimal::from(1),
                    BigDecimal::from(100),
                )],
            )
            .with_bill_number("JAN-1".to_string()),
        )
        .await
        .unwrap();
    engine
        .create_bill(
            BillDraft::cash(
                PartyRef::customer("Walk-in".to_string()),
                date(2025, 2, 1),
                vec![LineItem::new(
                    "Soap".to_string(),
                    BigDecimal::from(2),
                    BigDecimal::from(100),
                )],
            )
            .with_bill_number("FEB-1".to_string()),
        )
        .await
        .unwrap();

    let january = engine
        .list_bills(Some(date(2025, 1, 1)), Some(date(2025, 1, 31)))
        .await
        .unwrap();
    assert_eq!(january.len(), 1);
    assert_eq!(january[0].bill_number, "JAN-1");

    let daily = engine.daily_totals(date(2025, 1, 1)).await.unwrap();
    assert_eq!(daily.cash_total, BigDecimal::from(100));
    assert_eq!(daily.sales_total, BigDecimal::from(100));

    let months = engine.monthly_breakdown(None, None).await.unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(months["2025-01"].cash_total, BigDecimal::from(100));
    assert_eq!(months["2025-02"].cash_total, BigDecimal::from(200));

    // Settlements recorded on specific dates filter the same way
    let account = engine
        .open_account(PartyRef::customer("Asha Stores".to_string()))
        .await
        .unwrap();
    engine
        .post_charge(&account.party_id, &BigDecimal::from(300), date(2025, 1, 1))
        .await
        .unwrap();
    engine
        .settle_due_on(
            &account.party_id,
            &BigDecimal::from(100),
            None,
            date(2025, 1, 5),
        )
        .await
        .unwrap();
    engine
        .settle_due_on(
            &account.party_id,
            &BigDecimal::from(200),
            None,
            date(2025, 2, 5),
        )
        .await
        .unwrap();

    let january_settlements = engine
        .get_settlements(Some(date(2025, 1, 1)), Some(date(2025, 1, 31)))
        .await
        .unwrap();
    assert_eq!(january_settlements.len(), 1);
    assert_eq!(january_settlements[0].amount, BigDecimal::from(100));

    let all_settlements = engine
        .get_party_settlements(&account.party_id, None, None)
        .await
        .unwrap();
    assert_eq!(all_settlements.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_settlements_do_not_lose_updates() {
    let store = MemoryStore::new();

    let mut accounts = AccountManager::new(store.clone());
    let account = accounts
        .open_account(PartyRef::customer("Asha Stores".to_string()))
        .await
        .unwrap();
    accounts
        .post_charge(
            &account.party_id,
            &BigDecimal::from(500),
            date(2025, 4, 1),
        )
        .await
        .unwrap();

    // Two cashiers take the same payment at the same moment
    let party_id = account.party_id;
    let first_store = store.clone();
    let second_store = store.clone();
    let first = tokio::spawn(async move {
        let mut processor = SettlementProcessor::new(first_store);
        processor
            .settle(&party_id, &BigDecimal::from(500), None)
            .await
    });
    let second = tokio::spawn(async move {
        let mut processor = SettlementProcessor::new(second_store);
        processor
            .settle(&party_id, &BigDecimal::from(500), None)
            .await
    });

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    // One payment clears the due, the other is absorbed; nothing goes negative
    assert!(first.resulting_balance >= BigDecimal::from(0));
    assert!(second.resulting_balance >= BigDecimal::from(0));

    let account = store.get_account(&party_id).await.unwrap().unwrap();
    assert_eq!(account.total_due, BigDecimal::from(0));

    let settlements = store.get_settlements(None, None).await.unwrap();
    assert_eq!(settlements.len(), 2);
}

#[tokio::test]
async fn test_memory_store_operations() {
    let store = MemoryStore::new();

    // Account round trip with phone lookup
    let mut accounts = AccountManager::new(store.clone());
    let account = accounts
        .open_account(
            PartyRef::customer("Asha Stores".to_string()).with_phone("9876543210".to_string()),
        )
        .await
        .unwrap();

    let by_phone = store
        .find_account_by_phone(PartyKind::Customer, "9876543210")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_phone.party_id, account.party_id);

    // Stale versions are refused
    let result = store
        .update_account_versioned(&account, account.version + 1)
        .await;
    assert!(matches!(result, Err(BillingError::Conflict(_))));

    // Bill lookup by number through the engine
    let mut engine = BillingEngine::new(store.clone());
    let bill = engine
        .create_bill(
            BillDraft::cash(
                PartyRef::customer("Walk-in".to_string()),
                date(2025, 4, 1),
                vec![LineItem::new(
                    "Soap".to_string(),
                    BigDecimal::from(1),
                    BigDecimal::from(30),
                )],
            )
            .with_bill_number("B-42".to_string()),
        )
        .await
        .unwrap();

    let found = engine.find_bill_by_number("B-42").await.unwrap().unwrap();
    assert_eq!(found.id, bill.id);
    assert!(engine.find_bill_by_number("B-43").await.unwrap().is_none());
}
