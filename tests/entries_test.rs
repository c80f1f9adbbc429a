mod common;

use anyhow::Result;
use cashbook::application::{AppError, MAX_PAGE_LIMIT, NewEntry};
use cashbook::domain::{EntryReason, MoneyError, TaxRate};
use chrono::{Duration, NaiveDate};
use common::{parse_date, parse_instant, record, shop, test_service};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_running_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let cashbook = shop(&service, "alice").await?;

    let opening = record(
        &service,
        "alice",
        &cashbook,
        "2025-02-14T08:00:00Z",
        EntryReason::DayOpening,
        dec!(100),
    )
    .await?;
    let expense = record(
        &service,
        "alice",
        &cashbook,
        "2025-02-14T09:00:00Z",
        EntryReason::ExpenseGoods,
        dec!(-30),
    )
    .await?;
    let sale = record(
        &service,
        "alice",
        &cashbook,
        "2025-02-14T10:00:00Z",
        EntryReason::IncomeSales,
        dec!(12.5),
    )
    .await?;

    assert_eq!(opening.balance_raw, dec!(100.00));
    assert_eq!(expense.balance_raw, dec!(70.00));
    assert_eq!(sale.balance_raw, dec!(82.50));
    assert!(opening.id < expense.id && expense.id < sale.id);

    // Stored values match what was returned
    let entries = service.list_entries("alice", cashbook.id, 0, None).await?;
    assert_eq!(entries, vec![opening, expense, sale]);
    assert_eq!(entries[2].amount(&cashbook)?.amount().to_string(), "12.50");

    Ok(())
}

#[tokio::test]
async fn test_balance_follows_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let cashbook = shop(&service, "alice").await?;

    // Backdated entry recorded last still continues the ledger
    record(
        &service,
        "alice",
        &cashbook,
        "2025-02-14T12:00:00Z",
        EntryReason::IncomeMisc,
        dec!(10),
    )
    .await?;
    let late = record(
        &service,
        "alice",
        &cashbook,
        "2025-02-13T12:00:00Z",
        EntryReason::Correction,
        dec!(-1),
    )
    .await?;

    assert_eq!(late.balance_raw, dec!(9.00));

    Ok(())
}

#[tokio::test]
async fn test_balances_are_per_cashbook() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let first = shop(&service, "alice").await?;
    let second = shop(&service, "alice").await?;

    record(
        &service,
        "alice",
        &first,
        "2025-02-14T08:00:00Z",
        EntryReason::DayOpening,
        dec!(50),
    )
    .await?;
    let other = record(
        &service,
        "alice",
        &second,
        "2025-02-14T08:00:00Z",
        EntryReason::DayOpening,
        dec!(20),
    )
    .await?;

    assert_eq!(other.balance_raw, dec!(20.00));

    Ok(())
}

#[tokio::test]
async fn test_entry_details_are_stored() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let cashbook = shop(&service, "alice").await?;

    let new_entry = NewEntry::new(
        parse_instant("2025-02-14T09:15:30.250Z"),
        EntryReason::ExpenseBankTransfer,
        dec!(-200),
    )
    .with_text("Deposit")
    .with_tax(TaxRate::parse("19/100")?)
    .with_reference("KA-2025-02")
    .with_reference_date(NaiveDate::from_ymd_opt(2025, 2, 13).unwrap());
    service.record_entry("alice", cashbook.id, new_entry).await?;

    let entries = service.list_entries("alice", cashbook.id, 0, None).await?;
    let entry = &entries[0];
    assert_eq!(entry.user_id, "alice");
    assert_eq!(entry.datetime, parse_instant("2025-02-14T09:15:30.250Z"));
    assert_eq!(entry.text, "Deposit");
    assert_eq!(entry.reason, EntryReason::ExpenseBankTransfer);
    assert_eq!(entry.tax.as_ref().map(TaxRate::raw), Some("19/100"));
    assert_eq!(entry.reference.as_deref(), Some("KA-2025-02"));
    assert_eq!(entry.reference_date.map(|d| d.to_string()), Some("2025-02-13".to_string()));
    assert_eq!(entry.balance_raw, dec!(-200.00));

    Ok(())
}

#[tokio::test]
async fn test_amount_precision_follows_currency() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let eur = shop(&service, "alice").await?;
    let jpy = service
        .create_cashbook("alice", "Tokyo".into(), None, "JPY")
        .await?;

    let result = record(
        &service,
        "alice",
        &eur,
        "2025-02-14T08:00:00Z",
        EntryReason::IncomeMisc,
        dec!(1.005),
    )
    .await;
    assert!(matches!(
        result.unwrap_err().downcast_ref::<AppError>(),
        Some(AppError::InvalidAmount(_))
    ));

    let result = record(
        &service,
        "alice",
        &jpy,
        "2025-02-14T08:00:00Z",
        EntryReason::IncomeMisc,
        dec!(1.5),
    )
    .await;
    assert!(result.is_err());

    let entry = record(
        &service,
        "alice",
        &jpy,
        "2025-02-14T08:00:00Z",
        EntryReason::IncomeMisc,
        dec!(1500),
    )
    .await?;
    assert_eq!(entry.amount_raw.to_string(), "1500");

    // Nothing was written for the rejected amounts
    assert!(service.list_entries("alice", eur.id, 0, None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_entries_of_foreign_cashbook_cannot_be_recorded() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let cashbook = shop(&service, "alice").await?;

    let entry = NewEntry::new(parse_date("2025-02-14"), EntryReason::IncomeSales, dec!(5));
    let result = service.record_entry("bob", cashbook.id, entry).await;
    assert!(matches!(result, Err(AppError::CashbookNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_paging() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let cashbook = shop(&service, "alice").await?;

    let start = parse_date("2025-02-14");
    for i in 0..25 {
        let entry = NewEntry::new(start + Duration::minutes(i), EntryReason::IncomeSales, dec!(1));
        service.record_entry("alice", cashbook.id, entry).await?;
    }

    let first = service.list_entries("alice", cashbook.id, 0, None).await?;
    assert_eq!(first.len(), 20);
    assert_eq!(first[19].balance_raw, dec!(20.00));

    let rest = service.list_entries("alice", cashbook.id, 20, None).await?;
    assert_eq!(rest.len(), 5);
    assert!(first.last().unwrap().id < rest[0].id);

    let small = service.list_entries("alice", cashbook.id, 3, Some(2)).await?;
    assert_eq!(small.len(), 2);
    assert_eq!(small[0].id, first[3].id);

    let all = service
        .list_entries("alice", cashbook.id, 0, Some(MAX_PAGE_LIMIT))
        .await?;
    assert_eq!(all.len(), 25);

    let result = service
        .list_entries("alice", cashbook.id, 0, Some(MAX_PAGE_LIMIT + 1))
        .await;
    assert!(matches!(
        result,
        Err(AppError::LimitExceeded { requested: 51, max: 50 })
    ));

    Ok(())
}

#[tokio::test]
async fn test_balance_overflow_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let cashbook = shop(&service, "alice").await?;

    // Largest amount that still carries two decimal places
    let largest = Decimal::from_i128_with_scale(79_228_162_514_264_337_593_543_950_335, 2);
    let entry = NewEntry::new(parse_date("2025-02-14"), EntryReason::IncomeMisc, largest);
    service
        .record_entry("alice", cashbook.id, entry.clone())
        .await?;

    let result = service.record_entry("alice", cashbook.id, entry).await;
    assert!(matches!(
        result,
        Err(AppError::Money(MoneyError::Overflow { .. }))
    ));

    // The failed append left the ledger untouched
    let entries = service.list_entries("alice", cashbook.id, 0, None).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].balance_raw, largest);

    Ok(())
}

#[tokio::test]
async fn test_amount_too_large_for_currency_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let cashbook = shop(&service, "alice").await?;

    let entry = NewEntry::new(parse_date("2025-02-14"), EntryReason::IncomeMisc, Decimal::MAX);
    let result = service.record_entry("alice", cashbook.id, entry).await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    Ok(())
}
