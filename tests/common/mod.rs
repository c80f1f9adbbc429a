// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::Result;
use cashbook::application::{CashbookService, NewEntry};
use cashbook::domain::{Cashbook, Entry, EntryReason};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(CashbookService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = CashbookService::init(db_path(&temp_dir).to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Path of the database file inside a test directory
pub fn db_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("test.db")
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Helper to parse an RFC 3339 timestamp into DateTime<Utc>
pub fn parse_instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Create a EUR cashbook for `owner`
pub async fn shop(service: &CashbookService, owner: &str) -> Result<Cashbook> {
    Ok(service
        .create_cashbook(owner, "Shop".into(), None, "EUR")
        .await?)
}

/// Record a plain entry without text, tax or reference
pub async fn record(
    service: &CashbookService,
    owner: &str,
    cashbook: &Cashbook,
    at: &str,
    reason: EntryReason,
    amount: Decimal,
) -> Result<Entry> {
    let entry = NewEntry::new(parse_instant(at), reason, amount);
    Ok(service.record_entry(owner, cashbook.id, entry).await?)
}
