use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::{Cashbook, CashbookId, Currency, Entry, EntryReason, Money, TaxRate};

use super::MIGRATION_001_INITIAL;

const ENTRY_COLUMNS: &str = "id, cashbook_id, user_id, datetime, text, reason, amount_raw, balance_raw, tax_raw, reference, reference_date";

/// Repository for persisting and querying cashbooks and their entries.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Cashbook operations
    // ========================

    /// Save a new cashbook and assign its id.
    pub async fn save_cashbook(&self, cashbook: &mut Cashbook) -> Result<()> {
        let row = sqlx::query(
            r#"
            INSERT INTO cashbooks (name, account, owner, currency)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&cashbook.name)
        .bind(&cashbook.account)
        .bind(&cashbook.owner)
        .bind(cashbook.currency.code())
        .fetch_one(&self.pool)
        .await
        .context("Failed to save cashbook")?;

        cashbook.id = row.get("id");
        debug!(cashbook_id = cashbook.id, owner = %cashbook.owner, "saved cashbook");
        Ok(())
    }

    /// Get a cashbook by ID.
    pub async fn get_cashbook(&self, id: CashbookId) -> Result<Option<Cashbook>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, account, owner, currency
            FROM cashbooks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch cashbook")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_cashbook(&row)?)),
            None => Ok(None),
        }
    }

    /// List the cashbooks of one owner.
    pub async fn list_cashbooks_for_owner(&self, owner: &str) -> Result<Vec<Cashbook>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, account, owner, currency
            FROM cashbooks
            WHERE owner = ?
            ORDER BY id
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list cashbooks")?;

        rows.iter().map(Self::row_to_cashbook).collect()
    }

    /// Delete a cashbook. Its entries go with it (ON DELETE CASCADE).
    pub async fn delete_cashbook(&self, id: CashbookId) -> Result<()> {
        sqlx::query("DELETE FROM cashbooks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete cashbook")?;
        Ok(())
    }

    fn row_to_cashbook(row: &sqlx::sqlite::SqliteRow) -> Result<Cashbook> {
        let currency_str: String = row.get("currency");

        Ok(Cashbook {
            id: row.get("id"),
            name: row.get("name"),
            account: row.get("account"),
            currency: Currency::new(&currency_str).context("Invalid cashbook currency")?,
            owner: row.get("owner"),
        })
    }

    // ========================
    // Entry operations
    // ========================

    /// Append an entry to the end of a cashbook.
    ///
    /// The entry's balance is set to the balance of the cashbook's last entry
    /// (by id) plus the entry's amount. Read and insert happen in one
    /// transaction. Assigns the entry's id.
    pub async fn append_entry(&self, cashbook: &Cashbook, entry: &mut Entry) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start transaction")?;

        let previous: Option<String> = sqlx::query_scalar(
            r#"
            SELECT balance_raw
            FROM cashbook_entries
            WHERE cashbook_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(cashbook.id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch last balance")?;

        let previous = match previous {
            Some(raw) => parse_decimal(&raw).context("Invalid balance_raw")?,
            None => Decimal::ZERO,
        };
        let balance =
            Money::of(previous, cashbook.currency.clone())?.checked_add(&entry.amount(cashbook)?)?;
        entry.set_balance(&balance);

        let row = sqlx::query(
            r#"
            INSERT INTO cashbook_entries (cashbook_id, user_id, datetime, text, reason, amount_raw, balance_raw, tax_raw, reference, reference_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(entry.cashbook_id)
        .bind(&entry.user_id)
        .bind(format_timestamp(entry.datetime))
        .bind(&entry.text)
        .bind(entry.reason.as_str())
        .bind(entry.amount_raw.to_string())
        .bind(entry.balance_raw.to_string())
        .bind(entry.tax.as_ref().map(|tax| tax.raw().to_string()))
        .bind(&entry.reference)
        .bind(entry.reference_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .fetch_one(&mut *tx)
        .await
        .context("Failed to save entry")?;

        tx.commit().await.context("Failed to commit entry")?;

        entry.id = row.get("id");
        debug!(
            cashbook_id = cashbook.id,
            entry_id = entry.id,
            balance = %entry.balance_raw,
            "appended entry"
        );
        Ok(())
    }

    /// Get the last entry of a cashbook in ledger order.
    pub async fn get_last_entry(&self, cashbook_id: CashbookId) -> Result<Option<Entry>> {
        let query = format!(
            "SELECT {} FROM cashbook_entries WHERE cashbook_id = ? ORDER BY id DESC LIMIT 1",
            ENTRY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(cashbook_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch last entry")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_entry(&row)?)),
            None => Ok(None),
        }
    }

    /// Count the entries of a cashbook.
    pub async fn count_entries(&self, cashbook_id: CashbookId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM cashbook_entries WHERE cashbook_id = ?")
            .bind(cashbook_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count entries")?;

        Ok(row.get("count"))
    }

    /// List a page of entries, ordered by id.
    pub async fn list_entries(
        &self,
        cashbook_id: CashbookId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Entry>> {
        let query = format!(
            "SELECT {} FROM cashbook_entries WHERE cashbook_id = ? ORDER BY id LIMIT ? OFFSET ?",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(cashbook_id)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// List entries with `from <= datetime <= to`, ordered by id.
    pub async fn list_entries_between(
        &self,
        cashbook_id: CashbookId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Entry>> {
        let query = format!(
            "SELECT {} FROM cashbook_entries WHERE cashbook_id = ? AND datetime >= ? AND datetime <= ? ORDER BY id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(cashbook_id)
            .bind(format_timestamp(from))
            .bind(format_timestamp(to))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list entries by date")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Timestamp of the most recent day opening at or before `at`.
    pub async fn find_day_opening_before(
        &self,
        cashbook_id: CashbookId,
        at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let opened: Option<String> = sqlx::query_scalar(
            r#"
            SELECT datetime
            FROM cashbook_entries
            WHERE cashbook_id = ? AND reason = ? AND datetime <= ?
            ORDER BY datetime DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(cashbook_id)
        .bind(EntryReason::DayOpening.as_str())
        .bind(format_timestamp(at))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find day opening")?;

        opened.map(|s| parse_timestamp(&s)).transpose()
    }

    /// Entries for a statement over `[begin, end]`.
    ///
    /// The window is widened to start at midnight (UTC) of the day holding the
    /// most recent day opening at or before `begin`, so a statement starting
    /// mid-day still shows that day's opening balance.
    pub async fn list_entries_for_statement(
        &self,
        cashbook_id: CashbookId,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Entry>> {
        let from = match self.find_day_opening_before(cashbook_id, begin).await? {
            Some(opened) => start_of_day(opened),
            None => begin,
        };
        debug!(cashbook_id, %from, %end, "statement window");

        self.list_entries_between(cashbook_id, from, end).await
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<Entry> {
        let datetime_str: String = row.get("datetime");
        let reason_str: String = row.get("reason");
        let amount_str: String = row.get("amount_raw");
        let balance_str: String = row.get("balance_raw");
        let tax_str: Option<String> = row.get("tax_raw");
        let reference_date_str: Option<String> = row.get("reference_date");

        Ok(Entry {
            id: row.get("id"),
            cashbook_id: row.get("cashbook_id"),
            user_id: row.get("user_id"),
            datetime: parse_timestamp(&datetime_str)?,
            text: row.get("text"),
            reason: reason_str
                .parse::<EntryReason>()
                .context("Invalid entry reason")?,
            amount_raw: parse_decimal(&amount_str).context("Invalid amount_raw")?,
            balance_raw: parse_decimal(&balance_str).context("Invalid balance_raw")?,
            tax: tax_str
                .filter(|s| !s.is_empty())
                .map(|s| TaxRate::parse(&s))
                .transpose()
                .context("Invalid tax_raw")?,
            reference: row.get("reference"),
            reference_date: reference_date_str
                .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
                .transpose()
                .context("Invalid reference_date")?,
        })
    }
}

/// Fixed-width UTC timestamp so that text comparison in SQL is time comparison.
fn format_timestamp(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp '{}'", s))?
        .with_timezone(&Utc))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str_exact(s).with_context(|| format!("Invalid decimal '{}'", s))
}

fn start_of_day(datetime: DateTime<Utc>) -> DateTime<Utc> {
    datetime
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
}
