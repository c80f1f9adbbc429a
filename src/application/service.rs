use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::{
    Cashbook, CashbookId, Currency, Entry, EntryReason, Money, MoneyError, ParseReasonError,
    TaxRate, build_statement, parse_amount,
};
use crate::storage::Repository;

use super::{AppError, StatementLine, StatementReport};

/// Entries returned per page when no limit is given.
pub const DEFAULT_PAGE_LIMIT: usize = 20;
/// Largest page of entries a caller may request.
pub const MAX_PAGE_LIMIT: usize = 50;

/// Application service providing the cashbook use cases.
/// Every operation acts on behalf of a user and checks cashbook ownership.
pub struct CashbookService {
    repo: Repository,
}

/// Detailed cashbook information
pub struct CashbookInfo {
    pub cashbook: Cashbook,
    pub balance: Money,
    pub entry_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Data for a new entry; balance and id are filled in when it is recorded.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub datetime: DateTime<Utc>,
    pub reason: EntryReason,
    pub amount: Decimal,
    pub text: String,
    pub tax: Option<TaxRate>,
    pub reference: Option<String>,
    pub reference_date: Option<NaiveDate>,
}

impl NewEntry {
    pub fn new(datetime: DateTime<Utc>, reason: EntryReason, amount: Decimal) -> Self {
        Self {
            datetime,
            reason,
            amount,
            text: String::new(),
            tax: None,
            reference: None,
            reference_date: None,
        }
    }

    /// Build an entry from user input: amount, reason code and an optional
    /// tax rate given as text.
    pub fn parse(
        datetime: DateTime<Utc>,
        amount: &str,
        reason: &str,
        tax: Option<&str>,
    ) -> Result<Self, AppError> {
        let amount = parse_amount(amount)
            .map_err(|_| AppError::InvalidAmount(format!("'{}' is not a number", amount)))?;
        let reason: EntryReason = reason
            .parse()
            .map_err(|e: ParseReasonError| AppError::InvalidReason(e.0))?;

        let mut entry = Self::new(datetime, reason, amount);
        if let Some(tax) = tax {
            let tax = TaxRate::parse(tax).map_err(|e| AppError::InvalidTaxRate(e.to_string()))?;
            entry = entry.with_tax(tax);
        }
        Ok(entry)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_tax(mut self, tax: TaxRate) -> Self {
        self.tax = Some(tax);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }
}

impl CashbookService {
    /// Create a new cashbook service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Cashbook operations
    // ========================

    /// Create a new cashbook owned by `owner`.
    pub async fn create_cashbook(
        &self,
        owner: &str,
        name: String,
        account: Option<String>,
        currency: &str,
    ) -> Result<Cashbook, AppError> {
        let currency = Currency::new(currency).map_err(|e| AppError::InvalidCurrency(e.0))?;

        let mut cashbook = Cashbook::new(name, currency, owner);
        if let Some(account) = account {
            cashbook = cashbook.with_account(account);
        }

        self.repo.save_cashbook(&mut cashbook).await?;
        info!(cashbook_id = cashbook.id, owner, "created cashbook");
        Ok(cashbook)
    }

    /// List the cashbooks owned by `owner`.
    pub async fn list_cashbooks(&self, owner: &str) -> Result<Vec<Cashbook>, AppError> {
        Ok(self.repo.list_cashbooks_for_owner(owner).await?)
    }

    /// Get a cashbook. Cashbooks of other users are reported as not found.
    pub async fn get_cashbook(&self, owner: &str, id: CashbookId) -> Result<Cashbook, AppError> {
        match self.repo.get_cashbook(id).await? {
            Some(cashbook) if cashbook.is_owned_by(owner) => Ok(cashbook),
            _ => Err(AppError::CashbookNotFound(id)),
        }
    }

    /// Get detailed cashbook information.
    pub async fn get_cashbook_info(
        &self,
        owner: &str,
        id: CashbookId,
    ) -> Result<CashbookInfo, AppError> {
        let cashbook = self.get_cashbook(owner, id).await?;
        let entry_count = self.repo.count_entries(id).await?;
        let last = self.repo.get_last_entry(id).await?;

        let (balance, last_activity) = match last {
            Some(entry) => (entry.balance(&cashbook)?, Some(entry.datetime)),
            None => (Money::zero(cashbook.currency.clone()), None),
        };

        Ok(CashbookInfo {
            cashbook,
            balance,
            entry_count,
            last_activity,
        })
    }

    /// Delete a cashbook together with its entries. Only the owner may do this.
    pub async fn delete_cashbook(&self, owner: &str, id: CashbookId) -> Result<Cashbook, AppError> {
        let cashbook = match self.repo.get_cashbook(id).await? {
            Some(cashbook) if cashbook.is_owned_by(owner) => cashbook,
            _ => return Err(AppError::Forbidden(id)),
        };

        self.repo.delete_cashbook(id).await?;
        info!(cashbook_id = id, owner, "deleted cashbook");
        Ok(cashbook)
    }

    // ========================
    // Entry operations
    // ========================

    /// Record a new entry at the end of a cashbook, carrying the balance forward.
    pub async fn record_entry(
        &self,
        owner: &str,
        cashbook_id: CashbookId,
        new_entry: NewEntry,
    ) -> Result<Entry, AppError> {
        let cashbook = self.get_cashbook(owner, cashbook_id).await?;

        let amount = Money::of(new_entry.amount, cashbook.currency.clone())
            .map_err(|e| AppError::InvalidAmount(e.to_string()))?;

        let mut entry = Entry::new(
            &cashbook,
            owner,
            new_entry.datetime,
            new_entry.reason,
            &amount,
            &Money::zero(cashbook.currency.clone()),
        )
        .with_text(new_entry.text);
        entry.tax = new_entry.tax;
        entry.reference = new_entry.reference;
        entry.reference_date = new_entry.reference_date;

        // A balance overflow surfaces as a money error, not a storage one.
        self.repo
            .append_entry(&cashbook, &mut entry)
            .await
            .map_err(|e| match e.downcast::<MoneyError>() {
                Ok(money) => AppError::Money(money),
                Err(e) => AppError::Database(e),
            })?;
        Ok(entry)
    }

    /// List a page of entries in ledger order.
    pub async fn list_entries(
        &self,
        owner: &str,
        cashbook_id: CashbookId,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit > MAX_PAGE_LIMIT {
            return Err(AppError::LimitExceeded {
                requested: limit,
                max: MAX_PAGE_LIMIT,
            });
        }

        let cashbook = self.get_cashbook(owner, cashbook_id).await?;
        Ok(self.repo.list_entries(cashbook.id, offset, limit).await?)
    }

    // ========================
    // Statements
    // ========================

    /// Build a printable statement from user supplied range bounds.
    ///
    /// Bounds are RFC 3339 instants or plain `YYYY-MM-DD` dates; a plain `end`
    /// date covers that whole day.
    pub async fn statement(
        &self,
        owner: &str,
        cashbook_id: CashbookId,
        begin: &str,
        end: &str,
    ) -> Result<StatementReport, AppError> {
        let (begin, end) = parse_date_range(begin, end)?;
        self.statement_between(owner, cashbook_id, begin, end).await
    }

    /// Build a printable statement for `[begin, end]`.
    pub async fn statement_between(
        &self,
        owner: &str,
        cashbook_id: CashbookId,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<StatementReport, AppError> {
        if begin > end {
            return Err(AppError::InvalidDateRange(format!(
                "begin {} is after end {}",
                begin, end
            )));
        }

        let cashbook = self.get_cashbook(owner, cashbook_id).await?;
        let entries = self
            .repo
            .list_entries_for_statement(cashbook.id, begin, end)
            .await?;
        let fetched = entries.len();

        let collapsed = build_statement(&cashbook, entries)?;
        debug!(
            cashbook_id,
            fetched,
            lines = collapsed.len(),
            "built statement"
        );

        let mut total = Money::zero(cashbook.currency.clone());
        for entry in &collapsed {
            total = total.checked_add(&entry.amount(&cashbook)?)?;
        }
        let closing_balance = collapsed.last().map(|entry| entry.balance_raw);
        let lines = collapsed
            .iter()
            .map(|entry| StatementLine::from_entry(entry, &cashbook))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StatementReport {
            cashbook,
            begin,
            end,
            lines,
            total: total.amount(),
            closing_balance,
        })
    }
}

/// Parse the bounds of a statement range.
pub fn parse_date_range(
    begin: &str,
    end: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let begin = parse_instant(begin, false)?;
    let end = parse_instant(end, true)?;
    if begin > end {
        return Err(AppError::InvalidDateRange(format!(
            "begin {} is after end {}",
            begin, end
        )));
    }
    Ok((begin, end))
}

/// Parse an RFC 3339 instant or a `YYYY-MM-DD` date. Plain dates resolve to the
/// first instant of the day, or the last one if `end_of_day` is set.
pub fn parse_instant(input: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    let input = input.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Ok(datetime.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDateRange(format!("invalid date '{}'", input)))?;
    let time = if end_of_day {
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| AppError::InvalidDateRange(format!("invalid date '{}'", input)))?;

    Ok(date.and_time(time).and_utc())
}
