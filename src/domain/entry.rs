use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Cashbook, CashbookId, Currency, EntryReason, Money, MoneyError, TaxRate};

pub type EntryId = i64;

/// One dated posting in a cashbook.
///
/// Amount and balance are stored without a currency. Reading them as [`Money`]
/// needs the owning cashbook, passed explicitly to [`Entry::amount`] and
/// [`Entry::balance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Insertion order within the database, also ledger order
    pub id: EntryId,
    pub cashbook_id: CashbookId,
    /// User that recorded the entry
    pub user_id: String,
    pub datetime: DateTime<Utc>,
    /// Posting text, empty when the entry has no memo
    pub text: String,
    pub reason: EntryReason,
    pub amount_raw: Decimal,
    /// Cashbook balance after this entry
    pub balance_raw: Decimal,
    pub tax: Option<TaxRate>,
    /// Posting reference (receipt number, bank statement id, ...)
    pub reference: Option<String>,
    pub reference_date: Option<NaiveDate>,
}

impl Entry {
    /// Create a new entry in `cashbook`. The id is assigned by the repository.
    pub fn new(
        cashbook: &Cashbook,
        user_id: impl Into<String>,
        datetime: DateTime<Utc>,
        reason: EntryReason,
        amount: &Money,
        balance: &Money,
    ) -> Self {
        Self {
            id: 0,
            cashbook_id: cashbook.id,
            user_id: user_id.into(),
            datetime,
            text: String::new(),
            reason,
            amount_raw: amount.amount(),
            balance_raw: balance.amount(),
            tax: None,
            reference: None,
            reference_date: None,
        }
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

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn amount(&self, cashbook: &Cashbook) -> Result<Money, MoneyError> {
        Money::of(self.amount_raw, self.currency_of(cashbook)?.clone())
    }

    pub fn balance(&self, cashbook: &Cashbook) -> Result<Money, MoneyError> {
        Money::of(self.balance_raw, self.currency_of(cashbook)?.clone())
    }

    pub fn set_amount(&mut self, amount: &Money) {
        self.amount_raw = amount.amount();
    }

    pub fn set_balance(&mut self, balance: &Money) {
        self.balance_raw = balance.amount();
    }

    fn currency_of<'a>(&self, cashbook: &'a Cashbook) -> Result<&'a Currency, MoneyError> {
        if cashbook.id != self.cashbook_id {
            return Err(MoneyError::UnresolvedCurrency {
                entry_id: self.id,
                cashbook_id: cashbook.id,
            });
        }
        Ok(&cashbook.currency)
    }
}
