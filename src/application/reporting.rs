use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::{Cashbook, Entry, EntryId, EntryReason, MoneyError};

/// A collapsed statement for one cashbook and date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementReport {
    pub cashbook: Cashbook,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub lines: Vec<StatementLine>,
    /// Sum of all line amounts, exact
    pub total: Decimal,
    /// Balance after the last line, if there is one
    pub closing_balance: Option<Decimal>,
}

/// Debit for money coming in, credit for everything else.
/// Holds the magnitude only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Debit(f64),
    Credit(f64),
}

/// Display form of a statement line. Numbers are floats here and only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub id: EntryId,
    pub balance: f64,
    #[serde(flatten)]
    pub side: Side,
    pub text: String,
    pub date: String,
    pub reason: EntryReason,
    pub reference: Option<String>,
    pub tax: Option<f64>,
}

impl StatementLine {
    pub fn from_entry(entry: &Entry, cashbook: &Cashbook) -> Result<Self, MoneyError> {
        let amount = entry.amount(cashbook)?;
        let balance = entry.balance(cashbook)?;
        let magnitude = to_display(amount.abs().amount());
        let side = if amount.is_positive() {
            Side::Debit(magnitude)
        } else {
            Side::Credit(magnitude)
        };

        Ok(Self {
            id: entry.id,
            balance: to_display(balance.amount()),
            side,
            text: entry.text.clone(),
            date: format_date(entry.datetime),
            reason: entry.reason,
            reference: entry.reference.clone(),
            tax: entry.tax.as_ref().map(|tax| tax.to_f64()),
        })
    }

    pub fn debit(&self) -> Option<f64> {
        match self.side {
            Side::Debit(value) => Some(value),
            Side::Credit(_) => None,
        }
    }

    pub fn credit(&self) -> Option<f64> {
        match self.side {
            Side::Credit(value) => Some(value),
            Side::Debit(_) => None,
        }
    }
}

fn to_display(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// RFC 3339 with an explicit `+00:00` offset, e.g. `2025-02-14T14:00:00+00:00`.
pub fn format_date(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Secs, false)
}
