use thiserror::Error;

use crate::domain::{CashbookId, MoneyError};

#[derive(Error, Debug)]
pub enum AppError {
    /// Also returned when the cashbook exists but belongs to someone else.
    #[error("Cashbook not found: {0}")]
    CashbookNotFound(CashbookId),

    #[error("Not allowed to modify cashbook {0}")]
    Forbidden(CashbookId),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid tax rate: {0}")]
    InvalidTaxRate(String),

    #[error("Invalid entry reason: {0}")]
    InvalidReason(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Maximum limit exceeded: requested {requested}, maximum is {max}")]
    LimitExceeded { requested: usize, max: usize },

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
