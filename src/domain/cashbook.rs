use serde::{Deserialize, Serialize};

use super::Currency;

pub type CashbookId = i64;

/// A ledger kept in a single currency and owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cashbook {
    pub id: CashbookId,
    pub name: String,
    /// Account label this cashbook is about (e.g. a till or bank account)
    pub account: Option<String>,
    pub currency: Currency,
    pub owner: String,
}

impl Cashbook {
    /// Create a new cashbook. The id is assigned by the repository.
    pub fn new(name: impl Into<String>, currency: Currency, owner: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            account: None,
            currency,
            owner: owner.into(),
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner == user_id
    }
}
