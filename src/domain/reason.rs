use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What an entry was booked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryReason {
    DayOpening,
    DayClosing,
    Correction,
    #[serde(alias = "income-bank")]
    IncomeBankTransfer,
    IncomeSales,
    IncomeMisc,
    #[serde(alias = "expense-bank")]
    ExpenseBankTransfer,
    ExpenseGoods,
    ExpenseSalary,
    ExpenseTips,
    ExpenseChange,
    ExpenseRefund,
    ExpenseMisc,
}

impl EntryReason {
    pub const ALL: [EntryReason; 13] = [
        EntryReason::DayOpening,
        EntryReason::DayClosing,
        EntryReason::Correction,
        EntryReason::IncomeBankTransfer,
        EntryReason::IncomeSales,
        EntryReason::IncomeMisc,
        EntryReason::ExpenseBankTransfer,
        EntryReason::ExpenseGoods,
        EntryReason::ExpenseSalary,
        EntryReason::ExpenseTips,
        EntryReason::ExpenseChange,
        EntryReason::ExpenseRefund,
        EntryReason::ExpenseMisc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryReason::DayOpening => "day-opening",
            EntryReason::DayClosing => "day-closing",
            EntryReason::Correction => "correction",
            EntryReason::IncomeBankTransfer => "income-bank-transfer",
            EntryReason::IncomeSales => "income-sales",
            EntryReason::IncomeMisc => "income-misc",
            EntryReason::ExpenseBankTransfer => "expense-bank-transfer",
            EntryReason::ExpenseGoods => "expense-goods",
            EntryReason::ExpenseSalary => "expense-salary",
            EntryReason::ExpenseTips => "expense-tips",
            EntryReason::ExpenseChange => "expense-change",
            EntryReason::ExpenseRefund => "expense-refund",
            EntryReason::ExpenseMisc => "expense-misc",
        }
    }

    /// Whether consecutive entries with this reason may be merged into one
    /// statement line.
    pub fn is_collapsible(&self) -> bool {
        match self {
            EntryReason::IncomeSales => true,
            EntryReason::DayOpening
            | EntryReason::DayClosing
            | EntryReason::Correction
            | EntryReason::IncomeBankTransfer
            | EntryReason::IncomeMisc
            | EntryReason::ExpenseBankTransfer
            | EntryReason::ExpenseGoods
            | EntryReason::ExpenseSalary
            | EntryReason::ExpenseTips
            | EntryReason::ExpenseChange
            | EntryReason::ExpenseRefund
            | EntryReason::ExpenseMisc => false,
        }
    }
}

impl FromStr for EntryReason {
    type Err = ParseReasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        match code.as_str() {
            // short codes written by older versions
            "income-bank" => Ok(EntryReason::IncomeBankTransfer),
            "expense-bank" => Ok(EntryReason::ExpenseBankTransfer),
            _ => EntryReason::ALL
                .into_iter()
                .find(|reason| reason.as_str() == code)
                .ok_or_else(|| ParseReasonError(s.to_string())),
        }
    }
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReasonError(pub String);

impl fmt::Display for ParseReasonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entry reason '{}'", self.0)
    }
}

impl std::error::Error for ParseReasonError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_roundtrip() {
        for reason in EntryReason::ALL {
            let parsed: EntryReason = reason.as_str().parse().unwrap();
            assert_eq!(reason, parsed);
        }
    }

    #[test]
    fn test_legacy_bank_codes() {
        assert_eq!(
            "income-bank".parse::<EntryReason>().unwrap(),
            EntryReason::IncomeBankTransfer
        );
        assert_eq!(
            "expense-bank".parse::<EntryReason>().unwrap(),
            EntryReason::ExpenseBankTransfer
        );
    }

    #[test]
    fn test_unknown_reason() {
        assert!("income-lottery".parse::<EntryReason>().is_err());
    }

    #[test]
    fn test_only_sales_collapse() {
        let collapsible: Vec<_> = EntryReason::ALL
            .into_iter()
            .filter(EntryReason::is_collapsible)
            .collect();
        assert_eq!(collapsible, vec![EntryReason::IncomeSales]);
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&EntryReason::IncomeBankTransfer).unwrap();
        assert_eq!(json, "\"income-bank-transfer\"");
        let parsed: EntryReason = serde_json::from_str("\"expense-bank\"").unwrap();
        assert_eq!(parsed, EntryReason::ExpenseBankTransfer);
    }
}
