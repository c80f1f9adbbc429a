use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency code, always stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

/// Currencies whose minor unit is not the usual 1/100.
const ZERO_DECIMAL: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];
const THREE_DECIMAL: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

impl Currency {
    pub fn new(code: &str) -> Result<Self, ParseCurrencyError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ParseCurrencyError(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of decimal places amounts in this currency are kept with.
    pub fn minor_units(&self) -> u32 {
        if ZERO_DECIMAL.contains(&self.code()) {
            0
        } else if THREE_DECIMAL.contains(&self.code()) {
            3
        } else {
            2
        }
    }
}

impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = ParseCurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCurrencyError(pub String);

impl fmt::Display for ParseCurrencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid currency code '{}'", self.0)
    }
}

impl std::error::Error for ParseCurrencyError {}

/// An exact decimal amount in a known currency.
/// Arithmetic never goes through floating point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Build a money value, padding the amount to the currency's minor units.
    /// Fails if the amount carries more decimal places than the currency allows,
    /// or is too large to be padded.
    pub fn of(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        let scale = currency.minor_units();
        let normalized = amount.normalize();
        if normalized.scale() > scale {
            return Err(MoneyError::TooPrecise { amount, currency });
        }
        let mut padded = normalized;
        padded.rescale(scale);
        if padded.scale() != scale {
            return Err(MoneyError::OutOfRange { amount, currency });
        }
        Ok(Self {
            amount: padded,
            currency,
        })
    }

    pub fn zero(currency: Currency) -> Self {
        let mut amount = Decimal::ZERO;
        amount.rescale(currency.minor_units());
        Self { amount, currency }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| MoneyError::Overflow {
                currency: self.currency.clone(),
            })?;
        Ok(Money {
            amount,
            currency: self.currency.clone(),
        })
    }

    pub fn abs(&self) -> Money {
        Money {
            amount: self.amount.abs(),
            currency: self.currency.clone(),
        }
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount access on an entry that does not belong to the given cashbook,
    /// so its currency cannot be resolved.
    UnresolvedCurrency { entry_id: i64, cashbook_id: i64 },
    CurrencyMismatch { left: Currency, right: Currency },
    TooPrecise { amount: Decimal, currency: Currency },
    /// Amount cannot be held with the currency's minor units.
    OutOfRange { amount: Decimal, currency: Currency },
    /// Sum exceeds the decimal range.
    Overflow { currency: Currency },
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::UnresolvedCurrency {
                entry_id,
                cashbook_id,
            } => write!(
                f,
                "no currency available: entry {} is not bound to cashbook {}",
                entry_id, cashbook_id
            ),
            MoneyError::CurrencyMismatch { left, right } => {
                write!(f, "currency mismatch: {} vs {}", left, right)
            }
            MoneyError::TooPrecise { amount, currency } => write!(
                f,
                "amount {} has more than {} decimal places allowed for {}",
                amount,
                currency.minor_units(),
                currency
            ),
            MoneyError::OutOfRange { amount, currency } => write!(
                f,
                "amount {} is too large to keep {} decimal places for {}",
                amount,
                currency.minor_units(),
                currency
            ),
            MoneyError::Overflow { currency } => {
                write!(f, "{} amount overflowed", currency)
            }
        }
    }
}

impl std::error::Error for MoneyError {}

/// Parse a user supplied amount such as "12.50" or "-3" into an exact decimal.
pub fn parse_amount(input: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str_exact(input.trim())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn eur() -> Currency {
        Currency::new("EUR").unwrap()
    }

    #[test]
    fn test_currency_is_normalized() {
        assert_eq!(Currency::new("eur").unwrap().code(), "EUR");
        assert!(Currency::new("EU").is_err());
        assert!(Currency::new("EU1").is_err());
        assert!(Currency::new("EURO").is_err());
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(eur().minor_units(), 2);
        assert_eq!(Currency::new("JPY").unwrap().minor_units(), 0);
        assert_eq!(Currency::new("KWD").unwrap().minor_units(), 3);
    }

    #[test]
    fn test_money_of_pads_scale() {
        let money = Money::of(dec!(10), eur()).unwrap();
        assert_eq!(money.amount().to_string(), "10.00");

        let money = Money::of(dec!(10.500), eur()).unwrap();
        assert_eq!(money.amount().to_string(), "10.50");
    }

    #[test]
    fn test_money_of_rejects_extra_precision() {
        let result = Money::of(dec!(10.005), eur());
        assert!(matches!(result, Err(MoneyError::TooPrecise { .. })));
    }

    #[test]
    fn test_checked_add_is_exact() {
        let a = Money::of(dec!(0.10), eur()).unwrap();
        let b = Money::of(dec!(0.20), eur()).unwrap();
        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(0.30));
    }

    #[test]
    fn test_money_of_rejects_amount_too_large_to_pad() {
        let result = Money::of(Decimal::MAX, eur());
        assert!(matches!(result, Err(MoneyError::OutOfRange { .. })));

        let yen = Money::of(Decimal::MAX, Currency::new("JPY").unwrap()).unwrap();
        assert_eq!(yen.amount(), Decimal::MAX);
    }

    #[test]
    fn test_checked_add_overflow_is_an_error() {
        let largest = Money::of(Decimal::MAX, Currency::new("JPY").unwrap()).unwrap();
        let result = largest.checked_add(&largest);
        assert!(matches!(result, Err(MoneyError::Overflow { .. })));

        let one = Money::of(dec!(-1), Currency::new("JPY").unwrap()).unwrap();
        assert_eq!(
            largest.checked_add(&one).unwrap().amount(),
            Decimal::MAX - dec!(1)
        );
    }

    #[test]
    fn test_checked_add_currency_mismatch() {
        let a = Money::of(dec!(1), eur()).unwrap();
        let b = Money::of(dec!(1), Currency::new("USD").unwrap()).unwrap();
        assert!(matches!(
            a.checked_add(&b),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_sign_helpers() {
        let negative = Money::of(dec!(-4.20), eur()).unwrap();
        assert!(!negative.is_positive());
        assert_eq!(negative.abs().amount(), dec!(4.20));
        assert_eq!(Money::zero(eur()).amount().to_string(), "0.00");
        assert!(!Money::zero(eur()).is_positive());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.50").unwrap(), dec!(12.50));
        assert_eq!(parse_amount(" -3 ").unwrap(), dec!(-3));
        assert!(parse_amount("abc").is_err());
    }
}
