use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A tax rate kept as an exact rational number.
///
/// Accepts either a decimal ("0.19") or a fraction ("19/100"). The string it was
/// recorded with is kept verbatim: two rates are only equal when their raw
/// representations are identical, so "0.19" and "0.19000" are different rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxRate {
    raw: String,
    numerator: Decimal,
    denominator: Decimal,
}

impl TaxRate {
    pub fn parse(raw: &str) -> Result<Self, ParseTaxRateError> {
        let trimmed = raw.trim();
        let invalid = || ParseTaxRateError(raw.to_string());

        let (numerator, denominator) = match trimmed.split_once('/') {
            Some((n, d)) => (
                Decimal::from_str_exact(n.trim()).map_err(|_| invalid())?,
                Decimal::from_str_exact(d.trim()).map_err(|_| invalid())?,
            ),
            None => (
                Decimal::from_str_exact(trimmed).map_err(|_| invalid())?,
                Decimal::ONE,
            ),
        };
        if denominator.is_zero() {
            return Err(invalid());
        }

        Ok(Self {
            raw: trimmed.to_string(),
            numerator,
            denominator,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Approximate value, for display only.
    pub fn to_f64(&self) -> f64 {
        match self.numerator.checked_div(self.denominator) {
            Some(value) => value.to_f64().unwrap_or(f64::NAN),
            None => f64::NAN,
        }
    }
}

impl PartialEq for TaxRate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for TaxRate {}

impl FromStr for TaxRate {
    type Err = ParseTaxRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TaxRate {
    type Error = ParseTaxRateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TaxRate> for String {
    fn from(rate: TaxRate) -> Self {
        rate.raw
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTaxRateError(pub String);

impl fmt::Display for ParseTaxRateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid tax rate '{}'", self.0)
    }
}

impl std::error::Error for ParseTaxRateError {}
