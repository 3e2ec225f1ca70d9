use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Not a decimal number: '{0}'")]
    Invalid(String),
    #[error("Amount must be greater than zero, got {0}")]
    NotPositive(Decimal),
}

/// A monetary amount read off a receipt. Always strictly positive.
///
/// Currency is deliberately not tracked: candidates printed in different
/// currencies compete on magnitude alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Amount(value.normalize()))
    }

    /// Parse a printed figure such as `1,234.56`. Thousands separators are
    /// stripped before parsing.
    pub fn parse_printed(s: &str) -> Result<Self, AmountError> {
        let clean = s.trim().replace(',', "");
        let value =
            Decimal::from_str(&clean).map_err(|_| AmountError::Invalid(s.to_string()))?;
        Self::new(value)
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_printed(s)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
