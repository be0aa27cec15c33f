//! Amount type for handling monetary values extracted from receipts.
//!
//! Extraction results arrive either as JSON numbers (`12.5`) or as display strings (`"$1,012.50"`)
//! depending on which path produced them. `Amount` accepts both and remembers how a string value
//! was formatted so it can be written back the same way.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Represents how an amount was (or should be) formatted as a string.
///
/// # Examples
///  - `AmountFormat{ dollar: true, commas: true }` -> `$1,250.00`
///  - `AmountFormat{ dollar: false, commas: true }` -> `1,250.00`
///  - `AmountFormat{ dollar: false, commas: false }` -> `1250.00`
///  - `AmountFormat{ dollar: true, commas: false }` -> `$1250.00`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountFormat {
    dollar: bool,
    commas: bool,
}

impl Default for AmountFormat {
    fn default() -> Self {
        DEFAULT_FORMAT
    }
}

/// The default format has a dollar sign and commas: e.g. `$1,250.00`.
const DEFAULT_FORMAT: AmountFormat = AmountFormat {
    dollar: true,
    commas: true,
};

/// The format used for values that arrived as JSON numbers.
const PLAIN_FORMAT: AmountFormat = AmountFormat {
    dollar: false,
    commas: false,
};

/// Represents a currency amount on a receipt.
///
/// Formatting is considered significant for the purposes of equality, so for numeric comparisons,
/// you should access the `Decimal` value and use that.
///
/// # Examples
///
/// ```
/// # use receipt_analytics::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("1250.00").unwrap();
/// let b = Amount::from_str("$1,250.00").unwrap();
/// assert_ne!(a, b);
/// assert_eq!(a.value(), b.value());
/// assert_eq!(b.to_string(), "$1,250.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
    format: AmountFormat,
}

impl Amount {
    /// Creates a new Amount from a Decimal value with default `String` formatting.
    pub const fn new(value: Decimal) -> Self {
        Self {
            value,
            format: DEFAULT_FORMAT,
        }
    }

    /// Creates a new Amount from a Decimal value with the specified formatting.
    pub const fn new_with_format(value: Decimal, format: AmountFormat) -> Self {
        Self { value, format }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.value().is_sign_negative() && !self.is_zero()
    }

    /// The value rounded to cents and printed without symbols, e.g. `1250.00`.
    pub fn to_fixed(&self) -> String {
        fixed(self.value)
    }
}

/// Prints a decimal rounded to cents without symbols, e.g. `66.67`.
pub(crate) fn fixed(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Adds up `amounts`, clamping at `Decimal::MAX` or `Decimal::MIN` instead of overflowing.
pub(crate) fn saturating_sum(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |acc, a| acc.saturating_add(a))
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut dollar_sign = false;
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        let without_dollar = if let Some(after_minus) = trimmed.strip_prefix('-') {
            if let Some(after_dollar) = after_minus.strip_prefix('$') {
                dollar_sign = true;
                format!("-{after_dollar}")
            } else {
                trimmed.to_string()
            }
        } else if let Some(after_dollar) = trimmed.strip_prefix('$') {
            dollar_sign = true;
            after_dollar.to_string()
        } else {
            trimmed.to_string()
        };

        let without_commas = without_dollar.replace(',', "");
        let commas = without_commas.len() < without_dollar.len();

        let value = Decimal::from_str(without_commas.trim()).map_err(AmountError)?;
        Ok(Amount {
            value,
            format: AmountFormat {
                dollar: dollar_sign,
                commas,
            },
        })
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.value().abs();
        let dol = if self.format.dollar { "$" } else { "" };

        if self.format.commas {
            write!(
                f,
                "{sign}{dol}{}",
                format_num::format_num!(",.2", num.to_f64().unwrap_or_default())
            )
        } else {
            write!(f, "{sign}{dol}{num}")
        }
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Consumers of the wire format expect plain numbers.
        serializer.serialize_f64(self.value.to_f64().unwrap_or_default())
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a string such as \"$1,250.00\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::new_with_format(Decimal::from(v), PLAIN_FORMAT))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::new_with_format(Decimal::from(v), PLAIN_FORMAT))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        // The shortest round-trip representation avoids binary noise such as 0.1000000000000000055.
        let value = Decimal::from_str(&v.to_string()).map_err(E::custom)?;
        Ok(Amount::new_with_format(value, PLAIN_FORMAT))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new_with_format(value, PLAIN_FORMAT)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
