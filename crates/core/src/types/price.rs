//! Type-safe price representation using decimal arithmetic.
//!
//! Snapshot prices arrive as loosely typed JSON (numbers or numeric strings);
//! [`parse_amount`] turns them into a [`Decimal`] so subtotals never touch
//! floating point.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Parse a currency code, case-insensitively.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            "GBP" => Some(Self::GBP),
            "CAD" => Some(Self::CAD),
            "AUD" => Some(Self::AUD),
            _ => None,
        }
    }
}

/// Parse a non-negative amount from a JSON number or numeric string.
///
/// Returns `None` for anything else, including negative amounts.
#[must_use]
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().trim_start_matches('$').to_owned(),
        _ => return None,
    };

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return None;
    }
    Some(amount.normalize())
}
