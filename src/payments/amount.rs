//! Major/minor currency unit conversion
//!
//! The checkout page submits amounts in major units ("19.99" USD); the gateway
//! expects integer minor units ("1999"). Exponents follow ISO 4217.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Invalid amount: {value}")]
    Invalid { value: String },

    #[error("Amount must be greater than zero, got {value}")]
    NotPositive { value: String },

    #[error("Amount {value} has more decimals than {currency} allows")]
    TooPrecise { value: String, currency: String },

    #[error("Invalid currency code: {currency}")]
    InvalidCurrency { currency: String },
}

/// Number of minor-unit digits for a currency
pub fn currency_exponent(currency: &str) -> u32 {
    match currency {
        "BIF" | "CLP" | "DJF" | "GNF" | "ISK" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF"
        | "UGX" | "VND" | "VUV" | "XAF" | "XOF" | "XPF" => 0,
        "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
        _ => 2,
    }
}

fn validate_currency(currency: &str) -> Result<(), AmountError> {
    if currency.len() == 3 && currency.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(AmountError::InvalidCurrency {
            currency: currency.to_string(),
        })
    }
}

/// Convert a major-unit amount string to minor units.
pub fn to_minor_units(value: &str, currency: &str) -> Result<i64, AmountError> {
    validate_currency(currency)?;

    let trimmed = value.trim();
    let amount = Decimal::from_str(trimmed).map_err(|_| AmountError::Invalid {
        value: value.to_string(),
    })?;

    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive {
            value: value.to_string(),
        });
    }

    let factor = Decimal::from(10_i64.pow(currency_exponent(currency)));
    let minor = amount
        .checked_mul(factor)
        .ok_or_else(|| AmountError::Invalid {
            value: value.to_string(),
        })?;

    if !minor.fract().is_zero() {
        return Err(AmountError::TooPrecise {
            value: value.to_string(),
            currency: currency.to_string(),
        });
    }

    minor.to_i64().ok_or_else(|| AmountError::Invalid {
        value: value.to_string(),
    })
}

/// Render minor units back as a major-unit string, e.g. `1999 USD` -> `"19.99"`.
pub fn to_major_units(minor: i64, currency: &str) -> String {
    Decimal::new(minor, currency_exponent(currency)).to_string()
}
