//! Token amounts as CBOR decimal fractions.
//!
//! An amount `value * 10^-decimals` encodes as tag 4 over
//! `[-decimals, value]`. `1.500000` with 6 decimals is
//! `c4 82 25 1a 0016e360`.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cbor::{self, untag};
use crate::error::{CodecError, Result};
use crate::types::u64_string;

/// Tag for a decimal fraction.
pub const DECIMAL_FRACTION_TAG: u64 = 4;

/// Decimal digits in `u64::MAX`.
const MAX_U64_DIGITS: usize = 20;

/// A non-negative token amount with a fixed number of decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    #[serde(with = "u64_string")]
    value: u64,
    decimals: u32,
}

impl TokenAmount {
    /// Construct from unbounded parts, checking that `value` fits in a u64
    /// and `decimals` in a u32.
    pub fn new(value: i128, decimals: i64) -> Result<Self> {
        let value = u64::try_from(value).map_err(|_| {
            CodecError::AmountOutOfRange(format!("value {value} outside 0..=u64::MAX"))
        })?;
        let decimals = u32::try_from(decimals).map_err(|_| {
            CodecError::AmountOutOfRange(format!("decimals {decimals} outside 0..=u32::MAX"))
        })?;
        Ok(Self { value, decimals })
    }

    /// Construct from parts already within range.
    pub const fn from_parts(value: u64, decimals: u32) -> Self {
        Self { value, decimals }
    }

    /// Parse a decimal string such as `"12.5"` at the given precision.
    pub fn from_decimal(s: &str, decimals: u32) -> Result<Self> {
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(CodecError::AmountOutOfRange(format!(
                "{s:?} is not a non-negative decimal"
            )));
        }
        if frac.len() > decimals as usize {
            return Err(CodecError::AmountOutOfRange(format!(
                "{s:?} has more than {decimals} decimals"
            )));
        }
        let overflow = || {
            CodecError::AmountOutOfRange(format!("{s:?} exceeds u64::MAX at {decimals} decimals"))
        };
        let frac = frac.trim_end_matches('0');
        let digits = format!("{whole}{frac}");
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Self { value: 0, decimals });
        }
        if digits.len() > MAX_U64_DIGITS {
            return Err(overflow());
        }
        let mantissa: u64 = digits.parse().map_err(|_| overflow())?;
        let scale = decimals - frac.len() as u32;
        let value = 10u64
            .checked_pow(scale)
            .and_then(|factor| mantissa.checked_mul(factor))
            .ok_or_else(overflow)?;
        Ok(Self { value, decimals })
    }

    pub const fn value(&self) -> u64 {
        self.value
    }

    pub const fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn to_value(&self) -> Value {
        let exponent = -i64::from(self.decimals);
        Value::Tag(
            DECIMAL_FRACTION_TAG,
            Box::new(Value::Array(vec![
                Value::Integer(exponent.into()),
                Value::Integer(self.value.into()),
            ])),
        )
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let items = match untag(value, DECIMAL_FRACTION_TAG)? {
            Value::Array(items) if items.len() == 2 => items,
            _ => {
                return Err(CodecError::InvalidCborShape(
                    "decimal fraction must be a 2-element array".into(),
                ))
            }
        };
        let exponent = match &items[0] {
            Value::Integer(i) => i128::from(*i),
            _ => {
                return Err(CodecError::InvalidCborShape(
                    "decimal fraction exponent must be an integer".into(),
                ))
            }
        };
        let mantissa = match &items[1] {
            Value::Integer(i) => i128::from(*i),
            _ => {
                return Err(CodecError::InvalidCborShape(
                    "decimal fraction mantissa must be an integer".into(),
                ))
            }
        };
        if exponent > 0 {
            return Err(CodecError::AmountOutOfRange(format!(
                "positive exponent {exponent}"
            )));
        }
        let decimals = i64::try_from(-exponent).map_err(|_| {
            CodecError::AmountOutOfRange(format!("exponent {exponent} out of range"))
        })?;
        Self::new(mantissa, decimals)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        cbor::encode(&self.to_value())
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Self::from_value(&cbor::decode(bytes)?)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.value.to_string();
        let decimals = self.decimals as usize;
        if decimals == 0 {
            return f.write_str(&digits);
        }
        if digits.len() > decimals {
            let (whole, frac) = digits.split_at(digits.len() - decimals);
            return write!(f, "{whole}.{frac}");
        }
        f.write_str("0.")?;
        const ZEROS: &str = "0000000000000000000000000000000000000000000000000000000000000000";
        let mut padding = decimals - digits.len();
        while padding > 0 {
            let chunk = padding.min(ZEROS.len());
            f.write_str(&ZEROS[..chunk])?;
            padding -= chunk;
        }
        f.write_str(&digits)
    }
}

impl From<TokenAmount> for Value {
    fn from(amount: TokenAmount) -> Self {
        amount.to_value()
    }
}
