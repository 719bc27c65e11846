//! Native token amounts and address formatting.
//!
//! All amounts are kept in wei (`U256`) so that price and balance checks never
//! go through floating point.

use crate::{
    Address,
    U256,
};
use thiserror::Error;

pub const NATIVE_DECIMALS: usize = 18;
pub const NATIVE_SYMBOL: &str = "MON";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount '{0}'")]
    Invalid(String),
    #[error("amount '{0}' has more than 18 decimal places")]
    TooPrecise(String),
    #[error("amount '{0}' is too large")]
    Overflow(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid address '{0}'")]
pub struct AddressError(pub String);

pub fn one_ether() -> U256 {
    U256::exp10(NATIVE_DECIMALS)
}

/// Parse a decimal token amount such as `0.02` into wei.
pub fn parse_ether(raw: &str) -> Result<U256, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountError::Invalid(trimmed.to_string()));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(AmountError::Invalid(trimmed.to_string()));
    }
    if frac_part.len() > NATIVE_DECIMALS {
        return Err(AmountError::TooPrecise(trimmed.to_string()));
    }

    let overflow = || AmountError::Overflow(trimmed.to_string());
    let whole = if int_part.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(int_part).map_err(|_| overflow())?
    };
    let mut frac_digits = frac_part.to_string();
    while frac_digits.len() < NATIVE_DECIMALS {
        frac_digits.push('0');
    }
    let frac = U256::from_dec_str(&frac_digits).map_err(|_| overflow())?;
    whole
        .checked_mul(one_ether())
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(overflow)
}

/// Format wei as a decimal amount with exactly `places` fractional digits.
/// Extra precision is truncated, never rounded up.
pub fn format_ether(wei: U256, places: usize) -> String {
    let unit = one_ether();
    let whole = wei / unit;
    let frac = wei % unit;
    if places == 0 {
        return whole.to_string();
    }
    let mut frac_digits = frac.to_string();
    while frac_digits.len() < NATIVE_DECIMALS {
        frac_digits.insert(0, '0');
    }
    let places = places.min(NATIVE_DECIMALS);
    format!("{}.{}", whole, &frac_digits[..places])
}

pub fn format_mon(wei: U256) -> String {
    format!("{} {}", format_ether(wei, 2), NATIVE_SYMBOL)
}

pub fn u256_to_be_bytes(value: &U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = value.byte(31 - i);
    }
    out
}

/// Hex quantity as used by JSON-RPC (`0x0`, `0x1a`).
pub fn to_quantity(value: &U256) -> String {
    if value.is_zero() {
        return "0x0".to_string();
    }
    let encoded = hex::encode(u256_to_be_bytes(value));
    format!("0x{}", encoded.trim_start_matches('0'))
}

pub fn parse_quantity(raw: &str) -> Result<U256, AmountError> {
    let digits = raw.trim().trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|_| AmountError::Invalid(raw.to_string()))?;
    if bytes.len() > 32 {
        return Err(AmountError::Overflow(raw.to_string()));
    }
    Ok(U256::from_big_endian(&bytes))
}

pub fn parse_address(raw: &str) -> Result<Address, AddressError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| AddressError(raw.to_string()))?;
    if bytes.len() != 20 {
        return Err(AddressError(raw.to_string()));
    }
    Ok(Address::from_slice(&bytes))
}

pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
    let full = format_address(address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
