//! TOURS base-unit conversions (18 decimals) without going through floats.

use alloy_primitives::U256;

use crate::core::error::{AppError, AppResult};

/// Number of decimals for the TOURS token (and the native coin).
pub const TOURS_DECIMALS: u32 = 18;

fn one_token() -> U256 {
    U256::from(10u64).pow(U256::from(TOURS_DECIMALS))
}

/// Parse a user-supplied decimal amount ("12", "0.5", "1.25") into base
/// units. Digits beyond 18 decimal places are rejected rather than silently
/// truncated.
pub fn parse_units(s: &str) -> AppResult<U256> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AppError::Validation("amount must not be empty".into()));
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AppError::Validation(format!("'{}' is not a number", s)));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(format!("'{}' is not a number", s)));
    }
    if frac_part.len() > TOURS_DECIMALS as usize {
        return Err(AppError::Validation(format!(
            "'{}' has more than {} decimal places",
            s, TOURS_DECIMALS
        )));
    }

    let int_units = if int_part.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(int_part, 10)
            .map_err(|e| AppError::Validation(format!("'{}' is not a number: {}", s, e)))?
            .checked_mul(one_token())
            .ok_or_else(|| AppError::Validation(format!("'{}' is too large", s)))?
    };

    let frac_units = if frac_part.is_empty() {
        U256::ZERO
    } else {
        let scale = U256::from(10u64).pow(U256::from(TOURS_DECIMALS as usize - frac_part.len()));
        U256::from_str_radix(frac_part, 10)
            .map_err(|e| AppError::Validation(format!("'{}' is not a number: {}", s, e)))?
            * scale
    };

    int_units
        .checked_add(frac_units)
        .ok_or_else(|| AppError::Validation(format!("'{}' is too large", s)))
}

/// Format base units as a decimal string with up to four fractional digits,
/// trailing zeros trimmed: 1500000000000000000 -> "1.5".
pub fn format_units(v: U256) -> String {
    let one = one_token();
    let int = v / one;
    let rem = v % one;

    // Scale the remainder down to 4 digits
    let frac = rem / U256::from(10u64).pow(U256::from(TOURS_DECIMALS - 4));
    if frac.is_zero() {
        return int.to_string();
    }

    let frac_str = format!("{:04}", frac.to::<u64>());
    let trimmed = frac_str.trim_end_matches('0');
    format!("{}.{}", int, trimmed)
}

/// Balance display helper: "12.5 TOURS".
pub fn format_tours(v: U256) -> String {
    format!("{} TOURS", format_units(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_whole_number() {
        assert_eq!(parse_units("1").unwrap(), U256::from(1_000_000_000_000_000_000u128));
    }

    #[test]
    fn parse_fractional() {
        assert_eq!(parse_units("0.5").unwrap(), U256::from(500_000_000_000_000_000u128));
        assert_eq!(parse_units("1.25").unwrap(), U256::from(1_250_000_000_000_000_000u128));
    }

    #[test]
    fn parse_smallest_unit() {
        assert_eq!(parse_units("0.000000000000000001").unwrap(), U256::from(1u64));
    }

    #[test]
    fn parse_rejects_too_many_decimals() {
        assert!(parse_units("0.0000000000000000001").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_units("").is_err());
        assert!(parse_units(".").is_err());
        assert!(parse_units("1.2.3").is_err());
        assert!(parse_units("-5").is_err());
        assert!(parse_units("five").is_err());
    }

    #[test]
    fn parse_accepts_leading_dot() {
        assert_eq!(parse_units(".5").unwrap(), U256::from(500_000_000_000_000_000u128));
    }

    #[test]
    fn format_whole_number() {
        assert_eq!(format_units(U256::from(3_000_000_000_000_000_000u128)), "3");
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_units(U256::from(1_500_000_000_000_000_000u128)), "1.5");
        assert_eq!(format_units(U256::from(1_250_000_000_000_000_000u128)), "1.25");
    }

    #[test]
    fn format_truncates_below_four_digits() {
        // 1.00001 TOURS shows as just 1 (four display digits)
        assert_eq!(format_units(U256::from(1_000_010_000_000_000_000u128)), "1");
        assert_eq!(format_units(U256::from(1_000_100_000_000_000_000u128)), "1.0001");
    }

    #[test]
    fn format_zero() {
        assert_eq!(format_units(U256::ZERO), "0");
    }

    #[test]
    fn parse_format_round_trip() {
        let v = parse_units("123.4567").unwrap();
        assert_eq!(format_units(v), "123.4567");
        assert_eq!(format_tours(v), "123.4567 TOURS");
    }
}
