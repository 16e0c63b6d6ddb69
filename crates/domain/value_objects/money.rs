//! Amounts are carried as integer minor units (cents) everywhere inside the core.
//! Decimal strings only exist at the gateway boundary.

use crate::domain::errors::{CommerceError, CommerceResult};

pub fn line_total(quantity: i32, unit_price_minor: i64) -> CommerceResult<i64> {
    if quantity < 1 {
        return Err(CommerceError::InvalidInput(format!(
            "quantity must be at least 1, got {quantity}"
        )));
    }
    if unit_price_minor < 0 {
        return Err(CommerceError::InvalidInput(format!(
            "unit price must not be negative, got {unit_price_minor}"
        )));
    }

    unit_price_minor
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| CommerceError::InvalidInput("line total overflows".to_string()))
}

/// Bounded-difference comparison used for every externally quoted amount.
pub fn within_tolerance(expected_minor: i64, reported_minor: i64, tolerance_minor: i64) -> bool {
    expected_minor.abs_diff(reported_minor) <= tolerance_minor.unsigned_abs()
}

pub fn ensure_within_tolerance(
    expected_minor: i64,
    reported_minor: i64,
    tolerance_minor: i64,
) -> CommerceResult<()> {
    if within_tolerance(expected_minor, reported_minor, tolerance_minor) {
        Ok(())
    } else {
        Err(CommerceError::AmountMismatch {
            expected_minor,
            reported_minor,
        })
    }
}

/// `25000` -> `"250.00"`.
pub fn format_minor(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// `"250.00"`, `"250.5"` and `"250"` -> minor units. More than two decimals is rejected
/// rather than rounded.
pub fn parse_decimal_to_minor(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    if whole.is_empty() || fraction.len() > 2 {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    let minor = whole.checked_mul(100)?.checked_add(fraction)?;
    Some(if negative { -minor } else { minor })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_and_guards() {
        assert_eq!(line_total(2, 100).unwrap(), 200);
        assert!(line_total(0, 100).is_err());
        assert!(line_total(1, -1).is_err());
        assert!(line_total(i32::MAX, i64::MAX).is_err());
    }

    #[test]
    fn tolerance_is_inclusive() {
        assert!(within_tolerance(25_000, 25_000, 0));
        assert!(within_tolerance(25_000, 25_001, 1));
        assert!(!within_tolerance(25_000, 25_002, 1));
        assert!(!within_tolerance(25_000, 30_000, 1));
    }

    #[test]
    fn ensure_within_tolerance_reports_both_amounts() {
        let err = ensure_within_tolerance(250, 300, 0).unwrap_err();
        match err {
            CommerceError::AmountMismatch {
                expected_minor,
                reported_minor,
            } => {
                assert_eq!(expected_minor, 250);
                assert_eq!(reported_minor, 300);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn formats_minor_units() {
        assert_eq!(format_minor(25_000), "250.00");
        assert_eq!(format_minor(5), "0.05");
        assert_eq!(format_minor(-150), "-1.50");
    }

    #[test]
    fn parses_gateway_decimals() {
        assert_eq!(parse_decimal_to_minor("250.00"), Some(25_000));
        assert_eq!(parse_decimal_to_minor("250.5"), Some(25_050));
        assert_eq!(parse_decimal_to_minor("250"), Some(25_000));
        assert_eq!(parse_decimal_to_minor(" 0.01 "), Some(1));
        assert_eq!(parse_decimal_to_minor("1.005"), None);
        assert_eq!(parse_decimal_to_minor("abc"), None);
        assert_eq!(parse_decimal_to_minor(".50"), None);
    }
}
