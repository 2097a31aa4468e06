//! Integer money and lenient numeric coercion for imported cells.
//!
//! All amounts are minor-unit integers. Imported files are dirty, so numeric
//! cells are parsed as decimals via `rust_decimal` and truncated; a cell that
//! does not parse falls back to zero instead of rejecting the row.

use log::warn;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a numeric cell, truncating toward zero.
///
/// Returns `0` for empty, malformed or out-of-range input.
///
/// # Examples
///
/// ```
/// use crew_store::money::coerce_int;
///
/// assert_eq!(coerce_int(" 175.00 "), 175);
/// assert_eq!(coerce_int("45.9"), 45);
/// assert_eq!(coerce_int("n/a"), 0);
/// ```
pub fn coerce_int(cell: &str) -> i64 {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return 0;
    }

    Decimal::from_str(trimmed)
        .ok()
        .and_then(|d| d.trunc().to_i64())
        .unwrap_or(0)
}

/// Like [`coerce_int`], but clamps negative results to zero.
///
/// Used for prices, which are never negative.
pub fn coerce_non_negative(cell: &str, field: &str) -> i64 {
    let value = coerce_int(cell);
    if value < 0 {
        warn!("Negative {} {:?} clamped to 0", field, cell.trim());
        return 0;
    }
    value
}

/// Sums `price * qty` over line items without overflowing silently.
pub fn checked_line_total<I>(lines: I) -> Option<i64>
where
    I: IntoIterator<Item = (i64, i64)>,
{
    lines.into_iter().try_fold(0i64, |acc, (price, qty)| {
        price.checked_mul(qty).and_then(|line| acc.checked_add(line))
    })
}
