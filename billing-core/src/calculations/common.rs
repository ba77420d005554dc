//! Shared helpers for billing calculations.

use rust_decimal::Decimal;

/// Rounds a decimal value to exactly two decimal places using half-up
/// rounding (away from zero at the midpoint), the standard convention
/// for currency amounts.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use billing_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(10.454)), dec!(10.45));
/// assert_eq!(round_half_up(dec!(10.455)), dec!(10.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}
