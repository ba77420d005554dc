//! GST breakdown calculations.
//!
//! Australian GST applies at a flat 10% on top of the GST-exclusive
//! amount unless the line is explicitly GST-free. Every amount that
//! reaches an invoice is normalized into a [`GstBreakdown`] triple so
//! downstream code never has to re-derive one leg from the others.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use billing_core::calculations::gst::apply_gst;
//!
//! let breakdown = apply_gst(dec!(100.00), false).unwrap();
//!
//! assert_eq!(breakdown.amount_gst, dec!(10.00));
//! assert_eq!(breakdown.amount_incl_gst, dec!(110.00));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::round_half_up;
use crate::models::ExpenseDetail;

/// Errors that can occur while deriving a GST breakdown.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GstError {
    /// The GST-exclusive amount was negative.
    #[error("amount must not be negative, got {0}")]
    InvalidAmount(Decimal),
}

/// A GST-exclusive amount together with the tax and tax-inclusive legs.
///
/// Invariant: `amount_incl_gst == amount_excl_gst + amount_gst` to two
/// decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstBreakdown {
    pub amount_excl_gst: Decimal,
    pub amount_gst: Decimal,
    pub amount_incl_gst: Decimal,
}

/// Derives the GST breakdown for a GST-exclusive amount.
///
/// GST-free lines carry zero tax and an unchanged total; taxed lines
/// add 10%, rounded half-up to currency precision.
///
/// # Errors
///
/// Returns [`GstError::InvalidAmount`] when `amount_excl_gst` is
/// negative.
pub fn apply_gst(
    amount_excl_gst: Decimal,
    is_gst_free: bool,
) -> Result<GstBreakdown, GstError> {
    if amount_excl_gst < Decimal::ZERO {
        return Err(GstError::InvalidAmount(amount_excl_gst));
    }

    if is_gst_free {
        return Ok(GstBreakdown {
            amount_excl_gst,
            amount_gst: Decimal::ZERO,
            amount_incl_gst: amount_excl_gst,
        });
    }

    let gst_rate = Decimal::new(1, 1);
    Ok(GstBreakdown {
        amount_excl_gst,
        amount_gst: round_half_up(amount_excl_gst * gst_rate),
        amount_incl_gst: round_half_up(amount_excl_gst * (Decimal::ONE + gst_rate)),
    })
}

/// Derives the breakdown for kilometre travel: rate times distance,
/// rounded to currency precision, then taxed per [`apply_gst`].
///
/// # Errors
///
/// Returns [`GstError::InvalidAmount`] when the rate is negative.
pub fn kilometre_travel(
    km_rate_amount_excl_gst: Decimal,
    kms: u32,
    is_gst_free: bool,
) -> Result<GstBreakdown, GstError> {
    if km_rate_amount_excl_gst < Decimal::ZERO {
        return Err(GstError::InvalidAmount(km_rate_amount_excl_gst));
    }

    let amount_excl_gst = round_half_up(km_rate_amount_excl_gst * Decimal::from(kms));
    apply_gst(amount_excl_gst, is_gst_free)
}

/// Normalizes any expense variant into a breakdown.
///
/// Business and Reclaimable amounts were entered directly, so the
/// exclusive leg is reconstructed from them. Kilometre amounts are
/// always derived from the rate and distance; amount fields supplied
/// alongside a kilometre expense are never trusted.
pub fn expense_amounts(detail: &ExpenseDetail) -> Result<GstBreakdown, GstError> {
    match detail {
        ExpenseDetail::Business {
            amount_incl_gst,
            amount_gst,
            ..
        }
        | ExpenseDetail::Reclaimable {
            amount_incl_gst,
            amount_gst,
            ..
        } => Ok(GstBreakdown {
            amount_excl_gst: amount_incl_gst - amount_gst,
            amount_gst: *amount_gst,
            amount_incl_gst: *amount_incl_gst,
        }),
        ExpenseDetail::Kilometre {
            km_rate_amount_excl_gst,
            kms,
            is_gst_free,
            ..
        } => kilometre_travel(*km_rate_amount_excl_gst, *kms, *is_gst_free),
    }
}
