//! Expense classification.
//!
//! Raw expense input arrives with every variant-specific field optional
//! ([`ExpenseForm`]); this module decides which fields the chosen
//! expense type requires, checks the amounts, and produces a validated
//! [`ExpenseDetail`]. Persistence is the caller's concern.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{ExpenseDetail, ExpenseForm, ExpenseType};

/// Errors produced while classifying raw expense input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field the chosen expense type requires was not supplied.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// An amount field was out of range for the chosen expense type.
    #[error("invalid amount for '{field}': {value}")]
    InvalidAmount { field: &'static str, value: Decimal },
}

/// Validates raw input into one of the three expense shapes.
///
/// Business and Reclaimable keep their entered amounts after range
/// checks. Kilometre keeps only the rate, distance and GST flag —
/// any amount fields on the form are ignored for that type, since the
/// amounts are always derived (see
/// [`expense_amounts`](crate::calculations::gst::expense_amounts)).
///
/// # Errors
///
/// [`ValidationError::MissingField`] names the first absent required
/// field; [`ValidationError::InvalidAmount`] reports an out-of-range
/// amount.
pub fn validate_expense(form: &ExpenseForm) -> Result<ExpenseDetail, ValidationError> {
    let expense_type = form
        .expense_type
        .ok_or(ValidationError::MissingField("expense_type"))?;

    match expense_type {
        ExpenseType::Business => {
            let (amount_incl_gst, amount_gst) = entered_amounts(form)?;
            Ok(ExpenseDetail::Business {
                business_expense_type: required_text(
                    &form.business_expense_type,
                    "business_expense_type",
                )?,
                category: required_text(&form.category, "category")?,
                payee: required_text(&form.payee, "payee")?,
                amount_incl_gst,
                amount_gst,
            })
        }
        ExpenseType::Reclaimable => {
            let (amount_incl_gst, amount_gst) = entered_amounts(form)?;
            Ok(ExpenseDetail::Reclaimable {
                contact_id: form
                    .contact_id
                    .ok_or(ValidationError::MissingField("contact_id"))?,
                payee: required_text(&form.payee, "payee")?,
                amount_incl_gst,
                amount_gst,
            })
        }
        ExpenseType::Kilometre => {
            let km_rate_amount_excl_gst = form
                .km_rate_amount_excl_gst
                .ok_or(ValidationError::MissingField("km_rate_amount_excl_gst"))?;
            if km_rate_amount_excl_gst < Decimal::ZERO {
                return Err(ValidationError::InvalidAmount {
                    field: "km_rate_amount_excl_gst",
                    value: km_rate_amount_excl_gst,
                });
            }

            let kms = form.kms.ok_or(ValidationError::MissingField("kms"))?;
            if kms < 1 {
                return Err(ValidationError::InvalidAmount {
                    field: "kms",
                    value: Decimal::from(kms),
                });
            }

            Ok(ExpenseDetail::Kilometre {
                contact_id: form
                    .contact_id
                    .ok_or(ValidationError::MissingField("contact_id"))?,
                km_rate_amount_excl_gst,
                kms,
                // No implicit default: the flag must be stated.
                is_gst_free: form
                    .is_gst_free
                    .ok_or(ValidationError::MissingField("is_gst_free"))?,
            })
        }
    }
}

/// Range-checks the directly-entered amount pair shared by Business and
/// Reclaimable expenses.
fn entered_amounts(form: &ExpenseForm) -> Result<(Decimal, Decimal), ValidationError> {
    let amount_incl_gst = form
        .amount_incl_gst
        .ok_or(ValidationError::MissingField("amount_incl_gst"))?;
    if amount_incl_gst <= Decimal::ZERO {
        return Err(ValidationError::InvalidAmount {
            field: "amount_incl_gst",
            value: amount_incl_gst,
        });
    }

    let amount_gst = form
        .amount_gst
        .ok_or(ValidationError::MissingField("amount_gst"))?;
    if amount_gst < Decimal::ZERO || amount_gst > amount_incl_gst {
        return Err(ValidationError::InvalidAmount {
            field: "amount_gst",
            value: amount_gst,
        });
    }

    Ok((amount_incl_gst, amount_gst))
}

fn required_text(
    value: &Option<String>,
    field: &'static str,
) -> Result<String, ValidationError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.clone()),
        _ => Err(ValidationError::MissingField(field)),
    }
}
