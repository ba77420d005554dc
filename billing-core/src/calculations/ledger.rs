//! The receipt ledger.
//!
//! Receipts are append-only monetary events against an invoice. The
//! invoice's paid, written-off and outstanding figures are always
//! produced by summing the full receipt list (see
//! [`Invoice`](crate::models::Invoice)), never adjusted incrementally,
//! so the ledger stays internally consistent through out-of-order
//! removals.
//!
//! Over-payment and over-write-off are allowed on purpose: the
//! outstanding balance goes negative and stays visible to the caller
//! instead of being rejected, so reconciliation discrepancies surface.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Invoice, Receipt};

/// Errors that can occur while recording or removing receipts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Receipt amounts must be strictly positive.
    #[error("receipt amount must be positive, got {0}")]
    NegativeReceipt(Decimal),

    /// The receipt id was not found on the invoice.
    #[error("receipt {receipt_id} not found on invoice {invoice_id}")]
    ReceiptNotFound { invoice_id: i64, receipt_id: i64 },
}

/// Appends a receipt to the invoice's ledger.
///
/// # Errors
///
/// [`LedgerError::NegativeReceipt`] when the amount is zero or
/// negative.
pub fn apply_receipt(
    mut invoice: Invoice,
    receipt: Receipt,
) -> Result<Invoice, LedgerError> {
    if receipt.amount_incl_gst <= Decimal::ZERO {
        return Err(LedgerError::NegativeReceipt(receipt.amount_incl_gst));
    }

    invoice.receipts.push(receipt);
    Ok(invoice)
}

/// Removes one receipt from the invoice's ledger. Derived totals are
/// recomputed from the remaining receipts on the next read.
///
/// # Errors
///
/// [`LedgerError::ReceiptNotFound`] when no receipt with the given id
/// exists on the invoice.
pub fn remove_receipt(
    mut invoice: Invoice,
    receipt_id: i64,
) -> Result<Invoice, LedgerError> {
    let position = invoice
        .receipts
        .iter()
        .position(|receipt| receipt.id == receipt_id)
        .ok_or(LedgerError::ReceiptNotFound {
            invoice_id: invoice.id,
            receipt_id,
        })?;

    invoice.receipts.remove(position);
    Ok(invoice)
}
