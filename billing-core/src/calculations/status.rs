//! Invoice status derivation.
//!
//! Status is a pure function of the invoice and the current date,
//! recomputed on every read. Nothing is cached or stored, so an unpaid
//! invoice turns overdue the moment its due date passes without any
//! background job running.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Invoice, InvoiceStatus};

/// Derives the effective status of an invoice as of `today`.
///
/// Precedence:
/// 1. The explicit written-off flag.
/// 2. Paid — nothing outstanding and at least one payment received.
/// 3. Overdue — past the due date with a balance still owing. The
///    comparison is day-precision on the invoice's own date fields,
///    with no timezone conversion.
/// 4. Unpaid otherwise.
pub fn effective_status(
    invoice: &Invoice,
    today: NaiveDate,
) -> InvoiceStatus {
    if invoice.written_off {
        return InvoiceStatus::WrittenOff;
    }

    let outstanding = invoice.outstanding_incl_gst();
    if outstanding <= Decimal::ZERO && invoice.paid_incl_gst() > Decimal::ZERO {
        return InvoiceStatus::Paid;
    }

    if invoice.due_date < today && outstanding > Decimal::ZERO {
        return InvoiceStatus::Overdue;
    }

    InvoiceStatus::Unpaid
}
