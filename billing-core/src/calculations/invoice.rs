//! Invoice aggregation.
//!
//! Builds an invoice draft for one contact from a selection of
//! completed shifts and saved expenses. The caller fetches the
//! candidate records (and should pre-filter them through the
//! repository's billability query); the aggregator re-checks every
//! precondition against the records themselves so a stale selection
//! can never produce an inconsistent draft.
//!
//! Shift lines are GST-free: NDIS supports carry no GST, so the
//! completed total is both the exclusive and inclusive amount.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use billing_core::calculations::InvoiceAggregator;
//! use billing_core::models::{Shift, ShiftStatus};
//! use chrono::{TimeZone, Utc};
//!
//! let shifts = vec![Shift {
//!     id: 1,
//!     contact_id: 7,
//!     start_time: Utc.with_ymd_and_hms(2025, 7, 1, 23, 0, 0).unwrap(),
//!     end_time: Utc.with_ymd_and_hms(2025, 7, 2, 2, 0, 0).unwrap(),
//!     status: ShiftStatus::Completed,
//!     description: "Morning support".to_string(),
//!     total_incl_gst: Some(dec!(180.00)),
//!     invoice_id: None,
//! }];
//!
//! let aggregator = InvoiceAggregator::new(&shifts, &[]);
//! let draft = aggregator
//!     .draft(
//!         7,
//!         NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
//!         NaiveDate::from_ymd_opt(2025, 7, 24).unwrap(),
//!         &[1],
//!         &[],
//!     )
//!     .unwrap();
//!
//! assert_eq!(draft.total_incl_gst(), dec!(180.00));
//! ```

use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;

use crate::calculations::gst::{GstError, expense_amounts};
use crate::models::{
    BillableLine, Expense, Invoice, InvoiceDraft, LineRef, Shift, ShiftStatus,
};

/// Errors that can occur while drafting or amending an invoice.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    /// The due date precedes the invoice date.
    #[error("due date {due_date} is before invoice date {date}")]
    DueDateBeforeDate { date: NaiveDate, due_date: NaiveDate },

    /// A selected shift id was not among the candidate records.
    #[error("shift {0} is not among the candidate records")]
    UnknownShift(i64),

    /// A selected expense id was not among the candidate records.
    #[error("expense {0} is not among the candidate records")]
    UnknownExpense(i64),

    /// The record is already attached to an invoice.
    #[error("{0} is already attached to an invoice")]
    AlreadyInvoiced(LineRef),

    /// The record does not belong to the invoiced contact.
    #[error("{0} does not belong to the invoiced contact")]
    ContactMismatch(LineRef),

    /// The shift has not been completed, or carries no total.
    #[error("shift {0} has no completed total to bill")]
    ShiftNotCompleted(i64),

    /// An edit attempted to change the line set of an issued invoice.
    #[error("the line set of an issued invoice cannot be changed")]
    ImmutableLineSet,

    /// A stored expense held amounts that no longer form a valid
    /// breakdown.
    #[error("invalid expense amounts: {0}")]
    Amounts(#[from] GstError),
}

/// Builds invoice drafts from a pool of candidate shifts and expenses.
#[derive(Debug, Clone)]
pub struct InvoiceAggregator<'a> {
    shifts: &'a [Shift],
    expenses: &'a [Expense],
}

impl<'a> InvoiceAggregator<'a> {
    pub fn new(
        shifts: &'a [Shift],
        expenses: &'a [Expense],
    ) -> Self {
        Self { shifts, expenses }
    }

    /// Builds a draft for `contact_id` from the selected shift and
    /// expense ids.
    ///
    /// # Errors
    ///
    /// Fails when the date range is inverted, a selected record is
    /// missing, already invoiced, belongs to another contact, or a
    /// selected shift was never completed.
    pub fn draft(
        &self,
        contact_id: i64,
        date: NaiveDate,
        due_date: NaiveDate,
        shift_ids: &[i64],
        expense_ids: &[i64],
    ) -> Result<InvoiceDraft, DraftError> {
        if due_date < date {
            return Err(DraftError::DueDateBeforeDate { date, due_date });
        }

        let mut lines = Vec::with_capacity(shift_ids.len() + expense_ids.len());
        for shift_id in shift_ids {
            lines.push(self.shift_line(contact_id, *shift_id)?);
        }
        for expense_id in expense_ids {
            lines.push(self.expense_line(contact_id, *expense_id)?);
        }

        Ok(InvoiceDraft {
            contact_id,
            date,
            due_date,
            lines,
        })
    }

    fn shift_line(
        &self,
        contact_id: i64,
        shift_id: i64,
    ) -> Result<BillableLine, DraftError> {
        let shift = self
            .shifts
            .iter()
            .find(|shift| shift.id == shift_id)
            .ok_or(DraftError::UnknownShift(shift_id))?;
        let source = LineRef::Shift(shift_id);

        if shift.invoice_id.is_some() {
            return Err(DraftError::AlreadyInvoiced(source));
        }
        if shift.contact_id != contact_id {
            return Err(DraftError::ContactMismatch(source));
        }
        let total_incl_gst = match (shift.status, shift.total_incl_gst) {
            (ShiftStatus::Completed, Some(total)) => total,
            _ => return Err(DraftError::ShiftNotCompleted(shift_id)),
        };

        Ok(BillableLine {
            source,
            description: shift.description.clone(),
            date: shift.start_time.date_naive(),
            amount_excl_gst: total_incl_gst,
            amount_gst: rust_decimal::Decimal::ZERO,
            amount_incl_gst: total_incl_gst,
        })
    }

    fn expense_line(
        &self,
        contact_id: i64,
        expense_id: i64,
    ) -> Result<BillableLine, DraftError> {
        let expense = self
            .expenses
            .iter()
            .find(|expense| expense.id == expense_id)
            .ok_or(DraftError::UnknownExpense(expense_id))?;
        let source = LineRef::Expense(expense_id);

        if expense.invoice_id.is_some() {
            return Err(DraftError::AlreadyInvoiced(source));
        }
        if expense.detail.contact_id() != Some(contact_id) {
            return Err(DraftError::ContactMismatch(source));
        }

        let amounts = expense_amounts(&expense.detail)?;
        Ok(BillableLine {
            source,
            description: expense.description.clone(),
            date: expense.date,
            amount_excl_gst: amounts.amount_excl_gst,
            amount_gst: amounts.amount_gst,
            amount_incl_gst: amounts.amount_incl_gst,
        })
    }
}

/// Applies an edit to an issued invoice. Only the dates may change;
/// the requested line set must match the invoice's existing lines
/// (order does not matter).
///
/// # Errors
///
/// [`DraftError::ImmutableLineSet`] when the requested lines differ
/// from the frozen set; [`DraftError::DueDateBeforeDate`] when the
/// new date range is inverted.
pub fn amend_invoice(
    invoice: &Invoice,
    date: NaiveDate,
    due_date: NaiveDate,
    lines: &[LineRef],
) -> Result<Invoice, DraftError> {
    if due_date < date {
        return Err(DraftError::DueDateBeforeDate { date, due_date });
    }

    let existing: HashSet<LineRef> = invoice.lines.iter().map(|line| line.source).collect();
    let requested: HashSet<LineRef> = lines.iter().copied().collect();
    if existing != requested {
        return Err(DraftError::ImmutableLineSet);
    }

    let mut amended = invoice.clone();
    amended.date = date;
    amended.due_date = due_date;
    Ok(amended)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use crate::models::ExpenseDetail;

    use super::*;

    fn date(
        year: i32,
        month: u32,
        day: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn completed_shift(
        id: i64,
        contact_id: i64,
    ) -> Shift {
        Shift {
            id,
            contact_id,
            start_time: Utc.with_ymd_and_hms(2025, 7, 1, 23, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 7, 2, 2, 0, 0).unwrap(),
            status: ShiftStatus::Completed,
            description: "Community access".to_string(),
            total_incl_gst: Some(dec!(180.00)),
            invoice_id: None,
        }
    }

    fn reclaimable_expense(
        id: i64,
        contact_id: i64,
    ) -> Expense {
        Expense {
            id,
            date: date(2025, 7, 3),
            description: "Pharmacy run".to_string(),
            invoice_id: None,
            detail: ExpenseDetail::Reclaimable {
                contact_id,
                payee: "Chemist".to_string(),
                amount_incl_gst: dec!(55.00),
                amount_gst: dec!(5.00),
            },
        }
    }

    fn invoice_with_lines(lines: Vec<BillableLine>) -> Invoice {
        Invoice {
            id: 1,
            contact_id: 7,
            date: date(2025, 7, 10),
            due_date: date(2025, 7, 24),
            written_off: false,
            lines,
            receipts: Vec::new(),
        }
    }

    // =========================================================================
    // draft tests
    // =========================================================================

    #[test]
    fn draft_builds_one_line_per_selected_record() {
        let shifts = vec![completed_shift(1, 7), completed_shift(2, 7)];
        let expenses = vec![reclaimable_expense(10, 7)];
        let aggregator = InvoiceAggregator::new(&shifts, &expenses);

        let draft = aggregator
            .draft(7, date(2025, 7, 10), date(2025, 7, 24), &[1, 2], &[10])
            .unwrap();

        assert_eq!(draft.lines.len(), 3);
        assert_eq!(draft.total_incl_gst(), dec!(415.00));
    }

    #[test]
    fn draft_shift_lines_are_gst_free() {
        let shifts = vec![completed_shift(1, 7)];
        let aggregator = InvoiceAggregator::new(&shifts, &[]);

        let draft = aggregator
            .draft(7, date(2025, 7, 10), date(2025, 7, 24), &[1], &[])
            .unwrap();

        assert_eq!(draft.lines[0].amount_gst, dec!(0));
        assert_eq!(draft.lines[0].amount_excl_gst, dec!(180.00));
        assert_eq!(draft.lines[0].amount_incl_gst, dec!(180.00));
    }

    #[test]
    fn draft_kilometre_expense_amounts_are_derived() {
        let expenses = vec![Expense {
            id: 11,
            date: date(2025, 7, 4),
            description: "Travel to appointment".to_string(),
            invoice_id: None,
            detail: ExpenseDetail::Kilometre {
                contact_id: 7,
                km_rate_amount_excl_gst: dec!(0.85),
                kms: 120,
                is_gst_free: false,
            },
        }];
        let aggregator = InvoiceAggregator::new(&[], &expenses);

        let draft = aggregator
            .draft(7, date(2025, 7, 10), date(2025, 7, 24), &[], &[11])
            .unwrap();

        assert_eq!(draft.lines[0].amount_excl_gst, dec!(102.00));
        assert_eq!(draft.lines[0].amount_gst, dec!(10.20));
        assert_eq!(draft.lines[0].amount_incl_gst, dec!(112.20));
    }

    #[test]
    fn draft_rejects_inverted_date_range() {
        let aggregator = InvoiceAggregator::new(&[], &[]);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 9), &[], &[]);

        assert_eq!(
            result,
            Err(DraftError::DueDateBeforeDate {
                date: date(2025, 7, 10),
                due_date: date(2025, 7, 9),
            })
        );
    }

    #[test]
    fn draft_accepts_due_date_equal_to_date() {
        let aggregator = InvoiceAggregator::new(&[], &[]);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 10), &[], &[]);

        assert!(result.is_ok());
    }

    #[test]
    fn draft_rejects_unknown_shift() {
        let aggregator = InvoiceAggregator::new(&[], &[]);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 24), &[99], &[]);

        assert_eq!(result, Err(DraftError::UnknownShift(99)));
    }

    #[test]
    fn draft_rejects_unknown_expense() {
        let aggregator = InvoiceAggregator::new(&[], &[]);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 24), &[], &[99]);

        assert_eq!(result, Err(DraftError::UnknownExpense(99)));
    }

    #[test]
    fn draft_rejects_already_invoiced_shift() {
        let mut shift = completed_shift(1, 7);
        shift.invoice_id = Some(42);
        let shifts = vec![shift];
        let aggregator = InvoiceAggregator::new(&shifts, &[]);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 24), &[1], &[]);

        assert_eq!(result, Err(DraftError::AlreadyInvoiced(LineRef::Shift(1))));
    }

    #[test]
    fn draft_rejects_already_invoiced_expense() {
        let mut expense = reclaimable_expense(10, 7);
        expense.invoice_id = Some(42);
        let expenses = vec![expense];
        let aggregator = InvoiceAggregator::new(&[], &expenses);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 24), &[], &[10]);

        assert_eq!(
            result,
            Err(DraftError::AlreadyInvoiced(LineRef::Expense(10)))
        );
    }

    #[test]
    fn draft_rejects_shift_of_another_contact() {
        let shifts = vec![completed_shift(1, 8)];
        let aggregator = InvoiceAggregator::new(&shifts, &[]);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 24), &[1], &[]);

        assert_eq!(result, Err(DraftError::ContactMismatch(LineRef::Shift(1))));
    }

    #[test]
    fn draft_rejects_business_expense() {
        // Business expenses are internal and carry no contact.
        let expenses = vec![Expense {
            id: 10,
            date: date(2025, 7, 3),
            description: "Printer paper".to_string(),
            invoice_id: None,
            detail: ExpenseDetail::Business {
                business_expense_type: "supplies".to_string(),
                category: "office".to_string(),
                payee: "Officeworks".to_string(),
                amount_incl_gst: dec!(110.00),
                amount_gst: dec!(10.00),
            },
        }];
        let aggregator = InvoiceAggregator::new(&[], &expenses);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 24), &[], &[10]);

        assert_eq!(
            result,
            Err(DraftError::ContactMismatch(LineRef::Expense(10)))
        );
    }

    #[test]
    fn draft_rejects_uncompleted_shift() {
        let mut shift = completed_shift(1, 7);
        shift.status = ShiftStatus::Scheduled;
        let shifts = vec![shift];
        let aggregator = InvoiceAggregator::new(&shifts, &[]);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 24), &[1], &[]);

        assert_eq!(result, Err(DraftError::ShiftNotCompleted(1)));
    }

    #[test]
    fn draft_rejects_completed_shift_without_total() {
        let mut shift = completed_shift(1, 7);
        shift.total_incl_gst = None;
        let shifts = vec![shift];
        let aggregator = InvoiceAggregator::new(&shifts, &[]);

        let result = aggregator.draft(7, date(2025, 7, 10), date(2025, 7, 24), &[1], &[]);

        assert_eq!(result, Err(DraftError::ShiftNotCompleted(1)));
    }

    #[test]
    fn draft_total_matches_line_sum() {
        let shifts = vec![completed_shift(1, 7)];
        let expenses = vec![reclaimable_expense(10, 7)];
        let aggregator = InvoiceAggregator::new(&shifts, &expenses);

        let draft = aggregator
            .draft(7, date(2025, 7, 10), date(2025, 7, 24), &[1], &[10])
            .unwrap();

        let line_sum: rust_decimal::Decimal =
            draft.lines.iter().map(|line| line.amount_incl_gst).sum();
        assert_eq!(draft.total_incl_gst(), line_sum);
    }

    // =========================================================================
    // amend_invoice tests
    // =========================================================================

    #[test]
    fn amend_changes_dates_only() {
        let line = BillableLine {
            source: LineRef::Shift(1),
            description: "Community access".to_string(),
            date: date(2025, 7, 2),
            amount_excl_gst: dec!(180.00),
            amount_gst: dec!(0),
            amount_incl_gst: dec!(180.00),
        };
        let invoice = invoice_with_lines(vec![line]);

        let amended = amend_invoice(
            &invoice,
            date(2025, 7, 12),
            date(2025, 7, 26),
            &[LineRef::Shift(1)],
        )
        .unwrap();

        assert_eq!(amended.date, date(2025, 7, 12));
        assert_eq!(amended.due_date, date(2025, 7, 26));
        assert_eq!(amended.lines, invoice.lines);
    }

    #[test]
    fn amend_accepts_same_lines_in_any_order() {
        let lines = vec![
            BillableLine {
                source: LineRef::Shift(1),
                description: "Shift".to_string(),
                date: date(2025, 7, 2),
                amount_excl_gst: dec!(180.00),
                amount_gst: dec!(0),
                amount_incl_gst: dec!(180.00),
            },
            BillableLine {
                source: LineRef::Expense(10),
                description: "Expense".to_string(),
                date: date(2025, 7, 3),
                amount_excl_gst: dec!(50.00),
                amount_gst: dec!(5.00),
                amount_incl_gst: dec!(55.00),
            },
        ];
        let invoice = invoice_with_lines(lines);

        let result = amend_invoice(
            &invoice,
            date(2025, 7, 12),
            date(2025, 7, 26),
            &[LineRef::Expense(10), LineRef::Shift(1)],
        );

        assert!(result.is_ok());
    }

    #[test]
    fn amend_rejects_added_line() {
        let line = BillableLine {
            source: LineRef::Shift(1),
            description: "Shift".to_string(),
            date: date(2025, 7, 2),
            amount_excl_gst: dec!(180.00),
            amount_gst: dec!(0),
            amount_incl_gst: dec!(180.00),
        };
        let invoice = invoice_with_lines(vec![line]);

        let result = amend_invoice(
            &invoice,
            date(2025, 7, 12),
            date(2025, 7, 26),
            &[LineRef::Shift(1), LineRef::Shift(2)],
        );

        assert_eq!(result, Err(DraftError::ImmutableLineSet));
    }

    #[test]
    fn amend_rejects_removed_line() {
        let line = BillableLine {
            source: LineRef::Shift(1),
            description: "Shift".to_string(),
            date: date(2025, 7, 2),
            amount_excl_gst: dec!(180.00),
            amount_gst: dec!(0),
            amount_incl_gst: dec!(180.00),
        };
        let invoice = invoice_with_lines(vec![line]);

        let result = amend_invoice(&invoice, date(2025, 7, 12), date(2025, 7, 26), &[]);

        assert_eq!(result, Err(DraftError::ImmutableLineSet));
    }

    #[test]
    fn amend_rejects_inverted_date_range() {
        let invoice = invoice_with_lines(Vec::new());

        let result = amend_invoice(&invoice, date(2025, 7, 12), date(2025, 7, 11), &[]);

        assert_eq!(
            result,
            Err(DraftError::DueDateBeforeDate {
                date: date(2025, 7, 12),
                due_date: date(2025, 7, 11),
            })
        );
    }
}
