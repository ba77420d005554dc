use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::billable_line::BillableLine;
use super::receipt::{Receipt, ReceiptType};

/// Effective invoice state. Derived from the ledger and the current
/// date on every read; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Overdue,
    WrittenOff,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::WrittenOff => "written_off",
        }
    }
}

/// An invoice built from a frozen set of billable lines plus the
/// append-only receipt ledger recorded against it.
///
/// Monetary totals are computed by summing the lines and receipts on
/// every call rather than kept as stored fields, so a removal or an
/// out-of-order append can never leave them inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub contact_id: i64,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    /// Set when the invoice was explicitly written off as a whole.
    pub written_off: bool,
    pub lines: Vec<BillableLine>,
    pub receipts: Vec<Receipt>,
}

impl Invoice {
    pub fn total_incl_gst(&self) -> Decimal {
        self.lines.iter().map(|line| line.amount_incl_gst).sum()
    }

    pub fn paid_incl_gst(&self) -> Decimal {
        self.receipt_sum(ReceiptType::Payment)
    }

    pub fn written_off_incl_gst(&self) -> Decimal {
        self.receipt_sum(ReceiptType::WriteOff)
    }

    /// Raw outstanding balance. Negative when the invoice was over-paid
    /// or over-written-off; the raw value is kept visible so
    /// reconciliation discrepancies are not silently hidden.
    pub fn outstanding_incl_gst(&self) -> Decimal {
        self.total_incl_gst() - self.paid_incl_gst() - self.written_off_incl_gst()
    }

    /// Outstanding balance floored at zero, for display only.
    pub fn display_outstanding_incl_gst(&self) -> Decimal {
        self.outstanding_incl_gst().max(Decimal::ZERO)
    }

    fn receipt_sum(&self, receipt_type: ReceiptType) -> Decimal {
        self.receipts
            .iter()
            .filter(|receipt| receipt.receipt_type == receipt_type)
            .map(|receipt| receipt.amount_incl_gst)
            .sum()
    }
}

/// A not-yet-persisted invoice. The line set is fixed here; once the
/// draft is persisted only the dates stay editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub contact_id: i64,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub lines: Vec<BillableLine>,
}

impl InvoiceDraft {
    pub fn total_incl_gst(&self) -> Decimal {
        self.lines.iter().map(|line| line.amount_incl_gst).sum()
    }
}
