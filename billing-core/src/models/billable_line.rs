use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Typed reference to the record a billable line was produced from.
/// Doubles as the line's identity within an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineRef {
    Shift(i64),
    Expense(i64),
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(id) => write!(f, "shift {}", id),
            Self::Expense(id) => write!(f, "expense {}", id),
        }
    }
}

/// One line of an invoice. Immutable once the invoice is issued; edits
/// to the source record are blocked upstream while it stays linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillableLine {
    pub source: LineRef,
    pub description: String,
    pub date: NaiveDate,
    pub amount_excl_gst: Decimal,
    pub amount_gst: Decimal,
    pub amount_incl_gst: Decimal,
}
