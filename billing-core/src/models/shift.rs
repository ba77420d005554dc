use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: i64,
    pub contact_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ShiftStatus,
    pub description: String,
    /// Set when the shift is completed; the amount billed for the shift.
    pub total_incl_gst: Option<Decimal>,
    /// The invoice this shift is attached to, if any.
    pub invoice_id: Option<i64>,
}

impl Shift {
    /// A shift can be attached to a new invoice only once completed,
    /// priced, and not yet linked anywhere.
    pub fn is_billable(&self) -> bool {
        self.status == ShiftStatus::Completed
            && self.total_incl_gst.is_some()
            && self.invoice_id.is_none()
    }
}

/// For creating new shifts (no id, not yet invoiced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShift {
    pub contact_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ShiftStatus,
    pub description: String,
    pub total_incl_gst: Option<Decimal>,
}

/// Which side of the cursor a page request covers. A single request
/// never spans both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageDirection {
    Before,
    After,
}

impl PageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// One page of a cursor-paginated shift query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftsPage {
    pub items: Vec<Shift>,
    pub has_more: bool,
}
