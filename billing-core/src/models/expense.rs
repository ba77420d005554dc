use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseType {
    Business,
    Reclaimable,
    Kilometre,
}

impl ExpenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Reclaimable => "reclaimable",
            Self::Kilometre => "kilometre",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "business" => Some(Self::Business),
            "reclaimable" => Some(Self::Reclaimable),
            "kilometre" => Some(Self::Kilometre),
            _ => None,
        }
    }
}

/// The three expense shapes as a tagged union.
///
/// Business and Reclaimable carry amounts exactly as entered.
/// Kilometre never stores amounts; they are derived from the rate and
/// distance every time they are needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseDetail {
    Business {
        business_expense_type: String,
        category: String,
        payee: String,
        amount_incl_gst: Decimal,
        amount_gst: Decimal,
    },
    Reclaimable {
        contact_id: i64,
        payee: String,
        amount_incl_gst: Decimal,
        amount_gst: Decimal,
    },
    Kilometre {
        contact_id: i64,
        km_rate_amount_excl_gst: Decimal,
        kms: u32,
        is_gst_free: bool,
    },
}

impl ExpenseDetail {
    pub fn expense_type(&self) -> ExpenseType {
        match self {
            Self::Business { .. } => ExpenseType::Business,
            Self::Reclaimable { .. } => ExpenseType::Reclaimable,
            Self::Kilometre { .. } => ExpenseType::Kilometre,
        }
    }

    /// The contact an expense can be invoiced to. Business expenses are
    /// internal and never invoiceable.
    pub fn contact_id(&self) -> Option<i64> {
        match self {
            Self::Business { .. } => None,
            Self::Reclaimable { contact_id, .. } | Self::Kilometre { contact_id, .. } => {
                Some(*contact_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// The invoice this expense is attached to, if any.
    pub invoice_id: Option<i64>,
    pub detail: ExpenseDetail,
}

impl Expense {
    pub fn is_billable(&self) -> bool {
        self.invoice_id.is_none() && self.detail.contact_id().is_some()
    }
}

/// For creating new expenses from already-validated detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub description: String,
    pub detail: ExpenseDetail,
}

/// Raw, unvalidated expense input as it arrives from a form or API
/// payload. Every variant-specific field is optional here; the
/// classifier decides which ones the chosen type requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseForm {
    pub expense_type: Option<ExpenseType>,
    pub business_expense_type: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
    pub contact_id: Option<i64>,
    pub amount_incl_gst: Option<Decimal>,
    pub amount_gst: Option<Decimal>,
    pub km_rate_amount_excl_gst: Option<Decimal>,
    pub kms: Option<u32>,
    pub is_gst_free: Option<bool>,
}
