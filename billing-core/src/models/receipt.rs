use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptType {
    /// Cash received against the invoice.
    Payment,
    /// Balance forgiven without payment.
    WriteOff,
}

impl ReceiptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::WriteOff => "write_off",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "payment" => Some(Self::Payment),
            "write_off" => Some(Self::WriteOff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub invoice_id: i64,
    pub receipt_type: ReceiptType,
    pub amount_incl_gst: Decimal,
    pub date: NaiveDate,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// For recording new receipts (no id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceipt {
    pub invoice_id: i64,
    pub receipt_type: ReceiptType,
    pub amount_incl_gst: Decimal,
    pub date: NaiveDate,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}
