//! Billing calculation modules.
//!
//! This module provides the calculation logic for invoicing completed
//! shifts and expenses: GST breakdowns, expense classification, invoice
//! aggregation, the receipt ledger, and status derivation.

pub mod common;
pub mod expense;
pub mod gst;
pub mod invoice;
pub mod ledger;
pub mod status;

pub use expense::{ValidationError, validate_expense};
pub use gst::{GstBreakdown, GstError, apply_gst, expense_amounts, kilometre_travel};
pub use invoice::{DraftError, InvoiceAggregator, amend_invoice};
pub use ledger::{LedgerError, apply_receipt, remove_receipt};
pub use status::effective_status;
