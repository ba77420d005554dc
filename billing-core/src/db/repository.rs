use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{
    Contact, Expense, Invoice, InvoiceDraft, LineRef, NewContact, NewExpense, NewReceipt,
    NewShift, PageDirection, Receipt, Shift, ShiftsPage,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    /// A concurrent writer claimed the same record first.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// The persistence boundary of the billing core. One implementation
/// per backend; the core only ever sees this trait.
#[async_trait]
pub trait BillingRepository: Send + Sync {
    // Contacts
    async fn create_contact(&self, contact: NewContact) -> Result<Contact, RepositoryError>;
    async fn get_contact(&self, id: i64) -> Result<Contact, RepositoryError>;

    // Organization
    /// IANA zone name the organization operates in (e.g.
    /// "Australia/Sydney"); anchors the timeline's notion of "today".
    async fn organization_timezone(&self) -> Result<String, RepositoryError>;

    // Shifts
    async fn insert_shift(&self, shift: NewShift) -> Result<Shift, RepositoryError>;
    async fn get_shift(&self, id: i64) -> Result<Shift, RepositoryError>;

    /// Completed, priced, not-yet-invoiced shifts for a contact.
    async fn list_billable_shifts(&self, contact_id: i64) -> Result<Vec<Shift>, RepositoryError>;

    /// One page of a contact's shifts on a single side of the cursor:
    /// `Before` is strictly earlier than the cursor, `After` is the
    /// cursor instant or later. Items come back ascending by start
    /// time either way.
    async fn fetch_shifts_page(
        &self,
        contact_id: i64,
        direction: PageDirection,
        cursor: DateTime<Utc>,
        page_size: u32,
    ) -> Result<ShiftsPage, RepositoryError>;

    // Expenses
    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, RepositoryError>;
    async fn get_expense(&self, id: i64) -> Result<Expense, RepositoryError>;

    /// Not-yet-invoiced expenses attached to a contact.
    async fn list_billable_expenses(
        &self,
        contact_id: i64,
    ) -> Result<Vec<Expense>, RepositoryError>;

    /// Whether the record is free to attach to a new invoice.
    async fn is_billable(&self, line: LineRef) -> Result<bool, RepositoryError>;

    // Invoices
    /// Persists a draft and links its source records, atomically. A
    /// source claimed by a concurrent invoice fails the whole call
    /// with [`RepositoryError::Conflict`].
    async fn create_invoice(&self, draft: InvoiceDraft) -> Result<Invoice, RepositoryError>;
    async fn get_invoice(&self, id: i64) -> Result<Invoice, RepositoryError>;
    async fn list_invoices(
        &self,
        contact_id: Option<i64>,
    ) -> Result<Vec<Invoice>, RepositoryError>;

    /// Date fields are the only editable part of an issued invoice.
    async fn update_invoice_dates(
        &self,
        id: i64,
        date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<(), RepositoryError>;

    /// Terminal operation: removes the invoice, its lines and receipts,
    /// and releases the source records for re-invoicing.
    async fn delete_invoice(&self, id: i64) -> Result<(), RepositoryError>;

    // Receipts
    async fn insert_receipt(&self, receipt: NewReceipt) -> Result<Receipt, RepositoryError>;
    async fn delete_receipt(&self, id: i64) -> Result<(), RepositoryError>;
}
