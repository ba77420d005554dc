use std::path::Path;

use async_trait::async_trait;
use billing_core::{
    BillableLine, BillingRepository, Contact, Expense, ExpenseDetail, ExpenseType, Invoice,
    InvoiceDraft, LineRef, NewContact, NewExpense, NewReceipt, NewShift, PageDirection, Receipt,
    ReceiptType, RepositoryError, Shift, ShiftStatus, ShiftsPage,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::debug;

use crate::decimal::{decimal_to_f64, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let mut options = SqlitePoolOptions::new();
        // An in-memory database exists per connection; the pool must
        // not open a second one.
        if database_url.contains(":memory:") {
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified
    /// directory, in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<(), RepositoryError> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .map_err(|e| {
                RepositoryError::Configuration(format!(
                    "Failed to read seeds directory '{}': {}",
                    seeds_dir.display(),
                    e
                ))
            })?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path).map_err(|e| {
                RepositoryError::Configuration(format!(
                    "Failed to read seed file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    RepositoryError::Database(format!(
                        "Failed to execute seed file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_contact(row: &SqliteRow) -> Result<Contact, RepositoryError> {
    Ok(Contact {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        ndis_number: row.try_get("ndis_number").map_err(db_err)?,
    })
}

fn row_to_shift(row: &SqliteRow) -> Result<Shift, RepositoryError> {
    let status_str: String = row.try_get("status").map_err(db_err)?;
    let status = ShiftStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid shift status: {}", status_str)))?;

    Ok(Shift {
        id: row.try_get("id").map_err(db_err)?,
        contact_id: row.try_get("contact_id").map_err(db_err)?,
        start_time: row
            .try_get::<DateTime<Utc>, _>("start_time")
            .map_err(db_err)?,
        end_time: row.try_get::<DateTime<Utc>, _>("end_time").map_err(db_err)?,
        status,
        description: row.try_get("description").map_err(db_err)?,
        total_incl_gst: get_optional_decimal(row, "total_incl_gst")?,
        invoice_id: row.try_get("invoice_id").map_err(db_err)?,
    })
}

fn row_to_expense(row: &SqliteRow) -> Result<Expense, RepositoryError> {
    let type_str: String = row.try_get("expense_type").map_err(db_err)?;
    let expense_type = ExpenseType::parse(&type_str)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid expense type: {}", type_str)))?;

    let detail = match expense_type {
        ExpenseType::Business => ExpenseDetail::Business {
            business_expense_type: row.try_get("business_expense_type").map_err(db_err)?,
            category: row.try_get("category").map_err(db_err)?,
            payee: row.try_get("payee").map_err(db_err)?,
            amount_incl_gst: get_decimal(row, "amount_incl_gst")?,
            amount_gst: get_decimal(row, "amount_gst")?,
        },
        ExpenseType::Reclaimable => ExpenseDetail::Reclaimable {
            contact_id: row.try_get("contact_id").map_err(db_err)?,
            payee: row.try_get("payee").map_err(db_err)?,
            amount_incl_gst: get_decimal(row, "amount_incl_gst")?,
            amount_gst: get_decimal(row, "amount_gst")?,
        },
        ExpenseType::Kilometre => ExpenseDetail::Kilometre {
            contact_id: row.try_get("contact_id").map_err(db_err)?,
            km_rate_amount_excl_gst: get_decimal(row, "km_rate_amount_excl_gst")?,
            kms: row.try_get::<i64, _>("kms").map_err(db_err)? as u32,
            is_gst_free: row.try_get("is_gst_free").map_err(db_err)?,
        },
    };

    Ok(Expense {
        id: row.try_get("id").map_err(db_err)?,
        date: row.try_get::<NaiveDate, _>("date").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        invoice_id: row.try_get("invoice_id").map_err(db_err)?,
        detail,
    })
}

fn row_to_line(row: &SqliteRow) -> Result<BillableLine, RepositoryError> {
    let source_type: String = row.try_get("source_type").map_err(db_err)?;
    let source_id: i64 = row.try_get("source_id").map_err(db_err)?;
    let source = match source_type.as_str() {
        "shift" => LineRef::Shift(source_id),
        "expense" => LineRef::Expense(source_id),
        other => {
            return Err(RepositoryError::Database(format!(
                "Invalid line source type: {}",
                other
            )));
        }
    };

    Ok(BillableLine {
        source,
        description: row.try_get("description").map_err(db_err)?,
        date: row.try_get::<NaiveDate, _>("date").map_err(db_err)?,
        amount_excl_gst: get_decimal(row, "amount_excl_gst")?,
        amount_gst: get_decimal(row, "amount_gst")?,
        amount_incl_gst: get_decimal(row, "amount_incl_gst")?,
    })
}

fn row_to_receipt(row: &SqliteRow) -> Result<Receipt, RepositoryError> {
    let type_str: String = row.try_get("receipt_type").map_err(db_err)?;
    let receipt_type = ReceiptType::parse(&type_str)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid receipt type: {}", type_str)))?;

    Ok(Receipt {
        id: row.try_get("id").map_err(db_err)?,
        invoice_id: row.try_get("invoice_id").map_err(db_err)?,
        receipt_type,
        amount_incl_gst: get_decimal(row, "amount_incl_gst")?,
        date: row.try_get::<NaiveDate, _>("date").map_err(db_err)?,
        payment_method: row.try_get("payment_method").map_err(db_err)?,
        notes: row.try_get("notes").map_err(db_err)?,
    })
}

fn line_source_parts(source: LineRef) -> (&'static str, i64) {
    match source {
        LineRef::Shift(id) => ("shift", id),
        LineRef::Expense(id) => ("expense", id),
    }
}

/// Writes the draft's lines and claims each source row. A source that
/// is already linked to an invoice aborts the whole transaction with
/// [`RepositoryError::Conflict`].
async fn insert_invoice_lines(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    lines: &[BillableLine],
) -> Result<(), RepositoryError> {
    for line in lines {
        let (source_type, source_id) = line_source_parts(line.source);

        sqlx::query(
            "INSERT INTO invoice_lines (
                invoice_id, source_type, source_id, description, date,
                amount_excl_gst, amount_gst, amount_incl_gst
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(invoice_id)
        .bind(source_type)
        .bind(source_id)
        .bind(&line.description)
        .bind(line.date)
        .bind(decimal_to_f64(line.amount_excl_gst))
        .bind(decimal_to_f64(line.amount_gst))
        .bind(decimal_to_f64(line.amount_incl_gst))
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

        let claim = match line.source {
            LineRef::Shift(id) => {
                sqlx::query("UPDATE shifts SET invoice_id = ? WHERE id = ? AND invoice_id IS NULL")
                    .bind(invoice_id)
                    .bind(id)
                    .execute(&mut *conn)
                    .await
            }
            LineRef::Expense(id) => {
                sqlx::query(
                    "UPDATE expenses SET invoice_id = ? WHERE id = ? AND invoice_id IS NULL",
                )
                .bind(invoice_id)
                .bind(id)
                .execute(&mut *conn)
                .await
            }
        }
        .map_err(db_err)?;

        if claim.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "{} is already attached to an invoice",
                line.source
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl BillingRepository for SqliteRepository {
    async fn create_contact(
        &self,
        contact: NewContact,
    ) -> Result<Contact, RepositoryError> {
        let result = sqlx::query("INSERT INTO contacts (name, ndis_number) VALUES (?, ?)")
            .bind(&contact.name)
            .bind(&contact.ndis_number)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        self.get_contact(result.last_insert_rowid()).await
    }

    async fn get_contact(
        &self,
        id: i64,
    ) -> Result<Contact, RepositoryError> {
        let row = sqlx::query("SELECT id, name, ndis_number FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_contact(&row)
    }

    async fn organization_timezone(&self) -> Result<String, RepositoryError> {
        let row = sqlx::query("SELECT timezone FROM organization WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row.try_get("timezone").map_err(db_err)
    }

    async fn insert_shift(
        &self,
        shift: NewShift,
    ) -> Result<Shift, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO shifts (contact_id, start_time, end_time, status, description, total_incl_gst)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(shift.contact_id)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.status.as_str())
        .bind(&shift.description)
        .bind(shift.total_incl_gst.map(decimal_to_f64))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_shift(result.last_insert_rowid()).await
    }

    async fn get_shift(
        &self,
        id: i64,
    ) -> Result<Shift, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, contact_id, start_time, end_time, status, description,
                    total_incl_gst, invoice_id
             FROM shifts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_shift(&row)
    }

    async fn list_billable_shifts(
        &self,
        contact_id: i64,
    ) -> Result<Vec<Shift>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, contact_id, start_time, end_time, status, description,
                    total_incl_gst, invoice_id
             FROM shifts
             WHERE contact_id = ? AND status = 'completed'
               AND total_incl_gst IS NOT NULL AND invoice_id IS NULL
             ORDER BY start_time, id",
        )
        .bind(contact_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_shift).collect()
    }

    async fn fetch_shifts_page(
        &self,
        contact_id: i64,
        direction: PageDirection,
        cursor: DateTime<Utc>,
        page_size: u32,
    ) -> Result<ShiftsPage, RepositoryError> {
        // Fetch one extra row; its presence is the has-more signal.
        let limit = i64::from(page_size) + 1;

        let rows = match direction {
            PageDirection::Before => {
                sqlx::query(
                    "SELECT id, contact_id, start_time, end_time, status, description,
                            total_incl_gst, invoice_id
                     FROM shifts
                     WHERE contact_id = ? AND start_time < ?
                     ORDER BY start_time DESC, id DESC
                     LIMIT ?",
                )
                .bind(contact_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            PageDirection::After => {
                sqlx::query(
                    "SELECT id, contact_id, start_time, end_time, status, description,
                            total_incl_gst, invoice_id
                     FROM shifts
                     WHERE contact_id = ? AND start_time >= ?
                     ORDER BY start_time ASC, id ASC
                     LIMIT ?",
                )
                .bind(contact_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        let has_more = rows.len() > page_size as usize;
        let mut items: Vec<Shift> = rows
            .iter()
            .take(page_size as usize)
            .map(row_to_shift)
            .collect::<Result<_, _>>()?;

        if direction == PageDirection::Before {
            items.reverse();
        }

        Ok(ShiftsPage { items, has_more })
    }

    async fn insert_expense(
        &self,
        expense: NewExpense,
    ) -> Result<Expense, RepositoryError> {
        let result = match &expense.detail {
            ExpenseDetail::Business {
                business_expense_type,
                category,
                payee,
                amount_incl_gst,
                amount_gst,
            } => {
                sqlx::query(
                    "INSERT INTO expenses (
                        expense_type, date, description, business_expense_type,
                        category, payee, amount_incl_gst, amount_gst
                    ) VALUES ('business', ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(expense.date)
                .bind(&expense.description)
                .bind(business_expense_type)
                .bind(category)
                .bind(payee)
                .bind(decimal_to_f64(*amount_incl_gst))
                .bind(decimal_to_f64(*amount_gst))
                .execute(&self.pool)
                .await
            }
            ExpenseDetail::Reclaimable {
                contact_id,
                payee,
                amount_incl_gst,
                amount_gst,
            } => {
                sqlx::query(
                    "INSERT INTO expenses (
                        expense_type, date, description, contact_id, payee,
                        amount_incl_gst, amount_gst
                    ) VALUES ('reclaimable', ?, ?, ?, ?, ?, ?)",
                )
                .bind(expense.date)
                .bind(&expense.description)
                .bind(contact_id)
                .bind(payee)
                .bind(decimal_to_f64(*amount_incl_gst))
                .bind(decimal_to_f64(*amount_gst))
                .execute(&self.pool)
                .await
            }
            ExpenseDetail::Kilometre {
                contact_id,
                km_rate_amount_excl_gst,
                kms,
                is_gst_free,
            } => {
                sqlx::query(
                    "INSERT INTO expenses (
                        expense_type, date, description, contact_id,
                        km_rate_amount_excl_gst, kms, is_gst_free
                    ) VALUES ('kilometre', ?, ?, ?, ?, ?, ?)",
                )
                .bind(expense.date)
                .bind(&expense.description)
                .bind(contact_id)
                .bind(decimal_to_f64(*km_rate_amount_excl_gst))
                .bind(i64::from(*kms))
                .bind(is_gst_free)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        self.get_expense(result.last_insert_rowid()).await
    }

    async fn get_expense(
        &self,
        id: i64,
    ) -> Result<Expense, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, expense_type, date, description, contact_id, payee,
                    category, business_expense_type, amount_incl_gst, amount_gst,
                    km_rate_amount_excl_gst, kms, is_gst_free, invoice_id
             FROM expenses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_expense(&row)
    }

    async fn list_billable_expenses(
        &self,
        contact_id: i64,
    ) -> Result<Vec<Expense>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, expense_type, date, description, contact_id, payee,
                    category, business_expense_type, amount_incl_gst, amount_gst,
                    km_rate_amount_excl_gst, kms, is_gst_free, invoice_id
             FROM expenses
             WHERE contact_id = ? AND invoice_id IS NULL
             ORDER BY date, id",
        )
        .bind(contact_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_expense).collect()
    }

    async fn is_billable(
        &self,
        line: LineRef,
    ) -> Result<bool, RepositoryError> {
        match line {
            LineRef::Shift(id) => Ok(self.get_shift(id).await?.is_billable()),
            LineRef::Expense(id) => Ok(self.get_expense(id).await?.is_billable()),
        }
    }

    async fn create_invoice(
        &self,
        draft: InvoiceDraft,
    ) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query(
            "INSERT INTO invoices (contact_id, date, due_date, written_off)
             VALUES (?, ?, ?, 0)",
        )
        .bind(draft.contact_id)
        .bind(draft.date)
        .bind(draft.due_date)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        let invoice_id = result.last_insert_rowid();

        match insert_invoice_lines(&mut tx, invoice_id, &draft.lines).await {
            Ok(()) => {
                tx.commit().await.map_err(db_err)?;
            }
            Err(e) => {
                // Rollback failures are secondary; the original error
                // is the one the caller needs.
                let _ = tx.rollback().await;
                return Err(e);
            }
        }

        debug!(invoice_id, lines = draft.lines.len(), "invoice issued");
        self.get_invoice(invoice_id).await
    }

    async fn get_invoice(
        &self,
        id: i64,
    ) -> Result<Invoice, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, contact_id, date, due_date, written_off FROM invoices WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        let line_rows = sqlx::query(
            "SELECT source_type, source_id, description, date,
                    amount_excl_gst, amount_gst, amount_incl_gst
             FROM invoice_lines WHERE invoice_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let receipt_rows = sqlx::query(
            "SELECT id, invoice_id, receipt_type, amount_incl_gst, date,
                    payment_method, notes
             FROM receipts WHERE invoice_id = ? ORDER BY date, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Invoice {
            id: row.try_get("id").map_err(db_err)?,
            contact_id: row.try_get("contact_id").map_err(db_err)?,
            date: row.try_get::<NaiveDate, _>("date").map_err(db_err)?,
            due_date: row.try_get::<NaiveDate, _>("due_date").map_err(db_err)?,
            written_off: row.try_get("written_off").map_err(db_err)?,
            lines: line_rows
                .iter()
                .map(row_to_line)
                .collect::<Result<_, _>>()?,
            receipts: receipt_rows
                .iter()
                .map(row_to_receipt)
                .collect::<Result<_, _>>()?,
        })
    }

    async fn list_invoices(
        &self,
        contact_id: Option<i64>,
    ) -> Result<Vec<Invoice>, RepositoryError> {
        let id_rows = match contact_id {
            Some(contact_id) => {
                sqlx::query(
                    "SELECT id FROM invoices WHERE contact_id = ? ORDER BY date DESC, id DESC",
                )
                .bind(contact_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT id FROM invoices ORDER BY date DESC, id DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        let mut invoices = Vec::with_capacity(id_rows.len());
        for row in id_rows {
            let id: i64 = row.try_get("id").map_err(db_err)?;
            invoices.push(self.get_invoice(id).await?);
        }
        Ok(invoices)
    }

    async fn update_invoice_dates(
        &self,
        id: i64,
        date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE invoices SET date = ?, due_date = ? WHERE id = ?")
            .bind(date)
            .bind(due_date)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_invoice(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("UPDATE shifts SET invoice_id = NULL WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("UPDATE expenses SET invoice_id = NULL WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM receipts WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            let _ = tx.rollback().await;
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await.map_err(db_err)?;
        debug!(invoice_id = id, "invoice deleted, sources released");
        Ok(())
    }

    async fn insert_receipt(
        &self,
        receipt: NewReceipt,
    ) -> Result<Receipt, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO receipts (invoice_id, receipt_type, amount_incl_gst, date,
                                   payment_method, notes)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(receipt.invoice_id)
        .bind(receipt.receipt_type.as_str())
        .bind(decimal_to_f64(receipt.amount_incl_gst))
        .bind(receipt.date)
        .bind(&receipt.payment_method)
        .bind(&receipt.notes)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query(
            "SELECT id, invoice_id, receipt_type, amount_incl_gst, date,
                    payment_method, notes
             FROM receipts WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row_to_receipt(&row)
    }

    async fn delete_receipt(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM receipts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
