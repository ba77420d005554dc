mod billable_line;
mod contact;
mod expense;
mod invoice;
mod receipt;
mod shift;

pub use billable_line::{BillableLine, LineRef};
pub use contact::{Contact, NewContact};
pub use expense::{Expense, ExpenseDetail, ExpenseForm, ExpenseType, NewExpense};
pub use invoice::{Invoice, InvoiceDraft, InvoiceStatus};
pub use receipt::{NewReceipt, Receipt, ReceiptType};
pub use shift::{NewShift, PageDirection, Shift, ShiftStatus, ShiftsPage};
