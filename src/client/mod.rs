//! Operator-side building blocks: an HTTP client for the REST surface and the
//! in-memory models behind the invoice history list and the invoice form.

pub mod api;
pub mod draft;
pub mod error;
pub mod history;

pub use api::{ApiClient, Session};
pub use draft::{DraftRow, InvoiceDraft};
pub use error::ClientError;
pub use history::{HistoryFilter, InvoiceHistory, InvoiceRow};
