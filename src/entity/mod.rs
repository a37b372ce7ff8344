pub mod audit_logs;
pub mod invoice_items;
pub mod invoices;
pub mod shops;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use invoice_items::Entity as InvoiceItems;
pub use invoices::Entity as Invoices;
pub use shops::Entity as Shops;
pub use users::Entity as Users;
