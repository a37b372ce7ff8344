pub mod admin;
pub mod auth;
pub mod invoices;
pub mod shops;
