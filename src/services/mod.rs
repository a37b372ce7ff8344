pub mod admin_service;
pub mod auth_service;
pub mod invoice_service;
pub mod shop_service;
pub mod token_service;
