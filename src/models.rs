use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{invoice_items, invoices, shops, users};

/// Public view of a user row. The password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub login: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Shop {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Invoice {
    pub id: i32,
    pub shop_id: i32,
    pub user_id: i32,
    pub contact_info: String,
    pub additional_info: Option<String>,
    pub total_amount: Decimal,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceItem {
    pub id: i32,
    pub invoice_id: i32,
    pub position: i32,
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub sum: Decimal,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            login: model.login,
            email: model.email,
            phone: model.phone,
            is_active: model.is_active,
            is_superuser: model.is_superuser,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<shops::Model> for Shop {
    fn from(model: shops::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            address: model.address,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<invoices::Model> for Invoice {
    fn from(model: invoices::Model) -> Self {
        Self {
            id: model.id,
            shop_id: model.shop_id,
            user_id: model.user_id,
            contact_info: model.contact_info,
            additional_info: model.additional_info,
            total_amount: model.total_amount,
            is_paid: model.is_paid,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<invoice_items::Model> for InvoiceItem {
    fn from(model: invoice_items::Model) -> Self {
        Self {
            id: model.id,
            invoice_id: model.invoice_id,
            position: model.position,
            name: model.name,
            quantity: model.quantity,
            price: model.price,
            sum: model.sum,
        }
    }
}
