use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Invoice, InvoiceItem};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct InvoiceItemInput {
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Body of both create and full update. Line sums and the total are always
/// computed server side; any such fields sent by a client are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct InvoicePayload {
    pub shop_id: Option<i32>,
    pub contact_info: String,
    pub additional_info: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    pub created_at: Option<NaiveDate>,
    pub items: Vec<InvoiceItemInput>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SetPaidRequest {
    pub is_paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceWithItems {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceSaved {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub new_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceDeleted {
    pub id: i32,
    pub new_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceList {
    pub items: Vec<Invoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvoiceStats {
    pub shop_id: i32,
    pub count: i64,
    pub paid_count: i64,
    pub unpaid_count: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub unpaid_amount: Decimal,
}
