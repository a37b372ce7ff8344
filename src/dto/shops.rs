use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Shop;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateShopRequest {
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ShopCreated {
    pub shop: Shop,
    pub new_token: String,
}
