use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::User;

/// OAuth2 password-grant form body.
#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub user_id: i32,
    pub is_superuser: bool,
    pub sub: String,
    pub current_shop_id: Option<i32>,
    pub last_invoice_id: Option<i32>,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub current_shop_id: Option<i32>,
    pub last_invoice_id: Option<i32>,
}
