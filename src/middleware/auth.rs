use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header},
};
use sea_orm::EntityTrait;

use crate::{
    entity::users::Entity as Users,
    error::AppError,
    services::token_service::decode_token,
    state::AppState,
};

/// The caller of an authenticated endpoint, rebuilt from the bearer token and
/// the current user row.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub login: String,
    pub is_superuser: bool,
    pub current_shop_id: Option<i32>,
    pub last_invoice_id: Option<i32>,
}

pub fn ensure_superuser(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_superuser {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_str = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(AppError::credentials)?
        .to_str()
        .map_err(|_| AppError::credentials())?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(AppError::credentials)?;
    Ok(token)
}

/// Verify the token, then load the user: a deleted user is a 401, a
/// deactivated one a 400.
pub async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = decode_token(&state.keys, token)?;

    let user = Users::find_by_id(claims.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(AppError::credentials)?;

    if !user.is_active {
        return Err(AppError::BadRequest("Inactive user".into()));
    }

    Ok(AuthUser {
        user_id: user.id,
        login: user.login,
        is_superuser: user.is_superuser,
        current_shop_id: claims.current_shop_id,
        last_invoice_id: claims.last_invoice_id,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        authenticate(state, token).await
    }
}
