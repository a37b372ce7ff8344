use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::{
    audit,
    dto::shops::{CreateShopRequest, ShopCreated},
    entity::shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Shop,
    response::{ApiResponse, Meta},
    services::token_service::refresh_token,
    state::AppState,
};

const SHOP_TAKEN: &str = "User already has a shop";

/// Each user runs at most one shop; a second one is rejected.
pub async fn create_shop(
    state: &AppState,
    user: &AuthUser,
    payload: CreateShopRequest,
) -> AppResult<ApiResponse<ShopCreated>> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Shop name must not be empty".into()));
    }

    let existing = Shops::find()
        .filter(ShopCol::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(SHOP_TAKEN.into()));
    }

    let shop = ShopActive {
        owner_id: Set(user.user_id),
        name: Set(name),
        address: Set(payload.address.filter(|a| !a.trim().is_empty())),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await
    .map_err(|err| AppError::on_conflict(err, SHOP_TAKEN))?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "shop_create",
        "shops",
        serde_json::json!({ "shop_id": shop.id }),
    )
    .await;

    let new_token = refresh_token(&state.orm, &state.keys, user.into(), state.token_ttl).await?;

    Ok(ApiResponse::success(
        "Shop created",
        ShopCreated {
            shop: shop.into(),
            new_token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn my_shop(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Shop>> {
    let shop = Shops::find()
        .filter(ShopCol::OwnerId.eq(user.user_id))
        .order_by_asc(ShopCol::Id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("Shop", shop.into(), Some(Meta::empty())))
}
