use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::shops::{CreateShopRequest, ShopCreated},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Shop,
    response::ApiResponse,
    services::shop_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_shop))
        .route("/mine", get(my_shop))
}

#[utoipa::path(
    post,
    path = "/api/v1/shops",
    request_body = CreateShopRequest,
    responses(
        (status = 201, description = "Shop created, with a refreshed token", body = ApiResponse<ShopCreated>),
        (status = 400, description = "User already has a shop")
    ),
    security(("bearer_auth" = [])),
    tag = "Shops"
)]
pub async fn create_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateShopRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ShopCreated>>)> {
    let resp = shop_service::create_shop(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shops/mine",
    responses(
        (status = 200, description = "The caller's shop", body = ApiResponse<Shop>),
        (status = 404, description = "User has no shop")
    ),
    security(("bearer_auth" = [])),
    tag = "Shops"
)]
pub async fn my_shop(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::my_shop(&state, &user).await?;
    Ok(Json(resp))
}
