use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};

use crate::{
    dto::admin::{SetActiveRequest, UserList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    routes::params::Pagination,
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/active", patch(set_user_active))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(Pagination),
    responses(
        (status = 200, description = "All users (superuser only)", body = ApiResponse<UserList>),
        (status = 403, description = "Not enough privileges")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}/active",
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Activate or deactivate a user", body = ApiResponse<User>),
        (status = 400, description = "Cannot deactivate yourself"),
        (status = 403, description = "Not enough privileges"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_user_active(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<SetActiveRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::set_user_active(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
