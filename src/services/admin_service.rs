use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect, Set};

use crate::{
    audit,
    dto::admin::{SetActiveRequest, UserList},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_superuser},
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_superuser(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find().order_by_asc(UserCol::Id);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn set_user_active(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: SetActiveRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_superuser(user)?;
    if id == user.user_id && !payload.is_active {
        return Err(AppError::BadRequest("Cannot deactivate yourself".into()));
    }

    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = existing.into();
    active.is_active = Set(payload.is_active);
    let updated = active.update(&state.orm).await?;

    tracing::info!(target_user = id, is_active = payload.is_active, "user activation changed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "user_set_active",
        "users",
        serde_json::json!({ "user_id": id, "is_active": payload.is_active }),
    )
    .await;

    Ok(ApiResponse::success(
        "User updated",
        updated.into(),
        Some(Meta::empty()),
    ))
}
