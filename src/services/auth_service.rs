use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};

use crate::{
    audit,
    db::OrmConn,
    dto::auth::{ChangePasswordRequest, LoginForm, Profile, RegisterRequest, Token},
    entity::users::{self, ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::token_service::{ShopContext, issue_token, shop_context},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            tracing::warn!("stored password hash is not a valid PHC string");
            false
        }
    }
}

/// Look up `login` and check the password. `None` for both unknown users and
/// wrong passwords so callers cannot tell them apart.
pub async fn authenticate_user(
    orm: &OrmConn,
    login: &str,
    password: &str,
) -> AppResult<Option<users::Model>> {
    let user = Users::find()
        .filter(UserCol::Login.eq(login))
        .one(orm)
        .await?;

    Ok(user.filter(|u| verify_password(password, &u.password_hash)))
}

pub async fn login(state: &AppState, form: LoginForm) -> AppResult<ApiResponse<Token>> {
    let LoginForm { username, password } = form;
    let user = authenticate_user(&state.orm, &username, &password)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Incorrect username or password".into()))?;

    if !user.is_active {
        return Err(AppError::BadRequest("Inactive user".into()));
    }

    let context = shop_context(&state.orm, user.id).await?;
    let token = issue_token(&state.keys, (&user).into(), context, state.token_ttl)?;

    tracing::info!(user_id = user.id, shop_id = ?context.current_shop_id, "user logged in");
    audit::record(
        &state.orm,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        Token::bearer(token),
        Some(Meta::empty()),
    ))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<Token>> {
    let RegisterRequest {
        login,
        email,
        password,
        phone,
    } = payload;
    let login = login.trim().to_string();
    let email = email.trim().to_string();

    if login.is_empty() {
        return Err(AppError::BadRequest("Login must not be empty".into()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Email is invalid".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let exist = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Login.eq(login.as_str()))
                .add(UserCol::Email.eq(email.as_str())),
        )
        .one(&state.orm)
        .await?;

    if let Some(existing) = exist {
        let field = if existing.login == login { "Login" } else { "Email" };
        return Err(AppError::BadRequest(format!("{field} is already taken")));
    }

    let user = UserActive {
        login: Set(login),
        email: Set(email),
        password_hash: Set(hash_password(&password)?),
        phone: Set(phone.filter(|p| !p.trim().is_empty())),
        is_active: Set(true),
        is_superuser: Set(false),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await
    .map_err(|err| AppError::on_conflict(err, "Login or email is already taken"))?;

    let token = issue_token(
        &state.keys,
        (&user).into(),
        ShopContext::default(),
        state.token_ttl,
    )?;

    audit::record(
        &state.orm,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("User created", Token::bearer(token), None))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<()>> {
    let existing = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(AppError::credentials)?;

    if !verify_password(&payload.old_password, &existing.password_hash) {
        return Err(AppError::BadRequest("Incorrect password".into()));
    }
    if payload.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let mut active: UserActive = existing.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::message("Password updated successfully"))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Profile>> {
    let row = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "OK",
        Profile {
            user: row.into(),
            current_shop_id: user.current_shop_id,
            last_invoice_id: user.last_invoice_id,
        },
        Some(Meta::empty()),
    ))
}
