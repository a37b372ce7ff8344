#![allow(dead_code)]

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};

use invoice_backend::{
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::RegisterRequest,
        invoices::{InvoiceItemInput, InvoicePayload},
    },
    entity::users::ActiveModel as UserActive,
    middleware::auth::{AuthUser, authenticate},
    services::auth_service::{self, hash_password},
    state::AppState,
};

pub const SECRET: &str = "integration-secret";

/// Fresh in-memory database with every migration applied.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let orm = create_orm_conn("sqlite::memory:").await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm, SECRET, 30))
}

/// Register through the service and return the issued token.
pub async fn register(state: &AppState, login: &str, password: &str) -> anyhow::Result<String> {
    let resp = auth_service::register_user(
        state,
        RegisterRequest {
            login: login.into(),
            email: format!("{login}@example.com"),
            password: password.into(),
            phone: None,
        },
    )
    .await?;
    Ok(resp.data.expect("token").access_token)
}

pub async fn create_superuser(state: &AppState, login: &str) -> anyhow::Result<i32> {
    let user = UserActive {
        login: Set(login.into()),
        email: Set(format!("{login}@example.com")),
        password_hash: Set(hash_password("secret123")?),
        phone: Set(None),
        is_active: Set(true),
        is_superuser: Set(true),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

/// Resolve a token exactly like the request extractor does.
pub async fn caller(state: &AppState, token: &str) -> anyhow::Result<AuthUser> {
    Ok(authenticate(state, token).await?)
}

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal")
}

pub fn item(name: &str, quantity: &str, price: &str) -> InvoiceItemInput {
    InvoiceItemInput {
        name: name.into(),
        quantity: d(quantity),
        price: d(price),
    }
}

pub fn payload(contact: &str, items: Vec<InvoiceItemInput>) -> InvoicePayload {
    InvoicePayload {
        shop_id: None,
        contact_info: contact.into(),
        additional_info: None,
        is_paid: false,
        created_at: None,
        items,
    }
}
