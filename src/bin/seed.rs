use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use invoice_backend::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    dto::invoices::{InvoiceItemInput, InvoicePayload},
    entity::{
        invoices::{Column as InvoiceCol, Entity as Invoices},
        shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    middleware::auth::AuthUser,
    services::{auth_service::hash_password, invoice_service},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin", "admin@example.com", "admin123", true).await?;
    let operator_id =
        ensure_user(&orm, "operator", "operator@example.com", "operator123", false).await?;
    let shop_id = ensure_shop(&orm, operator_id, "Corner Shop").await?;

    let state = AppState::new(orm, &config.jwt_secret, config.access_token_expire_minutes);
    seed_invoice(&state, operator_id, shop_id).await?;

    tracing::info!(admin_id, operator_id, shop_id, "seed completed");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    login: &str,
    email: &str,
    password: &str,
    is_superuser: bool,
) -> anyhow::Result<i32> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Login.eq(login))
        .one(orm)
        .await?
    {
        tracing::info!(login, "user already present");
        return Ok(existing.id);
    }

    let password_hash = hash_password(password)?;
    let user = UserActive {
        login: Set(login.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        phone: Set(None),
        is_active: Set(true),
        is_superuser: Set(is_superuser),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(orm)
    .await?;

    tracing::info!(login, is_superuser, "user created");
    Ok(user.id)
}

async fn ensure_shop(orm: &OrmConn, owner_id: i32, name: &str) -> anyhow::Result<i32> {
    if let Some(shop) = Shops::find()
        .filter(ShopCol::OwnerId.eq(owner_id))
        .one(orm)
        .await?
    {
        return Ok(shop.id);
    }

    let shop = ShopActive {
        owner_id: Set(owner_id),
        name: Set(name.to_string()),
        address: Set(None),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(orm)
    .await?;
    Ok(shop.id)
}

async fn seed_invoice(state: &AppState, user_id: i32, shop_id: i32) -> anyhow::Result<()> {
    let existing = Invoices::find()
        .filter(InvoiceCol::ShopId.eq(shop_id))
        .count(&state.orm)
        .await?;
    if existing > 0 {
        tracing::info!(shop_id, existing, "shop already has invoices");
        return Ok(());
    }

    let operator = AuthUser {
        user_id,
        login: "operator".into(),
        is_superuser: false,
        current_shop_id: Some(shop_id),
        last_invoice_id: None,
    };

    let payload = InvoicePayload {
        shop_id: Some(shop_id),
        contact_info: "Walk-in customer".into(),
        additional_info: Some("seed data".into()),
        is_paid: false,
        created_at: None,
        items: vec![
            InvoiceItemInput {
                name: "Coffee beans 1kg".into(),
                quantity: Decimal::from(2),
                price: Decimal::from_str("14.90")?,
            },
            InvoiceItemInput {
                name: "Paper cups".into(),
                quantity: Decimal::from(50),
                price: Decimal::from_str("0.12")?,
            },
        ],
    };

    let saved = invoice_service::create_invoice(state, &operator, payload).await?;
    if let Some(data) = saved.data {
        tracing::info!(invoice_id = data.invoice.id, total = %data.invoice.total_amount, "invoice seeded");
    }
    Ok(())
}
