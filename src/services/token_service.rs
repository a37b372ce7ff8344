use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    db::OrmConn,
    dto::auth::Claims,
    entity::{
        invoices::{Column as InvoiceCol, Entity as Invoices},
        shops::{Column as ShopCol, Entity as Shops},
        users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
};

/// HS256 key pair derived from the shared secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// The "where am I working" part of a session: the user's shop and the most
/// recent invoice they wrote there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShopContext {
    pub current_shop_id: Option<i32>,
    pub last_invoice_id: Option<i32>,
}

/// Identity fields copied into the claims.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: i32,
    pub login: &'a str,
    pub is_superuser: bool,
}

impl<'a> From<&'a users::Model> for TokenSubject<'a> {
    fn from(user: &'a users::Model) -> Self {
        Self {
            user_id: user.id,
            login: &user.login,
            is_superuser: user.is_superuser,
        }
    }
}

impl<'a> From<&'a AuthUser> for TokenSubject<'a> {
    fn from(user: &'a AuthUser) -> Self {
        Self {
            user_id: user.user_id,
            login: &user.login,
            is_superuser: user.is_superuser,
        }
    }
}

pub fn issue_token(
    keys: &TokenKeys,
    subject: TokenSubject<'_>,
    context: ShopContext,
    ttl: Duration,
) -> AppResult<String> {
    issue_token_at(keys, subject, context, ttl, Utc::now())
}

pub fn issue_token_at(
    keys: &TokenKeys,
    subject: TokenSubject<'_>,
    context: ShopContext,
    ttl: Duration,
    now: DateTime<Utc>,
) -> AppResult<String> {
    let expiration = now
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        user_id: subject.user_id,
        is_superuser: subject.is_superuser,
        sub: subject.login.to_string(),
        current_shop_id: context.current_shop_id,
        last_invoice_id: context.last_invoice_id,
        iat: now.timestamp().max(0) as usize,
        exp: expiration.timestamp().max(0) as usize,
    };

    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Verify signature and expiry. Every failure collapses to the same 401.
pub fn decode_token(keys: &TokenKeys, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<Claims>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            AppError::credentials()
        })
}

pub async fn shop_context(orm: &OrmConn, user_id: i32) -> AppResult<ShopContext> {
    let shop = Shops::find()
        .filter(ShopCol::OwnerId.eq(user_id))
        .order_by_asc(ShopCol::Id)
        .one(orm)
        .await?;

    let Some(shop) = shop else {
        return Ok(ShopContext::default());
    };

    let last_invoice = Invoices::find()
        .filter(InvoiceCol::UserId.eq(user_id))
        .filter(InvoiceCol::ShopId.eq(shop.id))
        .order_by_desc(InvoiceCol::CreatedAt)
        .order_by_desc(InvoiceCol::Id)
        .one(orm)
        .await?;

    Ok(ShopContext {
        current_shop_id: Some(shop.id),
        last_invoice_id: last_invoice.map(|invoice| invoice.id),
    })
}

/// Mint a fresh token for `subject` with the context as it is in the database now.
pub async fn refresh_token(
    orm: &OrmConn,
    keys: &TokenKeys,
    subject: TokenSubject<'_>,
    ttl: Duration,
) -> AppResult<String> {
    let context = shop_context(orm, subject.user_id).await?;
    issue_token(keys, subject, context, ttl)
}
