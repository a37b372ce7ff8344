use std::sync::Arc;

use chrono::Duration;

use crate::{db::OrmConn, services::token_service::TokenKeys};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub keys: Arc<TokenKeys>,
    pub token_ttl: Duration,
}

impl AppState {
    pub fn new(orm: OrmConn, jwt_secret: &str, token_ttl_minutes: i64) -> Self {
        Self {
            orm,
            keys: Arc::new(TokenKeys::new(jwt_secret.as_bytes())),
            token_ttl: Duration::minutes(token_ttl_minutes),
        }
    }
}
