use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    client::error::{ClientError, ClientResult},
    dto::{
        auth::{ChangePasswordRequest, Claims, LoginForm, Profile, RegisterRequest, Token},
        invoices::{
            InvoiceDeleted, InvoiceList, InvoicePayload, InvoiceSaved, InvoiceStats,
            InvoiceWithItems, SetPaidRequest,
        },
        shops::{CreateShopRequest, ShopCreated},
    },
    models::{Invoice, Shop},
    response::{ApiResponse, Meta},
    routes::params::{InvoiceListQuery, StatsQuery},
};

/// A bearer token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
}

impl Session {
    /// Read the claims without checking the signature; only the server can do that.
    pub fn from_token(token: impl Into<String>) -> ClientResult<Self> {
        let token = token.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(&token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| ClientError::InvalidToken(e.to_string()))?
            .claims;
        Ok(Self { token, claims })
    }

    pub fn current_shop_id(&self) -> Option<i32> {
        self.claims.current_shop_id
    }

    pub fn last_invoice_id(&self) -> Option<i32> {
        self.claims.last_invoice_id
    }
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("invoice-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            session: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> ClientResult<Self> {
        self.session = Some(Session::from_token(token)?);
        Ok(self)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> ClientResult<RequestBuilder> {
        let session = self.session.as_ref().ok_or(ClientError::NotAuthenticated)?;
        Ok(builder.bearer_auth(&session.token))
    }

    fn adopt(&mut self, token: String) -> ClientResult<&Session> {
        let session = Session::from_token(token)?;
        tracing::debug!(
            shop_id = ?session.current_shop_id(),
            last_invoice_id = ?session.last_invoice_id(),
            "session refreshed"
        );
        Ok(&*self.session.insert(session))
    }

    /// Run the request; non-2xx statuses become typed errors carrying the
    /// server's message.
    async fn execute(builder: RequestBuilder) -> ClientResult<Vec<u8>> {
        let resp = builder.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?.to_vec();

        if status.is_success() {
            return Ok(bytes);
        }

        let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&bytes)
            .map(|body| body.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            _ => ClientError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<(T, Option<Meta>)> {
        let bytes = Self::execute(builder).await?;
        let body: ApiResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        let data = body
            .data
            .ok_or_else(|| ClientError::InvalidResponse(format!("no data in '{}'", body.message)))?;
        Ok((data, body.meta))
    }

    async fn send_data<T: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<T> {
        Self::send(builder).await.map(|(data, _)| data)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<&Session> {
        let form = LoginForm {
            username: username.to_string(),
            password: password.to_string(),
        };
        let token: Token =
            Self::send_data(self.http.post(self.url("/auth/token")).form(&form)).await?;
        self.adopt(token.access_token)
    }

    pub async fn register(&mut self, payload: &RegisterRequest) -> ClientResult<&Session> {
        let token: Token =
            Self::send_data(self.http.post(self.url("/auth/register")).json(payload)).await?;
        self.adopt(token.access_token)
    }

    pub async fn me(&self) -> ClientResult<Profile> {
        Self::send_data(self.authed(self.http.get(self.url("/auth/me")))?).await
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> ClientResult<()> {
        let payload = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        let builder = self
            .authed(self.http.post(self.url("/auth/change-password")))?
            .json(&payload);
        Self::execute(builder).await?;
        Ok(())
    }

    pub async fn create_shop(&mut self, payload: &CreateShopRequest) -> ClientResult<Shop> {
        let builder = self.authed(self.http.post(self.url("/shops")))?.json(payload);
        let created: ShopCreated = Self::send_data(builder).await?;
        self.adopt(created.new_token)?;
        Ok(created.shop)
    }

    pub async fn list_invoices(&self, query: &InvoiceListQuery) -> ClientResult<(Vec<Invoice>, Meta)> {
        let builder = self.authed(self.http.get(self.url("/invoices")))?.query(query);
        let (list, meta): (InvoiceList, _) = Self::send(builder).await?;
        Ok((list.items, meta.unwrap_or_else(Meta::empty)))
    }

    /// Walk every page of `query` until the server's total is reached.
    pub async fn list_all_invoices(&self, query: &InvoiceListQuery) -> ClientResult<Vec<Invoice>> {
        let mut all = Vec::new();
        let mut page = query.page.unwrap_or(1).max(1);
        loop {
            let paged = InvoiceListQuery {
                page: Some(page),
                ..query.clone()
            };
            let (items, meta) = self.list_invoices(&paged).await?;
            let fetched = items.len();
            all.extend(items);
            let total = meta.total.unwrap_or_default();
            if fetched == 0 || all.len() as i64 >= total {
                return Ok(all);
            }
            page += 1;
        }
    }

    pub async fn get_invoice(&self, id: i32) -> ClientResult<InvoiceWithItems> {
        let builder = self.authed(self.http.get(self.url(&format!("/invoices/{id}"))))?;
        Self::send_data(builder).await
    }

    pub async fn create_invoice(&mut self, payload: &InvoicePayload) -> ClientResult<InvoiceWithItems> {
        let builder = self.authed(self.http.post(self.url("/invoices")))?.json(payload);
        self.saved(builder).await
    }

    pub async fn update_invoice(
        &mut self,
        id: i32,
        payload: &InvoicePayload,
    ) -> ClientResult<InvoiceWithItems> {
        let builder = self
            .authed(self.http.put(self.url(&format!("/invoices/{id}"))))?
            .json(payload);
        self.saved(builder).await
    }

    async fn saved(&mut self, builder: RequestBuilder) -> ClientResult<InvoiceWithItems> {
        let saved: InvoiceSaved = Self::send_data(builder).await?;
        self.adopt(saved.new_token)?;
        Ok(InvoiceWithItems {
            invoice: saved.invoice,
            items: saved.items,
        })
    }

    pub async fn set_paid(&self, id: i32, is_paid: bool) -> ClientResult<Invoice> {
        let builder = self
            .authed(self.http.patch(self.url(&format!("/invoices/{id}/paid"))))?
            .json(&SetPaidRequest { is_paid });
        Self::send_data(builder).await
    }

    pub async fn delete_invoice(&mut self, id: i32) -> ClientResult<()> {
        let builder = self.authed(self.http.delete(self.url(&format!("/invoices/{id}"))))?;
        let deleted: InvoiceDeleted = Self::send_data(builder).await?;
        self.adopt(deleted.new_token)?;
        Ok(())
    }

    pub async fn stats(&self, shop_id: Option<i32>) -> ClientResult<InvoiceStats> {
        let builder = self
            .authed(self.http.get(self.url("/invoices/stats")))?
            .query(&StatsQuery { shop_id });
        Self::send_data(builder).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::services::token_service::{ShopContext, TokenKeys, TokenSubject, issue_token};

    #[test]
    fn session_reads_claims_without_the_secret() {
        let token = issue_token(
            &TokenKeys::new(b"server-only"),
            TokenSubject {
                user_id: 12,
                login: "anna",
                is_superuser: false,
            },
            ShopContext {
                current_shop_id: Some(2),
                last_invoice_id: None,
            },
            Duration::minutes(10),
        )
        .unwrap();

        let session = Session::from_token(token).unwrap();
        assert_eq!(session.claims.user_id, 12);
        assert_eq!(session.current_shop_id(), Some(2));
        assert_eq!(session.last_invoice_id(), None);
    }

    #[test]
    fn session_rejects_garbage() {
        assert!(matches!(
            Session::from_token("nope"),
            Err(ClientError::InvalidToken(_))
        ));
    }

    #[test]
    fn client_requires_login_for_protected_calls() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("/auth/me"), "http://localhost:3000/api/v1/auth/me");
        assert!(matches!(
            client.authed(client.http.get(client.url("/auth/me"))),
            Err(ClientError::NotAuthenticated)
        ));
    }
}
