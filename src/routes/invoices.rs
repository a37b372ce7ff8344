use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};

use crate::{
    dto::invoices::{
        InvoiceDeleted, InvoiceList, InvoicePayload, InvoiceSaved, InvoiceStats,
        InvoiceWithItems, SetPaidRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Invoice,
    response::ApiResponse,
    routes::params::{InvoiceListQuery, StatsQuery},
    services::invoice_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route("/stats", get(invoice_stats))
        .route(
            "/{id}",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/{id}/paid", patch(set_paid))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(InvoiceListQuery),
    responses(
        (status = 200, description = "Filtered, sorted page of invoices", body = ApiResponse<InvoiceList>),
        (status = 400, description = "Invalid date range"),
        (status = 403, description = "Shop belongs to another user")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InvoiceListQuery>,
) -> AppResult<Json<ApiResponse<InvoiceList>>> {
    let resp = invoice_service::list_invoices(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Totals for one shop", body = ApiResponse<InvoiceStats>),
        (status = 400, description = "No shop selected")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn invoice_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<ApiResponse<InvoiceStats>>> {
    let resp = invoice_service::invoice_stats(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice with its line items", body = ApiResponse<InvoiceWithItems>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<InvoiceWithItems>>> {
    let resp = invoice_service::get_invoice(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = InvoicePayload,
    responses(
        (status = 201, description = "Invoice created, with a refreshed token", body = ApiResponse<InvoiceSaved>),
        (status = 400, description = "Invalid invoice"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InvoicePayload>,
) -> AppResult<(StatusCode, Json<ApiResponse<InvoiceSaved>>)> {
    let resp = invoice_service::create_invoice(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}",
    params(("id" = i32, Path, description = "Invoice ID")),
    request_body = InvoicePayload,
    responses(
        (status = 200, description = "Invoice replaced, with a refreshed token", body = ApiResponse<InvoiceSaved>),
        (status = 400, description = "Invalid invoice"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<InvoicePayload>,
) -> AppResult<Json<ApiResponse<InvoiceSaved>>> {
    let resp = invoice_service::update_invoice(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/v1/invoices/{id}/paid",
    params(("id" = i32, Path, description = "Invoice ID")),
    request_body = SetPaidRequest,
    responses(
        (status = 200, description = "Payment status changed", body = ApiResponse<Invoice>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn set_paid(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<SetPaidRequest>,
) -> AppResult<Json<ApiResponse<Invoice>>> {
    let resp = invoice_service::set_paid(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{id}",
    params(("id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice deleted, with a refreshed token", body = ApiResponse<InvoiceDeleted>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<InvoiceDeleted>>> {
    let resp = invoice_service::delete_invoice(&state, &user, id).await?;
    Ok(Json(resp))
}
