use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, Func},
};

use crate::{
    audit,
    db::OrmConn,
    dto::invoices::{
        InvoiceDeleted, InvoiceItemInput, InvoiceList, InvoicePayload, InvoiceSaved,
        InvoiceStats, InvoiceWithItems, SetPaidRequest,
    },
    entity::{
        invoice_items::{ActiveModel as ItemActive, Column as ItemCol, Entity as InvoiceItems},
        invoices::{
            ActiveModel as InvoiceActive, Column as InvoiceCol, Entity as Invoices,
            Model as InvoiceModel,
        },
        shops::{Column as ShopCol, Entity as Shops, Model as ShopModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Invoice, InvoiceItem},
    pricing::{MAX_AMOUNT, MAX_QUANTITY, MONEY_SCALE, QUANTITY_SCALE, invoice_total, line_sum},
    response::{ApiResponse, Meta},
    routes::params::{InvoiceListQuery, InvoiceSortBy, SortOrder, StatsQuery},
    services::token_service::refresh_token,
    state::AppState,
};

/// A validated line item with its computed sum.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedItem {
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub sum: Decimal,
}

pub fn price_items(items: &[InvoiceItemInput]) -> AppResult<Vec<PricedItem>> {
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "Invoice must contain at least one item".into(),
        ));
    }

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let name = item.name.trim();
            if name.is_empty() {
                return Err(AppError::BadRequest(format!("Item {} has no name", idx + 1)));
            }
            if item.quantity <= Decimal::ZERO {
                return Err(AppError::BadRequest(format!(
                    "Item {} must have a positive quantity",
                    idx + 1
                )));
            }
            if item.price < Decimal::ZERO {
                return Err(AppError::BadRequest(format!(
                    "Item {} must not have a negative price",
                    idx + 1
                )));
            }
            if item.quantity.normalize().scale() > QUANTITY_SCALE {
                return Err(AppError::BadRequest(format!(
                    "Item {} quantity has more than {QUANTITY_SCALE} decimal places",
                    idx + 1
                )));
            }
            if item.price.normalize().scale() > MONEY_SCALE {
                return Err(AppError::BadRequest(format!(
                    "Item {} price has more than {MONEY_SCALE} decimal places",
                    idx + 1
                )));
            }
            let out_of_range =
                || AppError::BadRequest(format!("Item {} amount is out of range", idx + 1));
            if item.quantity > MAX_QUANTITY || item.price > MAX_AMOUNT {
                return Err(out_of_range());
            }
            let sum = line_sum(item.quantity, item.price).ok_or_else(out_of_range)?;
            Ok(PricedItem {
                name: name.to_string(),
                quantity: item.quantity,
                price: item.price,
                sum,
            })
        })
        .collect()
}

fn priced_total(items: &[PricedItem]) -> AppResult<Decimal> {
    invoice_total(items.iter().map(|item| item.sum))
        .ok_or_else(|| AppError::BadRequest("Invoice total is out of range".into()))
}

fn validate_contact(contact: &str) -> AppResult<String> {
    let contact = contact.trim();
    if contact.is_empty() {
        return Err(AppError::BadRequest("Contact is required".into()));
    }
    Ok(contact.to_string())
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// A date-only `created_at` keeps the current time of day so invoices entered
/// on the same date still order by entry.
fn timestamp_for(date: Option<NaiveDate>, now: DateTime<Utc>) -> DateTime<Utc> {
    match date {
        Some(date) => date.and_time(now.time()).and_utc(),
        None => now,
    }
}

/// Load the shop and check the caller may write to it.
pub async fn ensure_shop_access(
    orm: &OrmConn,
    user: &AuthUser,
    shop_id: i32,
) -> AppResult<ShopModel> {
    let shop = Shops::find_by_id(shop_id)
        .one(orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if shop.owner_id != user.user_id && !user.is_superuser {
        return Err(AppError::Forbidden);
    }
    Ok(shop)
}

async fn find_accessible_invoice(
    orm: &OrmConn,
    user: &AuthUser,
    id: i32,
) -> AppResult<InvoiceModel> {
    let invoice = Invoices::find_by_id(id)
        .one(orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_shop_access(orm, user, invoice.shop_id).await?;
    Ok(invoice)
}

async fn load_items(orm: &OrmConn, invoice_id: i32) -> AppResult<Vec<InvoiceItem>> {
    let items = InvoiceItems::find()
        .filter(ItemCol::InvoiceId.eq(invoice_id))
        .order_by_asc(ItemCol::Position)
        .all(orm)
        .await?
        .into_iter()
        .map(InvoiceItem::from)
        .collect();
    Ok(items)
}

async fn insert_items(
    txn: &DatabaseTransaction,
    invoice_id: i32,
    items: &[PricedItem],
) -> AppResult<Vec<InvoiceItem>> {
    let mut saved = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let model = ItemActive {
            invoice_id: Set(invoice_id),
            position: Set(position as i32),
            name: Set(item.name.clone()),
            quantity: Set(item.quantity),
            price: Set(item.price),
            sum: Set(item.sum),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        saved.push(InvoiceItem::from(model));
    }
    Ok(saved)
}

pub async fn list_invoices(
    state: &AppState,
    user: &AuthUser,
    query: InvoiceListQuery,
) -> AppResult<ApiResponse<InvoiceList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    match query.shop_id {
        Some(shop_id) => {
            ensure_shop_access(&state.orm, user, shop_id).await?;
            condition = condition.add(InvoiceCol::ShopId.eq(shop_id));
        }
        None if !user.is_superuser => {
            let owned: Vec<i32> = Shops::find()
                .select_only()
                .column(ShopCol::Id)
                .filter(ShopCol::OwnerId.eq(user.user_id))
                .into_tuple()
                .all(&state.orm)
                .await?;
            condition = condition.add(InvoiceCol::ShopId.is_in(owned));
        }
        None => {}
    }

    if let Some(is_paid) = query.is_paid {
        condition = condition.add(InvoiceCol::IsPaid.eq(is_paid));
    }

    if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
        if from > to {
            return Err(AppError::BadRequest(
                "date_from must not be after date_to".into(),
            ));
        }
    }
    if let Some(from) = query.date_from {
        condition = condition.add(InvoiceCol::CreatedAt.gte(start_of_day(from)));
    }
    if let Some(to) = query.date_to {
        condition =
            condition.add(InvoiceCol::CreatedAt.lt(start_of_day(to) + Duration::days(1)));
    }

    if let Some(contact) = query.contact.as_ref().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        let pattern = format!("%{}%", contact.to_lowercase());
        condition = condition
            .add(Expr::expr(Func::lower(Expr::col(InvoiceCol::ContactInfo))).like(pattern));
    }

    if let Some(min_total) = query.min_total {
        condition = condition.add(InvoiceCol::TotalAmount.gte(min_total));
    }
    if let Some(max_total) = query.max_total {
        condition = condition.add(InvoiceCol::TotalAmount.lte(max_total));
    }

    let sort_by = query.sort_by.unwrap_or(InvoiceSortBy::CreatedAt);
    let order = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => sea_orm::Order::Asc,
        SortOrder::Desc => sea_orm::Order::Desc,
    };
    let sort_col = match sort_by {
        InvoiceSortBy::CreatedAt => InvoiceCol::CreatedAt,
        InvoiceSortBy::Total => InvoiceCol::TotalAmount,
        InvoiceSortBy::Contact => InvoiceCol::ContactInfo,
        InvoiceSortBy::Id => InvoiceCol::Id,
    };

    let mut finder = Invoices::find()
        .filter(condition)
        .order_by(sort_col, order.clone());
    if sort_by != InvoiceSortBy::Id {
        finder = finder.order_by(InvoiceCol::Id, order);
    }

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Invoice::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Invoices", InvoiceList { items }, Some(meta)))
}

pub async fn get_invoice(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<InvoiceWithItems>> {
    let invoice = find_accessible_invoice(&state.orm, user, id).await?;
    let items = load_items(&state.orm, invoice.id).await?;

    Ok(ApiResponse::success(
        "OK",
        InvoiceWithItems {
            invoice: invoice.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn create_invoice(
    state: &AppState,
    user: &AuthUser,
    payload: InvoicePayload,
) -> AppResult<ApiResponse<InvoiceSaved>> {
    let shop_id = payload
        .shop_id
        .or(user.current_shop_id)
        .ok_or_else(|| AppError::BadRequest("No shop selected for the invoice".into()))?;
    ensure_shop_access(&state.orm, user, shop_id).await?;

    let contact = validate_contact(&payload.contact_info)?;
    let priced = price_items(&payload.items)?;
    let total = priced_total(&priced)?;
    let now = Utc::now();

    let txn = state.orm.begin().await?;

    let invoice = InvoiceActive {
        shop_id: Set(shop_id),
        user_id: Set(user.user_id),
        contact_info: Set(contact),
        additional_info: Set(payload.additional_info.filter(|s| !s.trim().is_empty())),
        total_amount: Set(total),
        is_paid: Set(payload.is_paid),
        created_at: Set(timestamp_for(payload.created_at, now).into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let items = insert_items(&txn, invoice.id, &priced).await?;

    txn.commit().await?;

    tracing::info!(invoice_id = invoice.id, shop_id, total = %total, "invoice created");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "invoice_create",
        "invoices",
        serde_json::json!({ "invoice_id": invoice.id, "shop_id": shop_id }),
    )
    .await;

    let new_token = refresh_token(&state.orm, &state.keys, user.into(), state.token_ttl).await?;

    Ok(ApiResponse::success(
        "Invoice created",
        InvoiceSaved {
            invoice: invoice.into(),
            items,
            new_token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_invoice(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: InvoicePayload,
) -> AppResult<ApiResponse<InvoiceSaved>> {
    let existing = find_accessible_invoice(&state.orm, user, id).await?;

    let shop_id = payload.shop_id.unwrap_or(existing.shop_id);
    if shop_id != existing.shop_id {
        ensure_shop_access(&state.orm, user, shop_id).await?;
    }

    let contact = validate_contact(&payload.contact_info)?;
    let priced = price_items(&payload.items)?;
    let total = priced_total(&priced)?;
    let now = Utc::now();

    let txn = state.orm.begin().await?;

    let original_created = existing.created_at.with_timezone(&Utc);
    let mut active: InvoiceActive = existing.into();
    active.shop_id = Set(shop_id);
    active.contact_info = Set(contact);
    active.additional_info = Set(payload.additional_info.filter(|s| !s.trim().is_empty()));
    active.total_amount = Set(total);
    active.is_paid = Set(payload.is_paid);
    if let Some(date) = payload.created_at {
        if date != original_created.date_naive() {
            active.created_at = Set(timestamp_for(Some(date), original_created).into());
        }
    }
    active.updated_at = Set(now.into());
    let invoice = active.update(&txn).await?;

    InvoiceItems::delete_many()
        .filter(ItemCol::InvoiceId.eq(invoice.id))
        .exec(&txn)
        .await?;
    let items = insert_items(&txn, invoice.id, &priced).await?;

    txn.commit().await?;

    tracing::info!(invoice_id = invoice.id, total = %total, "invoice updated");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "invoice_update",
        "invoices",
        serde_json::json!({ "invoice_id": invoice.id }),
    )
    .await;

    let new_token = refresh_token(&state.orm, &state.keys, user.into(), state.token_ttl).await?;

    Ok(ApiResponse::success(
        "Invoice updated",
        InvoiceSaved {
            invoice: invoice.into(),
            items,
            new_token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn set_paid(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: SetPaidRequest,
) -> AppResult<ApiResponse<Invoice>> {
    let existing = find_accessible_invoice(&state.orm, user, id).await?;

    let mut active: InvoiceActive = existing.into();
    active.is_paid = Set(payload.is_paid);
    active.updated_at = Set(Utc::now().into());
    let invoice = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "invoice_payment",
        "invoices",
        serde_json::json!({ "invoice_id": invoice.id, "is_paid": invoice.is_paid }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment status updated",
        invoice.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_invoice(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<InvoiceDeleted>> {
    let existing = find_accessible_invoice(&state.orm, user, id).await?;

    let txn = state.orm.begin().await?;
    InvoiceItems::delete_many()
        .filter(ItemCol::InvoiceId.eq(existing.id))
        .exec(&txn)
        .await?;
    Invoices::delete_by_id(existing.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(invoice_id = id, "invoice deleted");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "invoice_delete",
        "invoices",
        serde_json::json!({ "invoice_id": id }),
    )
    .await;

    let new_token = refresh_token(&state.orm, &state.keys, user.into(), state.token_ttl).await?;

    Ok(ApiResponse::success(
        "Invoice deleted",
        InvoiceDeleted { id, new_token },
        Some(Meta::empty()),
    ))
}

pub async fn invoice_stats(
    state: &AppState,
    user: &AuthUser,
    query: StatsQuery,
) -> AppResult<ApiResponse<InvoiceStats>> {
    let shop_id = query
        .shop_id
        .or(user.current_shop_id)
        .ok_or_else(|| AppError::BadRequest("No shop selected".into()))?;
    ensure_shop_access(&state.orm, user, shop_id).await?;

    let rows: Vec<(Decimal, bool)> = Invoices::find()
        .select_only()
        .column(InvoiceCol::TotalAmount)
        .column(InvoiceCol::IsPaid)
        .filter(InvoiceCol::ShopId.eq(shop_id))
        .into_tuple()
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Invoice stats",
        summarize(shop_id, &rows),
        Some(Meta::empty()),
    ))
}

fn summarize(shop_id: i32, rows: &[(Decimal, bool)]) -> InvoiceStats {
    let mut stats = InvoiceStats {
        shop_id,
        count: 0,
        paid_count: 0,
        unpaid_count: 0,
        total_amount: Decimal::ZERO,
        paid_amount: Decimal::ZERO,
        unpaid_amount: Decimal::ZERO,
    };
    for (amount, is_paid) in rows {
        stats.count += 1;
        stats.total_amount += amount;
        if *is_paid {
            stats.paid_count += 1;
            stats.paid_amount += amount;
        } else {
            stats.unpaid_count += 1;
            stats.unpaid_amount += amount;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(name: &str, quantity: &str, price: &str) -> InvoiceItemInput {
        InvoiceItemInput {
            name: name.into(),
            quantity: d(quantity),
            price: d(price),
        }
    }

    #[test]
    fn prices_every_line() {
        let priced = price_items(&[item(" Bread ", "2", "1.25"), item("Milk", "1.5", "0.99")])
            .unwrap();
        assert_eq!(priced[0].name, "Bread");
        assert_eq!(priced[0].sum, d("2.50"));
        assert_eq!(priced[1].sum, d("1.49"));
        assert_eq!(priced_total(&priced).unwrap(), d("3.99"));
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(price_items(&[]).is_err());
        assert!(price_items(&[item("x", "0", "1")]).is_err());
        assert!(price_items(&[item("x", "1", "-1")]).is_err());
        assert!(price_items(&[item("  ", "1", "1")]).is_err());
        assert!(price_items(&[item("free", "1", "0")]).is_ok());
    }

    #[test]
    fn huge_amounts_are_a_bad_request() {
        let err = price_items(&[item("x", "79228162514264337593543950335", "2")]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Item 1 amount is out of range"));

        let err = price_items(&[item("a", "1", "1"), item("b", "1000000", "1000000")]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Item 2 amount is out of range"));

        let priced = price_items(&[item("a", "1", "999999999999.99"), item("b", "1", "1")]).unwrap();
        assert!(matches!(priced_total(&priced), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn scale_must_fit_the_columns() {
        assert!(price_items(&[item("x", "3", "1.005")]).is_err());
        assert!(price_items(&[item("x", "0.0005", "1")]).is_err());

        let priced = price_items(&[item("x", "0.125", "1.500")]).unwrap();
        assert_eq!(priced[0].sum, d("0.19"));
        assert_eq!(priced[0].sum, crate::pricing::round_money(priced[0].quantity * priced[0].price));
    }

    #[test]
    fn summarize_splits_paid_and_unpaid() {
        let stats = summarize(
            4,
            &[(d("10.00"), true), (d("5.50"), false), (d("1.25"), true)],
        );
        assert_eq!(stats.count, 3);
        assert_eq!(stats.paid_count, 2);
        assert_eq!(stats.unpaid_count, 1);
        assert_eq!(stats.total_amount, d("16.75"));
        assert_eq!(stats.paid_amount, d("11.25"));
        assert_eq!(stats.unpaid_amount, d("5.50"));
    }

    #[test]
    fn date_only_timestamp_keeps_time_of_day() {
        let now = DateTime::parse_from_rfc3339("2025-03-10T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let ts = timestamp_for(Some(date), now);
        assert_eq!(ts.date_naive(), date);
        assert_eq!(ts.time(), now.time());
        assert_eq!(timestamp_for(None, now), now);
    }
}
