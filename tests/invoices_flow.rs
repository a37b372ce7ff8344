mod common;

use invoice_backend::{
    dto::{invoices::SetPaidRequest, shops::CreateShopRequest},
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{InvoiceListQuery, InvoiceSortBy, SortOrder, StatsQuery},
    services::{invoice_service, shop_service, token_service::decode_token},
    state::AppState,
};

use common::{caller, d, item, payload, register, setup_state};

/// Register `login`, open a shop for them and return the refreshed caller.
async fn operator_with_shop(state: &AppState, login: &str) -> anyhow::Result<AuthUser> {
    let token = register(state, login, "secret123").await?;
    let user = caller(state, &token).await?;
    let created = shop_service::create_shop(
        state,
        &user,
        CreateShopRequest {
            name: format!("{login} store"),
            address: Some("Main street 1".into()),
        },
    )
    .await?
    .data
    .expect("shop");
    caller(state, &created.new_token).await
}

#[tokio::test]
async fn create_and_update_keep_total_in_sync() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = operator_with_shop(&state, "ivan").await?;
    let shop_id = user.current_shop_id.expect("current shop");

    let saved = invoice_service::create_invoice(
        &state,
        &user,
        payload(
            "ACME Ltd",
            vec![item("Nails", "3", "0.333"), item("Hammer", "1", "12.50")],
        ),
    )
    .await?
    .data
    .expect("saved");

    assert_eq!(saved.invoice.shop_id, shop_id);
    assert_eq!(saved.items.len(), 2);
    assert_eq!(saved.items[0].position, 0);
    assert_eq!(saved.items[0].sum, d("1.00"));
    let sum: rust_decimal::Decimal = saved.items.iter().map(|i| i.sum).sum();
    assert_eq!(saved.invoice.total_amount, sum);
    assert_eq!(saved.invoice.total_amount, d("13.50"));

    let claims = decode_token(&state.keys, &saved.new_token)?;
    assert_eq!(claims.last_invoice_id, Some(saved.invoice.id));

    let mut edit = payload("ACME Ltd.", vec![item("Glue", "2", "4.25")]);
    edit.is_paid = true;
    let updated = invoice_service::update_invoice(&state, &user, saved.invoice.id, edit)
        .await?
        .data
        .expect("updated");
    assert_eq!(updated.invoice.id, saved.invoice.id);
    assert_eq!(updated.invoice.contact_info, "ACME Ltd.");
    assert!(updated.invoice.is_paid);
    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.invoice.total_amount, d("8.50"));

    let fetched = invoice_service::get_invoice(&state, &user, saved.invoice.id)
        .await?
        .data
        .expect("invoice");
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].name, "Glue");
    assert_eq!(fetched.invoice.total_amount, d("8.50"));
    Ok(())
}

#[tokio::test]
async fn invalid_invoices_are_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let token = register(&state, "judy", "secret123").await?;
    let shopless = caller(&state, &token).await?;

    let no_shop =
        invoice_service::create_invoice(&state, &shopless, payload("X", vec![item("a", "1", "1")]))
            .await;
    assert!(matches!(no_shop, Err(AppError::BadRequest(_))));

    let user = operator_with_shop(&state, "ken").await?;
    for bad in [
        payload("", vec![item("a", "1", "1")]),
        payload("Client", vec![]),
        payload("Client", vec![item("a", "0", "1")]),
        payload("Client", vec![item("a", "1", "-2")]),
    ] {
        let result = invoice_service::create_invoice(&state, &user, bad).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
    Ok(())
}

#[tokio::test]
async fn list_filters_and_sorts() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = operator_with_shop(&state, "leo").await?;

    let mut ids = Vec::new();
    for (contact, price) in [("Blue Cafe", "30"), ("red bar", "5"), ("Bluebird Inn", "12")] {
        let saved = invoice_service::create_invoice(
            &state,
            &user,
            payload(contact, vec![item("Service", "1", price)]),
        )
        .await?
        .data
        .expect("saved");
        ids.push(saved.invoice.id);
    }
    invoice_service::set_paid(&state, &user, ids[1], SetPaidRequest { is_paid: true }).await?;

    let by_total = invoice_service::list_invoices(
        &state,
        &user,
        InvoiceListQuery {
            sort_by: Some(InvoiceSortBy::Total),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(by_total.meta.as_ref().and_then(|m| m.total), Some(3));
    let order: Vec<i32> = by_total.data.expect("list").items.iter().map(|i| i.id).collect();
    assert_eq!(order, vec![ids[1], ids[2], ids[0]]);

    let blue = invoice_service::list_invoices(
        &state,
        &user,
        InvoiceListQuery {
            contact: Some("BLUE".into()),
            sort_by: Some(InvoiceSortBy::Id),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("list");
    let order: Vec<i32> = blue.items.iter().map(|i| i.id).collect();
    assert_eq!(order, vec![ids[0], ids[2]]);

    let paid = invoice_service::list_invoices(
        &state,
        &user,
        InvoiceListQuery {
            is_paid: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("list");
    assert_eq!(paid.items.len(), 1);
    assert_eq!(paid.items[0].id, ids[1]);

    let page = invoice_service::list_invoices(
        &state,
        &user,
        InvoiceListQuery {
            page: Some(2),
            per_page: Some(2),
            sort_by: Some(InvoiceSortBy::Id),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("list");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, ids[2]);

    let stats = invoice_service::invoice_stats(&state, &user, StatsQuery::default())
        .await?
        .data
        .expect("stats");
    assert_eq!(stats.count, 3);
    assert_eq!(stats.paid_count, 1);
    assert_eq!(stats.paid_amount, d("5"));
    assert_eq!(stats.unpaid_amount, d("42"));
    assert_eq!(stats.total_amount, d("47"));
    Ok(())
}

#[tokio::test]
async fn other_operators_cannot_touch_foreign_invoices() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let owner = operator_with_shop(&state, "mia").await?;
    let stranger = operator_with_shop(&state, "nick").await?;

    let saved = invoice_service::create_invoice(
        &state,
        &owner,
        payload("Private", vec![item("Secret", "1", "9.99")]),
    )
    .await?
    .data
    .expect("saved");
    let id = saved.invoice.id;

    assert!(matches!(
        invoice_service::get_invoice(&state, &stranger, id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        invoice_service::delete_invoice(&state, &stranger, id).await,
        Err(AppError::Forbidden)
    ));

    let visible = invoice_service::list_invoices(&state, &stranger, InvoiceListQuery::default())
        .await?
        .data
        .expect("list");
    assert!(visible.items.is_empty());

    let foreign_shop = invoice_service::list_invoices(
        &state,
        &stranger,
        InvoiceListQuery {
            shop_id: owner.current_shop_id,
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(foreign_shop, Err(AppError::Forbidden)));

    assert!(matches!(
        invoice_service::get_invoice(&state, &owner, id + 100).await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn delete_moves_last_invoice_back() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = operator_with_shop(&state, "olga").await?;

    let first = invoice_service::create_invoice(
        &state,
        &user,
        payload("First", vec![item("A", "1", "1")]),
    )
    .await?
    .data
    .expect("saved");
    let second = invoice_service::create_invoice(
        &state,
        &user,
        payload("Second", vec![item("B", "1", "2")]),
    )
    .await?
    .data
    .expect("saved");
    assert_eq!(
        decode_token(&state.keys, &second.new_token)?.last_invoice_id,
        Some(second.invoice.id)
    );

    let deleted = invoice_service::delete_invoice(&state, &user, second.invoice.id)
        .await?
        .data
        .expect("deleted");
    assert_eq!(deleted.id, second.invoice.id);
    assert_eq!(
        decode_token(&state.keys, &deleted.new_token)?.last_invoice_id,
        Some(first.invoice.id)
    );

    assert!(matches!(
        invoice_service::get_invoice(&state, &user, second.invoice.id).await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

async fn listed_ids(
    state: &AppState,
    user: &AuthUser,
    query: InvoiceListQuery,
) -> anyhow::Result<Vec<i32>> {
    let resp = invoice_service::list_invoices(state, user, query).await?;
    Ok(resp.data.expect("list").items.iter().map(|i| i.id).collect())
}

#[tokio::test]
async fn list_filters_by_date_and_amount() -> anyhow::Result<()> {
    use chrono::NaiveDate;

    let state = setup_state().await?;
    let user = operator_with_shop(&state, "pia").await?;

    let mut ids = Vec::new();
    for (day, price) in [(1, "10"), (2, "20"), (4, "30"), (5, "40")] {
        let mut body = payload("Client", vec![item("Work", "1", price)]);
        body.created_at = NaiveDate::from_ymd_opt(2025, 3, day);
        let saved = invoice_service::create_invoice(&state, &user, body)
            .await?
            .data
            .expect("saved");
        ids.push(saved.invoice.id);
    }

    let by_id = || InvoiceListQuery {
        sort_by: Some(InvoiceSortBy::Id),
        sort_order: Some(SortOrder::Asc),
        ..Default::default()
    };

    let ranged = listed_ids(&state, &user, InvoiceListQuery {
        date_from: NaiveDate::from_ymd_opt(2025, 3, 2),
        date_to: NaiveDate::from_ymd_opt(2025, 3, 4),
        ..by_id()
    })
    .await?;
    assert_eq!(ranged, vec![ids[1], ids[2]]);

    let single_day = listed_ids(&state, &user, InvoiceListQuery {
        date_from: NaiveDate::from_ymd_opt(2025, 3, 5),
        date_to: NaiveDate::from_ymd_opt(2025, 3, 5),
        ..by_id()
    })
    .await?;
    assert_eq!(single_day, vec![ids[3]]);

    let amounts = listed_ids(&state, &user, InvoiceListQuery {
        min_total: Some(d("20")),
        max_total: Some(d("30")),
        ..by_id()
    })
    .await?;
    assert_eq!(amounts, vec![ids[1], ids[2]]);

    let reversed = invoice_service::list_invoices(
        &state,
        &user,
        InvoiceListQuery {
            date_from: NaiveDate::from_ymd_opt(2025, 3, 4),
            date_to: NaiveDate::from_ymd_opt(2025, 3, 1),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(reversed, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn equal_totals_keep_id_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = operator_with_shop(&state, "quinn").await?;

    let mut ids = Vec::new();
    for contact in ["A", "B", "C"] {
        let saved = invoice_service::create_invoice(
            &state,
            &user,
            payload(contact, vec![item("Same", "1", "7")]),
        )
        .await?
        .data
        .expect("saved");
        ids.push(saved.invoice.id);
    }

    for (order, expected) in [
        (SortOrder::Asc, vec![ids[0], ids[1], ids[2]]),
        (SortOrder::Desc, vec![ids[2], ids[1], ids[0]]),
    ] {
        for _ in 0..2 {
            let listed = invoice_service::list_invoices(
                &state,
                &user,
                InvoiceListQuery {
                    sort_by: Some(InvoiceSortBy::Total),
                    sort_order: Some(order),
                    ..Default::default()
                },
            )
            .await?
            .data
            .expect("list");
            let got: Vec<i32> = listed.items.iter().map(|i| i.id).collect();
            assert_eq!(got, expected);
        }
    }
    Ok(())
}

#[tokio::test]
async fn oversized_amounts_and_pages_are_handled() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = operator_with_shop(&state, "rita").await?;

    let huge = invoice_service::create_invoice(
        &state,
        &user,
        payload("Bulk", vec![item("x", "79228162514264337593543950335", "2")]),
    )
    .await;
    assert!(matches!(huge, Err(AppError::BadRequest(ref msg)) if msg == "Item 1 amount is out of range"));

    let fine_scale = invoice_service::create_invoice(
        &state,
        &user,
        payload("Bulk", vec![item("x", "3", "1.005")]),
    )
    .await;
    assert!(matches!(fine_scale, Err(AppError::BadRequest(_))));

    invoice_service::create_invoice(&state, &user, payload("Ok", vec![item("x", "1", "1")]))
        .await?;
    let far = invoice_service::list_invoices(
        &state,
        &user,
        InvoiceListQuery {
            page: Some(i64::MAX),
            ..Default::default()
        },
    )
    .await?;
    assert!(far.data.expect("list").items.is_empty());
    assert_eq!(far.meta.and_then(|m| m.total), Some(1));
    Ok(())
}
