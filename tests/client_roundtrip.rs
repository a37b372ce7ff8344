mod common;

use invoice_backend::{
    client::{ApiClient, ClientError, DraftRow, HistoryFilter, InvoiceDraft, InvoiceHistory},
    dto::{auth::RegisterRequest, shops::CreateShopRequest},
    routes::{create_app, params::InvoiceListQuery},
};

use common::{d, setup_state};

async fn spawn_server() -> anyhow::Result<String> {
    let state = setup_state().await?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, create_app(state)).await;
    });
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn operator_session_over_http() -> anyhow::Result<()> {
    let base = spawn_server().await?;
    let mut client = ApiClient::new(&base)?;

    assert!(matches!(client.me().await, Err(ClientError::NotAuthenticated)));

    client
        .register(&RegisterRequest {
            login: "pat".into(),
            email: "pat@example.com".into(),
            password: "secret123".into(),
            phone: None,
        })
        .await?;

    let mut stranger = ApiClient::new(&base)?;
    let bad = stranger.login("pat", "wrong-pass").await;
    assert!(matches!(bad, Err(ClientError::Unauthorized(_))));

    let shop = client
        .create_shop(&CreateShopRequest {
            name: "Pat's Kiosk".into(),
            address: None,
        })
        .await?;
    let session = client.session().expect("session");
    assert_eq!(session.current_shop_id(), Some(shop.id));
    assert_eq!(session.last_invoice_id(), None);

    let mut draft = InvoiceDraft::new(chrono::Utc::now().date_naive());
    draft.contact = "Walk-in".into();
    if let Some(row) = draft.row_mut(0) {
        row.name = "Tea".into();
        row.quantity = "2".into();
        row.price = "1,50".into();
    }
    assert_eq!(draft.total(), d("3.00"));
    let saved = client.create_invoice(&draft.collect(Some(shop.id))?).await?;
    assert_eq!(saved.invoice.total_amount, d("3.00"));
    assert_eq!(client.session().and_then(|s| s.last_invoice_id()), Some(saved.invoice.id));
    assert_eq!(
        InvoiceDraft::predicted_number(client.session().and_then(|s| s.last_invoice_id())),
        saved.invoice.id + 1
    );

    let paid = client.set_paid(saved.invoice.id, true).await?;
    assert!(paid.is_paid);

    let (invoices, meta) = client.list_invoices(&InvoiceListQuery::default()).await?;
    assert_eq!(meta.total, Some(1));
    let mut history = InvoiceHistory::new(Some(shop.id), None);
    history.load(&invoices);
    assert_eq!(history.last_invoice_id(), Some(saved.invoice.id));
    let filter = HistoryFilter {
        contact: Some("walk".into()),
        ..Default::default()
    };
    assert_eq!(history.search(&filter)?, 1);

    let mut newest = saved.invoice.id;
    for contact in ["Second", "Third"] {
        let mut extra = InvoiceDraft::new(chrono::Utc::now().date_naive());
        extra.contact = contact.into();
        if let Some(row) = extra.row_mut(0) {
            *row = DraftRow::new("Tea", "1", "1");
        }
        newest = client.create_invoice(&extra.collect(Some(shop.id))?).await?.invoice.id;
    }
    let one_per_page = InvoiceListQuery {
        per_page: Some(1),
        ..Default::default()
    };
    let (first_page, _) = client.list_invoices(&one_per_page).await?;
    assert_eq!(first_page.len(), 1);
    let everything = client.list_all_invoices(&one_per_page).await?;
    assert_eq!(everything.len(), 3);
    let mut seen: Vec<i32> = everything.iter().map(|i| i.id).collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 3);

    let profile = client.me().await?;
    assert_eq!(profile.user.login, "pat");
    assert_eq!(profile.current_shop_id, Some(shop.id));

    let stats = client.stats(None).await?;
    assert_eq!(stats.paid_count, 1);

    client.delete_invoice(saved.invoice.id).await?;
    assert_eq!(client.session().and_then(|s| s.last_invoice_id()), Some(newest));
    let missing = client.get_invoice(saved.invoice.id).await;
    assert!(matches!(missing, Err(ClientError::Api { status: 404, .. })));
    Ok(())
}
