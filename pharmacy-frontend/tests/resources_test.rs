mod common;

use common::{admin_session, api_path, logged_in, TestApp};
use pharmacy_frontend::models::pharmacy::{NewPayment, NewSale, NewStore, PaymentMethod, SaleUpdate};
use pharmacy_frontend::models::Route;
use pharmacy_frontend::ClientError;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn sale_json(approved: bool) -> serde_json::Value {
    json!({
        "id": 5,
        "store": 1,
        "medicine": "Amoxicillin",
        "quantity": 2,
        "price": "4.25",
        "total": "8.50",
        "date": "2024-05-02T08:30:00Z",
        "approved": approved
    })
}

#[tokio::test]
async fn create_store_posts_bearer_authenticated_json() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    Mock::given(method("POST"))
        .and(path(api_path("/store/")))
        .and(header("Authorization", "Bearer a"))
        .and(body_json(json!({ "name": "Central", "location": "Market square" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 3,
            "name": "Central",
            "location": "Market square",
            "owner": 8,
            "owner_username": "jane",
            "approved": false
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let store = app
        .state
        .stores()
        .create(&NewStore {
            name: "Central".into(),
            location: "Market square".into(),
        })
        .await
        .unwrap();

    assert_eq!(store.id, 3);
    assert_eq!(store.owner_username.as_deref(), Some("jane"));
    assert!(!store.approved);
}

#[tokio::test]
async fn invalid_sale_is_rejected_before_sending() {
    let app = TestApp::spawn(logged_in("a", "r")).await;

    let err = app
        .state
        .sales()
        .create(&NewSale {
            store: 1,
            medicine: "Amoxicillin".into(),
            quantity: 0,
            price: Decimal::new(425, 2),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(app.received_paths().await.is_empty());
}

#[tokio::test]
async fn toggle_approval_flips_current_flag() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    Mock::given(method("GET"))
        .and(path(api_path("/sales/5/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(sale_json(false)))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(api_path("/sales/5/")))
        .and(header("Authorization", "Bearer a"))
        .and(body_json(json!({ "approved": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(sale_json(true)))
        .expect(1)
        .mount(&app.server)
        .await;

    let sales = app.state.sales();
    let sale = sales.get(5).await.unwrap();
    assert_eq!(sale.total, Decimal::new(850, 2));

    let updated = sales.toggle_approved(&sale).await.unwrap();
    assert!(updated.approved);
}

#[tokio::test]
async fn partial_update_sends_only_changed_fields() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    Mock::given(method("PATCH"))
        .and(path(api_path("/sales/5/")))
        .and(body_json(json!({ "quantity": 4 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(sale_json(false)))
        .expect(1)
        .mount(&app.server)
        .await;

    let changes = SaleUpdate {
        quantity: Some(4),
        ..Default::default()
    };
    app.state.sales().update(5, &changes).await.unwrap();
}

#[tokio::test]
async fn payments_list_and_delete() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    Mock::given(method("GET"))
        .and(path(api_path("/payment/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "sale": 5,
            "amount": "8.50",
            "method": "card",
            "date": "2024-05-02T09:00:00Z",
            "approved": true
        }])))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(api_path("/payment/1/")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.server)
        .await;

    let payments = app.state.payments();
    let listed = payments.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].method, PaymentMethod::Card);
    assert_eq!(listed[0].amount, Decimal::new(850, 2));

    payments.delete(1).await.unwrap();
}

#[tokio::test]
async fn create_payment_serializes_method_lowercase() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    Mock::given(method("POST"))
        .and(path(api_path("/payment/")))
        .and(body_json(json!({ "sale": 5, "amount": "8.50", "method": "transfer" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 2,
            "sale": 5,
            "amount": "8.50",
            "method": "transfer",
            "date": "2024-05-02T09:05:00Z"
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let payment = app
        .state
        .payments()
        .create(&NewPayment {
            sale: 5,
            amount: Decimal::new(850, 2),
            method: PaymentMethod::Transfer,
        })
        .await
        .unwrap();

    assert_eq!(payment.id, 2);
    assert!(!payment.approved);
}

#[tokio::test]
async fn login_activity_is_listed() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    Mock::given(method("GET"))
        .and(path(api_path("/login-activity/")))
        .and(header("Authorization", "Bearer a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "user": 8, "username": "jane", "logged_in_at": "2024-05-01T07:00:00Z" },
            { "id": 2, "user": 1, "username": "admin", "logged_in_at": "2024-05-01T07:30:00Z" }
        ])))
        .expect(1)
        .mount(&app.server)
        .await;

    let entries = app.state.login_activity().list().await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].username, "admin");
    assert!(entries[0].logged_in_at < entries[1].logged_in_at);
}

#[tokio::test]
async fn unexpected_payload_is_an_invalid_response() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    Mock::given(method("GET"))
        .and(path(api_path("/store/")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&app.server)
        .await;

    let err = app.state.stores().list().await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

async fn mount_list(app: &TestApp, collection: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(api_path(collection)))
        .and(header("Authorization", "Bearer a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&app.server)
        .await;
}

#[tokio::test]
async fn admin_summary_totals_sales_and_payments() {
    let app = TestApp::spawn(admin_session("a")).await;
    mount_list(
        &app,
        "/store/",
        json!([{ "id": 1, "name": "Central", "location": "Market square", "approved": true }]),
    )
    .await;
    mount_list(&app, "/sales/", json!([sale_json(true), sale_json(false)])).await;
    mount_list(
        &app,
        "/payment/",
        json!([{
            "id": 1,
            "sale": 5,
            "amount": "8.50",
            "method": "cash",
            "date": "2024-05-02T09:00:00Z"
        }]),
    )
    .await;
    let logins: Vec<_> = (1..=6)
        .map(|id| {
            json!({
                "id": id,
                "user": 1,
                "username": format!("user{id}"),
                "logged_in_at": format!("2024-05-0{id}T07:00:00Z")
            })
        })
        .collect();
    mount_list(&app, "/login-activity/", json!(logins)).await;

    let summary = app.state.admin_summary().await.unwrap();

    assert_eq!(summary.stores, 1);
    assert_eq!(summary.sales, 2);
    assert_eq!(summary.payments, 1);
    assert_eq!(summary.total_sales, Decimal::new(1700, 2));
    assert_eq!(summary.total_payments, Decimal::new(850, 2));
    assert_eq!(summary.pending, Decimal::new(850, 2));
    assert_eq!(summary.recent_logins.len(), 5);
    assert_eq!(summary.recent_logins[0].username, "user1");
}

#[tokio::test]
async fn admin_summary_is_refused_for_regular_users() {
    let app = TestApp::spawn(logged_in("a", "r")).await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;

    let err = app.state.admin_summary().await.unwrap_err();

    assert!(matches!(err, ClientError::AccessDenied(Route::Dashboard)));
    assert!(app.received_paths().await.is_empty());
}
