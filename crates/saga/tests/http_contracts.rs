//! Order saga against mocked downstream HTTP services.

use std::time::Duration;

use saga::{
    GatewayClient, HttpInventoryService, HttpOrderLookupService, HttpPaymentService, LineItem,
    OrderSagaController, PlaceOrderRequest, SagaState, SagaStatus,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STOCKS: &str = "/store-manager-api/stocks";
const ORDER: &str = "/store-manager-api/orders/1001";
const PAYMENTS: &str = "/payments-api/payments";

fn controller(server: &MockServer, timeout: Duration) -> OrderSagaController {
    let gateway = GatewayClient::new(server.uri(), timeout).unwrap();
    OrderSagaController::with_services(
        HttpInventoryService::new(gateway.clone()),
        HttpOrderLookupService::new(gateway.clone()),
        HttpPaymentService::new(gateway),
    )
    .unwrap()
}

fn request() -> PlaceOrderRequest {
    PlaceOrderRequest {
        order_id: Some(1001),
        user_id: Some(42),
        items: Some(vec![LineItem::new(1, 2), LineItem::new(3, 1)]),
    }
}

fn stock_body(operation: &str) -> serde_json::Value {
    json!({
        "items": [
            {"product_id": 1, "quantity": 2},
            {"product_id": 3, "quantity": 1}
        ],
        "operation": operation
    })
}

#[tokio::test]
async fn test_all_services_succeed() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(STOCKS))
        .and(body_json(stock_body("-")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ORDER))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"order_id": 1001, "total_amount": 49.90})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PAYMENTS))
        .and(body_json(
            json!({"user_id": 42, "order_id": 1001, "total_amount": 49.90}),
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"payment_id": "pay_123"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = controller(&server, Duration::from_secs(5))
        .run(request())
        .await
        .unwrap();

    assert_eq!(result.status, SagaStatus::Ok);
    assert_eq!(result.state, SagaState::Completed);
    assert_eq!(result.payment_id.as_deref(), Some("pay_123"));
}

#[tokio::test]
async fn test_stock_conflict_makes_no_payment_call() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(STOCKS))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"error": "insufficient stock"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ORDER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_amount": 1.0})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PAYMENTS))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = controller(&server, Duration::from_secs(5))
        .run(request())
        .await
        .unwrap();

    assert_eq!(result.status, SagaStatus::Error);
    assert_eq!(result.state, SagaState::Cancelled);
    let error = result.error.unwrap();
    assert!(error.contains("409"));
    assert!(error.contains("insufficient stock"));
}

#[tokio::test]
async fn test_missing_total_restocks_once() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(STOCKS))
        .and(body_json(stock_body("-")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(STOCKS))
        .and(body_json(stock_body("+")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ORDER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"order_id": 1001})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PAYMENTS))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = controller(&server, Duration::from_secs(5))
        .run(request())
        .await
        .unwrap();

    assert_eq!(result.status, SagaStatus::Error);
    assert_eq!(result.state, SagaState::Cancelled);
    assert!(result.error.unwrap().contains("total_amount"));
}

#[tokio::test]
async fn test_plain_text_payment_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(STOCKS))
        .and(body_json(stock_body("-")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(STOCKS))
        .and(body_json(stock_body("+")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ORDER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_amount": "12.50"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PAYMENTS))
        .and(body_json(
            json!({"user_id": 42, "order_id": 1001, "total_amount": 12.5}),
        ))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let result = controller(&server, Duration::from_secs(5))
        .run(request())
        .await
        .unwrap();

    assert_eq!(result.state, SagaState::Cancelled);
    assert_eq!(
        result.error.as_deref(),
        Some("create payment returned status 502: Bad Gateway")
    );
}

#[tokio::test]
async fn test_slow_payment_times_out_and_restocks() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(STOCKS))
        .and(body_json(stock_body("-")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(STOCKS))
        .and(body_json(stock_body("+")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ORDER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_amount": 5})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PAYMENTS))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"payment_id": "late"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = controller(&server, Duration::from_millis(300))
        .run(request())
        .await
        .unwrap();

    assert_eq!(result.status, SagaStatus::Error);
    assert_eq!(result.error.as_deref(), Some("create payment timed out"));
}

#[tokio::test]
async fn test_unreachable_gateway_cancels() {
    // Nothing listens on port 1.
    let gateway = GatewayClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
    let controller = OrderSagaController::with_services(
        HttpInventoryService::new(gateway.clone()),
        HttpOrderLookupService::new(gateway.clone()),
        HttpPaymentService::new(gateway),
    )
    .unwrap();

    let result = controller.run(request()).await.unwrap();

    assert_eq!(result.state, SagaState::Cancelled);
    assert!(result.error.unwrap().starts_with("decrease stock failed"));
}
