mod common;

use common::{initiate_input, intent_json, options};
use paybridge::application::provider::IntentsPaymentProvider;
use paybridge::config::ProviderOptions;
use paybridge::domain::intent::{
    CaptureMethod, CreateIntentParams, CreateRefundParams, IntentStatus, RefundStatus,
    UpdateIntentParams,
};
use paybridge::domain::ports::{PaymentGateway, PaymentProvider};
use paybridge::domain::session::{PaymentProviderInput, PaymentSessionStatus};
use paybridge::error::GatewayError;
use paybridge::infrastructure::http::HttpGateway;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> HttpGateway {
    HttpGateway::new(
        Url::parse(&server.uri()).unwrap(),
        "sk_test_integration",
        Duration::from_secs(5),
    )
    .unwrap()
}

fn server_options(server: &MockServer) -> ProviderOptions {
    let mut options = options(false);
    options.base_url = server.uri();
    options
}

#[tokio::test]
async fn test_create_intent_sends_auth_and_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_integration"))
        .and(header("idempotency-key", "cart_1"))
        .and(body_json(json!({
            "amount": 1999,
            "currency": "usd",
            "capture_method": "manual",
            "metadata": { "session_id": "payses_1" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(intent_json("pi_1", "requires_capture", 1999)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let params = CreateIntentParams {
        amount: 1999,
        currency: "usd".to_string(),
        capture_method: CaptureMethod::Manual,
        customer: None,
        description: None,
        receipt_email: None,
        metadata: HashMap::from([("session_id".to_string(), "payses_1".to_string())]),
    };
    let intent = gateway(&server)
        .create_intent(params, Some("cart_1"))
        .await
        .unwrap();

    assert_eq!(intent.id, "pi_1");
    assert_eq!(intent.status, IntentStatus::RequiresCapture);
}

#[tokio::test]
async fn test_vendor_error_envelope_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "resource_missing",
                "message": "No such payment_intent: 'pi_missing'"
            }
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .retrieve_intent("pi_missing")
        .await
        .unwrap_err();

    match err {
        GatewayError::Vendor { status, error } => {
            assert_eq!(status, 404);
            assert_eq!(error.code.as_deref(), Some("resource_missing"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreadable_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_1/cancel"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = gateway(&server).cancel_intent("pi_1", None).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::UnexpectedResponse { status: 502, ref body } if body == "Bad Gateway"
    ));
}

#[tokio::test]
async fn test_update_intent_sends_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_1"))
        .and(header("idempotency-key", "upd_1"))
        .and(body_json(json!({ "amount": 2500, "customer": "cus_9" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(intent_json("pi_1", "requires_capture", 2500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let params = UpdateIntentParams {
        amount: Some(2500),
        customer: Some("cus_9".to_string()),
        ..Default::default()
    };
    let intent = gateway(&server)
        .update_intent("pi_1", params, Some("upd_1"))
        .await
        .unwrap();
    assert_eq!(intent.amount, 2500);
}

#[tokio::test]
async fn test_retrieve_intent_is_an_authenticated_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_3"))
        .and(header("authorization", "Bearer sk_test_integration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("pi_3", "processing", 300)))
        .expect(1)
        .mount(&server)
        .await;

    let intent = gateway(&server).retrieve_intent("pi_3").await.unwrap();
    assert_eq!(intent.id, "pi_3");
    assert_eq!(intent.status, IntentStatus::Processing);
}

#[tokio::test]
async fn test_partial_capture_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_1/capture"))
        .and(body_json(json!({ "amount_to_capture": 500 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("pi_1", "succeeded", 500)))
        .expect(1)
        .mount(&server)
        .await;

    let intent = gateway(&server)
        .capture_intent("pi_1", Some(500), None)
        .await
        .unwrap();
    assert_eq!(intent.amount_received, 500);
}

#[tokio::test]
async fn test_create_refund() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/refunds"))
        .and(body_json(json!({ "payment_intent": "pi_1", "amount": 250 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "re_1",
            "amount": 250,
            "currency": "usd",
            "payment_intent": "pi_1",
            "status": "pending"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let refund = gateway(&server)
        .create_refund(
            CreateRefundParams {
                payment_intent: "pi_1".to_string(),
                amount: Some(250),
                reason: None,
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(refund.status, RefundStatus::Pending);
}

#[tokio::test]
async fn test_provider_over_http_initiate_and_capture() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(intent_json("pi_42", "requires_capture", 4200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_42/capture"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_json("pi_42", "succeeded", 4200)))
        .expect(1)
        .mount(&server)
        .await;

    let options = server_options(&server);
    let provider =
        IntentsPaymentProvider::new(Box::new(HttpGateway::from_options(&options).unwrap()), options);

    let session = provider
        .initiate_payment(initiate_input(dec!(42), "usd", "payses_1"))
        .await
        .unwrap();
    assert_eq!(session.id.as_deref(), Some("pi_42"));
    assert_eq!(session.status, Some(PaymentSessionStatus::Authorized));

    let captured = provider
        .capture_payment(PaymentProviderInput::new(session.data))
        .await
        .unwrap();
    assert_eq!(captured.status, Some(PaymentSessionStatus::Captured));
}

#[tokio::test]
async fn test_provider_recovers_already_captured_intent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents/pi_7/capture"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "payment_intent_unexpected_state",
                "message": "This PaymentIntent has already been captured.",
                "payment_intent": intent_json("pi_7", "succeeded", 700)
            }
        })))
        .mount(&server)
        .await;

    let options = server_options(&server);
    let provider =
        IntentsPaymentProvider::new(Box::new(HttpGateway::from_options(&options).unwrap()), options);

    let output = provider
        .capture_payment(PaymentProviderInput::for_intent("pi_7"))
        .await
        .unwrap();
    assert_eq!(output.status, Some(PaymentSessionStatus::Captured));
}

#[tokio::test]
async fn test_provider_error_shape_for_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let options = server_options(&server);
    let provider =
        IntentsPaymentProvider::new(Box::new(HttpGateway::from_options(&options).unwrap()), options);

    let err = provider
        .retrieve_payment(PaymentProviderInput::for_intent("pi_1"))
        .await
        .unwrap_err();
    assert_eq!(err.code, "unknown");
    assert!(err.detail.contains("oops"));
}
