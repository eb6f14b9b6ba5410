#![allow(dead_code)]

use paybridge::application::provider::IntentsPaymentProvider;
use paybridge::config::ProviderOptions;
use paybridge::domain::amount::{Amount, Currency};
use paybridge::domain::session::{InitiatePaymentInput, PaymentContext, PaymentData};
use paybridge::infrastructure::in_memory::InMemoryGateway;
use rust_decimal::Decimal;
use serde_json::{Value, json};

pub const WEBHOOK_SECRET: &str = "whsec_integration";

pub fn options(capture: bool) -> ProviderOptions {
    let mut options = ProviderOptions::new("sk_test_integration");
    options.capture = capture;
    options
}

pub fn provider(gateway: &InMemoryGateway, options: ProviderOptions) -> IntentsPaymentProvider {
    IntentsPaymentProvider::new(Box::new(gateway.clone()), options)
}

pub fn initiate_input(amount: Decimal, currency: &str, session_id: &str) -> InitiatePaymentInput {
    let mut data = PaymentData::new();
    data.insert("session_id".to_string(), json!(session_id));
    InitiatePaymentInput {
        amount: Amount::new(amount).unwrap(),
        currency_code: Currency::new(currency).unwrap(),
        context: PaymentContext::default(),
        data,
    }
}

/// A vendor intent as the API would return it.
pub fn intent_json(id: &str, status: &str, amount: i64) -> Value {
    json!({
        "id": id,
        "amount": amount,
        "amount_capturable": if status == "requires_capture" { amount } else { 0 },
        "amount_received": if status == "succeeded" { amount } else { 0 },
        "currency": "usd",
        "status": status,
        "capture_method": "manual",
        "metadata": { "session_id": "payses_1" },
        "created": 1_700_000_000
    })
}

pub fn webhook_event(event_type: &str, intent: Value) -> Value {
    json!({
        "id": "evt_1",
        "type": event_type,
        "data": { "object": intent }
    })
}
