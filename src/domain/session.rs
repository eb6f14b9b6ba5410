//! The host framework's side of the provider contract.
//!
//! These are the shapes the host hands to each lifecycle hook and expects
//! back. Amounts are major units; `data` is an opaque JSON object the host
//! stores with its payment session and passes back on every later call.

use super::amount::{Amount, Currency};
use super::intent::{IntentStatus, PaymentIntent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Opaque session data owned by the provider and stored by the host.
pub type PaymentData = Map<String, Value>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSessionStatus {
    Authorized,
    Captured,
    Pending,
    RequiresMore,
    Error,
    Canceled,
}

impl PaymentSessionStatus {
    pub fn from_intent(intent: &PaymentIntent) -> Self {
        match intent.status {
            IntentStatus::RequiresPaymentMethod if intent.last_payment_error.is_some() => {
                Self::Error
            }
            IntentStatus::RequiresPaymentMethod
            | IntentStatus::RequiresConfirmation
            | IntentStatus::Processing => Self::Pending,
            IntentStatus::RequiresAction => Self::RequiresMore,
            IntentStatus::RequiresCapture => Self::Authorized,
            IntentStatus::Succeeded => Self::Captured,
            IntentStatus::Canceled => Self::Canceled,
            IntentStatus::Unknown => Self::Pending,
        }
    }

    /// Whether the host may complete the cart with this status.
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized | Self::Captured)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct PaymentContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct InitiatePaymentInput {
    pub amount: Amount,
    pub currency_code: Currency,
    #[serde(default)]
    pub context: PaymentContext,
    #[serde(default)]
    pub data: PaymentData,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct UpdatePaymentInput {
    pub amount: Amount,
    pub currency_code: Currency,
    #[serde(default)]
    pub context: PaymentContext,
    #[serde(default)]
    pub data: PaymentData,
}

/// Input for hooks that only act on an existing session.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct PaymentProviderInput {
    #[serde(default)]
    pub data: PaymentData,
    #[serde(default)]
    pub context: PaymentContext,
}

impl PaymentProviderInput {
    pub fn new(data: PaymentData) -> Self {
        Self {
            data,
            context: PaymentContext::default(),
        }
    }

    /// Input pointing at the vendor intent with the given id.
    pub fn for_intent(intent_id: &str) -> Self {
        let mut data = PaymentData::new();
        data.insert("id".to_string(), Value::String(intent_id.to_string()));
        Self::new(data)
    }

    pub fn intent_id(&self) -> Option<&str> {
        intent_id(&self.data)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RefundPaymentInput {
    #[serde(default)]
    pub data: PaymentData,
    pub amount: Amount,
    #[serde(default)]
    pub context: PaymentContext,
}

impl RefundPaymentInput {
    pub fn intent_id(&self) -> Option<&str> {
        intent_id(&self.data)
    }
}

/// Reads the vendor intent id out of stored session data.
pub fn intent_id(data: &PaymentData) -> Option<&str> {
    data.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct PaymentProviderOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub data: PaymentData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentSessionStatus>,
}

impl PaymentProviderOutput {
    /// Output carrying the intent as session data, without a status.
    pub fn from_intent(intent: &PaymentIntent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Some(intent.id.clone()),
            data: to_data(intent)?,
            status: None,
        })
    }

    /// Output carrying the intent as session data along with its mapped status.
    pub fn with_status(intent: &PaymentIntent) -> Result<Self, serde_json::Error> {
        let mut output = Self::from_intent(intent)?;
        output.status = Some(PaymentSessionStatus::from_intent(intent));
        Ok(output)
    }
}

/// Serializes any vendor object into session data.
pub fn to_data<T: Serialize>(value: &T) -> Result<PaymentData, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = PaymentData::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentActions {
    Authorized,
    Captured,
    NotSupported,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WebhookActionData {
    pub session_id: String,
    pub amount: Decimal,
}

/// What the host should do with its session after a webhook.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WebhookActionResult {
    pub action: PaymentActions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<WebhookActionData>,
}

impl WebhookActionResult {
    pub fn not_supported() -> Self {
        Self {
            action: PaymentActions::NotSupported,
            data: None,
        }
    }

    pub fn new(action: PaymentActions, session_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            action,
            data: Some(WebhookActionData {
                session_id: session_id.into(),
                amount,
            }),
        }
    }
}

/// A webhook as received by the host: parsed body, raw body, and headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderWebhookPayload {
    pub data: Value,
    pub raw_data: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl ProviderWebhookPayload {
    /// Builds a payload from the raw request body, parsing it as JSON.
    pub fn from_raw(
        raw_data: Vec<u8>,
        headers: HashMap<String, String>,
    ) -> Result<Self, serde_json::Error> {
        let data = serde_json::from_slice(&raw_data)?;
        Ok(Self {
            data,
            raw_data,
            headers,
        })
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
