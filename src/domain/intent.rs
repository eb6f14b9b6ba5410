//! The vendor's data model: payment intents, refunds, and error envelopes.
//!
//! Amounts in this module are integer minor units, exactly as the vendor
//! sends and expects them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    #[default]
    Automatic,
    Manual,
}

/// The last failed charge attempt recorded on an intent.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct LastPaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub decline_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A vendor payment intent.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_capturable: i64,
    #[serde(default)]
    pub amount_received: i64,
    pub currency: String,
    pub status: IntentStatus,
    #[serde(default)]
    pub capture_method: CaptureMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_error: Option<LastPaymentError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub created: i64,
}

impl PaymentIntent {
    /// The host session this intent was created for, if it was tagged with one.
    pub fn session_id(&self) -> Option<&str> {
        self.metadata.get(SESSION_ID_METADATA_KEY).map(String::as_str)
    }
}

/// Metadata key linking an intent back to the host's payment session.
pub const SESSION_ID_METADATA_KEY: &str = "session_id";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub payment_intent: String,
    pub status: RefundStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body of a create-intent call.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CreateIntentParams {
    pub amount: i64,
    pub currency: String,
    pub capture_method: CaptureMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_email: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Body of an update-intent call. Unset fields are left untouched by the vendor.
#[derive(Debug, Serialize, PartialEq, Clone, Default)]
pub struct UpdateIntentParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Body of a create-refund call. Omitting `amount` refunds the full intent.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CreateRefundParams {
    pub payment_intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The `error` object the vendor returns with any non-2xx response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct VendorError {
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub decline_code: Option<String>,
    /// The intent in its current state, sent along with state errors.
    #[serde(default)]
    pub payment_intent: Option<Box<PaymentIntent>>,
}

impl VendorError {
    pub const UNEXPECTED_STATE: &'static str = "payment_intent_unexpected_state";
    pub const RESOURCE_MISSING: &'static str = "resource_missing";

    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            r#type: Some("invalid_request_error".to_string()),
            code: Some(code.to_string()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// True if this is a state error reporting the intent already sits in `status`.
    pub fn is_unexpected_state(&self, status: IntentStatus) -> bool {
        self.code.as_deref() == Some(Self::UNEXPECTED_STATE)
            && self
                .payment_intent
                .as_ref()
                .is_some_and(|intent| intent.status == status)
    }
}

impl fmt::Display for VendorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self
            .code
            .as_deref()
            .or(self.r#type.as_deref())
            .unwrap_or("unknown");
        match &self.message {
            Some(message) => write!(f, "{}: {}", code, message),
            None => f.write_str(code),
        }
    }
}

/// Wire wrapper around [`VendorError`].
#[derive(Debug, Serialize, Deserialize)]
pub struct VendorErrorEnvelope {
    pub error: VendorError,
}

/// An event delivered to the webhook endpoint.
///
/// `data.object` is left as raw JSON; its shape depends on `type`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    pub r#type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

pub mod event_types {
    pub const AMOUNT_CAPTURABLE_UPDATED: &str = "payment_intent.amount_capturable_updated";
    pub const SUCCEEDED: &str = "payment_intent.succeeded";
    pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_deserialization_defaults() {
        let json = r#"{"id":"pi_1","amount":1000,"currency":"usd","status":"requires_capture"}"#;
        let intent: PaymentIntent = serde_json::from_str(json).unwrap();

        assert_eq!(intent.status, IntentStatus::RequiresCapture);
        assert_eq!(intent.capture_method, CaptureMethod::Automatic);
        assert!(intent.metadata.is_empty());
        assert_eq!(intent.session_id(), None);
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let json = r#"{"id":"pi_1","amount":1000,"currency":"usd","status":"requires_source"}"#;
        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.status, IntentStatus::Unknown);
    }

    #[test]
    fn test_vendor_error_display() {
        let err = VendorError::new("resource_missing", "No such payment_intent: 'pi_x'");
        assert_eq!(
            err.to_string(),
            "resource_missing: No such payment_intent: 'pi_x'"
        );
        assert_eq!(VendorError::default().to_string(), "unknown");
    }

    #[test]
    fn test_update_params_skip_unset_fields() {
        let params = UpdateIntentParams {
            amount: Some(500),
            ..Default::default()
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({ "amount": 500 }));
    }
}
