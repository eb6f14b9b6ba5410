use crate::config::ProviderOptions;
use crate::domain::amount::Currency;
use crate::domain::intent::{PaymentIntent, WebhookEvent, event_types};
use crate::domain::ports::ProviderResult;
use crate::domain::session::{PaymentActions, ProviderWebhookPayload, WebhookActionResult};
use crate::error::ProviderError;
use crate::infrastructure::signature::{self, SIGNATURE_HEADER};
use std::time::Duration;

/// Turns vendor webhook deliveries into host session actions.
///
/// Only three intent events carry meaning for the host:
///
/// | event                                       | action       | amount              |
/// |---------------------------------------------|--------------|---------------------|
/// | `payment_intent.amount_capturable_updated`  | `authorized` | `amount_capturable` |
/// | `payment_intent.succeeded`                  | `captured`   | `amount_received`   |
/// | `payment_intent.payment_failed`             | `failed`     | `amount`            |
///
/// Everything else is `not_supported`. When a signing secret is configured the
/// signature header is checked before the body is looked at.
#[derive(Clone)]
pub struct WebhookDecoder {
    secret: Option<String>,
    tolerance: Duration,
}

impl WebhookDecoder {
    pub fn new(secret: Option<String>, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    pub fn from_options(options: &ProviderOptions) -> Self {
        Self::new(options.webhook_secret.clone(), options.webhook_tolerance())
    }

    /// Decodes a delivery into a session action.
    ///
    /// With a secret configured the event is read from the verified raw body,
    /// never from the pre-parsed `data`.
    pub fn decode(&self, payload: &ProviderWebhookPayload) -> ProviderResult<WebhookActionResult> {
        let event: WebhookEvent = match &self.secret {
            Some(secret) => {
                verify(payload, secret, self.tolerance)?;
                serde_json::from_slice(&payload.raw_data)
            }
            None => serde_json::from_value(payload.data.clone()),
        }
        .map_err(|e| invalid_payload(e.to_string()))?;

        let action = match event.r#type.as_str() {
            event_types::AMOUNT_CAPTURABLE_UPDATED => PaymentActions::Authorized,
            event_types::SUCCEEDED => PaymentActions::Captured,
            event_types::PAYMENT_FAILED => PaymentActions::Failed,
            other => {
                tracing::debug!(event_id = %event.id, event_type = other, "Ignoring webhook event");
                return Ok(WebhookActionResult::not_supported());
            }
        };

        let intent: PaymentIntent = serde_json::from_value(event.data.object)
            .map_err(|e| invalid_payload(format!("event object is not a payment intent: {}", e)))?;
        let currency =
            Currency::new(&intent.currency).map_err(|e| invalid_payload(e.to_string()))?;

        let minor = match action {
            PaymentActions::Authorized => intent.amount_capturable,
            PaymentActions::Captured => intent.amount_received,
            _ => intent.amount,
        };
        let session_id = intent.session_id().unwrap_or_default();

        tracing::info!(
            event_id = %event.id,
            intent_id = %intent.id,
            session_id,
            ?action,
            "Decoded webhook event"
        );

        Ok(WebhookActionResult::new(
            action,
            session_id,
            currency.from_minor_units(minor),
        ))
    }
}

fn verify(payload: &ProviderWebhookPayload, secret: &str, tolerance: Duration) -> ProviderResult<()> {
    let result = match payload.header(SIGNATURE_HEADER) {
        Some(header) => signature::verify_signature(&payload.raw_data, header, secret, tolerance),
        None => Err(signature::SignatureError::MissingHeader),
    };

    result.map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook delivery");
        ProviderError::new(
            "An error occurred in get_webhook_action_and_data",
            ProviderError::INVALID_SIGNATURE,
            e.to_string(),
        )
    })
}

fn invalid_payload(detail: impl Into<String>) -> ProviderError {
    ProviderError::new(
        "An error occurred in get_webhook_action_and_data",
        ProviderError::INVALID_PAYLOAD,
        detail,
    )
}
