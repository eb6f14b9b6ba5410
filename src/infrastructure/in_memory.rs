use crate::domain::intent::{
    CaptureMethod, CreateIntentParams, CreateRefundParams, IntentStatus, PaymentIntent, Refund,
    RefundStatus, UpdateIntentParams, VendorError,
};
use crate::domain::ports::{GatewayResult, PaymentGateway};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    intents: HashMap<String, PaymentIntent>,
    refunds: HashMap<String, Refund>,
    refunded: HashMap<String, i64>,
    idempotent_intents: HashMap<String, String>,
    idempotent_refunds: HashMap<String, String>,
    fail_next: Option<VendorError>,
}

/// A thread-safe, in-memory stand-in for the vendor API.
///
/// Intents move through the same states the vendor uses: manual-capture
/// intents are created already authorized (`requires_capture`), automatic ones
/// already `succeeded`. Invalid transitions fail with the vendor's error codes,
/// and create calls replay on a repeated idempotency key.
#[derive(Default, Clone)]
pub struct InMemoryGateway {
    state: Arc<RwLock<State>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next gateway call fail with `error`.
    pub async fn fail_next(&self, error: VendorError) {
        self.state.write().await.fail_next = Some(error);
    }

    /// Seeds an intent, replacing any intent with the same id.
    pub async fn insert_intent(&self, intent: PaymentIntent) {
        self.state
            .write()
            .await
            .intents
            .insert(intent.id.clone(), intent);
    }

    pub async fn intent(&self, id: &str) -> Option<PaymentIntent> {
        self.state.read().await.intents.get(id).cloned()
    }

    pub async fn intent_count(&self) -> usize {
        self.state.read().await.intents.len()
    }

    pub async fn refunds_for(&self, intent_id: &str) -> Vec<Refund> {
        self.state
            .read()
            .await
            .refunds
            .values()
            .filter(|refund| refund.payment_intent == intent_id)
            .cloned()
            .collect()
    }
}

fn rejected(status: u16, code: &str, message: impl Into<String>) -> GatewayError {
    GatewayError::Vendor {
        status,
        error: VendorError::new(code, message),
    }
}

fn unexpected_state(intent: &PaymentIntent, action: &str) -> GatewayError {
    let mut error = VendorError::new(
        VendorError::UNEXPECTED_STATE,
        format!(
            "You cannot {} this PaymentIntent because it has a status of {}.",
            action,
            serde_json::to_value(intent.status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        ),
    );
    error.payment_intent = Some(Box::new(intent.clone()));
    GatewayError::Vendor { status: 400, error }
}

fn missing(kind: &str, id: &str) -> GatewayError {
    rejected(
        404,
        VendorError::RESOURCE_MISSING,
        format!("No such {}: '{}'", kind, id),
    )
}

impl State {
    fn take_failure(&mut self) -> GatewayResult<()> {
        match self.fail_next.take() {
            Some(error) => Err(GatewayError::Vendor { status: 402, error }),
            None => Ok(()),
        }
    }

    fn intent_mut(&mut self, id: &str) -> GatewayResult<&mut PaymentIntent> {
        self.intents
            .get_mut(id)
            .ok_or_else(|| missing("payment_intent", id))
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_intent(
        &self,
        params: CreateIntentParams,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent> {
        let mut state = self.state.write().await;
        state.take_failure()?;

        if let Some(id) = idempotency_key.and_then(|key| state.idempotent_intents.get(key))
            && let Some(intent) = state.intents.get(id)
        {
            return Ok(intent.clone());
        }

        if params.amount <= 0 {
            return Err(rejected(
                400,
                "amount_too_small",
                "Amount must be at least 1 minor unit",
            ));
        }

        let id = format!("pi_{}", Uuid::new_v4().simple());
        let (status, amount_capturable, amount_received) = match params.capture_method {
            CaptureMethod::Manual => (IntentStatus::RequiresCapture, params.amount, 0),
            CaptureMethod::Automatic => (IntentStatus::Succeeded, 0, params.amount),
        };

        let intent = PaymentIntent {
            id: id.clone(),
            amount: params.amount,
            amount_capturable,
            amount_received,
            currency: params.currency,
            status,
            capture_method: params.capture_method,
            customer: params.customer,
            description: params.description,
            metadata: params.metadata,
            last_payment_error: None,
            client_secret: Some(format!("{}_secret_{}", id, Uuid::new_v4().simple())),
            created: chrono::Utc::now().timestamp(),
        };

        if let Some(key) = idempotency_key {
            state.idempotent_intents.insert(key.to_string(), id.clone());
        }
        state.intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, id: &str) -> GatewayResult<PaymentIntent> {
        let mut state = self.state.write().await;
        state.take_failure()?;
        state
            .intents
            .get(id)
            .cloned()
            .ok_or_else(|| missing("payment_intent", id))
    }

    async fn update_intent(
        &self,
        id: &str,
        params: UpdateIntentParams,
        _idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent> {
        let mut state = self.state.write().await;
        state.take_failure()?;
        let intent = state.intent_mut(id)?;

        if matches!(
            intent.status,
            IntentStatus::Succeeded | IntentStatus::Canceled | IntentStatus::Processing
        ) {
            return Err(unexpected_state(intent, "update"));
        }

        if let Some(amount) = params.amount {
            if amount <= 0 {
                return Err(rejected(
                    400,
                    "amount_too_small",
                    "Amount must be at least 1 minor unit",
                ));
            }
            intent.amount = amount;
            if intent.status == IntentStatus::RequiresCapture {
                intent.amount_capturable = amount;
            }
        }
        if let Some(customer) = params.customer {
            intent.customer = Some(customer);
        }
        if let Some(description) = params.description {
            intent.description = Some(description);
        }
        if let Some(metadata) = params.metadata {
            intent.metadata.extend(metadata);
        }
        Ok(intent.clone())
    }

    async fn capture_intent(
        &self,
        id: &str,
        amount_to_capture: Option<i64>,
        _idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent> {
        let mut state = self.state.write().await;
        state.take_failure()?;
        let intent = state.intent_mut(id)?;

        if intent.status != IntentStatus::RequiresCapture {
            return Err(unexpected_state(intent, "capture"));
        }

        let amount = amount_to_capture.unwrap_or(intent.amount_capturable);
        if amount <= 0 || amount > intent.amount_capturable {
            return Err(rejected(
                400,
                "amount_too_large",
                format!(
                    "The amount to capture ({}) must be between 1 and {}",
                    amount, intent.amount_capturable
                ),
            ));
        }

        intent.amount_received = amount;
        intent.amount_capturable = 0;
        intent.status = IntentStatus::Succeeded;
        Ok(intent.clone())
    }

    async fn cancel_intent(
        &self,
        id: &str,
        _idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent> {
        let mut state = self.state.write().await;
        state.take_failure()?;
        let intent = state.intent_mut(id)?;

        if matches!(
            intent.status,
            IntentStatus::Succeeded | IntentStatus::Canceled
        ) {
            return Err(unexpected_state(intent, "cancel"));
        }

        intent.amount_capturable = 0;
        intent.status = IntentStatus::Canceled;
        Ok(intent.clone())
    }

    async fn create_refund(
        &self,
        params: CreateRefundParams,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<Refund> {
        let mut state = self.state.write().await;
        state.take_failure()?;

        if let Some(id) = idempotency_key.and_then(|key| state.idempotent_refunds.get(key))
            && let Some(refund) = state.refunds.get(id)
        {
            return Ok(refund.clone());
        }

        let intent = state.intent_mut(&params.payment_intent)?.clone();
        if intent.status != IntentStatus::Succeeded {
            return Err(unexpected_state(&intent, "refund"));
        }

        let already_refunded = state.refunded.get(&intent.id).copied().unwrap_or(0);
        let remaining = intent.amount_received - already_refunded;
        let amount = params.amount.unwrap_or(remaining);
        if amount <= 0 || amount > remaining {
            return Err(rejected(
                400,
                "amount_too_large",
                format!(
                    "Refund amount ({}) is greater than unrefunded amount on charge ({})",
                    amount, remaining
                ),
            ));
        }

        let refund = Refund {
            id: format!("re_{}", Uuid::new_v4().simple()),
            amount,
            currency: intent.currency.clone(),
            payment_intent: intent.id.clone(),
            status: RefundStatus::Succeeded,
            reason: params.reason,
        };

        state
            .refunded
            .insert(intent.id.clone(), already_refunded + amount);
        if let Some(key) = idempotency_key {
            state
                .idempotent_refunds
                .insert(key.to_string(), refund.id.clone());
        }
        state.refunds.insert(refund.id.clone(), refund.clone());
        Ok(refund)
    }
}
