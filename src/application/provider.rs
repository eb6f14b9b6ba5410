use super::webhook::WebhookDecoder;
use crate::config::ProviderOptions;
use crate::domain::amount::{Amount, Currency};
use crate::domain::intent::{
    CaptureMethod, CreateIntentParams, CreateRefundParams, IntentStatus, PaymentIntent,
    SESSION_ID_METADATA_KEY, UpdateIntentParams,
};
use crate::domain::ports::{
    GatewayResult, PaymentGatewayBox, PaymentProvider, ProviderResult,
};
use crate::domain::session::{
    InitiatePaymentInput, PaymentContext, PaymentData, PaymentProviderInput,
    PaymentProviderOutput, PaymentSessionStatus, ProviderWebhookPayload, RefundPaymentInput,
    UpdatePaymentInput, WebhookActionResult, intent_id, to_data,
};
use crate::error::{GatewayError, PaymentError, ProviderError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// The payment provider the host framework drives.
///
/// Each lifecycle hook is one vendor call (two for refunds that need the
/// intent's currency) with the result reshaped into host types. The session
/// data this provider hands back is the serialized vendor intent, so later
/// hooks find the intent id under `data.id`.
pub struct IntentsPaymentProvider {
    gateway: PaymentGatewayBox,
    options: ProviderOptions,
    webhooks: WebhookDecoder,
}

impl IntentsPaymentProvider {
    /// Creates a provider on top of a vendor gateway.
    ///
    /// # Arguments
    ///
    /// * `gateway` - The vendor API client.
    /// * `options` - Provider options from the host's configuration.
    pub fn new(gateway: PaymentGatewayBox, options: ProviderOptions) -> Self {
        let webhooks = WebhookDecoder::from_options(&options);
        Self {
            gateway,
            options,
            webhooks,
        }
    }

    fn capture_method(&self) -> CaptureMethod {
        if self.options.capture {
            CaptureMethod::Automatic
        } else {
            CaptureMethod::Manual
        }
    }

    async fn create_intent(
        &self,
        amount: Amount,
        currency: &Currency,
        context: &PaymentContext,
        data: &PaymentData,
    ) -> Result<PaymentIntent> {
        let mut metadata = HashMap::new();
        if let Some(session_id) = data.get(SESSION_ID_METADATA_KEY).and_then(Value::as_str) {
            metadata.insert(SESSION_ID_METADATA_KEY.to_string(), session_id.to_string());
        }

        let description = data
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.options.payment_description.clone());

        let params = CreateIntentParams {
            amount: amount.to_minor_units(currency)?,
            currency: currency.code().to_string(),
            capture_method: self.capture_method(),
            customer: context.customer_id.clone(),
            description,
            receipt_email: context.email.clone(),
            metadata,
        };

        let intent = self
            .gateway
            .create_intent(params, context.idempotency_key.as_deref())
            .await?;
        tracing::info!(intent_id = %intent.id, status = ?intent.status, "Created payment intent");
        Ok(intent)
    }

    async fn initiate(&self, input: InitiatePaymentInput) -> Result<PaymentProviderOutput> {
        let intent = self
            .create_intent(
                input.amount,
                &input.currency_code,
                &input.context,
                &input.data,
            )
            .await?;
        Ok(PaymentProviderOutput::with_status(&intent)?)
    }

    async fn authorize(&self, input: PaymentProviderInput) -> Result<PaymentProviderOutput> {
        let intent = self.gateway.retrieve_intent(require_id(&input.data)?).await?;
        let output = PaymentProviderOutput::with_status(&intent)?;
        if let Some(status) = output.status
            && !status.is_authorized()
        {
            tracing::debug!(intent_id = %intent.id, ?status, "Payment not yet authorized");
        }
        Ok(output)
    }

    async fn capture(&self, input: PaymentProviderInput) -> Result<PaymentProviderOutput> {
        let id = require_id(&input.data)?;
        let key = input.context.idempotency_key.as_deref();
        let intent = recover_state(
            self.gateway.capture_intent(id, None, key).await,
            IntentStatus::Succeeded,
        )?;
        Ok(PaymentProviderOutput::with_status(&intent)?)
    }

    async fn cancel(&self, input: PaymentProviderInput) -> Result<PaymentProviderOutput> {
        let Some(id) = input.intent_id() else {
            return Ok(PaymentProviderOutput {
                id: None,
                data: input.data,
                status: None,
            });
        };
        let key = input.context.idempotency_key.as_deref();
        let intent = recover_state(
            self.gateway.cancel_intent(id, key).await,
            IntentStatus::Canceled,
        )?;
        Ok(PaymentProviderOutput::with_status(&intent)?)
    }

    async fn refund(&self, input: RefundPaymentInput) -> Result<PaymentProviderOutput> {
        let id = require_id(&input.data)?;

        let currency = match input.data.get("currency").and_then(Value::as_str) {
            Some(code) => Currency::new(code)?,
            None => Currency::new(self.gateway.retrieve_intent(id).await?.currency)?,
        };

        let params = CreateRefundParams {
            payment_intent: id.to_string(),
            amount: Some(input.amount.to_minor_units(&currency)?),
            reason: None,
        };
        let refund = self
            .gateway
            .create_refund(params, input.context.idempotency_key.as_deref())
            .await?;
        tracing::info!(intent_id = id, refund_id = %refund.id, amount = refund.amount, "Refunded payment");

        let mut data = input.data.clone();
        let refund = Value::Object(to_data(&refund)?);
        match data.get_mut("refunds") {
            Some(Value::Array(refunds)) => refunds.push(refund),
            _ => {
                data.insert("refunds".to_string(), Value::Array(vec![refund]));
            }
        }

        Ok(PaymentProviderOutput {
            id: Some(id.to_string()),
            data,
            status: None,
        })
    }

    async fn retrieve(&self, input: PaymentProviderInput) -> Result<PaymentProviderOutput> {
        let intent = self.gateway.retrieve_intent(require_id(&input.data)?).await?;
        Ok(PaymentProviderOutput::with_status(&intent)?)
    }

    async fn update(&self, input: UpdatePaymentInput) -> Result<PaymentProviderOutput> {
        let stored_currency = input.data.get("currency").and_then(Value::as_str);
        let currency_changed =
            stored_currency.is_some_and(|code| !code.eq_ignore_ascii_case(input.currency_code.code()));

        let id = match intent_id(&input.data) {
            Some(id) if !currency_changed => id,
            _ => {
                tracing::debug!("No reusable intent on session, creating a new one");
                let intent = self
                    .create_intent(
                        input.amount,
                        &input.currency_code,
                        &input.context,
                        &input.data,
                    )
                    .await?;
                return Ok(PaymentProviderOutput::with_status(&intent)?);
            }
        };

        let amount = input.amount.to_minor_units(&input.currency_code)?;
        let stored_amount = input.data.get("amount").and_then(Value::as_i64);
        let stored_customer = input.data.get("customer").and_then(Value::as_str);
        let customer_changed = input
            .context
            .customer_id
            .as_deref()
            .is_some_and(|customer| Some(customer) != stored_customer);

        if stored_amount == Some(amount) && !customer_changed {
            return Ok(PaymentProviderOutput {
                id: Some(id.to_string()),
                data: input.data.clone(),
                status: None,
            });
        }

        let params = UpdateIntentParams {
            amount: Some(amount),
            customer: input.context.customer_id.clone(),
            ..Default::default()
        };
        let intent = self
            .gateway
            .update_intent(id, params, input.context.idempotency_key.as_deref())
            .await?;
        Ok(PaymentProviderOutput::with_status(&intent)?)
    }

    async fn status(&self, input: PaymentProviderInput) -> Result<PaymentSessionStatus> {
        let intent = self.gateway.retrieve_intent(require_id(&input.data)?).await?;
        Ok(PaymentSessionStatus::from_intent(&intent))
    }
}

fn require_id(data: &PaymentData) -> Result<&str> {
    intent_id(data).ok_or_else(|| {
        PaymentError::ValidationError("session data does not reference a payment intent".to_string())
    })
}

/// Treats a state error as success when the intent already reached `target`.
///
/// Capturing a captured intent, or canceling a canceled one, is not a failure
/// for the host: the session simply catches up with the vendor.
fn recover_state(
    result: GatewayResult<PaymentIntent>,
    target: IntentStatus,
) -> GatewayResult<PaymentIntent> {
    match result {
        Err(GatewayError::Vendor { status, mut error }) if error.is_unexpected_state(target) => {
            match error.payment_intent.take() {
                Some(intent) => {
                    tracing::debug!(intent_id = %intent.id, status = ?target, "Intent already in target state");
                    Ok(*intent)
                }
                None => Err(GatewayError::Vendor { status, error }),
            }
        }
        other => other,
    }
}

fn failure(operation: &str, err: PaymentError) -> ProviderError {
    tracing::warn!(operation, error = %err, "Payment provider call failed");
    ProviderError::from_payment_error(operation, err)
}

#[async_trait]
impl PaymentProvider for IntentsPaymentProvider {
    fn identifier(&self) -> &str {
        &self.options.id
    }

    async fn initiate_payment(
        &self,
        input: InitiatePaymentInput,
    ) -> ProviderResult<PaymentProviderOutput> {
        self.initiate(input)
            .await
            .map_err(|e| failure("initiate_payment", e))
    }

    async fn authorize_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput> {
        self.authorize(input)
            .await
            .map_err(|e| failure("authorize_payment", e))
    }

    async fn capture_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput> {
        self.capture(input)
            .await
            .map_err(|e| failure("capture_payment", e))
    }

    async fn cancel_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput> {
        self.cancel(input)
            .await
            .map_err(|e| failure("cancel_payment", e))
    }

    async fn delete_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput> {
        self.cancel(input)
            .await
            .map_err(|e| failure("delete_payment", e))
    }

    async fn refund_payment(
        &self,
        input: RefundPaymentInput,
    ) -> ProviderResult<PaymentProviderOutput> {
        self.refund(input)
            .await
            .map_err(|e| failure("refund_payment", e))
    }

    async fn retrieve_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput> {
        self.retrieve(input)
            .await
            .map_err(|e| failure("retrieve_payment", e))
    }

    async fn update_payment(
        &self,
        input: UpdatePaymentInput,
    ) -> ProviderResult<PaymentProviderOutput> {
        self.update(input)
            .await
            .map_err(|e| failure("update_payment", e))
    }

    async fn get_payment_status(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentSessionStatus> {
        self.status(input)
            .await
            .map_err(|e| failure("get_payment_status", e))
    }

    async fn get_webhook_action_and_data(
        &self,
        payload: ProviderWebhookPayload,
    ) -> ProviderResult<WebhookActionResult> {
        self.webhooks.decode(&payload)
    }
}
