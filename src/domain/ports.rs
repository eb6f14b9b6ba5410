use super::intent::{
    CreateIntentParams, CreateRefundParams, PaymentIntent, Refund, UpdateIntentParams,
};
use super::session::{
    InitiatePaymentInput, PaymentProviderInput, PaymentProviderOutput, PaymentSessionStatus,
    ProviderWebhookPayload, RefundPaymentInput, UpdatePaymentInput, WebhookActionResult,
};
use crate::error::{GatewayError, ProviderError};
use async_trait::async_trait;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// The vendor API, as far as this plugin uses it.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        params: CreateIntentParams,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent>;
    async fn retrieve_intent(&self, id: &str) -> GatewayResult<PaymentIntent>;
    async fn update_intent(
        &self,
        id: &str,
        params: UpdateIntentParams,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent>;
    async fn capture_intent(
        &self,
        id: &str,
        amount_to_capture: Option<i64>,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent>;
    async fn cancel_intent(
        &self,
        id: &str,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent>;
    async fn create_refund(
        &self,
        params: CreateRefundParams,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<Refund>;
}

/// The fixed provider interface the host framework drives.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Identifier the host registers this provider under.
    fn identifier(&self) -> &str;
    async fn initiate_payment(
        &self,
        input: InitiatePaymentInput,
    ) -> ProviderResult<PaymentProviderOutput>;
    async fn authorize_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput>;
    async fn capture_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput>;
    async fn cancel_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput>;
    async fn delete_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput>;
    async fn refund_payment(
        &self,
        input: RefundPaymentInput,
    ) -> ProviderResult<PaymentProviderOutput>;
    async fn retrieve_payment(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentProviderOutput>;
    async fn update_payment(
        &self,
        input: UpdatePaymentInput,
    ) -> ProviderResult<PaymentProviderOutput>;
    async fn get_payment_status(
        &self,
        input: PaymentProviderInput,
    ) -> ProviderResult<PaymentSessionStatus>;
    async fn get_webhook_action_and_data(
        &self,
        payload: ProviderWebhookPayload,
    ) -> ProviderResult<WebhookActionResult>;
}

pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type PaymentProviderBox = Box<dyn PaymentProvider>;
