use crate::config::ProviderOptions;
use crate::domain::intent::{
    CreateIntentParams, CreateRefundParams, PaymentIntent, Refund, UpdateIntentParams,
    VendorErrorEnvelope,
};
use crate::domain::ports::{GatewayResult, PaymentGateway};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Serialize)]
struct CaptureBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    amount_to_capture: Option<i64>,
}

#[derive(Serialize)]
struct EmptyBody {}

/// A [`PaymentGateway`] that talks to the vendor's REST API over HTTPS.
///
/// Requests authenticate with the secret API key as a bearer token. Non-2xx
/// responses are decoded from the vendor's `{"error": {...}}` envelope into
/// [`GatewayError::Vendor`]; bodies that don't parse are kept verbatim in
/// [`GatewayError::UnexpectedResponse`].
#[derive(Clone)]
pub struct HttpGateway {
    base_url: Url,
    client: Client,
    api_key: String,
}

impl HttpGateway {
    pub fn new(base_url: Url, api_key: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            client,
            api_key: api_key.into(),
        })
    }

    pub fn from_options(options: &ProviderOptions) -> Result<Self> {
        Ok(Self::new(
            options.base_url()?,
            options.api_key.clone(),
            options.timeout(),
        )?)
    }

    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::UrlError(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, idempotency_key: Option<&str>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key);
        match idempotency_key {
            Some(key) => builder.header(IDEMPOTENCY_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await?;
        match serde_json::from_str::<VendorErrorEnvelope>(&body) {
            Ok(envelope) => {
                tracing::warn!(status = status.as_u16(), error = %envelope.error, "Vendor rejected request");
                Err(GatewayError::Vendor {
                    status: status.as_u16(),
                    error: envelope.error,
                })
            }
            Err(_) => {
                tracing::warn!(status = status.as_u16(), "Vendor returned an unreadable error body");
                Err(GatewayError::UnexpectedResponse {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_intent(
        &self,
        params: CreateIntentParams,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent> {
        tracing::debug!(amount = params.amount, currency = %params.currency, "Creating payment intent");
        let url = self.endpoint(&["v1", "payment_intents"])?;
        self.send(self.request(Method::POST, url, idempotency_key).json(&params))
            .await
    }

    async fn retrieve_intent(&self, id: &str) -> GatewayResult<PaymentIntent> {
        tracing::debug!(intent_id = id, "Retrieving payment intent");
        let url = self.endpoint(&["v1", "payment_intents", id])?;
        self.send(self.request(Method::GET, url, None)).await
    }

    async fn update_intent(
        &self,
        id: &str,
        params: UpdateIntentParams,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent> {
        tracing::debug!(intent_id = id, "Updating payment intent");
        let url = self.endpoint(&["v1", "payment_intents", id])?;
        self.send(self.request(Method::POST, url, idempotency_key).json(&params))
            .await
    }

    async fn capture_intent(
        &self,
        id: &str,
        amount_to_capture: Option<i64>,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent> {
        tracing::debug!(intent_id = id, ?amount_to_capture, "Capturing payment intent");
        let url = self.endpoint(&["v1", "payment_intents", id, "capture"])?;
        let body = CaptureBody { amount_to_capture };
        self.send(self.request(Method::POST, url, idempotency_key).json(&body))
            .await
    }

    async fn cancel_intent(
        &self,
        id: &str,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<PaymentIntent> {
        tracing::debug!(intent_id = id, "Canceling payment intent");
        let url = self.endpoint(&["v1", "payment_intents", id, "cancel"])?;
        self.send(self.request(Method::POST, url, idempotency_key).json(&EmptyBody {}))
            .await
    }

    async fn create_refund(
        &self,
        params: CreateRefundParams,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<Refund> {
        tracing::debug!(intent_id = %params.payment_intent, amount = ?params.amount, "Creating refund");
        let url = self.endpoint(&["v1", "refunds"])?;
        self.send(self.request(Method::POST, url, idempotency_key).json(&params))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(Url::parse(base).unwrap(), "sk_test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let gw = gateway("https://api.vendor.example");
        assert_eq!(
            gw.endpoint(&["v1", "payment_intents", "pi_1", "capture"])
                .unwrap()
                .as_str(),
            "https://api.vendor.example/v1/payment_intents/pi_1/capture"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let gw = gateway("https://proxy.example/vendor/");
        assert_eq!(
            gw.endpoint(&["v1", "refunds"]).unwrap().as_str(),
            "https://proxy.example/vendor/v1/refunds"
        );
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let gw = gateway("https://api.vendor.example");
        assert_eq!(
            gw.endpoint(&["v1", "payment_intents", "pi/../x"])
                .unwrap()
                .as_str(),
            "https://api.vendor.example/v1/payment_intents/pi%2F..%2Fx"
        );
    }
}
