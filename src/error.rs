use crate::domain::intent::VendorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Config file error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Failures talking to the payment vendor.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Vendor API error ({status}): {error}")]
    Vendor { status: u16, error: VendorError },
    #[error("Unexpected vendor response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl GatewayError {
    /// The vendor's machine-readable error code, if the vendor sent one.
    pub fn vendor_code(&self) -> Option<&str> {
        match self {
            GatewayError::Vendor { error, .. } => error.code.as_deref(),
            _ => None,
        }
    }

    pub fn vendor_error(&self) -> Option<&VendorError> {
        match self {
            GatewayError::Vendor { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// The error value handed back to the host framework.
///
/// Every lifecycle hook reports failures in this one shape. `code` carries
/// the vendor's error code when there is one and `"unknown"` otherwise.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{error} ({code}): {detail}")]
pub struct ProviderError {
    pub error: String,
    pub code: String,
    pub detail: String,
}

impl ProviderError {
    pub const UNKNOWN: &'static str = "unknown";
    pub const INVALID_DATA: &'static str = "invalid_data";
    pub const INVALID_PAYLOAD: &'static str = "invalid_payload";
    pub const INVALID_SIGNATURE: &'static str = "invalid_signature";

    pub fn new(
        error: impl Into<String>,
        code: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            detail: detail.into(),
        }
    }

    /// Wraps an internal failure, prefixing `error` with the operation that failed.
    pub fn from_payment_error(operation: &str, err: PaymentError) -> Self {
        let error = format!("An error occurred in {}", operation);
        match err {
            PaymentError::GatewayError(GatewayError::Vendor { error: vendor, .. }) => {
                let code = vendor
                    .code
                    .clone()
                    .or_else(|| vendor.r#type.clone())
                    .unwrap_or_else(|| Self::UNKNOWN.to_string());
                let detail = vendor
                    .message
                    .clone()
                    .unwrap_or_else(|| vendor.to_string());
                Self::new(error, code, detail)
            }
            PaymentError::ValidationError(msg) => Self::new(error, Self::INVALID_DATA, msg),
            other => Self::new(error, Self::UNKNOWN, other.to_string()),
        }
    }
}
