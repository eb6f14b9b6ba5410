use crate::domain::session::ProviderWebhookPayload;
use crate::error::Result;
use crate::infrastructure::signature::SIGNATURE_HEADER;
use std::collections::HashMap;
use std::io::Read;

/// Reads a webhook delivery from a raw body source.
///
/// The body is kept byte-for-byte, since signatures are computed over the
/// exact bytes the vendor sent.
pub struct WebhookReader<R: Read> {
    source: R,
    headers: HashMap<String, String>,
}

impl<R: Read> WebhookReader<R> {
    /// Creates a new `WebhookReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            source,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attaches the vendor signature header, if one was supplied.
    pub fn with_signature(self, signature: Option<String>) -> Self {
        match signature {
            Some(signature) => self.with_header(SIGNATURE_HEADER, signature),
            None => self,
        }
    }

    pub fn read_payload(mut self) -> Result<ProviderWebhookPayload> {
        let mut raw = Vec::new();
        self.source.read_to_end(&mut raw)?;
        Ok(ProviderWebhookPayload::from_raw(raw, self.headers)?)
    }
}
