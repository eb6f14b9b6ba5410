//! Application layer: the provider adapter and the webhook decoder.
//!
//! `IntentsPaymentProvider` is what the host framework holds. It owns a boxed
//! `PaymentGateway` so the same adapter runs against the real vendor API or
//! the in-memory gateway.

pub mod provider;
pub mod webhook;
