//! Push transport seam and delivery failure taxonomy.

mod web_push;

pub use web_push::{VapidCredentials, VapidPrivateKey, WebPushOptions, WebPushTransport};

use async_trait::async_trait;
use thiserror::Error;

/// Sends one already-serialized payload to one endpoint.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// `descriptor` is the endpoint's opaque registration blob.
    async fn send(&self, descriptor: &str, payload: &[u8]) -> Result<(), PushError>;
}

/// Why a single send did not go through.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push service responded {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Payload encryption failed: {0}")]
    Encryption(String),

    #[error("VAPID signing failed: {0}")]
    Signing(String),
}

impl PushError {
    /// Status code reported by the push service, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            PushError::Rejected { status, .. } => Some(*status),
            PushError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Classification of a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The endpoint no longer exists (404 / 410). It must be pruned.
    PermanentSubscription,
    /// Anything else. Counted and logged only.
    TransientDelivery,
}

impl DeliveryFailure {
    pub fn classify(err: &PushError) -> Self {
        match err.status() {
            Some(404) | Some(410) => DeliveryFailure::PermanentSubscription,
            _ => DeliveryFailure::TransientDelivery,
        }
    }

    pub fn is_permanent(self) -> bool {
        matches!(self, DeliveryFailure::PermanentSubscription)
    }
}
