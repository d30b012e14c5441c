//! Email dispatch seam.
//!
//! The core never formats message bodies — callers hand over a
//! pre-rendered document and the dispatcher moves it.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// A pre-rendered message ready for handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    /// Rendered body, produced by the presentation layer.
    pub body: String,
}

/// Delivery acknowledgement from the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailReceipt {
    pub message_id: String,
}

/// Outbound email transport, consumed by the core.
///
/// Failures surface as [`crate::error::CoreError::DeliveryError`].
pub trait EmailDispatch: Send + Sync {
    fn send(&self, message: &EmailMessage) -> impl Future<Output = CoreResult<EmailReceipt>> + Send;
}
