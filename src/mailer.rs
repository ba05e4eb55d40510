//! Mailer trait and delivery result types.
//!
//! The trait uses `#[async_trait]` rather than native async trait methods so
//! that a [`Transporter`](crate::Transporter) can hold an `Arc<dyn Mailer>`
//! and pick SMTP, the sandbox, or an in-memory mailer at runtime. The boxed
//! future per call is noise next to a network round trip.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::email::Email;
use crate::error::MailError;

/// Result of a successful email delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message ID assigned by the transport
    pub message_id: String,
    /// Raw server response text, when the transport returns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Web preview of the message (sandbox mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl DeliveryResult {
    /// Create a new delivery result with just a message ID.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            ..Self::default()
        }
    }

    /// Attach the raw server response.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }
}

/// Trait for email transports.
///
/// ```ignore
/// use careers_mailer::{Email, Mailer};
/// use careers_mailer::providers::SmtpMailer;
///
/// let mailer = SmtpMailer::new("smtp.example.com", 587)
///     .credentials("user", "pass")
///     .build()?;
///
/// mailer.verify().await?;
/// let result = mailer.deliver(&email).await?;
/// ```
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a single email.
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError>;

    /// Check that the transport is reachable and accepts our credentials.
    ///
    /// Transports without a handshake report success.
    async fn verify(&self) -> Result<(), MailError> {
        Ok(())
    }

    /// Get the provider name (for logging/debugging).
    fn provider_name(&self) -> &'static str {
        "unknown"
    }
}
