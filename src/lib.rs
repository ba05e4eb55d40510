//! # careers-mailer
//!
//! Transactional email for a job-application workflow: HR notifications and
//! applicant confirmations over SMTP, with an automatic fallback to a
//! disposable [Ethereal](https://ethereal.email) mailbox when no SMTP
//! credentials are configured.
//!
//! ## Quick Start
//!
//! ```bash
//! MAIL_HOST=smtp.example.com
//! MAIL_USER=careers@example.com
//! MAIL_PASS=secret
//! FROM_NAME="Example Careers"
//! ```
//!
//! ```rust,ignore
//! use careers_mailer::{send_application_emails, ApplicationEmailRequest, FormData};
//!
//! let request = ApplicationEmailRequest {
//!     applicant_email: "jane@example.com".into(),
//!     applicant_name: "Jane Doe".into(),
//!     hr_email: "hr@example.com".into(),
//!     position: "Backend Engineer".into(),
//!     form_data: FormData::new().with("Name", "Jane Doe").with("Experience", "5 years"),
//!     resume_path: Some("/var/uploads/jane-doe.pdf".into()),
//!     application_url: None,
//! };
//!
//! let outcome = send_application_emails(&request).await?;
//! if let Err(e) = &outcome.hr {
//!     // applicant was still confirmed; decide whether HR needs a follow-up
//! }
//! ```
//!
//! Leave the SMTP variables unset (or set `USE_ETHEREAL=1`) and every send
//! goes to a throwaway Ethereal inbox instead; results then carry a
//! `preview_url` to view the message in a browser.
//!
//! ## Environment Variables
//!
//! The first non-empty variable of each row wins.
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `USE_ETHEREAL` | `1`/`true` forces the sandbox |
//! | `MAIL_HOST`, `SMTP_HOST` | SMTP server host |
//! | `MAIL_USER`, `SMTP_USER`, `FROM_EMAIL` | SMTP username |
//! | `MAIL_PASS`, `SMTP_PASS` | SMTP password |
//! | `MAIL_PORT`, `SMTP_PORT` | SMTP port (default 587, or 465 when secure) |
//! | `MAIL_SECURE`, `SMTP_SECURE` | `true` for implicit TLS |
//! | `FROM_NAME` | Sender display name |
//! | `FROM_EMAIL`, `MAIL_USER`, `SMTP_USER` | Sender address (default `no-reply@example.com`) |
//! | `ETHEREAL_API`, `ETHEREAL_WEB` | Sandbox API and web UI base URLs |
//!
//! ## Feature Flags
//!
//! - `local` - assertion helpers in [`testing`] for [`providers::LocalMailer`]

/// The version of the careers-mailer crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
pub mod application;
mod attachment;
pub mod config;
mod email;
mod error;
mod mailer;
mod storage;
mod transport;

pub mod providers;

#[cfg(feature = "local")]
pub mod testing;

use std::sync::Arc;
use tokio::sync::OnceCell;

// Re-exports
pub use address::{Address, ToAddress};
pub use application::{ApplicationEmailRequest, DispatchOutcome, FormData, Recipient};
pub use attachment::Attachment;
pub use config::{MailerConfig, TransportMode};
pub use email::Email;
pub use error::MailError;
pub use mailer::{DeliveryResult, Mailer};
pub use storage::{MemoryStorage, StoredEmail};
pub use transport::Transporter;

// ============================================================================
// Process-wide Transporter
// ============================================================================

/// Created at most once; a failed creation leaves it empty so the next call
/// retries. Concurrent first callers wait on the same initialization.
static TRANSPORTER: OnceCell<Arc<Transporter>> = OnceCell::const_new();

/// Get the process-wide transporter, creating it from the environment on
/// first use.
///
/// ```rust,ignore
/// // In main.rs: resolve and verify the transport at startup
/// careers_mailer::transporter().await?;
/// ```
pub async fn transporter() -> Result<Arc<Transporter>, MailError> {
    TRANSPORTER
        .get_or_try_init(|| async { Transporter::from_env().await.map(Arc::new) })
        .await
        .map(Arc::clone)
}

/// Install a transporter instead of reading the environment.
///
/// Must run before the first [`transporter`] call; afterwards it fails with
/// [`MailError::AlreadyConfigured`].
///
/// ```rust,ignore
/// use careers_mailer::{configure, providers::LocalMailer, Transporter};
///
/// configure(Transporter::new(LocalMailer::new(), "careers@example.com"))?;
/// ```
pub fn configure(transporter: Transporter) -> Result<(), MailError> {
    TRANSPORTER
        .set(Arc::new(transporter))
        .map_err(|_| MailError::AlreadyConfigured)
}

/// The process-wide transporter, if one has been created.
pub fn installed() -> Option<Arc<Transporter>> {
    TRANSPORTER.get().cloned()
}

/// Send an email through the process-wide transporter.
///
/// See [`Transporter::send`].
pub async fn send_mail(email: &Email) -> Result<DeliveryResult, MailError> {
    transporter().await?.send(email).await
}

/// Send the HR notification and applicant confirmation for an application
/// through the process-wide transporter.
///
/// `Err` means the transporter could not be created and nothing was sent.
/// Otherwise each message's result, including an invalid recipient
/// address, is in the returned [`DispatchOutcome`].
pub async fn send_application_emails(
    request: &ApplicationEmailRequest,
) -> Result<DispatchOutcome, MailError> {
    let transporter = match transporter().await {
        Ok(transporter) => transporter,
        Err(e) => {
            tracing::error!(error = %e, position = %request.position, "Failed to prepare application emails");
            return Err(e);
        }
    };
    Ok(transporter.send_application_emails(request).await)
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::Address;
    pub use crate::ApplicationEmailRequest;
    pub use crate::Attachment;
    pub use crate::DeliveryResult;
    pub use crate::DispatchOutcome;
    pub use crate::Email;
    pub use crate::FormData;
    pub use crate::MailError;
    pub use crate::Mailer;
    pub use crate::ToAddress;
    pub use crate::Transporter;
    pub use crate::{send_application_emails, send_mail, transporter};
}
