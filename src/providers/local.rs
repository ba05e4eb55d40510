//! Local mailer for development and testing.
//!
//! Captures emails in memory instead of sending them, and can be told to
//! fail, either for every delivery or only for particular recipients.
//!
//! ```rust,ignore
//! use careers_mailer::providers::LocalMailer;
//! use careers_mailer::Transporter;
//!
//! #[tokio::test]
//! async fn hr_outage_does_not_block_applicant() {
//!     let mailer = LocalMailer::new();
//!     mailer.fail_for("hr@example.com", "mailbox unavailable");
//!     let transporter = Transporter::new(mailer.clone(), "careers@example.com");
//!
//!     let outcome = transporter.send_application_emails(&request).await;
//!     assert!(outcome.hr.is_err());
//!     assert!(mailer.sent_to("jane@example.com"));
//! }
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::email::Email;
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::storage::{MemoryStorage, StoredEmail};

#[derive(Debug, Default)]
struct Failures {
    all: Option<String>,
    by_recipient: HashMap<String, String>,
    verify: Option<String>,
}

/// Local mailer that stores emails in memory.
///
/// Clones share storage and failure settings.
#[derive(Clone)]
pub struct LocalMailer {
    storage: Arc<MemoryStorage>,
    failures: Arc<RwLock<Failures>>,
}

impl LocalMailer {
    /// Create a new local mailer with fresh storage.
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::shared())
    }

    /// Create a local mailer with existing storage.
    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self {
            storage,
            failures: Arc::default(),
        }
    }

    /// Get a reference to the underlying storage.
    pub fn storage(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }

    // =========================================================================
    // Failure Simulation
    // =========================================================================

    /// Make every delivery fail with `message`.
    pub fn set_failure(&self, message: impl Into<String>) {
        self.failures.write().all = Some(message.into());
    }

    /// Make deliveries addressed to `recipient` (to, cc or bcc) fail.
    pub fn fail_for(&self, recipient: impl Into<String>, message: impl Into<String>) {
        self.failures
            .write()
            .by_recipient
            .insert(recipient.into().to_ascii_lowercase(), message.into());
    }

    /// Make `verify()` report `message`.
    pub fn set_verify_failure(&self, message: impl Into<String>) {
        self.failures.write().verify = Some(message.into());
    }

    /// Clear every configured failure.
    pub fn clear_failure(&self) {
        *self.failures.write() = Failures::default();
    }

    fn failure_for(&self, email: &Email) -> Option<String> {
        let failures = self.failures.read();
        failures.all.clone().or_else(|| {
            email.all_recipients().iter().find_map(|addr| {
                failures
                    .by_recipient
                    .get(&addr.email.to_ascii_lowercase())
                    .cloned()
            })
        })
    }

    // =========================================================================
    // Email Access
    // =========================================================================

    /// Get all captured emails (newest first).
    pub fn emails(&self) -> Vec<StoredEmail> {
        self.storage.all()
    }

    /// Get the most recently captured email.
    pub fn last_email(&self) -> Option<StoredEmail> {
        self.storage.all().into_iter().next()
    }

    /// Get the count of captured emails.
    pub fn email_count(&self) -> usize {
        self.storage.count()
    }

    /// Check if any email was captured.
    pub fn has_emails(&self) -> bool {
        self.storage.count() > 0
    }

    /// Clear all captured emails.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Remove and return all captured emails.
    pub fn flush(&self) -> Vec<StoredEmail> {
        self.storage.flush()
    }

    /// Check if an email was sent to a specific address.
    pub fn sent_to(&self, email: &str) -> bool {
        self.last_email_to(email).is_some()
    }

    /// Check if an email with subject containing text was sent.
    pub fn sent_with_subject_containing(&self, text: &str) -> bool {
        self.storage
            .all()
            .iter()
            .any(|stored| stored.email.subject.contains(text))
    }

    /// Find emails matching a predicate (newest first).
    pub fn find_emails<F>(&self, predicate: F) -> Vec<StoredEmail>
    where
        F: Fn(&Email) -> bool,
    {
        self.storage
            .all()
            .into_iter()
            .filter(|stored| predicate(&stored.email))
            .collect()
    }

    /// The most recent email sent to `recipient`.
    pub fn last_email_to(&self, recipient: &str) -> Option<StoredEmail> {
        self.find_emails(|e| e.to.iter().any(|addr| addr.email.eq_ignore_ascii_case(recipient)))
            .into_iter()
            .next()
    }
}

impl Default for LocalMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LocalMailer {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        if let Some(message) = self.failure_for(email) {
            return Err(MailError::SendError(message));
        }

        // Path-based attachments must still be readable, as with SMTP
        for attachment in &email.attachments {
            attachment.get_data()?;
        }

        let id = self.storage.push(email.clone());
        // Same shape as an Ethereal acceptance, so sandbox previews can be exercised
        let response = format!("250 Accepted [STATUS=new MSGID={}]", id);
        Ok(DeliveryResult::new(id).with_response(response))
    }

    async fn verify(&self) -> Result<(), MailError> {
        let failure = self.failures.read().verify.clone();
        match failure {
            Some(message) => Err(MailError::SendError(message)),
            None => Ok(()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
