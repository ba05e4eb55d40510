//! Transporter: a resolved mailer plus the defaults applied to every send.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::Instrument;

use crate::address::{Address, ToAddress};
use crate::application::{self, ApplicationEmailRequest, DispatchOutcome};
use crate::config::{MailerConfig, TransportMode};
use crate::email::Email;
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::providers::{EtherealClient, SmtpMailer, TestAccount, TlsMode};

/// Outbound mail handle.
///
/// Built once from [`MailerConfig`], or wrapped around any [`Mailer`] with
/// [`Transporter::new`]. Cheap to share behind an `Arc`; the underlying SMTP
/// transport pools its connections.
pub struct Transporter {
    mailer: Arc<dyn Mailer>,
    default_from: Address,
    sandbox: Option<TestAccount>,
}

impl Transporter {
    /// Wrap an existing mailer.
    pub fn new(mailer: impl Mailer + 'static, default_from: impl ToAddress) -> Self {
        Self::from_arc(Arc::new(mailer), default_from)
    }

    /// Wrap an already shared mailer.
    pub fn from_arc(mailer: Arc<dyn Mailer>, default_from: impl ToAddress) -> Self {
        Self {
            mailer,
            default_from: default_from.to_address(),
            sandbox: None,
        }
    }

    /// Treat deliveries as landing in `account`, so results carry preview links.
    pub fn with_sandbox_account(mut self, account: TestAccount) -> Self {
        self.sandbox = Some(account);
        self
    }

    /// Build from process environment variables. See [`MailerConfig::from_env`].
    pub async fn from_env() -> Result<Self, MailError> {
        Self::from_config(&MailerConfig::from_env()).await
    }

    /// Resolve the mode, build the transport and run a verification handshake.
    ///
    /// Sandbox account errors are returned. A failed handshake is only
    /// logged: the transporter is returned and sends are still attempted.
    pub async fn from_config(config: &MailerConfig) -> Result<Self, MailError> {
        let transporter = match config.mode() {
            TransportMode::Sandbox => {
                if config.use_sandbox {
                    tracing::info!("Sandbox requested, using an Ethereal test account");
                } else {
                    tracing::warn!(
                        missing = ?config.missing_smtp_settings(),
                        "SMTP settings incomplete, falling back to an Ethereal test account"
                    );
                }

                let account = EtherealClient::new()
                    .base_url(&config.sandbox_api_url)
                    .web_url(&config.sandbox_web_url)
                    .create_test_account()
                    .await?;
                let mailer = account.mailer(config.max_connections)?;

                Self::new(mailer, config.default_from()).with_sandbox_account(account)
            }
            TransportMode::Smtp { host, port, secure } => {
                let tls = if secure { TlsMode::Tls } else { TlsMode::Opportunistic };
                let mut builder = SmtpMailer::new(&host, port)
                    .tls(tls)
                    .max_connections(config.max_connections);
                if let (Some(user), Some(pass)) = (&config.user, &config.pass) {
                    builder = builder.credentials(user, pass);
                }

                tracing::info!(host = %host, port, secure, "Using SMTP relay");
                Self::new(builder.build()?, config.default_from())
            }
        };

        transporter.verify().await;
        Ok(transporter)
    }

    /// Run the transport handshake and log the outcome. Never fails.
    pub async fn verify(&self) -> bool {
        match self.mailer.verify().await {
            Ok(()) => {
                tracing::info!(provider = self.provider_name(), "Mail transporter verified");
                true
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.provider_name(),
                    error = %e,
                    "Mail transporter verification failed, sends will still be attempted"
                );
                false
            }
        }
    }

    /// Whether messages go to an Ethereal sandbox instead of real inboxes.
    pub fn is_sandbox(&self) -> bool {
        self.sandbox.is_some()
    }

    /// The sandbox account in use, if any.
    pub fn sandbox_account(&self) -> Option<&TestAccount> {
        self.sandbox.as_ref()
    }

    /// Sender applied to emails without a `from`.
    pub fn default_from(&self) -> &Address {
        &self.default_from
    }

    pub fn provider_name(&self) -> &'static str {
        self.mailer.provider_name()
    }

    /// Send one email.
    ///
    /// Fills in the default sender, and in sandbox mode attaches a preview
    /// link to the result. Transport errors are returned as-is; there is no
    /// retry.
    pub async fn send(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        if email.to.is_empty() {
            return Err(MailError::MissingField("to"));
        }

        let email = self.prepare(email);
        let to: Vec<&str> = email.to.iter().map(|a| a.email.as_str()).collect();
        let span = tracing::info_span!("mailer.send", provider = self.provider_name());

        async {
            tracing::debug!(to = ?to, subject = %email.subject, "Sending email");

            let mut result = match self.mailer.deliver(&email).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(to = ?to, subject = %email.subject, error = %e, "Email delivery failed");
                    return Err(e);
                }
            };

            if let Some(account) = &self.sandbox {
                result.preview_url = account.preview_url(&result);
            }

            tracing::info!(
                to = ?to,
                subject = %email.subject,
                message_id = %result.message_id,
                preview_url = result.preview_url.as_deref(),
                "Email sent"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Send the HR notification and the applicant confirmation.
    ///
    /// See [`application`](crate::application) for what the messages
    /// contain. One failed message, including one with an unusable
    /// recipient address, never prevents the other.
    pub async fn send_application_emails(&self, request: &ApplicationEmailRequest) -> DispatchOutcome {
        application::dispatch(self, request).await
    }

    fn prepare<'a>(&self, email: &'a Email) -> Cow<'a, Email> {
        match email.from {
            Some(_) => Cow::Borrowed(email),
            None => {
                let mut email = email.clone();
                email.from = Some(self.default_from.clone());
                Cow::Owned(email)
            }
        }
    }
}

impl std::fmt::Debug for Transporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transporter")
            .field("provider", &self.provider_name())
            .field("default_from", &self.default_from)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}
