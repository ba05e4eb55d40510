//! SMTP provider using lettre.
//!
//! # Example
//!
//! ```rust,ignore
//! use careers_mailer::providers::{SmtpMailer, TlsMode};
//!
//! // Required STARTTLS on 587, at most 5 pooled connections
//! let mailer = SmtpMailer::new("smtp.example.com", 587)
//!     .credentials("username", "password")
//!     .build()?;
//!
//! // Implicit TLS on 465
//! let mailer = SmtpMailer::new("smtp.example.com", 465)
//!     .credentials("username", "password")
//!     .tls(TlsMode::Tls)
//!     .build()?;
//! ```

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment as LettreAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        response::Response,
        PoolConfig,
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::address::Address;
use crate::config::DEFAULT_MAX_CONNECTIONS;
use crate::email::Email;
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};

/// SMTP email provider backed by a pooled lettre transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
}

impl SmtpMailer {
    /// Create a new SMTP mailer builder (STARTTLS by default).
    pub fn new(host: &str, port: u16) -> SmtpBuilder {
        SmtpBuilder {
            host: host.to_string(),
            port,
            credentials: None,
            tls: TlsMode::StartTls,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Host this mailer connects to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port this mailer connects to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Build a lettre Message from our Email struct.
    fn build_message(&self, email: &Email) -> Result<(Message, String), MailError> {
        let from = email
            .from
            .as_ref()
            .ok_or(MailError::MissingField("from"))?;

        if email.to.is_empty() {
            return Err(MailError::MissingField("to"));
        }

        let message_id = format!(
            "<{}@{}>",
            uuid::Uuid::new_v4(),
            from.email.rsplit('@').next().unwrap_or("localhost")
        );

        let mut builder = Message::builder()
            .from(address_to_mailbox(from)?)
            .subject(&email.subject)
            .message_id(Some(message_id.clone()));

        for to in &email.to {
            builder = builder.to(address_to_mailbox(to)?);
        }
        for cc in &email.cc {
            builder = builder.cc(address_to_mailbox(cc)?);
        }
        for bcc in &email.bcc {
            builder = builder.bcc(address_to_mailbox(bcc)?);
        }
        // SMTP carries a single Reply-To
        if let Some(reply_to) = email.reply_to.first() {
            builder = builder.reply_to(address_to_mailbox(reply_to)?);
        }

        let message = if email.attachments.is_empty() {
            match (&email.html_body, &email.text_body) {
                (Some(html), Some(text)) => builder
                    .multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))?,
                (Some(html), None) => builder.header(ContentType::TEXT_HTML).body(html.clone())?,
                (None, Some(text)) => builder.header(ContentType::TEXT_PLAIN).body(text.clone())?,
                (None, None) => builder
                    .header(ContentType::TEXT_PLAIN)
                    .body(String::new())?,
            }
        } else {
            let body_part = match (&email.html_body, &email.text_body) {
                (Some(html), Some(text)) => {
                    MultiPart::alternative_plain_html(text.clone(), html.clone())
                }
                (Some(html), None) => MultiPart::mixed().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html.clone()),
                ),
                (None, text) => MultiPart::mixed().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text.clone().unwrap_or_default()),
                ),
            };

            let mut multipart = MultiPart::mixed().multipart(body_part);

            for attachment in &email.attachments {
                let content_type: ContentType = attachment
                    .content_type
                    .parse()
                    .unwrap_or(ContentType::TEXT_PLAIN);
                // Path-based attachments are read here, at delivery time
                let data = attachment.get_data()?;
                multipart = multipart.singlepart(
                    LettreAttachment::new(attachment.filename.clone()).body(data, content_type),
                );
            }

            builder.multipart(multipart)?
        };

        Ok((message, message_id))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let (message, message_id) = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::SendError(e.to_string()))?;

        Ok(DeliveryResult::new(message_id).with_response(response_text(&response)))
    }

    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await? {
            true => Ok(()),
            false => Err(MailError::SendError(format!(
                "SMTP server {}:{} did not accept the connection",
                self.host, self.port
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "smtp"
    }
}

/// TLS mode for SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// No TLS (dangerous, only for local relays)
    None,
    /// STARTTLS when the server offers it, plain text otherwise
    Opportunistic,
    /// STARTTLS - upgrade to TLS after connecting (port 587)
    StartTls,
    /// Implicit TLS - connect with TLS from start (port 465)
    Tls,
}

/// Builder for SmtpMailer.
pub struct SmtpBuilder {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    tls: TlsMode,
    max_connections: u32,
}

impl SmtpBuilder {
    /// Set SMTP credentials.
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials::new(username.to_string(), password.to_string()));
        self
    }

    /// Set TLS mode.
    pub fn tls(mut self, mode: TlsMode) -> Self {
        self.tls = mode;
        self
    }

    /// Disable TLS (dangerous, only for local relays/testing).
    pub fn no_tls(mut self) -> Self {
        self.tls = TlsMode::None;
        self
    }

    /// Cap the number of pooled connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Build the SmtpMailer.
    ///
    /// Fails when the host cannot be used for the requested TLS mode.
    pub fn build(self) -> Result<SmtpMailer, MailError> {
        let builder = match self.tls {
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host),
            TlsMode::Opportunistic => {
                let params = TlsParameters::new(self.host.clone())
                    .map_err(|e| invalid_host(&self.host, e))?;
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
                    .tls(Tls::Opportunistic(params))
            }
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| invalid_host(&self.host, e))?,
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
                .map_err(|e| invalid_host(&self.host, e))?,
        };

        let mut builder = builder
            .port(self.port)
            .pool_config(PoolConfig::new().max_size(self.max_connections));
        if let Some(creds) = self.credentials {
            builder = builder.credentials(creds);
        }

        Ok(SmtpMailer {
            transport: builder.build(),
            host: self.host,
            port: self.port,
        })
    }
}

fn invalid_host(host: &str, err: lettre::transport::smtp::Error) -> MailError {
    MailError::Configuration(format!("cannot use SMTP host '{}': {}", host, err))
}

/// Status code plus message lines, e.g. `250 Accepted [STATUS=new MSGID=...]`.
fn response_text(response: &Response) -> String {
    let lines: Vec<&str> = response.message().collect();
    format!("{} {}", response.code(), lines.join(" "))
}

/// Convert our Address to lettre's Mailbox, punycoding the domain.
fn address_to_mailbox(addr: &Address) -> Result<Mailbox, MailError> {
    let email: lettre::Address = addr.to_ascii()?.parse()?;
    Ok(Mailbox::new(addr.name.clone(), email))
}
