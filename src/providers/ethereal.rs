//! Ethereal sandbox accounts.
//!
//! Ethereal (<https://ethereal.email>) is a fake SMTP service: it accepts
//! mail and never delivers it, so development setups can exercise the real
//! SMTP path without credentials. A disposable account is requested over
//! HTTP, and each accepted message can be viewed in the browser.
//!
//! ```rust,ignore
//! use careers_mailer::providers::EtherealClient;
//!
//! let account = EtherealClient::new().create_test_account().await?;
//! let mailer = account.mailer(5)?;
//! ```

use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_SANDBOX_API_URL, DEFAULT_SANDBOX_WEB_URL};
use crate::error::MailError;
use crate::mailer::DeliveryResult;
use crate::providers::smtp::{SmtpMailer, TlsMode};

/// Client for the Ethereal account API.
pub struct EtherealClient {
    client: Client,
    base_url: String,
    web_url: String,
}

impl EtherealClient {
    /// Create a client against the public Ethereal API.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_SANDBOX_API_URL.to_string(),
            web_url: DEFAULT_SANDBOX_WEB_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Web UI used for preview links when the API does not report one.
    pub fn web_url(mut self, url: impl Into<String>) -> Self {
        self.web_url = url.into();
        self
    }

    /// Request a fresh disposable mailbox.
    pub async fn create_test_account(&self) -> Result<TestAccount, MailError> {
        let url = format!("{}/user", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("User-Agent", format!("careers-mailer/{}", crate::VERSION))
            .json(&AccountRequest {
                requestor: "careers-mailer",
                version: crate::VERSION,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::provider_with_status(
                "ethereal",
                format!("account request failed: {}", body),
                status.as_u16(),
            ));
        }

        let account: AccountResponse = response.json().await?;
        if account.status != "success" {
            return Err(MailError::provider(
                "ethereal",
                account
                    .error
                    .unwrap_or_else(|| format!("unexpected status '{}'", account.status)),
            ));
        }

        let (user, pass, smtp) = match (account.user, account.pass, account.smtp) {
            (Some(user), Some(pass), Some(smtp)) => (user, pass, smtp),
            _ => {
                return Err(MailError::provider(
                    "ethereal",
                    "account response is missing SMTP credentials",
                ))
            }
        };

        tracing::info!(user = %user, host = %smtp.host, port = smtp.port, "Created Ethereal test account");

        Ok(TestAccount {
            user,
            pass,
            smtp,
            web: account.web.unwrap_or_else(|| self.web_url.clone()),
        })
    }
}

impl Default for EtherealClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct AccountRequest {
    requestor: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct AccountResponse {
    status: String,
    error: Option<String>,
    user: Option<String>,
    pass: Option<String>,
    smtp: Option<SmtpEndpoint>,
    web: Option<String>,
}

/// SMTP endpoint issued with a test account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpEndpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

/// A disposable Ethereal mailbox.
#[derive(Clone)]
pub struct TestAccount {
    pub user: String,
    pub pass: String,
    pub smtp: SmtpEndpoint,
    /// Web UI base URL
    pub web: String,
}

impl fmt::Debug for TestAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestAccount")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("smtp", &self.smtp)
            .field("web", &self.web)
            .finish()
    }
}

impl TestAccount {
    /// SMTP mailer that submits to this account.
    pub fn mailer(&self, max_connections: u32) -> Result<SmtpMailer, MailError> {
        let tls = if self.smtp.secure {
            TlsMode::Tls
        } else {
            TlsMode::Opportunistic
        };

        SmtpMailer::new(&self.smtp.host, self.smtp.port)
            .credentials(&self.user, &self.pass)
            .tls(tls)
            .max_connections(max_connections)
            .build()
    }

    /// Browser link for a message accepted by this account, if the server
    /// response identifies it.
    pub fn preview_url(&self, result: &DeliveryResult) -> Option<String> {
        result
            .response
            .as_deref()
            .and_then(|response| test_message_url(&self.web, response))
    }
}

/// Derive the preview link from an Ethereal SMTP response.
///
/// Ethereal answers `250 Accepted [STATUS=new MSGID=<id>]`; the message is
/// then viewable at `{web}/message/{id}`.
///
/// ```
/// use careers_mailer::providers::test_message_url;
///
/// let url = test_message_url(
///     "https://ethereal.email",
///     "250 Accepted [STATUS=new MSGID=YzJ1bmx1ZC1hYmNk]",
/// );
/// assert_eq!(url.as_deref(), Some("https://ethereal.email/message/YzJ1bmx1ZC1hYmNk"));
/// assert_eq!(test_message_url("https://ethereal.email", "250 OK"), None);
/// ```
pub fn test_message_url(web: &str, response: &str) -> Option<String> {
    let props = response.trim().strip_suffix(']')?;
    let props = &props[props.rfind('[')? + 1..];

    let mut status = None;
    let mut msgid = None;
    for (key, value) in props.split_whitespace().filter_map(|p| p.split_once('=')) {
        match key {
            "STATUS" => status = Some(value),
            "MSGID" => msgid = Some(value),
            _ => {}
        }
    }

    status?;
    let msgid = msgid.filter(|id| !id.is_empty())?;
    Some(format!("{}/message/{}", web.trim_end_matches('/'), msgid))
}
