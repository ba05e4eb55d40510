//! Environment-driven mailer configuration.
//!
//! Every logical setting is read from an ordered list of variable names; the
//! first non-empty value wins. Older deployments use `SMTP_*` names, newer
//! ones `MAIL_*`, and both keep working.
//!
//! | Setting | Variables |
//! |---------|-----------|
//! | sandbox flag | `USE_ETHEREAL` (`1` or `true`) |
//! | host | `MAIL_HOST`, `SMTP_HOST` |
//! | user | `MAIL_USER`, `SMTP_USER`, `FROM_EMAIL` |
//! | password | `MAIL_PASS`, `SMTP_PASS` |
//! | port | `MAIL_PORT`, `SMTP_PORT` (default 587, or 465 when secure) |
//! | secure | `MAIL_SECURE`, `SMTP_SECURE` (`true`) |
//! | sender name | `FROM_NAME` |
//! | sender address | `FROM_EMAIL`, `MAIL_USER`, `SMTP_USER` |
//! | sandbox API | `ETHEREAL_API` |
//! | sandbox web UI | `ETHEREAL_WEB` |

use std::fmt;

use crate::address::Address;

pub const SANDBOX_FLAG_KEYS: &[&str] = &["USE_ETHEREAL"];
pub const HOST_KEYS: &[&str] = &["MAIL_HOST", "SMTP_HOST"];
pub const USER_KEYS: &[&str] = &["MAIL_USER", "SMTP_USER", "FROM_EMAIL"];
pub const PASS_KEYS: &[&str] = &["MAIL_PASS", "SMTP_PASS"];
pub const PORT_KEYS: &[&str] = &["MAIL_PORT", "SMTP_PORT"];
pub const SECURE_KEYS: &[&str] = &["MAIL_SECURE", "SMTP_SECURE"];
pub const FROM_NAME_KEYS: &[&str] = &["FROM_NAME"];
pub const FROM_EMAIL_KEYS: &[&str] = &["FROM_EMAIL", "MAIL_USER", "SMTP_USER"];
pub const SANDBOX_API_KEYS: &[&str] = &["ETHEREAL_API"];
pub const SANDBOX_WEB_KEYS: &[&str] = &["ETHEREAL_WEB"];

/// Sender address used when nothing is configured.
pub const DEFAULT_FROM_EMAIL: &str = "no-reply@example.com";
/// SMTP submission port (STARTTLS).
pub const DEFAULT_PORT: u16 = 587;
/// SMTPS port (implicit TLS).
pub const DEFAULT_SECURE_PORT: u16 = 465;
/// Pooled connections per transporter.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SANDBOX_API_URL: &str = "https://api.nodemailer.com";
pub const DEFAULT_SANDBOX_WEB_URL: &str = "https://ethereal.email";

/// Return the first non-empty value among `keys`, in order.
///
/// Values are trimmed; a key that is set to whitespace counts as unset.
///
/// ```
/// use careers_mailer::config::resolve_alias;
///
/// let lookup = |key: &str| match key {
///     "MAIL_HOST" => Some("".to_string()),
///     "SMTP_HOST" => Some("smtp.example.com".to_string()),
///     _ => None,
/// };
/// assert_eq!(
///     resolve_alias(&["MAIL_HOST", "SMTP_HOST"], lookup).as_deref(),
///     Some("smtp.example.com")
/// );
/// ```
pub fn resolve_alias<F>(keys: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|key| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// How the transporter talks to the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Real SMTP relay.
    Smtp { host: String, port: u16, secure: bool },
    /// Disposable Ethereal mailbox; messages are never delivered.
    Sandbox,
}

impl TransportMode {
    pub fn is_sandbox(&self) -> bool {
        matches!(self, TransportMode::Sandbox)
    }
}

/// Mailer settings, usually read once with [`MailerConfig::from_env`].
#[derive(Clone)]
pub struct MailerConfig {
    /// Force the Ethereal sandbox even with complete SMTP settings.
    pub use_sandbox: bool,
    pub host: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub port: Option<u16>,
    /// Implicit TLS requested.
    pub secure: bool,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    /// Upper bound on pooled SMTP connections.
    pub max_connections: u32,
    /// Base URL of the Ethereal account API.
    pub sandbox_api_url: String,
    /// Base URL of the Ethereal web UI, used for preview links.
    pub sandbox_web_url: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            use_sandbox: false,
            host: None,
            user: None,
            pass: None,
            port: None,
            secure: false,
            from_name: None,
            from_email: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            sandbox_api_url: DEFAULT_SANDBOX_API_URL.to_string(),
            sandbox_web_url: DEFAULT_SANDBOX_WEB_URL.to_string(),
        }
    }
}

impl fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerConfig")
            .field("use_sandbox", &self.use_sandbox)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("from_name", &self.from_name)
            .field("from_email", &self.from_email)
            .field("max_connections", &self.max_connections)
            .field("sandbox_api_url", &self.sandbox_api_url)
            .field("sandbox_web_url", &self.sandbox_web_url)
            .finish()
    }
}

impl MailerConfig {
    /// Empty configuration; resolves to sandbox mode until SMTP settings are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = resolve_alias(PORT_KEYS, &lookup).and_then(|raw| match raw.parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                tracing::warn!(value = %raw, "Ignoring invalid mail port, using default");
                None
            }
        });

        Self {
            use_sandbox: resolve_alias(SANDBOX_FLAG_KEYS, &lookup)
                .is_some_and(|v| v == "1" || v == "true"),
            host: resolve_alias(HOST_KEYS, &lookup),
            user: resolve_alias(USER_KEYS, &lookup),
            pass: resolve_alias(PASS_KEYS, &lookup),
            port,
            secure: resolve_alias(SECURE_KEYS, &lookup).is_some_and(|v| v.eq_ignore_ascii_case("true")),
            from_name: resolve_alias(FROM_NAME_KEYS, &lookup),
            from_email: resolve_alias(FROM_EMAIL_KEYS, &lookup),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            sandbox_api_url: resolve_alias(SANDBOX_API_KEYS, &lookup)
                .unwrap_or_else(|| DEFAULT_SANDBOX_API_URL.to_string()),
            sandbox_web_url: resolve_alias(SANDBOX_WEB_KEYS, &lookup)
                .unwrap_or_else(|| DEFAULT_SANDBOX_WEB_URL.to_string()),
        }
    }

    /// Set the SMTP host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set SMTP credentials.
    pub fn credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    /// Set the SMTP port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Request implicit TLS.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Force (or stop forcing) the sandbox.
    pub fn sandbox(mut self, use_sandbox: bool) -> Self {
        self.use_sandbox = use_sandbox;
        self
    }

    /// Set the default sender.
    pub fn from(mut self, name: Option<String>, email: impl Into<String>) -> Self {
        self.from_name = name;
        self.from_email = Some(email.into());
        self
    }

    /// Cap the SMTP connection pool.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Point sandbox account creation and preview links at other hosts.
    pub fn sandbox_urls(mut self, api_url: impl Into<String>, web_url: impl Into<String>) -> Self {
        self.sandbox_api_url = api_url.into();
        self.sandbox_web_url = web_url.into();
        self
    }

    /// Names of the SMTP settings that are absent.
    pub fn missing_smtp_settings(&self) -> Vec<&'static str> {
        [
            ("host", self.host.is_none()),
            ("user", self.user.is_none()),
            ("pass", self.pass.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }

    /// Port to connect to: configured, else 465 when secure, else 587.
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or(if self.secure {
            DEFAULT_SECURE_PORT
        } else {
            DEFAULT_PORT
        })
    }

    /// Implicit TLS when requested or when talking to port 465.
    pub fn resolved_secure(&self) -> bool {
        self.secure || self.resolved_port() == DEFAULT_SECURE_PORT
    }

    /// Decide between the sandbox and a real relay.
    ///
    /// The sandbox wins when explicitly requested or when any of host, user
    /// or password is missing.
    pub fn mode(&self) -> TransportMode {
        match (&self.host, self.missing_smtp_settings().is_empty()) {
            (Some(host), true) if !self.use_sandbox => TransportMode::Smtp {
                host: host.clone(),
                port: self.resolved_port(),
                secure: self.resolved_secure(),
            },
            _ => TransportMode::Sandbox,
        }
    }

    /// Default sender: `FROM_NAME` plus the first configured address, or
    /// [`DEFAULT_FROM_EMAIL`].
    pub fn default_from(&self) -> Address {
        let email = self
            .from_email
            .clone()
            .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string());
        match &self.from_name {
            Some(name) => Address::with_name(name.clone(), email),
            None => Address::new(email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> MailerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MailerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_resolve_alias_first_non_empty_wins() {
        let vars: HashMap<&str, &str> = [("A", "  "), ("B", "second"), ("C", "third")].into();
        let lookup = |key: &str| vars.get(key).map(|v| v.to_string());

        assert_eq!(resolve_alias(&["A", "B", "C"], lookup).as_deref(), Some("second"));
        assert_eq!(resolve_alias(&["C", "B"], lookup).as_deref(), Some("third"));
        assert_eq!(resolve_alias(&["Z"], lookup), None);
        assert_eq!(resolve_alias(&[], lookup), None);
    }

    #[test]
    fn test_no_settings_selects_sandbox() {
        let config = config_from(&[]);
        assert_eq!(config.mode(), TransportMode::Sandbox);
        assert_eq!(config.missing_smtp_settings(), vec!["host", "user", "pass"]);
    }

    #[test]
    fn test_missing_password_selects_sandbox() {
        let config = config_from(&[("MAIL_HOST", "smtp.example.com"), ("MAIL_USER", "u")]);
        assert_eq!(config.mode(), TransportMode::Sandbox);
        assert_eq!(config.missing_smtp_settings(), vec!["pass"]);
    }

    #[test]
    fn test_complete_settings_default_to_starttls_port() {
        let config = config_from(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASS", "secret"),
        ]);
        assert_eq!(
            config.mode(),
            TransportMode::Smtp {
                host: "smtp.example.com".into(),
                port: 587,
                secure: false,
            }
        );
    }

    #[test]
    fn test_secure_flag_defaults_port_465() {
        let config = config_from(&[
            ("MAIL_HOST", "smtp.example.com"),
            ("MAIL_USER", "mailer"),
            ("MAIL_PASS", "secret"),
            ("MAIL_SECURE", "TRUE"),
        ]);
        assert_eq!(config.resolved_port(), 465);
        assert!(config.resolved_secure());
    }

    #[test]
    fn test_port_465_forces_secure() {
        let config = config_from(&[
            ("MAIL_HOST", "smtp.example.com"),
            ("MAIL_USER", "mailer"),
            ("MAIL_PASS", "secret"),
            ("MAIL_PORT", "465"),
            ("MAIL_SECURE", "false"),
        ]);
        assert!(!config.secure);
        assert!(config.resolved_secure());
    }

    #[test]
    fn test_sandbox_flag_overrides_complete_settings() {
        for flag in ["1", "true"] {
            let config = config_from(&[
                ("USE_ETHEREAL", flag),
                ("MAIL_HOST", "smtp.example.com"),
                ("MAIL_USER", "mailer"),
                ("MAIL_PASS", "secret"),
            ]);
            assert!(config.mode().is_sandbox(), "flag {flag:?}");
        }

        for flag in ["yes", "TRUE", "True", "0", "false"] {
            let config = config_from(&[
                ("USE_ETHEREAL", flag),
                ("MAIL_HOST", "smtp.example.com"),
                ("MAIL_USER", "mailer"),
                ("MAIL_PASS", "secret"),
            ]);
            assert!(!config.mode().is_sandbox(), "flag {flag:?}");
        }
    }

    #[test]
    fn test_mail_keys_take_precedence_over_smtp_keys() {
        let config = config_from(&[
            ("MAIL_HOST", "new.example.com"),
            ("SMTP_HOST", "old.example.com"),
            ("MAIL_PORT", "2525"),
            ("SMTP_PORT", "25"),
        ]);
        assert_eq!(config.host.as_deref(), Some("new.example.com"));
        assert_eq!(config.port, Some(2525));
    }

    #[test]
    fn test_invalid_port_falls_back_to_default() {
        let config = config_from(&[("MAIL_PORT", "not-a-port")]);
        assert_eq!(config.port, None);
        assert_eq!(config.resolved_port(), 587);
    }

    #[test]
    fn test_from_email_used_as_user() {
        let config = config_from(&[("FROM_EMAIL", "careers@example.com")]);
        assert_eq!(config.user.as_deref(), Some("careers@example.com"));
    }

    #[test]
    fn test_default_from_chain() {
        let config = config_from(&[]);
        assert_eq!(config.default_from().email, DEFAULT_FROM_EMAIL);
        assert_eq!(config.default_from().name, None);

        let config = config_from(&[("SMTP_USER", "relay@example.com"), ("FROM_NAME", "Careers")]);
        let from = config.default_from();
        assert_eq!(from.email, "relay@example.com");
        assert_eq!(from.name.as_deref(), Some("Careers"));

        let config = config_from(&[
            ("FROM_EMAIL", "jobs@example.com"),
            ("MAIL_USER", "relay@example.com"),
        ]);
        assert_eq!(config.default_from().email, "jobs@example.com");
    }

    #[test]
    fn test_sandbox_urls_from_env() {
        let config = config_from(&[("ETHEREAL_API", "http://localhost:9000")]);
        assert_eq!(config.sandbox_api_url, "http://localhost:9000");
        assert_eq!(config.sandbox_web_url, DEFAULT_SANDBOX_WEB_URL);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = MailerConfig::new().credentials("mailer", "hunter2");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
