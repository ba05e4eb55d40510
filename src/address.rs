//! Mailbox address with an optional display name.

use crate::error::MailError;
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An email address with an optional display name.
///
/// ```
/// use careers_mailer::Address;
///
/// let hr: Address = ("Hiring Team", "hr@example.com").into();
/// assert_eq!(hr.email, "hr@example.com");
/// assert_eq!(hr.formatted(), "Hiring Team <hr@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Optional display name (e.g., "Hiring Team")
    pub name: Option<String>,
    /// Email address (e.g., "hr@example.com")
    pub email: String,
}

impl Address {
    /// Create an address without a display name.
    ///
    /// No validation beyond a warning for obviously broken input; use
    /// [`Address::parse`] at trust boundaries.
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        warn_if_suspicious(&email);
        Self { name: None, email }
    }

    /// Create an address with a display name. An empty name is dropped.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        let name = name.into();
        let email = email.into();
        warn_if_suspicious(&email);
        Self {
            name: (!name.is_empty()).then_some(name),
            email,
        }
    }

    /// Parse and validate an email address (RFC 5321/5322).
    ///
    /// ```
    /// use careers_mailer::Address;
    ///
    /// assert!(Address::parse("jane@example.com").is_ok());
    /// assert!(Address::parse("jane").is_err());
    /// assert!(Address::parse("").is_err());
    /// ```
    pub fn parse(email: &str) -> Result<Self, MailError> {
        let email = email.trim();
        if !EmailAddress::is_valid(email) {
            return Err(MailError::InvalidAddress(format!(
                "'{}' is not a valid email address",
                email
            )));
        }

        Ok(Self {
            name: None,
            email: email.to_string(),
        })
    }

    /// Set the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The address with its domain converted to ASCII (Punycode).
    ///
    /// SMTP envelopes need ASCII domains; the local part is kept as-is.
    ///
    /// ```
    /// use careers_mailer::Address;
    ///
    /// let addr = Address::new("user@例え.jp");
    /// assert_eq!(addr.to_ascii().unwrap(), "user@xn--r8jz45g.jp");
    /// ```
    pub fn to_ascii(&self) -> Result<String, MailError> {
        let (local_part, domain) = self.email.split_once('@').ok_or_else(|| {
            MailError::InvalidAddress(format!("'{}' is missing @ symbol", self.email))
        })?;

        let ascii_domain = idna::domain_to_ascii(domain).map_err(|e| {
            MailError::InvalidAddress(format!(
                "Failed to convert domain '{}' to ASCII: {:?}",
                domain, e
            ))
        })?;

        Ok(format!("{}@{}", local_part, ascii_domain))
    }

    /// Format as "Name <email>" or just "email" if no name.
    pub fn formatted(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

fn warn_if_suspicious(email: &str) {
    if email.is_empty() || !email.contains('@') {
        tracing::warn!(
            email = %email,
            "Creating address with potentially invalid email. Use Address::parse() for strict validation."
        );
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Address {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

impl From<(&str, &str)> for Address {
    fn from((name, email): (&str, &str)) -> Self {
        Self::with_name(name, email)
    }
}

impl From<(String, String)> for Address {
    fn from((name, email): (String, String)) -> Self {
        Self::with_name(name, email)
    }
}

/// Types usable directly in [`Email`](crate::Email) builder methods.
pub trait ToAddress {
    fn to_address(&self) -> Address;
}

impl<T: ToAddress + ?Sized> ToAddress for &T {
    fn to_address(&self) -> Address {
        (*self).to_address()
    }
}

impl ToAddress for Address {
    fn to_address(&self) -> Address {
        self.clone()
    }
}

impl ToAddress for str {
    fn to_address(&self) -> Address {
        Address::new(self)
    }
}

impl ToAddress for String {
    fn to_address(&self) -> Address {
        Address::new(self)
    }
}

impl<N: AsRef<str>, E: AsRef<str>> ToAddress for (N, E) {
    fn to_address(&self) -> Address {
        Address::with_name(self.0.as_ref(), self.1.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        let addr: Address = "jane@example.com".into();
        assert_eq!(addr.email, "jane@example.com");
        assert_eq!(addr.name, None);
    }

    #[test]
    fn test_empty_name_is_dropped() {
        let addr = Address::with_name("", "jane@example.com");
        assert_eq!(addr.name, None);
        assert_eq!(addr.formatted(), "jane@example.com");
    }

    #[test]
    fn test_formatted() {
        let addr = Address::with_name("Careers", "careers@example.com");
        assert_eq!(addr.formatted(), "Careers <careers@example.com>");
        assert_eq!(format!("{}", addr), "Careers <careers@example.com>");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let addr = Address::parse("  jane@example.com ").unwrap();
        assert_eq!(addr.email, "jane@example.com");
    }

    #[test]
    fn test_to_ascii_requires_at() {
        let addr = Address::new("no-at-sign");
        assert!(matches!(addr.to_ascii(), Err(MailError::InvalidAddress(_))));
    }
}
