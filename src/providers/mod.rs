//! Mail transports.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SmtpMailer`] | Pooled SMTP via lettre ([`Mailer`](crate::Mailer)) |
//! | [`LocalMailer`] | In-memory capture for development and tests ([`Mailer`](crate::Mailer)) |
//! | [`EtherealClient`] | Disposable sandbox accounts, delivered to through [`SmtpMailer`] |

mod ethereal;
pub use ethereal::{test_message_url, EtherealClient, SmtpEndpoint, TestAccount};

mod smtp;
pub use smtp::{SmtpBuilder, SmtpMailer, TlsMode};

mod local;
pub use local::LocalMailer;
