//! Assertion helpers over [`LocalMailer`].
//!
//! Helpers that take a recipient look only at emails addressed to it, which
//! keeps HR and applicant messages apart.
//!
//! ```rust,ignore
//! use careers_mailer::providers::LocalMailer;
//! use careers_mailer::testing::*;
//!
//! assert_email_count(&mailer, 2);
//! assert_email_to(&mailer, "hr@example.com");
//! assert_email_has_attachment(&mailer, "hr@example.com", "resume.pdf");
//! assert_email_html_matches(&mailer, "jane@example.com", r"Reference ID:</strong> [0-9A-Z]{7}");
//! ```

use regex::Regex;

use crate::providers::LocalMailer;
use crate::storage::StoredEmail;

fn format_email_summary(emails: &[StoredEmail]) -> String {
    if emails.is_empty() {
        return "  (no emails sent)".to_string();
    }

    emails
        .iter()
        .enumerate()
        .map(|(i, stored)| {
            let to = stored
                .email
                .to
                .iter()
                .map(|a| a.email.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "  {}. To: [{}], Subject: \"{}\", Attachments: {}",
                i + 1,
                to,
                stored.email.subject,
                stored.email.attachments.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn last_email_to(mailer: &LocalMailer, recipient: &str) -> StoredEmail {
    mailer.last_email_to(recipient).unwrap_or_else(|| {
        panic!(
            "Expected an email to be sent to '{}'.\n\nEmails sent:\n{}",
            recipient,
            format_email_summary(&mailer.emails())
        )
    })
}

/// Assert that exactly N emails were captured.
pub fn assert_email_count(mailer: &LocalMailer, expected: usize) {
    let actual = mailer.email_count();
    assert!(
        actual == expected,
        "Expected {} email(s) to be sent, but {} were sent.\n\nEmails sent:\n{}",
        expected,
        actual,
        format_email_summary(&mailer.emails())
    );
}

/// Assert that an email was sent to `recipient`.
pub fn assert_email_to(mailer: &LocalMailer, recipient: &str) {
    last_email_to(mailer, recipient);
}

/// Assert that no email was sent to `recipient`.
pub fn refute_email_to(mailer: &LocalMailer, recipient: &str) {
    if let Some(found) = mailer.last_email_to(recipient) {
        panic!(
            "Expected no email to be sent to '{}', but found one with subject \"{}\".\n\nEmails sent:\n{}",
            recipient,
            found.email.subject,
            format_email_summary(&mailer.emails())
        );
    }
}

/// Assert that the latest email to `recipient` has a subject containing `text`.
pub fn assert_email_subject_contains(mailer: &LocalMailer, recipient: &str, text: &str) {
    let stored = last_email_to(mailer, recipient);
    assert!(
        stored.email.subject.contains(text),
        "Expected subject of email to '{}' to contain '{}', got \"{}\"",
        recipient,
        text,
        stored.email.subject
    );
}

/// Assert that the latest email to `recipient` has an HTML body containing `text`.
pub fn assert_email_html_contains(mailer: &LocalMailer, recipient: &str, text: &str) {
    let stored = last_email_to(mailer, recipient);
    let html = stored.email.html_body.as_deref().unwrap_or_default();
    assert!(
        html.contains(text),
        "Expected HTML body of email to '{}' to contain '{}'.\n\nBody:\n{}",
        recipient,
        text,
        html
    );
}

/// Assert that the latest email to `recipient` has an HTML body matching `pattern`.
///
/// # Panics
///
/// Panics if the pattern is invalid or does not match.
pub fn assert_email_html_matches(mailer: &LocalMailer, recipient: &str, pattern: &str) {
    let re = Regex::new(pattern)
        .unwrap_or_else(|e| panic!("Invalid regex pattern '{}': {}", pattern, e));
    let stored = last_email_to(mailer, recipient);
    let html = stored.email.html_body.as_deref().unwrap_or_default();
    assert!(
        re.is_match(html),
        "Expected HTML body of email to '{}' to match /{}/.\n\nBody:\n{}",
        recipient,
        pattern,
        html
    );
}

/// Assert that the latest email to `recipient` carries an attachment named `filename`.
pub fn assert_email_has_attachment(mailer: &LocalMailer, recipient: &str, filename: &str) {
    let stored = last_email_to(mailer, recipient);
    let names: Vec<&str> = stored
        .email
        .attachments
        .iter()
        .map(|a| a.filename.as_str())
        .collect();
    assert!(
        names.contains(&filename),
        "Expected email to '{}' to have attachment '{}', found {:?}",
        recipient,
        filename,
        names
    );
}

/// Assert that the latest email to `recipient` has no attachments.
pub fn refute_email_has_attachments(mailer: &LocalMailer, recipient: &str) {
    let stored = last_email_to(mailer, recipient);
    assert!(
        stored.email.attachments.is_empty(),
        "Expected email to '{}' to have no attachments, found {}",
        recipient,
        stored.email.attachments.len()
    );
}
