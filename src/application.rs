//! Job-application emails.
//!
//! One submitted application produces two messages:
//!
//! - an HR notification with the applicant's details, the submitted form
//!   and, when available, the resume as an attachment;
//! - a confirmation to the applicant echoing the same form.
//!
//! Both share a reference id and submission time. They are sent
//! concurrently and each outcome is reported on its own, so an HR mailbox
//! outage never keeps the applicant from getting a confirmation.
//!
//! Every value interpolated into HTML is escaped; form field names and
//! values come straight from the applicant.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use crate::address::Address;
use crate::attachment::Attachment;
use crate::email::Email;
use crate::error::MailError;
use crate::mailer::DeliveryResult;
use crate::transport::Transporter;

const REFERENCE_ID_LEN: usize = 7;
const REFERENCE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Data collected from an application form.
///
/// Deserializes from the JSON the HTTP layer receives (camelCase keys).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationEmailRequest {
    pub applicant_email: String,
    pub applicant_name: String,
    pub hr_email: String,
    pub position: String,
    #[serde(default)]
    pub form_data: FormData,
    /// Uploaded resume on local disk.
    #[serde(default)]
    pub resume_path: Option<PathBuf>,
    /// Link to the application in the back office.
    #[serde(default)]
    pub application_url: Option<String>,
}

/// Form fields in submission order.
///
/// Accepts a JSON object or `null` (treated as empty).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData(Vec<(String, Value)>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Builder form of [`FormData::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = FormData::new();
        for (key, value) in iter {
            data.insert(key, value);
        }
        data
    }
}

impl Serialize for FormData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FormData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FormDataVisitor;

        impl<'de> Visitor<'de> for FormDataVisitor {
            type Value = FormData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of form fields or null")
            }

            fn visit_none<E: de::Error>(self) -> Result<FormData, E> {
                Ok(FormData::new())
            }

            fn visit_unit<E: de::Error>(self) -> Result<FormData, E> {
                Ok(FormData::new())
            }

            fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FormData, D::Error> {
                deserializer.deserialize_map(self)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FormData, A::Error> {
                let mut data = FormData::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    data.insert(key, value);
                }
                Ok(data)
            }
        }

        deserializer.deserialize_option(FormDataVisitor)
    }
}

/// Text shown for a form value: strings as-is, `null` as empty, anything
/// else in its JSON form.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render form fields as an HTML table, one row per field.
///
/// Empty form data renders as an empty string.
pub fn render_form_table(data: &FormData) -> String {
    if data.is_empty() {
        return String::new();
    }

    let rows: String = data
        .iter()
        .map(|(key, value)| {
            format!(
                "<tr><td style=\"padding:6px 12px;border:1px solid #ddd;font-weight:bold\">{}</td>\
                 <td style=\"padding:6px 12px;border:1px solid #ddd\">{}</td></tr>",
                escape_html(key),
                escape_html(&display_value(value))
            )
        })
        .collect();

    format!(
        "<table style=\"border-collapse:collapse;width:100%\">{}</table>",
        rows
    )
}

/// `form_data["id"]` when present and non-empty, otherwise a fresh token.
pub fn reference_id(data: &FormData) -> String {
    data.get("id")
        .map(display_value)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_reference_id)
}

/// Random 7-character token over `[0-9A-Z]`. Not guaranteed unique.
pub fn generate_reference_id() -> String {
    let mut n = uuid::Uuid::new_v4().as_u128();
    (0..REFERENCE_ID_LEN)
        .map(|_| {
            let c = REFERENCE_ALPHABET[(n % 36) as usize] as char;
            n /= 36;
            c
        })
        .collect()
}

fn format_submitted_at(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y at %-I:%M %p UTC").to_string()
}

/// The two messages composed for one application.
///
/// Each message is built on its own: an unusable recipient address fails
/// only the message addressed to it.
#[derive(Debug, Clone)]
pub struct ApplicationEmails {
    pub reference_id: String,
    pub submitted_at: String,
    pub hr: Result<Email, MailError>,
    pub applicant: Result<Email, MailError>,
}

/// Build both messages without sending anything.
///
/// A resume path that does not point to an existing file is skipped.
pub fn compose(request: &ApplicationEmailRequest) -> ApplicationEmails {
    compose_at(request, Utc::now())
}

fn compose_at(request: &ApplicationEmailRequest, now: DateTime<Utc>) -> ApplicationEmails {
    let applicant_address = Address::parse(&request.applicant_email).map(|addr| {
        match request.applicant_name.trim() {
            "" => addr,
            name => addr.name(name),
        }
    });

    let reference_id = reference_id(&request.form_data);
    let submitted_at = format_submitted_at(now);
    let table = render_form_table(&request.form_data);

    let name = escape_html(&request.applicant_name);
    let position = escape_html(&request.position);
    let reference = escape_html(&reference_id);

    let hr = Address::parse(&request.hr_email).map(|hr_address| {
        let link = request
            .application_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| {
                format!(
                    "<p><a href=\"{}\">View the full application</a></p>",
                    escape_html(url)
                )
            })
            .unwrap_or_default();

        let hr_html = format!(
            "<h2>New application for {position}</h2>\
             <p><strong>Applicant:</strong> {name} &lt;{email}&gt;</p>\
             <p><strong>Reference ID:</strong> {reference}</p>\
             <p><strong>Submitted:</strong> {submitted_at}</p>\
             {table}{link}",
            email = escape_html(request.applicant_email.trim()),
        );

        let mut hr = Email::new()
            .to(hr_address)
            .subject(format!(
                "New application: {} - {}",
                request.position, request.applicant_name
            ))
            .html_body(hr_html);

        // Replies go to the applicant only when their address is usable
        if let Ok(applicant) = &applicant_address {
            hr = hr.reply_to(applicant.clone());
        }

        if let Some(path) = request.resume_path.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            match Attachment::from_path(path) {
                Ok(resume) => hr = hr.attachment(resume),
                Err(e) => tracing::debug!(error = %e, "Resume not found, sending without attachment"),
            }
        }
        hr
    });

    let applicant = applicant_address.map(|applicant_address| {
        let applicant_html = format!(
            "<h2>Thank you for applying, {name}!</h2>\
             <p>We have received your application for <strong>{position}</strong>.</p>\
             <p><strong>Reference ID:</strong> {reference}</p>\
             <p><strong>Submitted:</strong> {submitted_at}</p>\
             <p>Here is a copy of the information you submitted:</p>\
             {table}\
             <p>Our team will review your application and get back to you.</p>"
        );

        Email::new()
            .to(applicant_address)
            .subject(format!(
                "We received your application for {}",
                request.position
            ))
            .html_body(applicant_html)
    });

    ApplicationEmails {
        reference_id,
        submitted_at,
        hr,
        applicant,
    }
}

/// Which of the two application messages an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Hr,
    Applicant,
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Hr => f.write_str("hr"),
            Recipient::Applicant => f.write_str("applicant"),
        }
    }
}

/// Per-message results of an application dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Reference id shared by both messages
    pub reference_id: String,
    pub hr: Result<DeliveryResult, MailError>,
    pub applicant: Result<DeliveryResult, MailError>,
}

impl DispatchOutcome {
    /// Outcomes in fixed order: `[hr, applicant]`.
    pub fn into_array(self) -> [Result<DeliveryResult, MailError>; 2] {
        [self.hr, self.applicant]
    }

    /// Whether both messages were accepted.
    pub fn all_sent(&self) -> bool {
        self.hr.is_ok() && self.applicant.is_ok()
    }

    /// Failed sends, HR first.
    pub fn failures(&self) -> Vec<(Recipient, &MailError)> {
        [
            (Recipient::Hr, self.hr.as_ref().err()),
            (Recipient::Applicant, self.applicant.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(recipient, err)| err.map(|e| (recipient, e)))
        .collect()
    }
}

async fn send_composed(
    transporter: &Transporter,
    email: Result<Email, MailError>,
) -> Result<DeliveryResult, MailError> {
    transporter.send(&email?).await
}

pub(crate) async fn dispatch(
    transporter: &Transporter,
    request: &ApplicationEmailRequest,
) -> DispatchOutcome {
    let emails = compose(request);

    let span = tracing::info_span!(
        "mailer.send_application_emails",
        position = %request.position,
        reference_id = %emails.reference_id,
    );

    async move {
        let (hr, applicant) = tokio::join!(
            send_composed(transporter, emails.hr),
            send_composed(transporter, emails.applicant)
        );

        let outcome = DispatchOutcome {
            reference_id: emails.reference_id,
            hr,
            applicant,
        };
        for (recipient, err) in outcome.failures() {
            tracing::error!(recipient = %recipient, error = %err, "Application email failed");
        }
        outcome
    }
    .instrument(span)
    .await
}
