//! Application email dispatch tests.

use std::path::PathBuf;

use careers_mailer::providers::{EtherealClient, LocalMailer};
use careers_mailer::{
    ApplicationEmailRequest, FormData, MailError, Recipient, Transporter,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

const HR: &str = "hr@example.com";
const APPLICANT: &str = "jane@example.com";

fn request() -> ApplicationEmailRequest {
    ApplicationEmailRequest {
        applicant_email: APPLICANT.into(),
        applicant_name: "Jane Doe".into(),
        hr_email: HR.into(),
        position: "Backend Engineer".into(),
        form_data: FormData::new()
            .with("Name", "Jane Doe")
            .with("Experience", "5 years")
            .with("Relocate", true),
        resume_path: None,
        application_url: None,
    }
}

fn setup() -> (LocalMailer, Transporter) {
    let mailer = LocalMailer::new();
    let transporter = Transporter::new(mailer.clone(), ("Careers", "careers@example.com"));
    (mailer, transporter)
}

fn temp_resume(contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("resume-{}.pdf", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}

// ============================================================================
// Successful Dispatch
// ============================================================================

#[tokio::test]
async fn sends_hr_and_applicant_emails() {
    let (mailer, transporter) = setup();

    let outcome = transporter.send_application_emails(&request()).await;

    assert!(outcome.all_sent());
    assert!(outcome.failures().is_empty());
    assert_eq!(mailer.email_count(), 2);

    let hr = mailer.last_email_to(HR).unwrap().email;
    assert_eq!(hr.subject, "New application: Backend Engineer - Jane Doe");
    assert_eq!(hr.from.unwrap().email, "careers@example.com");
    assert_eq!(hr.reply_to[0].email, APPLICANT);
    let html = hr.html_body.unwrap();
    assert!(html.contains("Jane Doe"));
    assert!(html.contains(&outcome.reference_id));
    assert!(html.contains("<td"));
    assert!(html.contains("5 years"));

    let applicant = mailer.last_email_to(APPLICANT).unwrap().email;
    assert_eq!(
        applicant.subject,
        "We received your application for Backend Engineer"
    );
    assert_eq!(applicant.to[0].name.as_deref(), Some("Jane Doe"));
    let html = applicant.html_body.unwrap();
    assert!(html.contains(&outcome.reference_id));
    assert!(html.contains("Relocate"));
}

#[tokio::test]
async fn outcomes_are_hr_then_applicant() {
    let (mailer, transporter) = setup();

    let [hr, applicant] = transporter
        .send_application_emails(&request())
        .await
        .into_array();

    let hr_id = hr.unwrap().message_id;
    let applicant_id = applicant.unwrap().message_id;
    assert_ne!(hr_id, applicant_id);

    let stored_hr = mailer.last_email_to(HR).unwrap();
    assert_eq!(stored_hr.id, hr_id);
    let stored_applicant = mailer.last_email_to(APPLICANT).unwrap();
    assert_eq!(stored_applicant.id, applicant_id);
}

#[tokio::test]
async fn reference_id_comes_from_form_data() {
    let (mailer, transporter) = setup();
    let mut req = request();
    req.form_data.insert("id", "APP-2041");

    let outcome = transporter.send_application_emails(&req).await;

    assert_eq!(outcome.reference_id, "APP-2041");
    for recipient in [HR, APPLICANT] {
        let html = mailer.last_email_to(recipient).unwrap().email.html_body.unwrap();
        assert!(html.contains("APP-2041"));
    }
}

#[tokio::test]
async fn generated_reference_id_is_shared() {
    let (mailer, transporter) = setup();

    let outcome = transporter.send_application_emails(&request()).await;

    assert_eq!(outcome.reference_id.len(), 7);
    assert!(outcome
        .reference_id
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    for recipient in [HR, APPLICANT] {
        let html = mailer.last_email_to(recipient).unwrap().email.html_body.unwrap();
        assert!(html.contains(&outcome.reference_id));
    }
}

#[tokio::test]
async fn form_values_are_escaped() {
    let (mailer, transporter) = setup();
    let mut req = request();
    req.applicant_name = "<script>alert(1)</script>".into();
    req.form_data.insert("Cover letter", "Tom & Jerry <3");

    transporter.send_application_emails(&req).await;

    let html = mailer.last_email_to(HR).unwrap().email.html_body.unwrap();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("Tom &amp; Jerry &lt;3"));
}

#[tokio::test]
async fn application_link_only_when_url_given() {
    let (mailer, transporter) = setup();

    transporter.send_application_emails(&request()).await;
    let html = mailer.last_email_to(HR).unwrap().email.html_body.unwrap();
    assert!(!html.contains("href="));

    let mut req = request();
    req.application_url = Some("https://careers.example.com/applications/42".into());
    transporter.send_application_emails(&req).await;
    let html = mailer.last_email_to(HR).unwrap().email.html_body.unwrap();
    assert!(html.contains("href=\"https://careers.example.com/applications/42\""));
}

// ============================================================================
// Resume Attachment
// ============================================================================

#[tokio::test]
async fn attaches_existing_resume_to_hr_email_only() {
    let (mailer, transporter) = setup();
    let resume = temp_resume(b"%PDF-1.4 resume");
    let filename = resume.file_name().unwrap().to_str().unwrap().to_string();
    let mut req = request();
    req.resume_path = Some(resume.clone());

    let outcome = transporter.send_application_emails(&req).await;
    std::fs::remove_file(&resume).unwrap();

    assert!(outcome.all_sent());
    let hr = mailer.last_email_to(HR).unwrap().email;
    assert_eq!(hr.attachments.len(), 1);
    assert_eq!(hr.attachments[0].filename, filename);
    assert_eq!(hr.attachments[0].content_type, "application/pdf");

    let applicant = mailer.last_email_to(APPLICANT).unwrap().email;
    assert!(applicant.attachments.is_empty());
}

#[tokio::test]
async fn missing_resume_is_skipped() {
    let (mailer, transporter) = setup();
    let mut req = request();
    req.resume_path = Some("/definitely/not/here/resume.pdf".into());

    let outcome = transporter.send_application_emails(&req).await;

    assert!(outcome.all_sent());
    assert!(mailer.last_email_to(HR).unwrap().email.attachments.is_empty());
}

// ============================================================================
// Failure Isolation
// ============================================================================

#[tokio::test]
async fn hr_failure_does_not_block_applicant() {
    let (mailer, transporter) = setup();
    mailer.fail_for(HR, "mailbox unavailable");

    let outcome = transporter.send_application_emails(&request()).await;

    assert!(!outcome.all_sent());
    assert!(matches!(outcome.hr, Err(MailError::SendError(ref m)) if m == "mailbox unavailable"));
    assert!(outcome.applicant.is_ok());

    let failures = outcome.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, Recipient::Hr);

    assert!(!mailer.sent_to(HR));
    assert!(mailer.sent_to(APPLICANT));
}

#[tokio::test]
async fn applicant_failure_does_not_block_hr() {
    let (mailer, transporter) = setup();
    mailer.fail_for(APPLICANT, "recipient rejected");

    let outcome = transporter.send_application_emails(&request()).await;

    assert!(outcome.hr.is_ok());
    assert!(outcome.applicant.is_err());
    assert_eq!(outcome.failures()[0].0, Recipient::Applicant);
    assert!(mailer.sent_to(HR));
    assert!(!mailer.sent_to(APPLICANT));
}

#[tokio::test]
async fn both_failures_are_reported() {
    let (mailer, transporter) = setup();
    mailer.set_failure("connection refused");

    let outcome = transporter.send_application_emails(&request()).await;

    let recipients: Vec<Recipient> = outcome.failures().into_iter().map(|(r, _)| r).collect();
    assert_eq!(recipients, vec![Recipient::Hr, Recipient::Applicant]);
    assert!(!mailer.has_emails());
}

#[tokio::test]
async fn malformed_applicant_address_still_notifies_hr() {
    let (mailer, transporter) = setup();
    let mut req = request();
    req.applicant_email = "jane-at-example.com".into();

    let outcome = transporter.send_application_emails(&req).await;

    assert!(outcome.hr.is_ok());
    assert!(matches!(outcome.applicant, Err(MailError::InvalidAddress(_))));
    assert_eq!(outcome.failures()[0].0, Recipient::Applicant);

    let hr = mailer.last_email_to(HR).unwrap().email;
    assert!(hr.reply_to.is_empty());
    assert!(hr.html_body.unwrap().contains("jane-at-example.com"));
    assert_eq!(mailer.email_count(), 1);
}

#[tokio::test]
async fn malformed_hr_address_still_confirms_applicant() {
    let (mailer, transporter) = setup();
    let mut req = request();
    req.hr_email = "not-an-address".into();

    let outcome = transporter.send_application_emails(&req).await;

    assert!(matches!(outcome.hr, Err(MailError::InvalidAddress(_))));
    assert!(outcome.applicant.is_ok());
    assert!(mailer.sent_to(APPLICANT));
    assert_eq!(mailer.email_count(), 1);
}

#[tokio::test]
async fn both_addresses_malformed_sends_nothing() {
    let (mailer, transporter) = setup();
    let mut req = request();
    req.hr_email = String::new();
    req.applicant_email = "jane".into();

    let outcome = transporter.send_application_emails(&req).await;

    assert_eq!(outcome.failures().len(), 2);
    assert!(!mailer.has_emails());
}

// ============================================================================
// Sandbox Previews
// ============================================================================

#[tokio::test]
async fn sandbox_results_carry_preview_urls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "user": "kim.lowe@ethereal.email",
            "pass": "p4ssw0rd",
            "smtp": { "host": "smtp.ethereal.email", "port": 587, "secure": false },
            "web": "https://ethereal.email"
        })))
        .mount(&server)
        .await;

    let account = EtherealClient::new()
        .base_url(server.uri())
        .create_test_account()
        .await
        .unwrap();
    let transporter =
        Transporter::new(LocalMailer::new(), "careers@example.com").with_sandbox_account(account);

    let outcome = transporter.send_application_emails(&request()).await;

    for result in outcome.into_array() {
        let delivery = result.unwrap();
        assert_eq!(
            delivery.preview_url.as_deref(),
            Some(format!("https://ethereal.email/message/{}", delivery.message_id).as_str())
        );
    }
}
