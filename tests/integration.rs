//! Live Chrome checks of the page scripts. They need a local Chrome, so they
//! are ignored by default: `cargo test -- --ignored`.

use job_autoapply::fakes::ScriptedAnswers;
use job_autoapply::form::{fields_from_scan, FieldKind};
use job_autoapply::jobs::JobPosting;
use job_autoapply::profile::CandidateProfile;
use job_autoapply::submit::{SubmissionConfig, SubmissionValidator, SubmitLocators};
use job_autoapply::surface::{ControlKey, FormSurface};
use job_autoapply::{CustomQuestionRouter, DeterministicFiller, Page, PortalBrowser};

const FORM: &str = r#"<html><body>
<form onsubmit="event.preventDefault(); document.body.innerText = 'Thank you for applying';">
  <label for="fn">First Name *</label><input id="fn" name="first_name">
  <label>Email <input name="email" type="email"></label>
  <input name="website" style="display:none">
  <input type="hidden" name="authenticity_token" value="abc">
  <div class="field"><label>Why do you want this job?</label><textarea name="q_why"></textarea></div>
  <fieldset><legend>Willing to relocate?</legend>
    <input type="radio" name="relocate" value="y" aria-label="Yes">
    <input type="radio" name="relocate" value="n" aria-label="No">
  </fieldset>
  <label for="notice">Notice period</label>
  <select id="notice" name="notice"><option value="">Select...</option><option value="1m">One month</option></select>
  <input type="file" name="resume" aria-label="Resume">
  <button type="submit">Submit application</button>
</form></body></html>"#;

async fn open(browser: &PortalBrowser) -> Page {
    let page = browser.open_page().await.expect("Failed to open page");
    page.navigate(&format!("data:text/html;charset=utf-8,{FORM}"))
        .await
        .expect("Failed to load form");
    page
}

async fn launch() -> PortalBrowser {
    PortalBrowser::builder()
        .headless(true)
        .build()
        .await
        .expect("Failed to launch browser")
}

#[tokio::test]
#[ignore = "needs a local Chrome"]
async fn scan_resolves_labels_and_skips_hidden_inputs() {
    let browser = launch().await;
    let page = open(&browser).await;

    let fields = fields_from_scan(page.scan().await.expect("scan failed"), 8);
    let question = |name: &str| {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.question().to_string())
    };
    assert_eq!(question("first_name").as_deref(), Some("First Name"));
    assert_eq!(question("email").as_deref(), Some("Email"));
    assert_eq!(question("q_why").as_deref(), Some("Why do you want this job?"));
    assert_eq!(question("notice").as_deref(), Some("Notice period"));
    assert!(fields.iter().all(|f| f.name != "website" && f.name != "authenticity_token"));
    assert_eq!(
        fields.iter().filter(|f| f.kind == FieldKind::Radio).count(),
        2
    );
    assert!(fields.iter().any(|f| f.kind == FieldKind::File));
}

#[tokio::test]
#[ignore = "needs a local Chrome"]
async fn fill_answer_and_confirm_through_the_dom() {
    let browser = launch().await;
    let page = open(&browser).await;
    let profile = CandidateProfile {
        first_name: "Ada".into(),
        email: "ada@example.com".into(),
        ..Default::default()
    };

    DeterministicFiller::default()
        .fill_standard_fields(&page, &profile)
        .await
        .expect("fill failed");
    let answers = ScriptedAnswers::new().text("Because it is paid media.").choice("1m");
    let qa = CustomQuestionRouter::default()
        .answer_custom_questions(&page, &answers, &profile, &JobPosting::default())
        .await
        .expect("routing failed");
    assert_eq!(qa.len(), 2);

    let fields = fields_from_scan(page.scan().await.expect("scan failed"), 8);
    let key_of = |name: &str| -> ControlKey {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.key.clone())
            .expect("field present")
    };
    assert_eq!(
        page.read_value(&key_of("first_name")).await.unwrap().as_deref(),
        Some("Ada")
    );
    assert_eq!(
        page.read_value(&key_of("notice")).await.unwrap().as_deref(),
        Some("1m")
    );

    let dir = tempfile::tempdir().unwrap();
    let validator = SubmissionValidator::new(SubmissionConfig {
        artifact_dir: dir.path().to_path_buf(),
        ..SubmissionConfig::default()
    });
    let submit = SubmitLocators::default()
        .locate(&page)
        .await
        .expect("submit button");
    let verdict = validator.submit(&page, "data-form", page.click(&submit)).await;
    assert!(verdict.success(), "{}", verdict.reason());
    assert!(verdict.reason().contains("thank you for applying"));
    assert_eq!(verdict.diagnostic_artifact_paths().len(), 1);

    browser.close().await.expect("close failed");
}
