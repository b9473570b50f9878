//! Click-and-verify scenarios. Time is paused so the 15 s response window
//! and the settle delay elapse instantly.

use job_autoapply::fakes::{text_input, MemoryForm, SubmitScript};
use job_autoapply::submit::{SubmissionConfig, SubmissionValidator, SubmissionVerdict};
use job_autoapply::surface::{ControlKey, FormSurface, ValidationError};
use tempfile::TempDir;

fn validator(dir: &TempDir) -> SubmissionValidator {
    SubmissionValidator::new(SubmissionConfig {
        artifact_dir: dir.path().to_path_buf(),
        ..SubmissionConfig::default()
    })
}

fn form(script: SubmitScript) -> MemoryForm {
    MemoryForm::new("https://boards.example.com/acme/jobs/4012345")
        .with_control(text_input("phone", "Phone"))
        .with_submit_button("submit_app")
        .with_body("Apply for Performance Marketing Lead")
        .on_submit(script)
}

async fn submit(form: &MemoryForm, dir: &TempDir) -> SubmissionVerdict {
    let key = ControlKey::new("submit_app");
    validator(dir).submit(form, "GH-4012345", form.click(&key)).await
}

#[tokio::test(start_paused = true)]
async fn accepted_response_confirms() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(SubmitScript::responds(200));

    let verdict = submit(&form, &dir).await;
    assert!(verdict.success(), "{}", verdict.reason());
    assert_eq!(verdict.http_status(), Some(200));
    assert!(verdict.reason().contains("accepted by server (HTTP 200)"));
}

#[tokio::test(start_paused = true)]
async fn new_validation_errors_override_a_success_status() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(
        SubmitScript::responds(200)
            .with_errors_after(vec![ValidationError::new("phone", "Phone is required")])
            .with_body_after("Thank you for applying!"),
    );

    let verdict = submit(&form, &dir).await;
    assert!(!verdict.success());
    assert!(
        verdict.reason().starts_with("New validation errors after submit"),
        "{}",
        verdict.reason()
    );
    assert!(verdict.reason().contains("Phone is required"));
    assert_eq!(verdict.http_status(), Some(200));
}

#[tokio::test(start_paused = true)]
async fn errors_present_before_the_click_do_not_count() {
    let dir = tempfile::tempdir().unwrap();
    let stale = ValidationError::new("", "Please review the highlighted fields");
    let form = form(SubmitScript::responds(201).with_errors_after(vec![stale.clone()]))
        .with_validation(vec![stale]);

    let verdict = submit(&form, &dir).await;
    assert!(verdict.success(), "{}", verdict.reason());
}

#[tokio::test(start_paused = true)]
async fn error_status_rejects() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(SubmitScript::responds(422));

    let verdict = submit(&form, &dir).await;
    assert!(!verdict.success());
    assert_eq!(verdict.http_status(), Some(422));
    assert_eq!(verdict.reason(), "Submission rejected by server (HTTP 422)");
}

#[tokio::test(start_paused = true)]
async fn silence_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(SubmitScript::default());

    let verdict = submit(&form, &dir).await;
    assert!(!verdict.success());
    assert_eq!(verdict.http_status(), None);
    assert_eq!(
        verdict.reason(),
        "No submission request or confirmation signal detected"
    );
}

#[tokio::test(start_paused = true)]
async fn pending_request_with_confirmation_text_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(SubmitScript::unanswered().with_body_after("Application received. We'll be in touch."));

    let verdict = submit(&form, &dir).await;
    assert!(verdict.success(), "{}", verdict.reason());
    assert_eq!(verdict.http_status(), None);
    assert!(verdict.reason().contains("DOM"));
    assert!(verdict.reason().contains("application received"));
}

#[tokio::test(start_paused = true)]
async fn pending_request_without_confirmation_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(SubmitScript::unanswered());

    let verdict = submit(&form, &dir).await;
    assert!(!verdict.success());
    assert_eq!(
        verdict.reason(),
        "Submission request sent but no response or confirmation within 15s"
    );
}

#[tokio::test(start_paused = true)]
async fn confirmation_url_counts_only_when_it_changed() {
    let dir = tempfile::tempdir().unwrap();
    let moved = form(SubmitScript::default().with_url_after("https://boards.example.com/acme/jobs/4012345/confirmation"));
    let verdict = submit(&moved, &dir).await;
    assert!(verdict.success(), "{}", verdict.reason());
    assert!(verdict.reason().contains("URL token \"confirmation\""));

    let stayed = MemoryForm::new("https://jobs.example.com/success-stories/apply")
        .with_submit_button("submit_app")
        .on_submit(SubmitScript::default());
    let verdict = submit(&stayed, &dir).await;
    assert!(!verdict.success());
}

#[tokio::test(start_paused = true)]
async fn failed_click_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(SubmitScript {
        click_fails: true,
        ..SubmitScript::responds(200)
    });

    let verdict = submit(&form, &dir).await;
    assert!(!verdict.success());
    assert!(verdict.reason().contains("click failed"), "{}", verdict.reason());
}

#[tokio::test(start_paused = true)]
async fn confirmation_copy_already_on_the_page_does_not_confirm_a_failed_click() {
    let dir = tempfile::tempdir().unwrap();
    let form = MemoryForm::new("https://boards.example.com/acme/jobs/4012345")
        .with_submit_button("submit_app")
        .with_body("Paid Media Manager. Thank you for your application interest in Acme!")
        .with_element(".thank-you")
        .on_submit(SubmitScript {
            click_fails: true,
            ..SubmitScript::default()
        });

    let verdict = submit(&form, &dir).await;
    assert!(!verdict.success(), "{}", verdict.reason());
    assert!(verdict.reason().contains("click failed"), "{}", verdict.reason());
}

#[tokio::test(start_paused = true)]
async fn confirmation_copy_already_on_the_page_is_not_a_signal() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(SubmitScript::default()).with_body("Thank you for applying to Acme roles before!");

    let verdict = submit(&form, &dir).await;
    assert!(!verdict.success(), "{}", verdict.reason());
    assert_eq!(
        verdict.reason(),
        "No submission request or confirmation signal detected"
    );
}

#[tokio::test(start_paused = true)]
async fn confirmation_container_confirms_a_pending_request() {
    let dir = tempfile::tempdir().unwrap();
    let form = form(SubmitScript::unanswered().with_element_after("#application_confirmation"));

    let verdict = submit(&form, &dir).await;
    assert!(verdict.success(), "{}", verdict.reason());
    assert_eq!(verdict.http_status(), None);
    assert!(
        verdict.reason().contains("container `#application_confirmation`"),
        "{}",
        verdict.reason()
    );
}

#[tokio::test(start_paused = true)]
async fn network_watch_is_released_and_artifact_captured() {
    let dir = tempfile::tempdir().unwrap();
    for script in [
        SubmitScript::responds(200),
        SubmitScript::responds(500),
        SubmitScript::unanswered(),
        SubmitScript::default(),
    ] {
        let form = form(script);
        let verdict = submit(&form, &dir).await;
        assert_eq!(form.watches_opened(), 1);
        assert_eq!(form.active_watches(), 0);

        let captures = form.captures();
        assert_eq!(captures.len(), 1);
        assert_eq!(verdict.diagnostic_artifact_paths(), captures.as_slice());
        assert!(captures[0].starts_with(dir.path()));
    }
}
