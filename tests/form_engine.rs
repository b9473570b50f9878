//! Filling and routing scenarios against the in-memory form.

use std::collections::HashSet;

use futures::StreamExt;

use job_autoapply::config::EngineConfig;
use job_autoapply::fakes::{
    checkbox, file_input, picker, radio, select, text_input, textarea, MemoryForm, ScriptedAnswers,
};
use job_autoapply::form::{fields_from_scan, Bucket, Classifier, Partition};
use job_autoapply::jobs::JobPosting;
use job_autoapply::profile::CandidateProfile;
use job_autoapply::surface::{FormSurface, RawControl, SelectOption};
use job_autoapply::{CustomQuestionRouter, DeterministicFiller};

fn profile() -> CandidateProfile {
    CandidateProfile {
        first_name: "Ada".into(),
        last_name: "Quinn".into(),
        email: "ada@example.com".into(),
        phone: "+49 30 1234567".into(),
        linkedin_url: "https://www.linkedin.com/in/adaquinn".into(),
        location: "Berlin".into(),
        summary: "Eight years in paid media and lifecycle marketing.".into(),
        skills: vec!["Google Ads".into(), "HubSpot".into()],
    }
}

fn job() -> JobPosting {
    JobPosting {
        job_id: "GH-4012345".into(),
        company: "Acme".into(),
        role: "Performance Marketing Lead".into(),
        location: "Remote".into(),
        apply_url: "https://boards.example.com/acme/jobs/4012345".into(),
        description: "Own paid acquisition across Google and Meta.".into(),
        source: "greenhouse".into(),
    }
}

/// Router with a short picker wait so empty panels resolve quickly.
fn router() -> CustomQuestionRouter {
    CustomQuestionRouter::new(
        Classifier::default(),
        EngineConfig {
            picker_wait: std::time::Duration::from_millis(50),
            picker_poll: std::time::Duration::from_millis(10),
            ..EngineConfig::default()
        },
    )
}

fn blocked_controls() -> Vec<RawControl> {
    vec![
        text_input("honeypot_text", "Leave this field blank"),
        textarea("hp_field_notes", "Comments"),
        select("captcha_choice", "Pick the bicycle"),
        picker("utm_source_picker", "Where did you hear about us?"),
        checkbox("bot_field_check", "Robot?"),
        radio("csrf_radio_a", "csrf_radio", "A"),
        file_input("recaptcha_upload", "Upload"),
    ]
}

fn application_form() -> MemoryForm {
    let mut form = MemoryForm::new("https://boards.example.com/acme/jobs/4012345")
        .with_control(text_input("first_name", "First Name"))
        .with_control(text_input("last_name", "Last Name"))
        .with_control(text_input("email", "Email"))
        .with_control(text_input("phone", "Phone"))
        .with_control(text_input("linkedin", "LinkedIn Profile"))
        .with_control(file_input("resume", "Resume/CV"))
        .with_control(checkbox("privacy_consent", "I agree to the privacy policy"))
        .with_control(radio("relocate_yes", "relocate", "Yes"))
        .with_control(radio("relocate_no", "relocate", "No"))
        .with_control(textarea("why_acme", "Why do you want to work at Acme?"))
        .with_control(select("notice", "What is your notice period?"))
        .with_options(
            "notice",
            vec![
                SelectOption::new("", "Select..."),
                SelectOption::new("1m", "One month"),
                SelectOption::new("3m", "Three months"),
            ],
        )
        .with_control(picker("office", "Which office would you join?"))
        .with_picker_catalog("office", &["Amsterdam", "Berlin, Germany", "Bern"]);
    for raw in blocked_controls() {
        form = form.with_control(raw);
    }
    form
}

#[tokio::test]
async fn blocked_fields_are_never_touched_whatever_their_kind() {
    let form = application_form();
    let answers = ScriptedAnswers::new().text("Because.").choice("1m").term("Berlin");

    DeterministicFiller::default()
        .fill_standard_fields(&form, &profile())
        .await
        .unwrap();
    router()
        .answer_custom_questions(&form, &answers, &profile(), &job())
        .await
        .unwrap();

    for raw in blocked_controls() {
        assert!(!form.touched(raw.key.as_str()), "{} was touched", raw.key);
    }
    assert!(
        !answers.asked().iter().any(|q| q.contains("hear about us")),
        "blocked picker reached the answer provider"
    );
    assert!(form.touched("first_name"));
    assert!(form.touched("why_acme"));
}

#[tokio::test]
async fn every_field_lands_in_exactly_one_bucket() {
    let form = application_form()
        .with_control(RawControl {
            picker_shadow: true,
            ..text_input("office_search", "Which office would you join?")
        });
    let raw = form.scan().await.unwrap();
    let expected: HashSet<String> = raw.iter().map(|r| r.key.to_string()).collect();

    let partition = Partition::build(fields_from_scan(raw, 8), &Classifier::default());
    let keys: Vec<String> = partition.iter().map(|r| r.field.key.to_string()).collect();
    let unique: HashSet<String> = keys.iter().cloned().collect();
    assert_eq!(keys.len(), unique.len(), "a field was routed twice");
    assert_eq!(unique, expected);

    let bucket_of = |key: &str| {
        partition
            .iter()
            .find(|r| r.field.key.as_str() == key)
            .map(|r| r.bucket)
    };
    assert_eq!(bucket_of("email"), Some(Bucket::Standard));
    assert_eq!(bucket_of("privacy_consent"), Some(Bucket::Standard));
    assert_eq!(bucket_of("why_acme"), Some(Bucket::CustomText));
    assert_eq!(bucket_of("notice"), Some(Bucket::CustomSelect));
    assert_eq!(bucket_of("office"), Some(Bucket::CustomPicker));
    assert_eq!(bucket_of("office_search"), Some(Bucket::Skipped));
    assert_eq!(bucket_of("resume"), Some(Bucket::Skipped));
    assert_eq!(bucket_of("honeypot_text"), Some(Bucket::Skipped));
}

#[tokio::test]
async fn standard_fill_writes_profile_values_once() {
    let form = application_form().with_value("email", "already@there.io");
    let filler = DeterministicFiller::default();

    let first = filler.fill_standard_fields(&form, &profile()).await.unwrap();
    assert_eq!(form.value_of("first_name").as_deref(), Some("Ada"));
    assert_eq!(form.value_of("last_name").as_deref(), Some("Quinn"));
    assert_eq!(form.value_of("phone").as_deref(), Some("+49 30 1234567"));
    assert_eq!(
        form.value_of("linkedin").as_deref(),
        Some("https://www.linkedin.com/in/adaquinn")
    );
    assert_eq!(form.value_of("email").as_deref(), Some("already@there.io"));
    assert_eq!(form.write_count("email"), 0);
    assert!(form.is_checked("privacy_consent"));
    assert!(form.is_checked("relocate_yes"));
    assert!(!form.is_checked("relocate_no"));
    assert_eq!(first.failures, 0);

    let writes_after_first = form.total_writes();
    let second = filler.fill_standard_fields(&form, &profile()).await.unwrap();
    assert_eq!(second.filled, 0);
    assert_eq!(form.total_writes(), writes_after_first);
}

#[tokio::test]
async fn write_failures_are_counted_not_raised() {
    let form = application_form().failing("phone");
    let report = DeterministicFiller::default()
        .fill_standard_fields(&form, &profile())
        .await
        .unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(form.value_of("first_name").as_deref(), Some("Ada"));
}

#[tokio::test]
async fn custom_questions_are_answered_per_widget() {
    let form = application_form();
    let answers = ScriptedAnswers::new()
        .text("  I have run Acme-sized budgets before.  ")
        .choice("3m")
        .term("Berlin");

    let qa = router()
        .answer_custom_questions(&form, &answers, &profile(), &job())
        .await
        .unwrap();

    assert_eq!(
        form.value_of("why_acme").as_deref(),
        Some("I have run Acme-sized budgets before.")
    );
    assert_eq!(form.value_of("notice").as_deref(), Some("3m"));
    assert_eq!(form.value_of("office").as_deref(), Some("Berlin, Germany"));

    let pairs: Vec<(&str, &str)> = qa
        .iter()
        .map(|e| (e.question.as_str(), e.answer.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Why do you want to work at Acme?", "I have run Acme-sized budgets before."),
            ("What is your notice period?", "Three months"),
            ("Which office would you join?", "Berlin, Germany"),
        ]
    );
}

#[tokio::test]
async fn answers_follow_the_order_questions_appear_on_the_page() {
    let form = MemoryForm::new("https://jobs.example.com/apply")
        .with_control(select("work_auth", "Are you authorised to work in the EU?"))
        .with_options(
            "work_auth",
            vec![
                SelectOption::new("", "Select..."),
                SelectOption::new("yes", "Yes"),
                SelectOption::new("no", "No"),
            ],
        )
        .with_control(textarea("why_us", "Why us?"));
    let answers = ScriptedAnswers::new().text("Your media mix.").choice("yes");

    let qa = router()
        .answer_custom_questions(&form, &answers, &profile(), &job())
        .await
        .unwrap();
    let order: Vec<&str> = qa.iter().map(|e| e.question.as_str()).collect();
    assert_eq!(order, ["Are you authorised to work in the EU?", "Why us?"]);
}

#[tokio::test]
async fn unknown_choice_falls_back_to_first_real_option() {
    let form = application_form();
    let answers = ScriptedAnswers::new().choice("6m");
    router()
        .answer_custom_questions(&form, &answers, &profile(), &job())
        .await
        .unwrap();
    assert_eq!(form.value_of("notice").as_deref(), Some("1m"));
}

#[tokio::test]
async fn placeholder_only_select_produces_no_answer() {
    let form = MemoryForm::new("https://jobs.example.com/apply")
        .with_control(select("source", "How did you find us?"))
        .with_options(
            "source",
            vec![
                SelectOption::new("", "Please select"),
                SelectOption::new("-", "--"),
            ],
        );
    let answers = ScriptedAnswers::new().choice("-");

    let qa = router()
        .answer_custom_questions(&form, &answers, &profile(), &job())
        .await
        .unwrap();
    assert!(qa.is_empty());
    assert!(!form.touched("source"));
    assert!(answers.asked().is_empty());
}

#[tokio::test]
async fn filled_custom_fields_are_left_alone() {
    let form = application_form().with_value("why_acme", "Drafted earlier");
    let answers = ScriptedAnswers::new().text("New answer");
    router()
        .answer_custom_questions(&form, &answers, &profile(), &job())
        .await
        .unwrap();
    assert_eq!(form.value_of("why_acme").as_deref(), Some("Drafted earlier"));
    assert!(!answers.asked().iter().any(|q| q.starts_with("Why do you want")));
}

#[tokio::test]
async fn empty_picker_panel_is_dismissed() {
    let form = MemoryForm::new("https://jobs.example.com/apply")
        .with_control(picker("school", "Which university did you attend?"))
        .with_picker_catalog("school", &["Humboldt University", "TU Berlin"]);
    let answers = ScriptedAnswers::new().term("Sorbonne");

    let qa = router()
        .answer_custom_questions(&form, &answers, &profile(), &job())
        .await
        .unwrap();
    assert!(qa.is_empty());
    assert_eq!(form.value_of("school"), None);
    let pressed = form.keys_pressed();
    assert_eq!(pressed.len(), 1);
    assert_eq!(pressed[0].1, "Escape");
}

#[tokio::test]
async fn picker_without_term_match_takes_first_rendered_option() {
    let form = MemoryForm::new("https://jobs.example.com/apply")
        .with_control(picker("country", "Country of residence"))
        .with_picker_catalog("country", &["Germany", "Germany (remote)"]);
    let answers = ScriptedAnswers::new().term("");

    let qa = router()
        .answer_custom_questions(&form, &answers, &profile(), &job())
        .await
        .unwrap();
    assert_eq!(qa.len(), 1);
    assert_eq!(form.value_of("country").as_deref(), Some("Germany"));
}

#[tokio::test]
async fn question_pass_streams_lazily() {
    let form = application_form();
    let answers = ScriptedAnswers::new().text("Yes.").choice("1m").term("Bern");
    let router = router();
    let pass = router.begin(&form, &answers, &profile(), &job()).await.unwrap();
    assert_eq!(pass.remaining(), 3);

    let mut stream = Box::pin(pass.into_stream());
    let first = stream.next().await.unwrap();
    assert_eq!(first.question, "Why do you want to work at Acme?");
    assert!(!form.touched("notice"), "select answered before it was pulled");

    let rest: Vec<_> = stream.collect().await;
    assert_eq!(rest.len(), 2);
    assert_eq!(form.value_of("office").as_deref(), Some("Bern"));
}
