//! Click-and-verify protocol for a form submission.
//!
//! A submission is never trusted on its own. The validator watches the
//! network for the portal's submission request, looks for confirmation cues
//! in the DOM, and compares validation errors before and after the click.
//! New validation errors always turn the verdict into a failure.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::surface::{ControlKey, FormSurface, LocatorStrategy, NetworkEvent, NetworkWatch};

/// Phases of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionState {
    Idle,
    Observing,
    Clicked,
    AwaitingConfirmation,
    Confirmed,
    Rejected,
    TimedOut,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Final, immutable outcome of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionVerdict {
    success: bool,
    reason: String,
    http_status: Option<u16>,
    diagnostic_artifact_paths: Vec<PathBuf>,
}

impl SubmissionVerdict {
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn diagnostic_artifact_paths(&self) -> &[PathBuf] {
        &self.diagnostic_artifact_paths
    }
}

/// Where and how confirmation is looked for.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// URLs of requests that count as the form submission.
    pub endpoint_pattern: Regex,
    pub response_timeout: Duration,
    /// Pause after a response so the page can render its confirmation.
    pub settle_delay: Duration,
    /// Lower-case phrases whose presence in the page body confirms success.
    pub confirmation_phrases: Vec<String>,
    /// Lower-case tokens a post-submit URL may contain.
    pub url_tokens: Vec<String>,
    pub confirmation_selectors: Vec<String>,
    pub artifact_dir: PathBuf,
}

const CONFIRMATION_PHRASES: &[&str] = &[
    // en
    "application received",
    "application has been received",
    "application has been submitted",
    "thank you for applying",
    "thanks for applying",
    "thank you for your application",
    "we have received your application",
    "we've received your application",
    // de
    "vielen dank für ihre bewerbung",
    "danke für deine bewerbung",
    "bewerbung wurde erfolgreich",
    "ihre bewerbung ist eingegangen",
    // fr
    "merci pour votre candidature",
    "votre candidature a bien été",
    "candidature envoyée",
    // es
    "gracias por tu solicitud",
    "gracias por su solicitud",
    "hemos recibido tu solicitud",
    "solicitud enviada",
    // nl
    "bedankt voor je sollicitatie",
    "bedankt voor uw sollicitatie",
    // pt
    "obrigado pela sua candidatura",
    "candidatura enviada",
];

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint_pattern: Regex::new(r"(?i)/(applications?|apply|submit|candidatures?|bewerbung)\b|/jobs/\d+")
                .expect("valid endpoint regex"),
            response_timeout: Duration::from_secs(15),
            settle_delay: Duration::from_millis(1500),
            confirmation_phrases: CONFIRMATION_PHRASES.iter().map(|s| s.to_string()).collect(),
            url_tokens: ["confirmation", "thank", "success", "submitted", "applied"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            confirmation_selectors: [
                "#application_confirmation",
                ".application-confirmation",
                "[data-testid*=confirmation]",
                ".thank-you",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            artifact_dir: PathBuf::from("output/diagnostics"),
        }
    }
}

/// Prioritized ways of finding the submit control, tried lazily in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitLocators(pub Vec<LocatorStrategy>);

impl Default for SubmitLocators {
    fn default() -> Self {
        let css = ["#submit_app", "button[type=submit]", "input[type=submit]"]
            .into_iter()
            .map(|s| LocatorStrategy::Css(s.to_string()));
        let texts = [
            "Submit application",
            "Submit Application",
            "Submit",
            "Apply",
            "Send application",
            "Bewerbung absenden",
            "Absenden",
            "Bewerben",
            "Envoyer ma candidature",
            "Envoyer",
            "Postuler",
            "Enviar solicitud",
            "Enviar",
            "Solicitar",
            "Verstuur",
            "Solliciteren",
            "Candidatar",
        ]
        .into_iter()
        .map(|s| LocatorStrategy::ButtonText(s.to_string()));
        Self(css.chain(texts).collect())
    }
}

impl SubmitLocators {
    /// First control matched by any strategy.
    pub async fn locate(&self, surface: &dyn FormSurface) -> Result<ControlKey> {
        for strategy in &self.0 {
            match surface.locate(strategy).await {
                Ok(Some(key)) => {
                    debug!(%strategy, "submit control located");
                    return Ok(key);
                }
                Ok(None) => {}
                Err(e) => debug!(%strategy, error = %e, "locator failed"),
            }
        }
        Err(Error::MissingControl("submit control".into()))
    }
}

/// DOM cues that a form was accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationSignals {
    pub url_token: Option<String>,
    pub phrase: Option<String>,
    pub container: Option<String>,
}

impl ConfirmationSignals {
    pub fn any(&self) -> bool {
        self.url_token.is_some() || self.phrase.is_some() || self.container.is_some()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref phrase) = self.phrase {
            parts.push(format!("phrase \"{phrase}\""));
        }
        if let Some(ref token) = self.url_token {
            parts.push(format!("URL token \"{token}\""));
        }
        if let Some(ref selector) = self.container {
            parts.push(format!("container `{selector}`"));
        }
        parts.join(", ")
    }
}

/// Confirmation cues visible on the page at one moment.
#[derive(Debug, Clone, Default)]
struct PageCues {
    url: String,
    phrases: Vec<String>,
    containers: Vec<String>,
}

impl PageCues {
    /// Cues present now that were absent in `before`.
    fn appeared_since(&self, before: &PageCues, url_tokens: &[String]) -> ConfirmationSignals {
        let url_token = if self.url != before.url {
            url_tokens
                .iter()
                .find(|t| self.url.contains(t.as_str()) && !before.url.contains(t.as_str()))
                .cloned()
        } else {
            None
        };
        ConfirmationSignals {
            url_token,
            phrase: self.phrases.iter().find(|p| !before.phrases.contains(p)).cloned(),
            container: self.containers.iter().find(|c| !before.containers.contains(c)).cloned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NetworkOutcome {
    Responded(u16),
    /// A submission request went out but no response arrived in time.
    Pending,
    /// No submission request was seen.
    Silent,
}

pub struct SubmissionValidator {
    config: SubmissionConfig,
}

impl SubmissionValidator {
    pub fn new(config: SubmissionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Perform `click` and decide whether the submission went through.
    ///
    /// `label` names the attempt in logs and in the diagnostic file name.
    /// Never fails: every problem is folded into the verdict.
    pub async fn submit(
        &self,
        surface: &dyn FormSurface,
        label: &str,
        click: impl Future<Output = Result<()>>,
    ) -> SubmissionVerdict {
        let mut state = SubmissionState::Idle;
        advance(&mut state, SubmissionState::Observing, label);

        let watch = match surface.watch_network().await {
            Ok(watch) => Some(watch),
            Err(e) => {
                warn!(error = %e, "network observation unavailable");
                None
            }
        };
        let cues_before = self.page_cues(surface).await;
        let errors_before = surface.read_validation_state().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not read validation state before click");
            Default::default()
        });

        let click_error = click.await.err();
        if let Some(ref e) = click_error {
            warn!(attempt = label, error = %e, "submit click failed");
        }
        advance(&mut state, SubmissionState::Clicked, label);

        advance(&mut state, SubmissionState::AwaitingConfirmation, label);
        let network = self.await_response(watch).await;
        if matches!(network, NetworkOutcome::Responded(_)) {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let signals = self
            .page_cues(surface)
            .await
            .appeared_since(&cues_before, &self.config.url_tokens);
        let (mut terminal, mut reason, http_status) =
            self.resolve(network, &signals, click_error.is_some());
        if let Some(ref e) = click_error {
            reason.push_str(&format!(" (click failed: {e})"));
        }

        let errors_after = surface.read_validation_state().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not read validation state after click");
            errors_before.clone()
        });
        let new_errors = errors_after.new_since(&errors_before);
        if !new_errors.is_empty() {
            let listed = new_errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            reason = format!("New validation errors after submit: {listed}");
            terminal = SubmissionState::Rejected;
        }
        advance(&mut state, terminal, label);

        let diagnostic_artifact_paths = self.capture_artifact(surface, label).await.into_iter().collect();

        let verdict = SubmissionVerdict {
            success: state == SubmissionState::Confirmed,
            reason,
            http_status,
            diagnostic_artifact_paths,
        };
        info!(
            attempt = label,
            success = verdict.success,
            status = ?verdict.http_status,
            reason = %verdict.reason,
            "submission verdict"
        );
        verdict
    }

    /// Race the submission response against the timeout. Consumes the watch
    /// so its listeners are released as soon as the race ends.
    async fn await_response(&self, watch: Option<NetworkWatch>) -> NetworkOutcome {
        let Some(mut watch) = watch else {
            tokio::time::sleep(self.config.settle_delay).await;
            return NetworkOutcome::Silent;
        };
        let pattern = &self.config.endpoint_pattern;
        let mut captured: Vec<String> = Vec::new();
        // Requests and responses arrive on separate listeners and may interleave.
        let mut early: HashMap<String, u16> = HashMap::new();

        let race = tokio::time::timeout(self.config.response_timeout, async {
            while let Some(event) = watch.next_event().await {
                match event {
                    NetworkEvent::Request {
                        request_id,
                        method,
                        url,
                    } if !method.eq_ignore_ascii_case("GET") && pattern.is_match(&url) => {
                        debug!(%method, %url, "submission request captured");
                        if let Some(status) = early.remove(&request_id) {
                            return Some(status);
                        }
                        captured.push(request_id);
                    }
                    NetworkEvent::Response { request_id, status } => {
                        if captured.contains(&request_id) {
                            return Some(status);
                        }
                        early.insert(request_id, status);
                    }
                    _ => {}
                }
            }
            None
        })
        .await;

        match race {
            Ok(Some(status)) => NetworkOutcome::Responded(status),
            Ok(None) | Err(_) if !captured.is_empty() => NetworkOutcome::Pending,
            _ => NetworkOutcome::Silent,
        }
    }

    async fn page_cues(&self, surface: &dyn FormSurface) -> PageCues {
        let mut cues = PageCues {
            url: surface.current_url().await.unwrap_or_default().to_lowercase(),
            ..PageCues::default()
        };

        match surface.body_text().await {
            Ok(body) => {
                let body = body.to_lowercase();
                cues.phrases = self
                    .config
                    .confirmation_phrases
                    .iter()
                    .filter(|p| body.contains(p.as_str()))
                    .cloned()
                    .collect();
            }
            Err(e) => debug!(error = %e, "body text unavailable"),
        }

        for selector in &self.config.confirmation_selectors {
            if let Ok(true) = surface.has_element(selector).await {
                cues.containers.push(selector.clone());
            }
        }
        cues
    }

    fn resolve(
        &self,
        network: NetworkOutcome,
        signals: &ConfirmationSignals,
        click_failed: bool,
    ) -> (SubmissionState, String, Option<u16>) {
        // A failed click with no submission request leaves nothing for the DOM to confirm.
        let dom_counts = !(click_failed && network == NetworkOutcome::Silent);
        match network {
            NetworkOutcome::Responded(status) if (200..400).contains(&status) => {
                let mut reason = format!("Submission accepted by server (HTTP {status})");
                if signals.any() {
                    reason.push_str(&format!("; DOM confirmation: {}", signals.describe()));
                }
                (SubmissionState::Confirmed, reason, Some(status))
            }
            NetworkOutcome::Responded(status) => (
                SubmissionState::Rejected,
                format!("Submission rejected by server (HTTP {status})"),
                Some(status),
            ),
            _ if dom_counts && signals.any() => (
                SubmissionState::Confirmed,
                format!("Submission confirmed by DOM signal: {}", signals.describe()),
                None,
            ),
            NetworkOutcome::Pending => (
                SubmissionState::TimedOut,
                format!(
                    "Submission request sent but no response or confirmation within {}s",
                    self.config.response_timeout.as_secs()
                ),
                None,
            ),
            NetworkOutcome::Silent => (
                SubmissionState::Rejected,
                "No submission request or confirmation signal detected".to_string(),
                None,
            ),
        }
    }

    async fn capture_artifact(&self, surface: &dyn FormSurface, label: &str) -> Option<PathBuf> {
        let path = artifact_path(&self.config.artifact_dir, label);
        if let Err(e) = tokio::fs::create_dir_all(&self.config.artifact_dir).await {
            warn!(dir = %self.config.artifact_dir.display(), error = %e, "cannot create artifact dir");
            return None;
        }
        match surface.capture_full_page(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "diagnostic capture failed");
                None
            }
        }
    }
}

impl Default for SubmissionValidator {
    fn default() -> Self {
        Self::new(SubmissionConfig::default())
    }
}

fn advance(state: &mut SubmissionState, next: SubmissionState, label: &str) {
    debug!(attempt = label, from = %state, to = %next, "submission state");
    *state = next;
}

fn artifact_path(dir: &Path, label: &str) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let label: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    dir.join(format!("submission_{stamp}_{label}.png"))
}
