//! In-memory fakes for the engine's seams (testing only)
//!
//! `MemoryForm` plays a rendered application form, `ScriptedAnswers` a
//! language model, `MemoryTracker` the applications log and `FixedResume`
//! the document source. None of them touch a browser, network or disk.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::answer::AnswerProvider;
use crate::documents::DocumentGenerator;
use crate::error::{Error, Result};
use crate::jobs::JobPosting;
use crate::surface::{
    ControlKey, FormSurface, LabelEvidence, LocatorStrategy, NetworkEvent, NetworkWatch,
    RawControl, SelectOption, ValidationError, ValidationErrorSnapshot,
};
use crate::tracking::{ApplicationRecord, TrackingStore};

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Control constructors
// ---------------------------------------------------------------------------

fn control(key: &str, tag: &str, input_type: &str, label: &str) -> RawControl {
    RawControl {
        key: ControlKey::new(key),
        tag: tag.into(),
        input_type: input_type.into(),
        name: key.into(),
        id: key.into(),
        evidence: LabelEvidence {
            bound_label: (!label.is_empty()).then(|| label.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// `<input type=text>` labelled `label`, with `key` as name and id.
pub fn text_input(key: &str, label: &str) -> RawControl {
    control(key, "input", "text", label)
}

pub fn textarea(key: &str, label: &str) -> RawControl {
    control(key, "textarea", "", label)
}

pub fn select(key: &str, label: &str) -> RawControl {
    control(key, "select", "", label)
}

pub fn checkbox(key: &str, label: &str) -> RawControl {
    control(key, "input", "checkbox", label)
}

/// Radio button `key` belonging to group `name`.
pub fn radio(key: &str, name: &str, label: &str) -> RawControl {
    RawControl {
        name: name.into(),
        ..control(key, "input", "radio", label)
    }
}

pub fn file_input(key: &str, label: &str) -> RawControl {
    control(key, "input", "file", label)
}

/// Searchable combobox-style picker.
pub fn picker(key: &str, label: &str) -> RawControl {
    RawControl {
        picker: true,
        ..control(key, "input", "text", label)
    }
}

// ---------------------------------------------------------------------------
// MemoryForm
// ---------------------------------------------------------------------------

/// What the page does when a control is clicked for submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitScript {
    /// Events delivered to the active network watch, in order. The watch's
    /// stream ends once they are delivered.
    pub network: Vec<NetworkEvent>,
    /// Validation errors present after the click, replacing the current ones.
    pub errors_after: Option<Vec<ValidationError>>,
    pub url_after: Option<String>,
    pub body_after: Option<String>,
    /// Selector that matches after the click.
    pub element_after: Option<String>,
    /// The click itself fails and nothing else happens.
    pub click_fails: bool,
}

impl SubmitScript {
    /// A submission POST answered with `status`.
    pub fn responds(status: u16) -> Self {
        Self {
            network: vec![
                NetworkEvent::Request {
                    request_id: "req-1".into(),
                    method: "POST".into(),
                    url: "https://boards.example.com/acme/jobs/4012345".into(),
                },
                NetworkEvent::Response {
                    request_id: "req-1".into(),
                    status,
                },
            ],
            ..Default::default()
        }
    }

    /// A submission POST that never gets a response.
    pub fn unanswered() -> Self {
        Self {
            network: vec![NetworkEvent::Request {
                request_id: "req-1".into(),
                method: "POST".into(),
                url: "https://boards.example.com/acme/jobs/4012345".into(),
            }],
            ..Default::default()
        }
    }

    pub fn with_errors_after(mut self, errors: Vec<ValidationError>) -> Self {
        self.errors_after = Some(errors);
        self
    }

    pub fn with_body_after(mut self, body: impl Into<String>) -> Self {
        self.body_after = Some(body.into());
        self
    }

    pub fn with_element_after(mut self, selector: impl Into<String>) -> Self {
        self.element_after = Some(selector.into());
        self
    }

    pub fn with_url_after(mut self, url: impl Into<String>) -> Self {
        self.url_after = Some(url.into());
        self
    }
}

#[derive(Default)]
struct FormState {
    url: String,
    body: String,
    elements: HashSet<String>,
    controls: Vec<RawControl>,
    options: HashMap<ControlKey, Vec<SelectOption>>,
    catalogs: HashMap<ControlKey, Vec<String>>,
    locators: Vec<(LocatorStrategy, ControlKey)>,
    validation: Vec<ValidationError>,
    submit: Option<SubmitScript>,
    failing: HashSet<ControlKey>,
    failing_urls: HashSet<String>,

    open_picker: Option<ControlKey>,
    panel: Vec<String>,
    network: Option<mpsc::UnboundedSender<NetworkEvent>>,

    writes: HashMap<ControlKey, usize>,
    touched: HashSet<ControlKey>,
    keys_pressed: Vec<(ControlKey, String)>,
    attached: Vec<(ControlKey, PathBuf)>,
    navigations: Vec<String>,
    clicks: Vec<ControlKey>,
    captures: Vec<PathBuf>,
    watches_opened: usize,
}

impl FormState {
    fn control_mut(&mut self, key: &ControlKey) -> Result<&mut RawControl> {
        if self.failing.contains(key) {
            return Err(Error::JsError(format!("control {key} rejected the interaction")));
        }
        self.controls
            .iter_mut()
            .find(|c| &c.key == key)
            .ok_or_else(|| Error::ElementNotFound(key.to_string()))
    }
}

/// A scripted application form held entirely in memory.
#[derive(Default)]
pub struct MemoryForm {
    state: Mutex<FormState>,
    active_watches: Arc<AtomicUsize>,
}

impl MemoryForm {
    pub fn new(url: impl Into<String>) -> Self {
        let form = Self::default();
        guard(&form.state).url = url.into();
        form
    }

    pub fn with_control(self, raw: RawControl) -> Self {
        guard(&self.state).controls.push(raw);
        self
    }

    /// Give a control an initial value.
    pub fn with_value(self, key: &str, value: &str) -> Self {
        {
            let mut state = guard(&self.state);
            if let Some(c) = state.controls.iter_mut().find(|c| c.key.as_str() == key) {
                c.value = Some(value.to_string());
            }
        }
        self
    }

    pub fn with_options(self, key: &str, options: Vec<SelectOption>) -> Self {
        guard(&self.state).options.insert(ControlKey::new(key), options);
        self
    }

    /// Entries a picker renders when opened, before any search narrows them.
    pub fn with_picker_catalog(self, key: &str, entries: &[&str]) -> Self {
        guard(&self.state)
            .catalogs
            .insert(ControlKey::new(key), entries.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn with_locator(self, strategy: LocatorStrategy, key: &str) -> Self {
        guard(&self.state).locators.push((strategy, ControlKey::new(key)));
        self
    }

    /// A submit button reachable through `button[type=submit]`.
    pub fn with_submit_button(self, key: &str) -> Self {
        self.with_locator(LocatorStrategy::Css("button[type=submit]".into()), key)
    }

    pub fn with_body(self, body: impl Into<String>) -> Self {
        guard(&self.state).body = body.into();
        self
    }

    /// A selector that already matches before any click.
    pub fn with_element(self, selector: impl Into<String>) -> Self {
        guard(&self.state).elements.insert(selector.into());
        self
    }

    pub fn with_validation(self, errors: Vec<ValidationError>) -> Self {
        guard(&self.state).validation = errors;
        self
    }

    pub fn on_submit(self, script: SubmitScript) -> Self {
        guard(&self.state).submit = Some(script);
        self
    }

    /// Every interaction with `key` fails.
    pub fn failing(self, key: &str) -> Self {
        guard(&self.state).failing.insert(ControlKey::new(key));
        self
    }

    pub fn failing_navigation(self, url: &str) -> Self {
        guard(&self.state).failing_urls.insert(url.to_string());
        self
    }

    pub fn value_of(&self, key: &str) -> Option<String> {
        guard(&self.state)
            .controls
            .iter()
            .find(|c| c.key.as_str() == key)
            .and_then(|c| c.value.clone())
    }

    pub fn is_checked(&self, key: &str) -> bool {
        guard(&self.state)
            .controls
            .iter()
            .any(|c| c.key.as_str() == key && c.checked)
    }

    pub fn write_count(&self, key: &str) -> usize {
        guard(&self.state)
            .writes
            .get(&ControlKey::new(key))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_writes(&self) -> usize {
        guard(&self.state).writes.values().sum()
    }

    /// Whether any mutating interaction reached `key`.
    pub fn touched(&self, key: &str) -> bool {
        guard(&self.state).touched.contains(&ControlKey::new(key))
    }

    pub fn keys_pressed(&self) -> Vec<(ControlKey, String)> {
        guard(&self.state).keys_pressed.clone()
    }

    pub fn attached(&self) -> Vec<(ControlKey, PathBuf)> {
        guard(&self.state).attached.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        guard(&self.state).navigations.clone()
    }

    pub fn clicks(&self) -> Vec<ControlKey> {
        guard(&self.state).clicks.clone()
    }

    pub fn captures(&self) -> Vec<PathBuf> {
        guard(&self.state).captures.clone()
    }

    pub fn watches_opened(&self) -> usize {
        guard(&self.state).watches_opened
    }

    /// Network watches handed out and not yet released.
    pub fn active_watches(&self) -> usize {
        self.active_watches.load(Ordering::SeqCst)
    }

    fn mutate<T>(&self, key: &ControlKey, f: impl FnOnce(&mut RawControl) -> Result<T>) -> Result<T> {
        let mut state = guard(&self.state);
        let out = f(state.control_mut(key)?)?;
        state.touched.insert(key.clone());
        Ok(out)
    }
}

#[async_trait]
impl FormSurface for MemoryForm {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = guard(&self.state);
        state.navigations.push(url.to_string());
        if state.failing_urls.contains(url) {
            return Err(Error::NavigationError(format!("{url} did not load")));
        }
        state.url = url.to_string();
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<RawControl>> {
        Ok(guard(&self.state).controls.clone())
    }

    async fn read_value(&self, key: &ControlKey) -> Result<Option<String>> {
        let mut state = guard(&self.state);
        Ok(state.control_mut(key)?.value.clone())
    }

    async fn write_text(&self, key: &ControlKey, value: &str) -> Result<()> {
        self.mutate(key, |c| {
            if c.tag != "textarea" && c.tag != "input" {
                return Err(Error::JsError(format!("{} is not a text control", c.key)));
            }
            c.value = Some(value.to_string());
            Ok(())
        })?;
        *guard(&self.state).writes.entry(key.clone()).or_default() += 1;
        Ok(())
    }

    async fn set_checked(&self, key: &ControlKey) -> Result<()> {
        let group = self.mutate(key, |c| {
            c.checked = true;
            Ok((c.input_type == "radio").then(|| c.name.clone()))
        })?;
        let mut state = guard(&self.state);
        if let Some(name) = group {
            for other in state.controls.iter_mut() {
                if other.input_type == "radio" && other.name == name && &other.key != key {
                    other.checked = false;
                }
            }
        }
        *state.writes.entry(key.clone()).or_default() += 1;
        Ok(())
    }

    async fn enumerate_options(&self, key: &ControlKey) -> Result<Vec<SelectOption>> {
        let mut state = guard(&self.state);
        state.control_mut(key)?;
        Ok(state.options.get(key).cloned().unwrap_or_default())
    }

    async fn choose_option(&self, key: &ControlKey, value: &str) -> Result<()> {
        let known = guard(&self.state)
            .options
            .get(key)
            .is_some_and(|opts| opts.iter().any(|o| o.value == value));
        if !known {
            return Err(Error::JsError(format!("option {value} not accepted")));
        }
        self.mutate(key, |c| {
            c.value = Some(value.to_string());
            Ok(())
        })?;
        *guard(&self.state).writes.entry(key.clone()).or_default() += 1;
        Ok(())
    }

    async fn open_picker(&self, key: &ControlKey) -> Result<()> {
        self.mutate(key, |_| Ok(()))?;
        let mut state = guard(&self.state);
        state.panel = state.catalogs.get(key).cloned().unwrap_or_default();
        state.open_picker = Some(key.clone());
        Ok(())
    }

    async fn type_search(&self, key: &ControlKey, text: &str) -> Result<()> {
        self.mutate(key, |_| Ok(()))?;
        let mut state = guard(&self.state);
        let needle = text.to_lowercase();
        state.panel = state
            .catalogs
            .get(key)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(())
    }

    async fn picker_options(&self) -> Result<Vec<String>> {
        let state = guard(&self.state);
        Ok(if state.open_picker.is_some() {
            state.panel.clone()
        } else {
            Vec::new()
        })
    }

    async fn pick_rendered_option(&self, index: usize) -> Result<()> {
        let mut state = guard(&self.state);
        let key = state
            .open_picker
            .clone()
            .ok_or_else(|| Error::ElementNotFound("no open picker".into()))?;
        let choice = state
            .panel
            .get(index)
            .cloned()
            .ok_or_else(|| Error::ElementNotFound(format!("option {index} not rendered")))?;
        state.control_mut(&key)?.value = Some(choice);
        *state.writes.entry(key).or_default() += 1;
        state.open_picker = None;
        state.panel.clear();
        Ok(())
    }

    async fn press_key(&self, key: &ControlKey, name: &str) -> Result<()> {
        let mut state = guard(&self.state);
        state.keys_pressed.push((key.clone(), name.to_string()));
        if name == "Escape" {
            state.open_picker = None;
            state.panel.clear();
        }
        Ok(())
    }

    async fn attach_file(&self, key: &ControlKey, path: &Path) -> Result<()> {
        self.mutate(key, |c| {
            if c.input_type != "file" {
                return Err(Error::JsError(format!("{} is not a file input", c.key)));
            }
            c.value = path.file_name().map(|n| n.to_string_lossy().into_owned());
            Ok(())
        })?;
        guard(&self.state)
            .attached
            .push((key.clone(), path.to_path_buf()));
        Ok(())
    }

    async fn read_validation_state(&self) -> Result<ValidationErrorSnapshot> {
        Ok(ValidationErrorSnapshot::new(guard(&self.state).validation.clone()))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(guard(&self.state).url.clone())
    }

    async fn body_text(&self) -> Result<String> {
        Ok(guard(&self.state).body.clone())
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        Ok(guard(&self.state).elements.contains(selector))
    }

    async fn locate(&self, strategy: &LocatorStrategy) -> Result<Option<ControlKey>> {
        Ok(guard(&self.state)
            .locators
            .iter()
            .find(|(s, _)| s == strategy)
            .map(|(_, key)| key.clone()))
    }

    async fn click(&self, key: &ControlKey) -> Result<()> {
        let mut state = guard(&self.state);
        if state.failing.contains(key) {
            return Err(Error::JsError(format!("control {key} rejected the click")));
        }
        state.clicks.push(key.clone());
        state.touched.insert(key.clone());
        let Some(script) = state.submit.clone() else {
            return Ok(());
        };
        if script.click_fails {
            return Err(Error::JsError("click intercepted by overlay".into()));
        }
        if let Some(tx) = state.network.take() {
            for event in script.network {
                let _ = tx.send(event);
            }
        }
        if let Some(errors) = script.errors_after {
            state.validation = errors;
        }
        if let Some(url) = script.url_after {
            state.url = url;
        }
        if let Some(body) = script.body_after {
            state.body = body;
        }
        if let Some(selector) = script.element_after {
            state.elements.insert(selector);
        }
        Ok(())
    }

    async fn watch_network(&self) -> Result<NetworkWatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = guard(&self.state);
            state.network = Some(tx);
            state.watches_opened += 1;
        }
        self.active_watches.fetch_add(1, Ordering::SeqCst);
        let active = Arc::clone(&self.active_watches);
        Ok(NetworkWatch::new(rx, Vec::new()).on_release(move || {
            active.fetch_sub(1, Ordering::SeqCst);
        }))
    }

    async fn capture_full_page(&self, path: &Path) -> Result<()> {
        guard(&self.state).captures.push(path.to_path_buf());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedAnswers
// ---------------------------------------------------------------------------

/// Answer provider returning canned replies and recording every question.
#[derive(Debug, Default)]
pub struct ScriptedAnswers {
    text: Option<String>,
    choice: Option<String>,
    term: String,
    asked: Mutex<Vec<String>>,
}

impl ScriptedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, answer: impl Into<String>) -> Self {
        self.text = Some(answer.into());
        self
    }

    /// Option value returned for every choice question.
    pub fn choice(mut self, value: impl Into<String>) -> Self {
        self.choice = Some(value.into());
        self
    }

    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn asked(&self) -> Vec<String> {
        guard(&self.asked).clone()
    }
}

#[async_trait]
impl AnswerProvider for ScriptedAnswers {
    async fn text_answer(&self, question: &str, _job_context: &str) -> Option<String> {
        guard(&self.asked).push(question.to_string());
        self.text.clone()
    }

    async fn best_option(
        &self,
        question: &str,
        _options: &[SelectOption],
        _job_context: &str,
    ) -> Option<String> {
        guard(&self.asked).push(question.to_string());
        self.choice.clone()
    }

    async fn short_search_term(&self, question: &str, _job_context: &str) -> String {
        guard(&self.asked).push(question.to_string());
        self.term.clone()
    }
}

// ---------------------------------------------------------------------------
// MemoryTracker
// ---------------------------------------------------------------------------

/// Tracking store backed by a `Vec<ApplicationRecord>`.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    preexisting: HashSet<String>,
    records: Mutex<Vec<ApplicationRecord>>,
    unreadable: bool,
    read_only: bool,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Job ids already on record before the run.
    pub fn with_applied(mut self, ids: &[&str]) -> Self {
        self.preexisting.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn records(&self) -> Vec<ApplicationRecord> {
        guard(&self.records).clone()
    }
}

#[async_trait]
impl TrackingStore for MemoryTracker {
    async fn applied_job_ids(&self) -> Result<HashSet<String>> {
        if self.unreadable {
            return Err(Error::Upstream("tracking sheet offline".into()));
        }
        let mut ids = self.preexisting.clone();
        ids.extend(guard(&self.records).iter().map(|r| r.job_id.clone()));
        Ok(ids)
    }

    async fn append(&self, record: &ApplicationRecord) -> Result<()> {
        if self.read_only {
            return Err(Error::Upstream("tracking sheet is read-only".into()));
        }
        guard(&self.records).push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FixedResume
// ---------------------------------------------------------------------------

/// Document source handing out the same path for every job.
#[derive(Debug, Clone)]
pub struct FixedResume(pub PathBuf);

impl DocumentGenerator for FixedResume {
    fn resume_for(&self, _job: &JobPosting) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}
