//! Capability interface between the form engine and a live page.
//!
//! Filling, routing and submission logic only ever talk to a [`FormSurface`].
//! The chromiumoxide-backed [`Page`](crate::page::Page) implements it against
//! a real browser; [`MemoryForm`](crate::fakes::MemoryForm) implements it in
//! memory for tests.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Handle for a control discovered during a scan. Only valid until the page
/// navigates or re-renders the control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlKey(pub String);

impl ControlKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw structural facts about a control's surroundings, gathered by the scan
/// and turned into question text by [`resolve_label`](crate::form::label::resolve_label).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelEvidence {
    /// Text of a `<label for=...>` bound to the control's id.
    pub bound_label: Option<String>,
    /// Text of the elements named by `aria-labelledby`.
    pub aria_labelled_by: Option<String>,
    pub aria_label: Option<String>,
    /// `label`/`legend` texts per ancestor level, nearest ancestor first,
    /// excluding any label that itself contains the control.
    pub ancestors: Vec<Vec<String>>,
}

/// A control as reported by a page scan, before classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawControl {
    pub key: ControlKey,
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub value: Option<String>,
    pub checked: bool,
    /// The control is a non-native combobox-style picker.
    pub picker: bool,
    /// The control is the hidden or search input living inside a picker widget.
    pub picker_shadow: bool,
    pub evidence: LabelEvidence,
}

/// One entry of a native `<select>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }
}

/// A validation message visible on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// The set of validation errors present at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorSnapshot(BTreeSet<ValidationError>);

impl ValidationErrorSnapshot {
    pub fn new(errors: impl IntoIterator<Item = ValidationError>) -> Self {
        Self(errors.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Errors present in `self` that were absent from `earlier`.
    pub fn new_since<'a>(&'a self, earlier: &'a ValidationErrorSnapshot) -> Vec<&'a ValidationError> {
        self.0.difference(&earlier.0).collect()
    }
}

/// Network traffic seen while a submission is being observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Request {
        request_id: String,
        method: String,
        url: String,
    },
    Response {
        request_id: String,
        status: u16,
    },
}

/// Scoped network subscription.
///
/// Listener tasks are aborted and the release hook runs when the watch is
/// dropped, so every exit path of a submission attempt deregisters it.
pub struct NetworkWatch {
    events: mpsc::UnboundedReceiver<NetworkEvent>,
    tasks: Vec<JoinHandle<()>>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl NetworkWatch {
    pub fn new(events: mpsc::UnboundedReceiver<NetworkEvent>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self {
            events,
            tasks,
            on_release: None,
        }
    }

    /// Run `hook` once when the watch is released.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Next observed event, or `None` once every listener has stopped.
    pub async fn next_event(&mut self) -> Option<NetworkEvent> {
        self.events.recv().await
    }
}

impl Drop for NetworkWatch {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

/// One way of locating a control, tried in priority order by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStrategy {
    /// A CSS selector.
    Css(String),
    /// A button-like element whose visible text matches, case-insensitively.
    ButtonText(String),
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorStrategy::Css(selector) => write!(f, "css `{selector}`"),
            LocatorStrategy::ButtonText(text) => write!(f, "button text \"{text}\""),
        }
    }
}

/// Everything the engine needs from a rendered page.
#[async_trait]
pub trait FormSurface: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Discover every interactive control currently rendered.
    async fn scan(&self) -> Result<Vec<RawControl>>;

    async fn read_value(&self, key: &ControlKey) -> Result<Option<String>>;

    /// Replace a text control's value and notify the page's listeners.
    async fn write_text(&self, key: &ControlKey, value: &str) -> Result<()>;

    /// Check a checkbox or select a radio button.
    async fn set_checked(&self, key: &ControlKey) -> Result<()>;

    async fn enumerate_options(&self, key: &ControlKey) -> Result<Vec<SelectOption>>;

    /// Commit a native select to `value` and emit change/input events.
    async fn choose_option(&self, key: &ControlKey, value: &str) -> Result<()>;

    async fn open_picker(&self, key: &ControlKey) -> Result<()>;

    async fn type_search(&self, key: &ControlKey, text: &str) -> Result<()>;

    /// Display texts of the options panel currently rendered, if any.
    async fn picker_options(&self) -> Result<Vec<String>>;

    async fn pick_rendered_option(&self, index: usize) -> Result<()>;

    async fn press_key(&self, key: &ControlKey, name: &str) -> Result<()>;

    async fn attach_file(&self, key: &ControlKey, path: &Path) -> Result<()>;

    async fn read_validation_state(&self) -> Result<ValidationErrorSnapshot>;

    async fn current_url(&self) -> Result<String>;

    async fn body_text(&self) -> Result<String>;

    async fn has_element(&self, selector: &str) -> Result<bool>;

    async fn locate(&self, strategy: &LocatorStrategy) -> Result<Option<ControlKey>>;

    async fn click(&self, key: &ControlKey) -> Result<()>;

    /// Start observing network requests and responses.
    async fn watch_network(&self) -> Result<NetworkWatch>;

    async fn capture_full_page(&self, path: &Path) -> Result<()>;
}

/// Run one surface call under a time bound.
pub async fn bounded<T>(
    limit: Duration,
    what: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!("{what} after {}ms", limit.as_millis()))),
    }
}
