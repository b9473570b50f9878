use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::Page as CrPage;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::element::Element;
use crate::error::{Error, Result};
use crate::scripts;
use crate::surface::{
    ControlKey, FormSurface, LocatorStrategy, NetworkEvent, NetworkWatch, RawControl,
    SelectOption, ValidationError, ValidationErrorSnapshot,
};

/// A browser tab driven through chromiumoxide.
pub struct Page {
    inner: CrPage,
    default_timeout: Duration,
    label_depth: usize,
}

impl Page {
    pub(crate) fn new(inner: CrPage, default_timeout: Duration) -> Self {
        Self {
            inner,
            default_timeout,
            label_depth: crate::form::label::DEFAULT_MAX_DEPTH,
        }
    }

    /// Bound the ancestor walk used for label evidence.
    pub fn with_label_depth(mut self, depth: usize) -> Self {
        self.label_depth = depth;
        self
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Navigate to the given URL and wait for the page to load.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Get the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    /// Wait for an element matching the given CSS selector to appear in the DOM.
    /// Polls every 100ms up to the configured default timeout.
    pub async fn wait_for_selector(&self, selector: &str) -> Result<Element> {
        let interval = Duration::from_millis(100);
        let start = std::time::Instant::now();

        loop {
            match self.find_element(selector).await {
                Ok(el) => return Ok(el),
                Err(_) if start.elapsed() < self.default_timeout => {
                    tokio::time::sleep(interval).await;
                }
                Err(_) => {
                    return Err(Error::Timeout(format!(
                        "Timed out waiting for selector: {selector}"
                    )));
                }
            }
        }
    }

    // ── Observations ────────────────────────────────────────────────

    /// Save a full-page PNG screenshot to `path`.
    pub async fn screenshot_full_page_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.inner
            .save_screenshot(params, path)
            .await
            .map_err(|e| Error::ScreenshotError(e.to_string()))?;
        Ok(())
    }

    /// Run one of the [`scripts`] bodies with `args` and decode its JSON result.
    async fn run_script<T: DeserializeOwned>(&self, body: &str, args: serde_json::Value) -> Result<T> {
        let js = format!(
            "JSON.stringify((function (args) {{ {prelude}\n{body}\n}})({args}))",
            prelude = scripts::PRELUDE,
        );
        let result = self
            .inner
            .evaluate(js)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        let json_str: String = result
            .into_value()
            .map_err(|e| Error::JsError(e.to_string()))?;
        serde_json::from_str(&json_str).map_err(|e| Error::JsError(e.to_string()))
    }

    // ── Element Queries ─────────────────────────────────────────────

    /// Find an element matching the given CSS selector.
    pub async fn find_element(&self, selector: &str) -> Result<Element> {
        let el = self
            .inner
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        Ok(Element::new(el))
    }

    async fn control(&self, key: &ControlKey) -> Result<Element> {
        self.find_element(&key_selector(key)).await
    }

    /// Follow an embedded application iframe, then wait for a form control.
    async fn settle_form(&self) -> Result<()> {
        let embedded: Option<String> = self.run_script(scripts::EMBEDDED_FORM, json!({})).await?;
        if let Some(src) = embedded {
            info!(%src, "following embedded application form");
            self.goto(&src).await?;
        }
        if let Err(e) = self.wait_for_selector("input, textarea, select").await {
            debug!(error = %e, "no form control rendered yet");
        }
        Ok(())
    }
}

fn key_selector(key: &ControlKey) -> String {
    let escaped = key.as_str().replace('\\', "\\\\").replace('"', "\\\"");
    format!("[data-autoapply-key=\"{escaped}\"]")
}

#[async_trait]
impl FormSurface for Page {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.goto(url).await?;
        self.settle_form().await
    }

    async fn scan(&self) -> Result<Vec<RawControl>> {
        self.run_script(scripts::SCAN, json!({ "depth": self.label_depth })).await
    }

    async fn read_value(&self, key: &ControlKey) -> Result<Option<String>> {
        self.run_script(scripts::READ_VALUE, json!({ "key": key })).await
    }

    async fn write_text(&self, key: &ControlKey, value: &str) -> Result<()> {
        self.run_script(scripts::WRITE_TEXT, json!({ "key": key, "value": value })).await
    }

    async fn set_checked(&self, key: &ControlKey) -> Result<()> {
        self.run_script(scripts::SET_CHECKED, json!({ "key": key })).await
    }

    async fn enumerate_options(&self, key: &ControlKey) -> Result<Vec<SelectOption>> {
        self.run_script(scripts::SELECT_OPTIONS, json!({ "key": key })).await
    }

    async fn choose_option(&self, key: &ControlKey, value: &str) -> Result<()> {
        self.run_script(scripts::CHOOSE_OPTION, json!({ "key": key, "value": value })).await
    }

    async fn open_picker(&self, key: &ControlKey) -> Result<()> {
        self.control(key).await?.click().await
    }

    async fn type_search(&self, key: &ControlKey, text: &str) -> Result<()> {
        let el = self.control(key).await?;
        el.focus().await?;
        el.type_text(text).await
    }

    async fn picker_options(&self) -> Result<Vec<String>> {
        self.run_script(&scripts::picker_options(), json!({})).await
    }

    async fn pick_rendered_option(&self, index: usize) -> Result<()> {
        self.run_script(&scripts::pick_rendered_option(), json!({ "index": index }))
            .await
    }

    async fn press_key(&self, key: &ControlKey, name: &str) -> Result<()> {
        self.control(key).await?.press_key(name).await
    }

    async fn attach_file(&self, key: &ControlKey, path: &Path) -> Result<()> {
        let absolute = tokio::fs::canonicalize(path).await?;
        let el = self.control(key).await?;
        let params = SetFileInputFilesParams::builder()
            .file(absolute.to_string_lossy().into_owned())
            .backend_node_id(el.backend_node_id())
            .build()
            .map_err(Error::JsError)?;
        self.inner.execute(params).await?;
        debug!(%key, file = %absolute.display(), "file attached");
        Ok(())
    }

    async fn read_validation_state(&self) -> Result<ValidationErrorSnapshot> {
        let errors: Vec<ValidationError> = self.run_script(scripts::VALIDATION_STATE, json!({})).await?;
        Ok(ValidationErrorSnapshot::new(errors))
    }

    async fn current_url(&self) -> Result<String> {
        self.url().await
    }

    async fn body_text(&self) -> Result<String> {
        self.run_script(scripts::BODY_TEXT, json!({})).await
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        self.run_script(scripts::HAS_ELEMENT, json!({ "selector": selector })).await
    }

    async fn locate(&self, strategy: &LocatorStrategy) -> Result<Option<ControlKey>> {
        let args = match strategy {
            LocatorStrategy::Css(selector) => json!({ "css": selector }),
            LocatorStrategy::ButtonText(text) => json!({ "text": text }),
        };
        self.run_script(scripts::LOCATE, args).await
    }

    async fn click(&self, key: &ControlKey) -> Result<()> {
        self.control(key).await?.click().await
    }

    /// Subscribe before enabling the domain so no early event is missed.
    async fn watch_network(&self) -> Result<NetworkWatch> {
        let mut requests = self.inner.event_listener::<EventRequestWillBeSent>().await?;
        let mut responses = self.inner.event_listener::<EventResponseReceived>().await?;
        self.inner.execute(NetworkEnableParams::default()).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let request_tx = tx.clone();
        let request_task = tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                let forwarded = request_tx.send(NetworkEvent::Request {
                    request_id: event.request_id.inner().clone(),
                    method: event.request.method.clone(),
                    url: event.request.url.clone(),
                });
                if forwarded.is_err() {
                    break;
                }
            }
        });
        let response_task = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let status = u16::try_from(event.response.status).unwrap_or(0);
                let forwarded = tx.send(NetworkEvent::Response {
                    request_id: event.request_id.inner().clone(),
                    status,
                });
                if forwarded.is_err() {
                    break;
                }
            }
        });

        Ok(NetworkWatch::new(rx, vec![request_task, response_task]))
    }

    async fn capture_full_page(&self, path: &Path) -> Result<()> {
        self.screenshot_full_page_to_file(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_selector_escapes_quotes() {
        assert_eq!(
            key_selector(&ControlKey::new("c1")),
            r#"[data-autoapply-key="c1"]"#
        );
        assert_eq!(
            key_selector(&ControlKey::new(r#"a"b"#)),
            r#"[data-autoapply-key="a\"b"]"#
        );
    }
}
