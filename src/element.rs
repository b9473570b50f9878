use chromiumoxide::cdp::browser_protocol::dom::BackendNodeId;
use chromiumoxide::element::Element as CrElement;

use crate::error::Result;

/// Wrapper around a chromiumoxide Element for the interactions that need
/// real input events rather than injected script.
pub struct Element {
    inner: CrElement,
}

impl Element {
    pub(crate) fn new(inner: CrElement) -> Self {
        Self { inner }
    }

    pub(crate) fn backend_node_id(&self) -> BackendNodeId {
        self.inner.backend_node_id.clone()
    }

    /// Click this element (scrolls into view first).
    pub async fn click(&self) -> Result<()> {
        self.inner.click().await?;
        Ok(())
    }

    /// Type text into this element key by key, so search-as-you-type
    /// widgets see every keystroke.
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.inner.type_str(text).await?;
        Ok(())
    }

    /// Press a key on this element (e.g. "Escape", "Enter").
    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.inner.press_key(key).await?;
        Ok(())
    }

    pub async fn focus(&self) -> Result<()> {
        self.inner.focus().await?;
        Ok(())
    }
}
