//! Launch flags and an init script that keep application portals from
//! flagging the session as automated.

use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page as CrPage;

use crate::error::{Error, Result};

pub const STEALTH_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

/// Bare switches. chromiumoxide adds the `--` prefix itself.
pub const SWITCHES: &[&str] = &["disable-infobars", "no-first-run", "disable-default-apps"];

/// `--key=value` switches.
pub const VALUED_SWITCHES: &[(&str, &str)] = &[
    ("disable-blink-features", "AutomationControlled"),
    ("user-agent", STEALTH_USER_AGENT),
    ("lang", "en-US,en"),
];

/// Install the init script so it runs before any portal script on every
/// document the page loads.
pub async fn apply_stealth(page: &CrPage) -> Result<()> {
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(INIT_SCRIPT))
        .await
        .map_err(|e| Error::JsError(format!("stealth init script rejected: {e}")))?;
    Ok(())
}

const INIT_SCRIPT: &str = r#"
(() => {
  const define = (target, prop, value) => {
    try { Object.defineProperty(target, prop, { get: () => value, configurable: true }); } catch (_) {}
  };

  define(Navigator.prototype, 'webdriver', undefined);
  define(Navigator.prototype, 'languages', ['en-US', 'en']);
  define(Navigator.prototype, 'hardwareConcurrency', 8);
  define(Navigator.prototype, 'deviceMemory', 8);

  if (!window.chrome) {
    window.chrome = { runtime: {}, app: { isInstalled: false }, csi: () => ({}), loadTimes: () => ({}) };
  }

  // Headless reports "denied" for notifications while Notification.permission says "default".
  const query = window.Permissions && window.Permissions.prototype.query;
  if (query) {
    window.Permissions.prototype.query = function (params) {
      if (params && params.name === 'notifications') {
        return Promise.resolve({ state: Notification.permission, onchange: null });
      }
      return query.call(this, params);
    };
  }

  for (const ctx of [window.WebGLRenderingContext, window.WebGL2RenderingContext]) {
    if (!ctx) continue;
    const getParameter = ctx.prototype.getParameter;
    ctx.prototype.getParameter = function (p) {
      if (p === 37445) return 'Google Inc. (Intel)';
      if (p === 37446) return 'ANGLE (Intel, Intel(R) UHD Graphics 620 Direct3D11 vs_5_0 ps_5_0)';
      return getParameter.call(this, p);
    };
  }
})();
"#;
