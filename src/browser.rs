use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use tracing::{debug, info};

use crate::config::{BrowserBuilder, BrowserConfig};
use crate::error::{Error, Result};
use crate::page::Page;
use crate::stealth;

/// Chrome flags that cut startup work without changing page behavior.
const PERF_ARGS: &[&str] = &[
    "disable-gpu",
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "no-default-browser-check",
    "disable-client-side-phishing-detection",
    "disable-prompt-on-repost",
];

/// One Chrome instance driving application portals.
pub struct PortalBrowser {
    browser: CrBrowser,
    stealth: bool,
    default_timeout: std::time::Duration,
    _handler_task: tokio::task::JoinHandle<()>,
}

impl PortalBrowser {
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    /// Launch a browser instance with the given configuration.
    pub async fn launch(config: BrowserConfig) -> Result<Self> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        for arg in PERF_ARGS {
            builder = builder.arg(*arg);
        }

        if config.stealth {
            for arg in stealth::SWITCHES {
                builder = builder.arg(*arg);
            }
            for pair in stealth::VALUED_SWITCHES {
                builder = builder.arg(*pair);
            }
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(("proxy-server", proxy.as_str()));
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

        let cr_config = builder
            .build()
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "cdp handler event failed");
                }
            }
        });

        info!(
            headless = config.headless,
            stealth = config.stealth,
            proxied = config.proxy.is_some(),
            "browser launched"
        );

        Ok(Self {
            browser,
            stealth: config.stealth,
            default_timeout: config.default_timeout,
            _handler_task: handler_task,
        })
    }

    /// Open a blank tab, with the stealth init script installed when enabled.
    ///
    /// The returned page is reused for every job in a run.
    pub async fn open_page(&self) -> Result<Page> {
        let cr_page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;

        if self.stealth {
            stealth::apply_stealth(&cr_page).await?;
        }

        Ok(Page::new(cr_page, self.default_timeout))
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        self.browser.wait().await?;
        Ok(())
    }
}
