use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::browser::PortalBrowser;
use crate::error::Result;

pub struct BrowserConfig {
    pub headless: bool,
    pub stealth: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
    /// Proxy server URL, e.g. "http://host:port" or "socks5://host:port".
    pub proxy: Option<String>,
    /// Default timeout for operations like `wait_for_selector` (default: 30s).
    pub default_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            stealth: true,
            viewport_width: 1440,
            viewport_height: 1000,
            chrome_path: None,
            proxy: None,
            default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn stealth(mut self, stealth: bool) -> Self {
        self.config.stealth = stealth;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Set the default timeout for operations like `wait_for_selector`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Route traffic through a proxy server.
    pub fn proxy(mut self, server: impl Into<String>) -> Self {
        self.config.proxy = Some(server.into());
        self
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    pub async fn build(self) -> Result<PortalBrowser> {
        PortalBrowser::launch(self.build_config()).await
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing and traversal bounds shared by the filler and the router.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ancestor levels searched for a label or legend.
    pub label_depth: usize,
    /// Upper bound on any single field interaction.
    pub field_timeout: Duration,
    /// How long a picker's options panel may take to render.
    pub picker_wait: Duration,
    pub picker_poll: Duration,
    /// Job description characters forwarded to the answer provider.
    pub context_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            label_depth: crate::form::label::DEFAULT_MAX_DEPTH,
            field_timeout: Duration::from_secs(5),
            picker_wait: Duration::from_millis(1500),
            picker_poll: Duration::from_millis(100),
            context_limit: 6000,
        }
    }
}

/// Files and limits for one `autoapply run` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub max_applications: usize,
    pub profile_path: PathBuf,
    pub jobs_csv: PathBuf,
    pub applications_csv: PathBuf,
    pub resume_dir: PathBuf,
    pub default_resume: Option<PathBuf>,
    pub artifact_dir: PathBuf,
}

/// Chat-completions endpoint used for answers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Everything read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub headless: bool,
    pub stealth: bool,
    pub chrome_path: Option<String>,
    pub proxy: Option<String>,
    pub run: RunConfig,
    pub provider: ProviderConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got `{value}`")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be true/false, got `{value}`")]
    InvalidBool { var: &'static str, value: String },
}

impl AppConfig {
    /// Read `.env` (if present) and then the process environment.
    pub fn load() -> std::result::Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str, default: &str| PathBuf::from(get(key).unwrap_or_else(|| default.to_string()));

        let run = RunConfig {
            max_applications: parse_usize(&get, "AUTOAPPLY_MAX_APPLICATIONS", 5)?,
            profile_path: path("AUTOAPPLY_PROFILE", "data/master_resume.json"),
            jobs_csv: path("AUTOAPPLY_JOBS_CSV", "data/job_intake.csv"),
            applications_csv: path("AUTOAPPLY_APPLICATIONS_CSV", "data/applications.csv"),
            resume_dir: path("AUTOAPPLY_RESUME_DIR", "output"),
            default_resume: get("AUTOAPPLY_DEFAULT_RESUME").map(PathBuf::from),
            artifact_dir: path("AUTOAPPLY_ARTIFACT_DIR", "output/diagnostics"),
        };

        let provider = ProviderConfig {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        };

        Ok(Self {
            headless: parse_bool(&get, "AUTOAPPLY_HEADLESS", true)?,
            stealth: parse_bool(&get, "AUTOAPPLY_STEALTH", true)?,
            chrome_path: get("AUTOAPPLY_CHROME_PATH"),
            proxy: get("AUTOAPPLY_PROXY"),
            run,
            provider,
            telemetry: TelemetryConfig {
                log_level: get("AUTOAPPLY_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
        })
    }

    pub fn browser_builder(&self) -> BrowserBuilder {
        let mut builder = BrowserBuilder::new()
            .headless(self.headless)
            .stealth(self.stealth);
        if let Some(ref path) = self.chrome_path {
            builder = builder.chrome_path(path);
        }
        if let Some(ref proxy) = self.proxy {
            builder = builder.proxy(proxy);
        }
        builder
    }
}

fn parse_usize(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: usize,
) -> std::result::Result<usize, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: bool,
) -> std::result::Result<bool, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool { var, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> std::result::Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert!(config.headless);
        assert_eq!(config.run.max_applications, 5);
        assert_eq!(config.run.jobs_csv, PathBuf::from("data/job_intake.csv"));
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.api_key, None);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("AUTOAPPLY_MAX_APPLICATIONS", "12"),
            ("AUTOAPPLY_HEADLESS", "false"),
            ("OPENAI_API_KEY", "sk-test"),
            ("AUTOAPPLY_DEFAULT_RESUME", "output/resume.pdf"),
        ])
        .unwrap();
        assert_eq!(config.run.max_applications, 12);
        assert!(!config.headless);
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.run.default_resume, Some(PathBuf::from("output/resume.pdf")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            config_from(&[("AUTOAPPLY_MAX_APPLICATIONS", "many")]).unwrap_err(),
            ConfigError::InvalidNumber {
                var: "AUTOAPPLY_MAX_APPLICATIONS",
                value: "many".into()
            }
        );
        assert!(matches!(
            config_from(&[("AUTOAPPLY_STEALTH", "maybe")]),
            Err(ConfigError::InvalidBool { .. })
        ));
    }

    #[test]
    fn browser_builder_carries_launch_options() {
        let config = config_from(&[
            ("AUTOAPPLY_HEADLESS", "off"),
            ("AUTOAPPLY_PROXY", "http://127.0.0.1:8080"),
        ])
        .unwrap();
        let launch = config
            .browser_builder()
            .viewport(1280, 800)
            .timeout(Duration::from_secs(10))
            .build_config();
        assert!(!launch.headless);
        assert!(launch.stealth);
        assert_eq!(launch.proxy.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!((launch.viewport_width, launch.viewport_height), (1280, 800));
        assert_eq!(launch.default_timeout, Duration::from_secs(10));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("OPENAI_MODEL", "  ")]).unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
    }
}
