//! Configuration loader and validator for the portal watch daemon.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub portal: Portal,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub poll_interval_secs: u64,
}

/// Portal endpoints and scraping settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Portal {
    /// Origin of the LMS, e.g. `https://panda.ecs.kyoto-u.ac.jp`.
    pub base_url: String,
    /// Substring a course title must contain to be synced, e.g. `2025後期`.
    /// An empty string keeps every course.
    #[serde(default)]
    pub term_filter: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

impl Portal {
    fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// CAS login endpoint with the portal root as the service parameter.
    pub fn login_url(&self) -> String {
        format!("{origin}/cas/login?service={origin}/portal", origin = self.origin())
    }

    /// Authenticated portal landing page carrying the course catalog.
    pub fn portal_url(&self) -> String {
        format!("{}/portal", self.origin())
    }

    /// Per-course assignment JSON endpoint.
    pub fn assignment_url(&self, site_id: &str) -> String {
        format!("{}/direct/assignment/site/{}.json", self.origin(), site_id)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_secs must be > 0"));
    }

    let base = cfg.portal.base_url.trim();
    if base.is_empty() {
        return Err(ConfigError::Invalid("portal.base_url must be non-empty"));
    }
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ConfigError::Invalid("portal.base_url must be an http(s) URL"));
    }

    Ok(())
}

/// Example YAML shipped with `--print-example-config`.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_secs: 900

portal:
  base_url: "https://panda.ecs.kyoto-u.ac.jp"
  term_filter: "2025後期"
"#
}
