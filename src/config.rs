use anyhow::{Context, Error};
use config::Config;

use crate::domain::error::LifecycleError;
use crate::domain::model::PrEvent;

/// All inputs come from the CI environment, prefixed `PREVIEWCTL_`
/// (e.g. `PREVIEWCTL_CLOUD_TOKEN`, `PREVIEWCTL_PR_NUMBER`).
#[derive(Debug, Clone, serde_derive::Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub cloud_base: String,
    pub cloud_token: String,
    pub token_dir: String,
    pub spin_bin: String,
    pub spin_toml_file: String,
    pub plugins: String,
    pub quota: usize,
    pub overwrite_old_previews: bool,
    pub github_token: String,
    pub github_repo: String,
    pub pr_number: u64,
    pub pr_event: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cloud_base: "https://cloud.fermyon.com".to_string(),
            cloud_token: String::new(),
            token_dir: format!(
                "{}/.config/fermyon",
                std::env::var("HOME").unwrap_or_else(|_| "/home/runner".to_string())
            ),
            spin_bin: "spin".to_string(),
            spin_toml_file: "spin.toml".to_string(),
            plugins: String::new(),
            quota: 5,
            overwrite_old_previews: false,
            github_token: String::new(),
            github_repo: String::new(),
            pr_number: 0,
            pr_event: String::new(),
        }
    }
}

pub fn load_config() -> Result<AppConfig, Error> {
    let config = Config::builder()
        .add_source(config::Environment::with_prefix("previewctl").try_parsing(true))
        .build()
        .context("Can't load configuration")?;

    config
        .try_deserialize()
        .context("Can't deserialize AppConfig from loaded configuration")
}

impl AppConfig {
    /// Fails fast on missing credentials or PR context, before any network
    /// call is made. Returns the parsed event on success.
    pub fn validate(&self) -> Result<PrEvent, LifecycleError> {
        if self.cloud_token.is_empty() {
            return Err(LifecycleError::Configuration(
                "cloud_token is required to authenticate against the platform".to_string(),
            ));
        }
        if self.github_token.is_empty() || self.github_repo.is_empty() {
            return Err(LifecycleError::Configuration(
                "github_token and github_repo are required for PR previews".to_string(),
            ));
        }
        if self.pr_number == 0 {
            return Err(LifecycleError::Configuration(
                "pr_number is required, previews only run for pull requests".to_string(),
            ));
        }
        PrEvent::parse(&self.pr_event).ok_or_else(|| {
            LifecycleError::Configuration(format!(
                "unsupported pull request event '{}'",
                self.pr_event
            ))
        })
    }
}
