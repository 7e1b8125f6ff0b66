use std::path::Path;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use log::{info, warn};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tokio::process::Command;

use crate::config::AppConfig;
use crate::domain::error::LifecycleError;
use crate::domain::extract::extract;
use crate::domain::model::DeploymentMetadata;
use crate::domain::naming::render_preview_descriptor;
use crate::domain::port::Deployer;

/// Adapter around the `spin` executable. Owns descriptor rendering, the auth
/// token file and plugin installation; everything else is the tool's job.
pub struct SpinDeployer {
    pub config: AppConfig,
}

#[derive(serde_derive::Deserialize)]
struct SpinManifest {
    name: String,
}

#[derive(serde_derive::Serialize)]
struct TokenFile<'a> {
    url: &'a str,
    danger_accept_invalid_certs: bool,
    token: &'a str,
    expiration: String,
}

/// Reads the application name out of the deploy descriptor.
pub fn read_manifest_name(path: &str) -> Result<String, LifecycleError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LifecycleError::Configuration(format!("can't read {path}: {e}")))?;
    let manifest: SpinManifest = toml::from_str(&text)
        .map_err(|e| LifecycleError::Configuration(format!("can't parse {path}: {e}")))?;
    Ok(manifest.name)
}

/// Places the platform auth token where the deploy tool expects it. Token
/// lifetime is pinned to two hours, plenty for one CI run.
pub fn write_token_file(token_dir: &str, base: &str, token: &str) -> Result<(), LifecycleError> {
    let expiration = (OffsetDateTime::now_utc() + Duration::hours(2))
        .format(&Rfc3339)
        .context("Can't format token expiration")?;
    let content = serde_json::to_string(&TokenFile {
        url: base,
        danger_accept_invalid_certs: false,
        token,
        expiration,
    })
    .context("Can't serialize token file")?;

    std::fs::create_dir_all(token_dir)
        .with_context(|| format!("Can't create token directory {token_dir}"))?;
    let token_file = Path::new(token_dir).join("config.json");
    std::fs::write(&token_file, content)
        .with_context(|| format!("Can't write token file {}", token_file.display()))?;
    Ok(())
}

/// Installs the configured plugins (comma-separated list), updating the
/// plugin index first. Empty list is a no-op.
pub async fn install_plugins(spin_bin: &str, plugins: &str) -> Result<(), LifecycleError> {
    let plugins: Vec<&str> = plugins
        .split(',')
        .map(str::trim)
        .filter(|plugin| !plugin.is_empty())
        .collect();
    if plugins.is_empty() {
        return Ok(());
    }

    run_spin(spin_bin, &["plugin", "update"]).await?;
    for plugin in plugins {
        info!("installing spin plugin {}", plugin);
        run_spin(spin_bin, &["plugin", "install", plugin, "--yes"]).await?;
    }
    Ok(())
}

async fn run_spin(spin_bin: &str, args: &[&str]) -> Result<(), LifecycleError> {
    let status = Command::new(spin_bin)
        .args(args)
        .status()
        .await
        .with_context(|| format!("Can't run {spin_bin} {}", args.join(" ")))?;
    if !status.success() {
        return Err(LifecycleError::Other(anyhow!(
            "{spin_bin} {} exited with {status}",
            args.join(" ")
        )));
    }
    Ok(())
}

#[async_trait]
impl Deployer for SpinDeployer {
    async fn deploy_preview(
        &self,
        real_name: &str,
        preview_name: &str,
    ) -> Result<DeploymentMetadata, LifecycleError> {
        let descriptor = tokio::fs::read_to_string(&self.config.spin_toml_file)
            .await
            .with_context(|| format!("Can't read descriptor {}", self.config.spin_toml_file))?;

        // The shared descriptor stays untouched, the preview deploys from
        // its own rendered copy.
        let rendered = render_preview_descriptor(&descriptor, real_name, preview_name);
        if rendered == descriptor {
            warn!(
                "descriptor {} has no 'name = \"{}\"' entry, deploying would target the real app",
                self.config.spin_toml_file, real_name
            );
        }
        let preview_file = format!("{preview_name}-spin.toml");
        tokio::fs::write(&preview_file, rendered)
            .await
            .with_context(|| format!("Can't write preview descriptor {preview_file}"))?;

        let output = Command::new(&self.config.spin_bin)
            .args(["deploy", "--file", &preview_file])
            .output()
            .await
            .with_context(|| format!("Can't run {} deploy", self.config.spin_bin))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(LifecycleError::DeployFailed {
                code: output.status.code().unwrap_or(-1),
                stdout,
                stderr,
            });
        }

        Ok(extract(preview_name, &stdout))
    }
}
