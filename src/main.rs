use std::error::Error;

use config::load_config;
use domain::{run_preview, PreviewService};
use infra::{cloud::CloudRegistry, github::GithubClient, spin::SpinDeployer};
use log::info;

mod config;
mod domain;
mod infra;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = load_config()?;
    let event = config.validate()?;

    info!("reading app name from {}", config.spin_toml_file);
    let real_name = infra::spin::read_manifest_name(&config.spin_toml_file)?;

    info!("configuring token for spin auth");
    infra::spin::write_token_file(&config.token_dir, &config.cloud_base, &config.cloud_token)?;
    infra::spin::install_plugins(&config.spin_bin, &config.plugins).await?;

    let service = PreviewService {
        registry: Box::new(CloudRegistry::new(&config.cloud_base, &config.cloud_token)?),
        deployer: Box::new(SpinDeployer {
            config: config.clone(),
        }),
        pull_requests: Box::new(GithubClient::new(&config.github_repo, &config.github_token)?),
    };

    let result = run_preview(
        &service,
        event,
        &real_name,
        config.pr_number,
        config.quota,
        config.overwrite_old_previews,
    )
    .await?;

    if let Some(metadata) = result {
        let comment = format!("Your preview is available at {}", metadata.base);
        service
            .pull_requests
            .upsert_comment(config.pr_number, &comment)
            .await?;
        info!(
            "preview deployment successful and available at {}",
            metadata.base
        );
    }
    Ok(())
}
