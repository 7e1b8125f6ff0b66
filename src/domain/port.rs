use async_trait::async_trait;

use super::error::LifecycleError;
use super::model::{Application, DeploymentMetadata};

/// Application registry of the hosting platform. Network only, no policy.
#[async_trait]
pub trait AppRegistry {
    async fn list_apps(&self) -> Result<Vec<Application>, LifecycleError>;

    /// Resolves an application by name over `list_apps`. Zero matches is
    /// `NotFound`, more than one is `AmbiguousName`.
    async fn find_by_name(&self, name: &str) -> Result<Application, LifecycleError>;

    async fn delete_by_name(&self, name: &str) -> Result<(), LifecycleError>;
}

/// Runs the external deploy tool against a renamed copy of the descriptor and
/// extracts metadata from its output.
#[async_trait]
pub trait Deployer {
    async fn deploy_preview(
        &self,
        real_name: &str,
        preview_name: &str,
    ) -> Result<DeploymentMetadata, LifecycleError>;
}

/// Pull-request host API. The open-PR listing is only consulted when a
/// quota slot must be evicted.
#[async_trait]
pub trait PullRequestHost {
    /// Open pull-request numbers, oldest first by creation.
    async fn list_open_prs(&self) -> Result<Vec<u64>, LifecycleError>;

    /// Posts the comment on the given PR, updating this controller's
    /// previous comment when one exists.
    async fn upsert_comment(&self, pr_number: u64, body: &str) -> Result<(), LifecycleError>;
}
