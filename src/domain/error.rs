use thiserror::Error;

/// Errors surfaced by the preview lifecycle. Every variant terminates the
/// invocation; the CI pipeline re-triggers runs, so nothing is retried here.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("no app found with name {0}")]
    NotFound(String),

    #[error("multiple apps found with name {0}, refusing to pick one")]
    AmbiguousName(String),

    #[error("max apps allowed limit exceeded. max_allowed: {quota}, current_apps_count: {current}. Use option 'overwrite_old_previews=true' to overwrite old previews")]
    QuotaExceeded { quota: usize, current: usize },

    #[error("deploy failed with [status_code: {code}] [stdout: {stdout}] [stderr: {stderr}]")]
    DeployFailed {
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
