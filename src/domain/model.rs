use serde::{Deserialize, Serialize};

/// An application as listed by the hosting platform. Identity is `id`;
/// lookups from this controller go through `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
}

/// A published endpoint reported by the deploy tool for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub url: String,
    pub wildcard: bool,
}

/// Everything recovered from one deploy invocation's output. `base` is the
/// url of the first route when any route was found, empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    pub app_name: String,
    pub base: String,
    pub version: String,
    pub routes: Vec<Route>,
    pub raw_logs: String,
}

/// The pull-request event this invocation reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrEvent {
    Opened,
    Updated,
    Closed,
}

impl PrEvent {
    /// Maps the action string of a pull-request webhook payload.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "opened" | "reopened" => Some(PrEvent::Opened),
            "synchronize" | "updated" => Some(PrEvent::Updated),
            "closed" => Some(PrEvent::Closed),
            _ => None,
        }
    }
}

/// Outcome of the lifecycle policy for one invocation. Never stored, computed
/// fresh from the registry listing each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Noop,
    DeleteExisting,
    DeployDirect,
    EvictOldestThenDeploy,
}
