use anyhow::Context;
use async_trait::async_trait;
use itertools::Itertools;
use log::info;

use crate::domain::error::LifecycleError;
use crate::domain::model::Application;
use crate::domain::port::AppRegistry;

/// Registry client for the hosting platform's application API.
pub struct CloudRegistry {
    base: String,
    token: String,
    client: reqwest::Client,
}

#[derive(serde_derive::Deserialize)]
struct AppsResponse {
    items: Vec<Application>,
}

impl CloudRegistry {
    pub fn new(base: &str, token: &str) -> Result<Self, LifecycleError> {
        let client = reqwest::Client::builder()
            .user_agent("previewctl")
            .build()
            .context("Can't build http client")?;
        Ok(CloudRegistry {
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }
}

/// Name resolution over a registry listing. The platform does not guarantee
/// name uniqueness; a duplicate is refused rather than silently resolved to
/// whichever entry listed first.
fn select_by_name(apps: Vec<Application>, name: &str) -> Result<Application, LifecycleError> {
    apps.into_iter()
        .filter(|app| app.name == name)
        .at_most_one()
        .map_err(|_| LifecycleError::AmbiguousName(name.to_string()))?
        .ok_or_else(|| LifecycleError::NotFound(name.to_string()))
}

#[async_trait]
impl AppRegistry for CloudRegistry {
    async fn list_apps(&self) -> Result<Vec<Application>, LifecycleError> {
        let response = self
            .client
            .get(format!("{}/api/apps", self.base))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| LifecycleError::RegistryUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(LifecycleError::RegistryUnavailable(format!(
                "listing apps returned status {}",
                response.status()
            )));
        }
        let apps: AppsResponse = response
            .json()
            .await
            .map_err(|e| LifecycleError::RegistryUnavailable(e.to_string()))?;
        Ok(apps.items)
    }

    async fn find_by_name(&self, name: &str) -> Result<Application, LifecycleError> {
        select_by_name(self.list_apps().await?, name)
    }

    async fn delete_by_name(&self, name: &str) -> Result<(), LifecycleError> {
        let app = self.find_by_name(name).await?;
        info!("deleting app {} (id {})", app.name, app.id);
        let response = self
            .client
            .delete(format!("{}/api/apps/{}", self.base, app.id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| LifecycleError::RegistryUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(LifecycleError::RegistryUnavailable(format!(
                "deleting app {} returned status {}",
                app.id,
                response.status()
            )));
        }
        Ok(())
    }
}
