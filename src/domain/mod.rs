use anyhow::anyhow;
use log::info;

use error::LifecycleError;
use model::{Application, Decision, DeploymentMetadata, PrEvent};
use port::{AppRegistry, Deployer, PullRequestHost};

pub mod error;
pub mod extract;
pub mod model;
pub mod naming;
pub mod port;

pub struct PreviewService {
    pub registry: Box<dyn AppRegistry + 'static + Sync + Send>,
    pub deployer: Box<dyn Deployer + 'static + Sync + Send>,
    pub pull_requests: Box<dyn PullRequestHost + 'static + Sync + Send>,
}

/// Lifecycle policy. Pure: looks only at the registry listing passed in.
pub fn decide(
    event: PrEvent,
    existing: &[Application],
    preview_name: &str,
    quota: usize,
    allow_evict: bool,
) -> Result<Decision, LifecycleError> {
    let slot_held = existing.iter().any(|app| app.name == preview_name);
    match event {
        PrEvent::Closed if slot_held => Ok(Decision::DeleteExisting),
        PrEvent::Closed => Ok(Decision::Noop),
        _ if slot_held => Ok(Decision::DeployDirect),
        _ if existing.len() < quota => Ok(Decision::DeployDirect),
        _ if allow_evict => Ok(Decision::EvictOldestThenDeploy),
        _ => Err(LifecycleError::QuotaExceeded {
            quota,
            current: existing.len(),
        }),
    }
}

/// Runs one pull-request event end-to-end: list the registry, decide,
/// execute. Deploy paths return the extracted metadata.
pub async fn run_preview(
    service: &PreviewService,
    event: PrEvent,
    real_name: &str,
    pr_number: u64,
    quota: usize,
    allow_evict: bool,
) -> Result<Option<DeploymentMetadata>, LifecycleError> {
    let preview_name = naming::preview_name(real_name, pr_number);
    let existing = service.registry.list_apps().await?;

    match decide(event, &existing, &preview_name, quota, allow_evict)? {
        Decision::Noop => {
            info!("no preview found for pr {}", pr_number);
            return Ok(None);
        }
        Decision::DeleteExisting => {
            info!("cleaning up preview for pr {}", pr_number);
            service.registry.delete_by_name(&preview_name).await?;
            return Ok(None);
        }
        Decision::EvictOldestThenDeploy => {
            info!("apps limit reached, finding oldest pr to overwrite");
            let open_prs = service.pull_requests.list_open_prs().await?;
            // Only a PR whose preview is actually deployed frees a slot.
            let victim_pr = open_prs
                .into_iter()
                .find(|pr| {
                    let name = naming::preview_name(real_name, *pr);
                    existing.iter().any(|app| app.name == name)
                })
                .ok_or_else(|| anyhow!("no open pull request with a deployed preview to evict"))?;
            let victim = naming::preview_name(real_name, victim_pr);
            info!("deleting app by name {}", victim);
            service.registry.delete_by_name(&victim).await?;
        }
        Decision::DeployDirect => {}
    }

    info!("deploying preview as {}", preview_name);
    let metadata = service
        .deployer
        .deploy_preview(real_name, &preview_name)
        .await?;
    Ok(Some(metadata))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;

    fn app(id: &str, name: &str) -> Application {
        Application {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[derive(Default)]
    struct CallLog {
        deleted: Mutex<Vec<String>>,
        deployed: Mutex<Vec<String>>,
    }

    impl CallLog {
        fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }

        fn deployed(&self) -> Vec<String> {
            self.deployed.lock().unwrap().clone()
        }
    }

    struct FakeRegistry {
        apps: Vec<Application>,
        log: Arc<CallLog>,
    }

    #[async_trait]
    impl AppRegistry for FakeRegistry {
        async fn list_apps(&self) -> Result<Vec<Application>, LifecycleError> {
            Ok(self.apps.clone())
        }

        async fn find_by_name(&self, name: &str) -> Result<Application, LifecycleError> {
            self.apps
                .iter()
                .find(|app| app.name == name)
                .cloned()
                .ok_or_else(|| LifecycleError::NotFound(name.to_string()))
        }

        async fn delete_by_name(&self, name: &str) -> Result<(), LifecycleError> {
            self.log.deleted.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    struct FakeDeployer {
        log: Arc<CallLog>,
    }

    #[async_trait]
    impl Deployer for FakeDeployer {
        async fn deploy_preview(
            &self,
            _real_name: &str,
            preview_name: &str,
        ) -> Result<DeploymentMetadata, LifecycleError> {
            self.log.deployed.lock().unwrap().push(preview_name.to_string());
            Ok(extract::extract(
                preview_name,
                "Available Routes:\n  web: https://preview.example.com\n",
            ))
        }
    }

    struct FakePulls {
        open: Vec<u64>,
    }

    #[async_trait]
    impl PullRequestHost for FakePulls {
        async fn list_open_prs(&self) -> Result<Vec<u64>, LifecycleError> {
            Ok(self.open.clone())
        }

        async fn upsert_comment(&self, _pr_number: u64, _body: &str) -> Result<(), LifecycleError> {
            Ok(())
        }
    }

    fn service(apps: Vec<Application>, open: Vec<u64>) -> (PreviewService, Arc<CallLog>) {
        let log = Arc::new(CallLog::default());
        let service = PreviewService {
            registry: Box::new(FakeRegistry {
                apps,
                log: Arc::clone(&log),
            }),
            deployer: Box::new(FakeDeployer {
                log: Arc::clone(&log),
            }),
            pull_requests: Box::new(FakePulls { open }),
        };
        (service, log)
    }

    fn five_previews() -> Vec<Application> {
        (1..=5)
            .map(|pr| app(&format!("id-{pr}"), &naming::preview_name("myapp", pr)))
            .collect()
    }

    #[test]
    fn quota_full_without_eviction_is_refused() {
        let result = decide(PrEvent::Opened, &five_previews(), "myapp-pr-42", 5, false);
        assert!(matches!(
            result,
            Err(LifecycleError::QuotaExceeded { quota: 5, current: 5 })
        ));
    }

    #[test]
    fn quota_full_with_eviction_allowed_evicts() {
        let decision = decide(PrEvent::Opened, &five_previews(), "myapp-pr-42", 5, true).unwrap();
        assert_eq!(decision, Decision::EvictOldestThenDeploy);
    }

    #[test]
    fn existing_slot_redeploys_even_at_quota() {
        let decision = decide(PrEvent::Updated, &five_previews(), "myapp-pr-3", 5, false).unwrap();
        assert_eq!(decision, Decision::DeployDirect);
    }

    #[test]
    fn free_slot_deploys_directly() {
        let apps = vec![app("id-1", "myapp-pr-1")];
        let decision = decide(PrEvent::Opened, &apps, "myapp-pr-42", 5, false).unwrap();
        assert_eq!(decision, Decision::DeployDirect);
    }

    #[test]
    fn closing_without_preview_is_noop() {
        let decision = decide(PrEvent::Closed, &[], "myapp-pr-42", 5, false).unwrap();
        assert_eq!(decision, Decision::Noop);
    }

    #[test]
    fn closing_with_preview_deletes_it() {
        let apps = vec![app("id-42", "myapp-pr-42")];
        let decision = decide(PrEvent::Closed, &apps, "myapp-pr-42", 5, false).unwrap();
        assert_eq!(decision, Decision::DeleteExisting);
    }

    #[tokio::test]
    async fn closed_event_without_preview_touches_nothing() {
        let (service, log) = service(vec![app("id-1", "myapp-pr-1")], vec![1]);
        let result = run_preview(&service, PrEvent::Closed, "myapp", 42, 5, false)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(log.deleted().is_empty());
        assert!(log.deployed().is_empty());
    }

    #[tokio::test]
    async fn eviction_deletes_exactly_the_oldest_preview_then_deploys() {
        let (service, log) = service(five_previews(), vec![1, 2, 3, 4, 5, 42]);
        let metadata = run_preview(&service, PrEvent::Opened, "myapp", 42, 5, true)
            .await
            .unwrap()
            .expect("deploy path returns metadata");
        assert_eq!(metadata.app_name, "myapp-pr-42");
        assert_eq!(metadata.base, "https://preview.example.com");
        assert_eq!(log.deleted(), vec!["myapp-pr-1".to_string()]);
        assert_eq!(log.deployed(), vec!["myapp-pr-42".to_string()]);
    }

    #[tokio::test]
    async fn eviction_skips_open_prs_without_a_deployed_preview() {
        // pr 6 is the oldest open pr but never had a preview; the oldest
        // open pr still holding a slot is 2.
        let apps = vec![
            app("id-2", "myapp-pr-2"),
            app("id-3", "myapp-pr-3"),
            app("id-4", "myapp-pr-4"),
            app("id-5", "myapp-pr-5"),
            app("id-real", "myapp"),
        ];
        let (service, log) = service(apps, vec![6, 2, 3, 4, 5, 42]);

        let result = run_preview(&service, PrEvent::Opened, "myapp", 42, 5, true)
            .await
            .unwrap();
        assert!(result.is_some());
        assert_eq!(log.deleted(), vec!["myapp-pr-2".to_string()]);
        assert_eq!(log.deployed(), vec!["myapp-pr-42".to_string()]);
    }

    #[tokio::test]
    async fn eviction_without_any_evictable_preview_fails_cleanly() {
        // Five non-preview apps fill the quota, no open pr holds a slot.
        let apps: Vec<Application> = (1..=5)
            .map(|i| app(&format!("id-{i}"), &format!("service-{i}")))
            .collect();
        let (service, log) = service(apps, vec![6, 42]);

        let result = run_preview(&service, PrEvent::Opened, "myapp", 42, 5, true).await;
        assert!(matches!(result, Err(LifecycleError::Other(_))));
        assert!(log.deleted().is_empty());
        assert!(log.deployed().is_empty());
    }

    #[tokio::test]
    async fn closed_event_with_preview_deletes_and_skips_deploy() {
        let (service, log) = service(vec![app("id-42", "myapp-pr-42")], vec![42]);
        let result = run_preview(&service, PrEvent::Closed, "myapp", 42, 5, false)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(log.deleted(), vec!["myapp-pr-42".to_string()]);
        assert!(log.deployed().is_empty());
    }

    #[tokio::test]
    async fn redeploy_in_place_never_deletes() {
        let (service, log) = service(five_previews(), vec![1, 2, 3, 4, 5, 42]);
        let metadata = run_preview(&service, PrEvent::Updated, "myapp", 3, 5, false)
            .await
            .unwrap();
        assert!(metadata.is_some());
        assert!(log.deleted().is_empty());
        assert_eq!(log.deployed(), vec!["myapp-pr-3".to_string()]);
    }

    #[tokio::test]
    async fn quota_exceeded_surfaces_from_run() {
        let (service, log) = service(five_previews(), vec![1, 2, 3, 4, 5, 42]);
        let result = run_preview(&service, PrEvent::Opened, "myapp", 42, 5, false).await;
        assert!(matches!(result, Err(LifecycleError::QuotaExceeded { .. })));
        assert!(log.deleted().is_empty());
        assert!(log.deployed().is_empty());
    }
}
