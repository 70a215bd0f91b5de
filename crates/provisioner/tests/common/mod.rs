//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use provisioner::config::{
    default_tags, AzureConfig, Config, GitHubConfig, LogFormat, LoggingConfig, WebhookConfig,
};
use provisioner::providers::memory::InMemoryTrackingList;
use provisioner::{
    CloudProvisioner, CollaboratorPermission, CreateRepositoryRequest, ProviderError,
    ProvisioningRequest, RepositoryProvisioner, Repository, ResourceContainer, StatusUpdate, Tags,
    TrackingList,
};

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub fn test_config() -> Config {
    Config {
        app_name: "Azure Resources Tracker".to_string(),
        app_version: "1.0.0".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        azure: AzureConfig {
            subscription_id: "sub-1".to_string(),
            tenant_id: "tenant".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            default_location: "eastus".to_string(),
            default_tags: default_tags(),
        },
        github: GitHubConfig {
            token: "gh-token".to_string(),
            org: "acme".to_string(),
            auto_init: true,
            private: false,
        },
        sharepoint: None,
        webhook: WebhookConfig {
            secret: WEBHOOK_SECRET.to_string(),
            require_signature: false,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        },
    }
}

/// Arguments of one `create_resource_container` call.
#[derive(Debug, Clone)]
pub struct CloudCall {
    pub name: String,
    pub location: String,
    pub tags: Tags,
}

/// Cloud provisioner that records calls and can be told to fail.
#[derive(Default)]
pub struct FakeCloud {
    pub created: Mutex<Vec<CloudCall>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_with: Mutex<Option<String>>,
    pub delay: Mutex<Option<Duration>>,
}

impl FakeCloud {
    pub fn failing(message: &str) -> Self {
        let fake = Self::default();
        *fake.fail_with.lock().unwrap() = Some(message.to_string());
        fake
    }

    pub fn created(&self) -> Vec<CloudCall> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn container(name: &str, location: &str, tags: &Tags) -> ResourceContainer {
        ResourceContainer {
            id: format!("/subscriptions/sub-1/resourceGroups/{name}"),
            name: name.to_string(),
            location: location.to_string(),
            tags: tags.clone(),
            provisioning_state: "Succeeded".to_string(),
        }
    }
}

#[async_trait]
impl CloudProvisioner for FakeCloud {
    async fn create_resource_container(
        &self,
        name: &str,
        location: &str,
        tags: &Tags,
    ) -> Result<ResourceContainer, ProviderError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.created.lock().unwrap().push(CloudCall {
            name: name.to_string(),
            location: location.to_string(),
            tags: tags.clone(),
        });
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(ProviderError::Api {
                status: 409,
                message,
            });
        }
        Ok(Self::container(name, location, tags))
    }

    async fn get_resource_container(
        &self,
        name: &str,
    ) -> Result<Option<ResourceContainer>, ProviderError> {
        Ok(self
            .created()
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| Self::container(&c.name, &c.location, &c.tags)))
    }

    async fn delete_resource_container(&self, name: &str) -> Result<(), ProviderError> {
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn list_resource_containers(&self) -> Result<Vec<ResourceContainer>, ProviderError> {
        Ok(self
            .created()
            .iter()
            .map(|c| Self::container(&c.name, &c.location, &c.tags))
            .collect())
    }
}

/// Repository provisioner that records calls and can be told to fail.
#[derive(Default)]
pub struct FakeRepositories {
    pub created: Mutex<Vec<CreateRepositoryRequest>>,
    pub deleted: Mutex<Vec<String>>,
    pub collaborators: Mutex<Vec<(String, String, CollaboratorPermission)>>,
    pub fail_with: Mutex<Option<String>>,
    pub unhealthy: bool,
}

impl FakeRepositories {
    pub fn failing(message: &str) -> Self {
        let fake = Self::default();
        *fake.fail_with.lock().unwrap() = Some(message.to_string());
        fake
    }

    pub fn created(&self) -> Vec<CreateRepositoryRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositoryProvisioner for FakeRepositories {
    async fn create_repository(
        &self,
        req: CreateRepositoryRequest,
    ) -> Result<Repository, ProviderError> {
        self.created.lock().unwrap().push(req.clone());
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(ProviderError::Conflict(message));
        }
        Ok(Repository {
            id: 1,
            full_name: format!("acme/{}", req.name),
            html_url: format!("https://github.com/acme/{}", req.name),
            clone_url: format!("https://github.com/acme/{}.git", req.name),
            created_at: Utc::now(),
            private: req.private,
            name: req.name,
        })
    }

    async fn get_repository(&self, name: &str) -> Result<Option<Repository>, ProviderError> {
        Ok(self.created().into_iter().find(|r| r.name == name).map(|r| Repository {
            id: 1,
            full_name: format!("acme/{}", r.name),
            html_url: format!("https://github.com/acme/{}", r.name),
            clone_url: format!("https://github.com/acme/{}.git", r.name),
            created_at: Utc::now(),
            private: r.private,
            name: r.name,
        }))
    }

    async fn delete_repository(&self, name: &str) -> Result<(), ProviderError> {
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn add_collaborator(
        &self,
        repository: &str,
        username: &str,
        permission: CollaboratorPermission,
    ) -> Result<(), ProviderError> {
        self.collaborators.lock().unwrap().push((
            repository.to_string(),
            username.to_string(),
            permission,
        ));
        Ok(())
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        if self.unhealthy {
            Err(ProviderError::PermissionDenied("Bad credentials".to_string()))
        } else {
            Ok(())
        }
    }
}

/// In-memory tracking list that counts reads and can reject writes.
#[derive(Default)]
pub struct RecordingTrackingList {
    pub inner: InMemoryTrackingList,
    pub reads: AtomicUsize,
    pub updates: Mutex<Vec<(String, StatusUpdate)>>,
    pub fail_create: bool,
    pub fail_updates: bool,
    /// Number of upcoming updates to reject before accepting writes again.
    pub reject_next_updates: AtomicUsize,
}

impl RecordingTrackingList {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<(String, StatusUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    /// Seed a request and return its id.
    pub async fn seed(&self, requester: &str, resource: &str, project: &str) -> String {
        self.inner
            .create(&ProvisioningRequest::new(requester, resource, project))
            .await
            .unwrap()
    }

    pub async fn stored(&self, id: &str) -> ProvisioningRequest {
        self.inner.get(id).await.unwrap().unwrap()
    }
}

#[async_trait]
impl TrackingList for RecordingTrackingList {
    async fn list_pending(&self) -> Result<Vec<ProvisioningRequest>, ProviderError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_pending().await
    }

    async fn list_all(&self) -> Result<Vec<ProvisioningRequest>, ProviderError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_all().await
    }

    async fn get(&self, id: &str) -> Result<Option<ProvisioningRequest>, ProviderError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn create(&self, request: &ProvisioningRequest) -> Result<String, ProviderError> {
        if self.fail_create {
            return Err(ProviderError::Api {
                status: 503,
                message: "list unavailable".to_string(),
            });
        }
        self.inner.create(request).await
    }

    async fn update_status(&self, id: &str, update: &StatusUpdate) -> bool {
        self.updates
            .lock()
            .unwrap()
            .push((id.to_string(), update.clone()));
        if self.fail_updates {
            return false;
        }
        let rejected = self
            .reject_next_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if rejected.is_ok() {
            return false;
        }
        self.inner.update_status(id, update).await
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Fakes wired together the way the binary wires the real adapters.
pub struct Harness {
    pub cloud: Arc<FakeCloud>,
    pub repositories: Arc<FakeRepositories>,
    pub tracking: Arc<RecordingTrackingList>,
}

impl Harness {
    pub fn new(
        cloud: FakeCloud,
        repositories: FakeRepositories,
        tracking: RecordingTrackingList,
    ) -> Self {
        Self {
            cloud: Arc::new(cloud),
            repositories: Arc::new(repositories),
            tracking: Arc::new(tracking),
        }
    }

    pub fn healthy() -> Self {
        Self::new(
            FakeCloud::default(),
            FakeRepositories::default(),
            RecordingTrackingList::default(),
        )
    }

    pub fn orchestrator(&self) -> provisioner::Orchestrator {
        provisioner::Orchestrator::new(
            self.cloud.clone(),
            self.repositories.clone(),
            self.tracking.clone(),
            provisioner::ProvisioningDefaults::from_config(&test_config()),
        )
    }

    pub fn app_state(&self, config: Config) -> provisioner::server::AppState {
        provisioner::server::AppState::new(
            config,
            self.cloud.clone(),
            self.repositories.clone(),
            self.tracking.clone(),
        )
    }
}
