//! Orchestration engine.
//!
//! Drives one provisioning request from `Pending` to a terminal state:
//! mark it `In Progress`, create the resource group, optionally create the
//! repository, then persist the outcome. Mid-run failures never propagate;
//! they are captured into the request's error message. A resource group
//! created before a repository failure is left in place.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ProvisioningError, ValidationError};
use crate::models::{
    CreateRepositoryRequest, ProvisioningRequest, RequestStatus, ResourceCreationRequest,
    RunOutcome, StatusUpdate, Tags, SUCCESS_MESSAGE,
};
use crate::providers::{CloudProvisioner, RepositoryProvisioner, TrackingList};
use crate::validators::ResourceName;

/// Values applied when a request leaves them open.
#[derive(Debug, Clone)]
pub struct ProvisioningDefaults {
    /// Region for new resource groups.
    pub location: String,
    /// Base tag set, overridden by per-run and request tags.
    pub tags: Tags,
    /// Create repositories as private.
    pub repository_private: bool,
    /// Initialize repositories with a README and `.gitignore`.
    pub repository_auto_init: bool,
}

impl ProvisioningDefaults {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            location: config.azure.default_location.clone(),
            tags: config.azure.default_tags.clone(),
            repository_private: config.github.private,
            repository_auto_init: config.github.auto_init,
        }
    }
}

/// Per-run choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Region override.
    pub location: Option<String>,
    /// Caller tags; win on key collision.
    pub tags: Tags,
    /// Also create a repository.
    pub create_repository: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            location: None,
            tags: Tags::new(),
            create_repository: true,
        }
    }
}

/// A validated unit of work for an already-persisted request.
#[derive(Debug, Clone)]
pub struct ProvisioningJob {
    pub request_id: String,
    pub name: ResourceName,
    pub requester_name: String,
    pub project_name: String,
    pub options: RunOptions,
}

impl ProvisioningJob {
    /// Validate `request` and bind it to its tracking-list id.
    pub fn new(
        request_id: impl Into<String>,
        request: &ProvisioningRequest,
        options: RunOptions,
    ) -> Result<Self, ValidationError> {
        let name = validate_request(request, &options)?;
        Ok(Self {
            request_id: request_id.into(),
            name,
            requester_name: request.requester_name.trim().to_string(),
            project_name: request.project_name.trim().to_string(),
            options,
        })
    }
}

/// Check the free-text fields and derive the resource name.
fn validate_request(
    request: &ProvisioningRequest,
    options: &RunOptions,
) -> Result<ResourceName, ValidationError> {
    if request.requester_name.trim().is_empty() {
        return Err(ValidationError::MissingField("user_name"));
    }
    if request.project_name.trim().is_empty() {
        return Err(ValidationError::MissingField("project_name"));
    }
    if request.resource_name.trim().is_empty() {
        return Err(ValidationError::MissingField("resource_group_name"));
    }

    let name = ResourceName::parse(&request.resource_name)?;
    if options.create_repository {
        name.validate_for_repository()?;
    }
    Ok(name)
}

/// Coordinates the cloud provisioner, repository provisioner and tracking
/// list for provisioning runs.
pub struct Orchestrator {
    cloud: Arc<dyn CloudProvisioner>,
    repositories: Arc<dyn RepositoryProvisioner>,
    tracking: Arc<dyn TrackingList>,
    defaults: ProvisioningDefaults,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        cloud: Arc<dyn CloudProvisioner>,
        repositories: Arc<dyn RepositoryProvisioner>,
        tracking: Arc<dyn TrackingList>,
        defaults: ProvisioningDefaults,
    ) -> Self {
        Self {
            cloud,
            repositories,
            tracking,
            defaults,
        }
    }

    #[must_use]
    pub fn defaults(&self) -> &ProvisioningDefaults {
        &self.defaults
    }

    /// Run a job to a terminal state and persist the outcome.
    pub async fn run(&self, job: &ProvisioningJob) -> RunOutcome {
        let span = info_span!(
            "provisioning_run",
            request_id = %job.request_id,
            run_id = %Uuid::new_v4()
        );
        self.execute(job).instrument(span).await
    }

    async fn execute(&self, job: &ProvisioningJob) -> RunOutcome {
        info!(resource_name = %job.name, "Starting provisioning run");

        if !self
            .tracking
            .update_status(&job.request_id, &StatusUpdate::in_progress())
            .await
        {
            warn!("Could not mark request in progress, continuing");
        }

        let tags = self.merge_tags(job);
        let location = job
            .options
            .location
            .as_deref()
            .unwrap_or(&self.defaults.location);

        let mut cloud_resource_id = None;
        let mut repository_url = None;
        let failure = match self
            .cloud
            .create_resource_container(job.name.as_str(), location, &tags)
            .await
        {
            Ok(container) => {
                info!(cloud_resource_id = %container.id, "Resource group ready");
                cloud_resource_id = Some(container.id);

                if job.options.create_repository {
                    match self.create_repository(job).await {
                        Ok(url) => {
                            repository_url = Some(url);
                            None
                        }
                        Err(e) => Some(e),
                    }
                } else {
                    None
                }
            }
            Err(e) => Some(ProvisioningError::CloudProvisioning(e)),
        };

        let status = if failure.is_none() {
            RequestStatus::Completed
        } else {
            RequestStatus::Failed
        };
        let error_message = failure.map(|e| e.to_string());
        if let Some(message) = &error_message {
            error!(error = %message, "Provisioning run failed");
        }

        let update = StatusUpdate {
            status,
            cloud_resource_id: cloud_resource_id.clone(),
            repository_url: repository_url.clone(),
            error_message: error_message.clone(),
            clear_error: status == RequestStatus::Completed,
        };
        if !self.tracking.update_status(&job.request_id, &update).await {
            warn!(status = %status, "Could not persist final state");
        }

        info!(status = %status, "Provisioning run finished");
        RunOutcome {
            request_id: job.request_id.clone(),
            status,
            resource_name: cloud_resource_id
                .as_ref()
                .map(|_| job.name.as_str().to_string()),
            cloud_resource_id,
            repository_url,
            message: error_message
                .as_ref()
                .map_or_else(|| SUCCESS_MESSAGE.to_string(), |m| format!("Failed: {m}")),
            error_message,
        }
    }

    async fn create_repository(&self, job: &ProvisioningJob) -> Result<String, ProvisioningError> {
        let req = CreateRepositoryRequest {
            name: job.name.as_str().to_string(),
            description: format!("{} - Created for {}", job.project_name, job.requester_name),
            private: self.defaults.repository_private,
            auto_init: self.defaults.repository_auto_init,
        };

        let repo = self
            .repositories
            .create_repository(req)
            .await
            .map_err(ProvisioningError::RepositoryProvisioning)?;
        info!(repository_url = %repo.html_url, "Repository ready");
        Ok(repo.html_url)
    }

    /// Default tags, then run metadata, then caller tags.
    fn merge_tags(&self, job: &ProvisioningJob) -> Tags {
        let mut tags = self.defaults.tags.clone();
        tags.insert("ProjectName".to_string(), job.project_name.clone());
        tags.insert("CreatedBy".to_string(), job.requester_name.clone());
        tags.insert("CreatedAt".to_string(), Utc::now().to_rfc3339());
        tags.extend(job.options.tags.clone());
        tags
    }

    /// Fetch a persisted request and run it with default options.
    ///
    /// Returns `None` when the request cannot be read. A request that fails
    /// validation is marked `Failed` without any provider call.
    pub async fn run_by_id(&self, id: &str) -> Option<RunOutcome> {
        let request = match self.tracking.get(id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                warn!(request_id = %id, "Request not found, nothing to run");
                return None;
            }
            Err(e) => {
                error!(request_id = %id, error = %e, "Failed to read request");
                return None;
            }
        };

        match ProvisioningJob::new(id, &request, RunOptions::default()) {
            Ok(job) => Some(self.run(&job).await),
            Err(e) => Some(self.reject(id, &e).await),
        }
    }

    async fn reject(&self, id: &str, err: &ValidationError) -> RunOutcome {
        let message = err.to_string();
        warn!(request_id = %id, error = %message, "Request failed validation");

        let update = StatusUpdate {
            error_message: Some(message.clone()),
            ..StatusUpdate::status(RequestStatus::Failed)
        };
        if !self.tracking.update_status(id, &update).await {
            warn!(request_id = %id, "Could not persist validation failure");
        }

        RunOutcome {
            request_id: id.to_string(),
            status: RequestStatus::Failed,
            resource_name: None,
            cloud_resource_id: None,
            repository_url: None,
            message: format!("Failed: {message}"),
            error_message: Some(message),
        }
    }

    /// Validate a manual request, persist it as `Pending` and run it.
    ///
    /// Fails only on validation or when the initial tracking-list write is
    /// rejected; provider failures are reported in the outcome.
    pub async fn create_and_run(
        &self,
        request: ResourceCreationRequest,
    ) -> Result<RunOutcome, ProvisioningError> {
        let record = ProvisioningRequest::new(
            request.user_name,
            request.resource_group_name,
            request.project_name,
        );
        let options = RunOptions {
            location: request.location.filter(|l| !l.trim().is_empty()),
            tags: request.tags.unwrap_or_default(),
            create_repository: request.create_github_repo,
        };
        let name = validate_request(&record, &options)?;

        let request_id = self
            .tracking
            .create(&record)
            .await
            .map_err(ProvisioningError::Persistence)?;
        info!(request_id = %request_id, resource_name = %name, "Created tracking record");

        let job = ProvisioningJob {
            request_id,
            name,
            requester_name: record.requester_name.trim().to_string(),
            project_name: record.project_name.trim().to_string(),
            options,
        };
        Ok(self.run(&job).await)
    }
}
