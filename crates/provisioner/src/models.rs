//! Type definitions for provisioning requests and provisioned resources.
//!
//! Field names serialize to the snake_case labels used by the HTTP API
//! (`user_name`, `resource_group_name`, ...). Tracking-list column labels
//! live with the SharePoint adapter.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource tags, ordered by key so merged tag sets are deterministic.
pub type Tags = BTreeMap<String, String>;

/// Message reported for a run where every requested step succeeded.
pub const SUCCESS_MESSAGE: &str = "Resources created successfully";

/// Lifecycle status of a provisioning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Waiting for an orchestration run.
    Pending,
    /// An orchestration run has started.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Every requested resource was created.
    Completed,
    /// At least one requested step failed.
    Failed,
}

impl RequestStatus {
    /// Wire value used by the tracking list and the HTTP API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "In Progress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A user's request for a resource group and repository pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    /// Identifier assigned by the tracking list; absent until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the requesting user.
    #[serde(rename = "user_name")]
    pub requester_name: String,
    /// Requested resource name (sanitized before use).
    #[serde(rename = "resource_group_name")]
    pub resource_name: String,
    /// Project the resources belong to.
    pub project_name: String,
    /// Creation time, never mutated.
    #[serde(rename = "date_of_creation")]
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// Resource group id, set once the cloud step succeeds.
    #[serde(
        rename = "azure_resource_group_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cloud_resource_id: Option<String>,
    /// Repository URL, set once the repository step succeeds.
    #[serde(
        rename = "github_repo_url",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub repository_url: Option<String>,
    /// Failure reason, set only when the status is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProvisioningRequest {
    /// Create an unpersisted `Pending` request stamped with the current time.
    #[must_use]
    pub fn new(
        requester_name: impl Into<String>,
        resource_name: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            requester_name: requester_name.into(),
            resource_name: resource_name.into(),
            project_name: project_name.into(),
            created_at: Utc::now(),
            status: RequestStatus::Pending,
            cloud_resource_id: None,
            repository_url: None,
            error_message: None,
        }
    }

    /// Override the initial status.
    #[must_use]
    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update of a request's status fields.
///
/// `None` fields are left unchanged by the tracking list. `clear_error`
/// explicitly empties a stale error message left by an earlier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: RequestStatus,
    pub cloud_resource_id: Option<String>,
    pub repository_url: Option<String>,
    pub error_message: Option<String>,
    pub clear_error: bool,
}

impl StatusUpdate {
    /// Bare status change.
    #[must_use]
    pub const fn status(status: RequestStatus) -> Self {
        Self {
            status,
            cloud_resource_id: None,
            repository_url: None,
            error_message: None,
            clear_error: false,
        }
    }

    /// Start of a run; clears any error message from a previous run.
    #[must_use]
    pub fn in_progress() -> Self {
        Self {
            clear_error: true,
            ..Self::status(RequestStatus::InProgress)
        }
    }

    /// Apply this update to a record in place.
    pub fn apply_to(&self, request: &mut ProvisioningRequest) {
        request.status = self.status;
        if let Some(id) = &self.cloud_resource_id {
            request.cloud_resource_id = Some(id.clone());
        }
        if let Some(url) = &self.repository_url {
            request.repository_url = Some(url.clone());
        }
        if self.clear_error {
            request.error_message = None;
        }
        if let Some(message) = &self.error_message {
            request.error_message = Some(message.clone());
        }
    }
}

/// Manual resource creation request accepted by the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCreationRequest {
    /// Name of the requesting user.
    pub user_name: String,
    /// Requested resource group name.
    pub resource_group_name: String,
    /// Project name.
    pub project_name: String,
    /// Azure region; the configured default applies when absent.
    #[serde(default)]
    pub location: Option<String>,
    /// Whether a GitHub repository should also be created.
    #[serde(default = "default_true")]
    pub create_github_repo: bool,
    /// Extra tags; these win over the default tags on key collision.
    #[serde(default)]
    pub tags: Option<Tags>,
}

const fn default_true() -> bool {
    true
}

/// Result of a single orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Tracking-list id of the request.
    pub request_id: String,
    /// Terminal status.
    pub status: RequestStatus,
    /// Sanitized resource name, reported only when the container exists.
    pub resource_name: Option<String>,
    /// Created resource group id.
    pub cloud_resource_id: Option<String>,
    /// Created repository URL.
    pub repository_url: Option<String>,
    /// Failure reason when `Failed`.
    pub error_message: Option<String>,
    /// Human-readable summary.
    pub message: String,
}

impl RunOutcome {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, RequestStatus::Completed)
    }
}

/// Response body of the manual creation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCreationResponse {
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharepoint_item_id: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<RunOutcome> for ResourceCreationResponse {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            status: outcome.status,
            resource_group_id: outcome.cloud_resource_id,
            resource_group_name: outcome.resource_name,
            github_repo_url: outcome.repository_url,
            sharepoint_item_id: Some(outcome.request_id),
            message: outcome.message,
            created_at: Utc::now(),
        }
    }
}

/// An Azure resource group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContainer {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub tags: Tags,
    pub provisioning_state: String,
}

/// A GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub created_at: DateTime<Utc>,
    pub private: bool,
}

/// Parameters for repository creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRepositoryRequest {
    pub name: String,
    pub description: String,
    pub private: bool,
    pub auto_init: bool,
}

/// Access level granted to a repository collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorPermission {
    Pull,
    Triage,
    #[default]
    Push,
    Maintain,
    Admin,
}
