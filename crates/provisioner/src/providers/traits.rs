//! Collaborator traits and the shared adapter error type.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CollaboratorPermission, CreateRepositoryRequest, ProvisioningRequest, Repository,
    ResourceContainer, StatusUpdate, Tags,
};

/// Errors that can occur during adapter operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists (naming conflict).
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Credentials were rejected or lack permission.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// OAuth token acquisition failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Payload did not match the expected shape.
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Creates and inspects cloud resource containers (Azure resource groups).
#[async_trait]
pub trait CloudProvisioner: Send + Sync {
    /// Create a named resource container.
    async fn create_resource_container(
        &self,
        name: &str,
        location: &str,
        tags: &Tags,
    ) -> Result<ResourceContainer, ProviderError>;

    /// Get a container by name, `None` when it does not exist.
    async fn get_resource_container(
        &self,
        name: &str,
    ) -> Result<Option<ResourceContainer>, ProviderError>;

    /// Delete a container by name.
    async fn delete_resource_container(&self, name: &str) -> Result<(), ProviderError>;

    /// List all containers in the subscription.
    async fn list_resource_containers(&self) -> Result<Vec<ResourceContainer>, ProviderError>;

    /// Connectivity check used by health aggregation.
    async fn probe(&self) -> Result<(), ProviderError> {
        self.list_resource_containers().await.map(|_| ())
    }
}

/// Creates and inspects source-control repositories (GitHub).
#[async_trait]
pub trait RepositoryProvisioner: Send + Sync {
    /// Create a repository in the configured organization.
    async fn create_repository(
        &self,
        req: CreateRepositoryRequest,
    ) -> Result<Repository, ProviderError>;

    /// Get a repository by name, `None` when it does not exist.
    async fn get_repository(&self, name: &str) -> Result<Option<Repository>, ProviderError>;

    /// Delete a repository by name.
    async fn delete_repository(&self, name: &str) -> Result<(), ProviderError>;

    /// Grant `username` access to a repository, inviting them when they are
    /// not yet a member.
    async fn add_collaborator(
        &self,
        repository: &str,
        username: &str,
        permission: CollaboratorPermission,
    ) -> Result<(), ProviderError>;

    /// Connectivity check used by health aggregation.
    async fn probe(&self) -> Result<(), ProviderError>;
}

/// The external store of provisioning requests (a SharePoint list).
///
/// The tracking list is the sole owner of identity assignment.
#[async_trait]
pub trait TrackingList: Send + Sync {
    /// All requests currently `Pending`. No ordering guarantee.
    async fn list_pending(&self) -> Result<Vec<ProvisioningRequest>, ProviderError>;

    /// Every request, regardless of status.
    async fn list_all(&self) -> Result<Vec<ProvisioningRequest>, ProviderError>;

    /// Get a request by id.
    async fn get(&self, id: &str) -> Result<Option<ProvisioningRequest>, ProviderError>;

    /// Persist a new request and return its assigned id.
    async fn create(&self, request: &ProvisioningRequest) -> Result<String, ProviderError>;

    /// Apply a partial status update.
    ///
    /// Never fails loudly: implementations log the failure and return
    /// `false`.
    async fn update_status(&self, id: &str, update: &StatusUpdate) -> bool;

    /// Connectivity check used by health aggregation.
    async fn probe(&self) -> Result<(), ProviderError>;
}
