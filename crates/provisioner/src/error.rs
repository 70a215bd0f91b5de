//! Error types for provisioning runs and name validation.

use thiserror::Error;

use crate::providers::ProviderError;

/// Rejected resource or request input. Raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Empty resource group name.
    #[error("Resource group name cannot be empty")]
    CloudNameEmpty,

    /// Resource group name over 90 characters.
    #[error("Resource group name must be 90 characters or less")]
    CloudNameTooLong,

    /// Resource group name ending with `.`.
    #[error("Resource group name cannot end with a period")]
    CloudNameTrailingPeriod,

    /// Resource group name outside `[A-Za-z0-9_\-().]`.
    #[error(
        "Resource group name can only contain alphanumerics, underscores, parentheses, hyphens, and periods"
    )]
    CloudNameInvalidCharacters,

    /// Empty repository name.
    #[error("Repository name cannot be empty")]
    RepositoryNameEmpty,

    /// Repository name over 100 characters.
    #[error("Repository name must be 100 characters or less")]
    RepositoryNameTooLong,

    /// Repository name starting with `-` or `_`.
    #[error("Repository name cannot start with hyphen or underscore")]
    RepositoryNameLeadingSeparator,

    /// Repository name outside `[A-Za-z0-9_\-.]`.
    #[error("Repository name can only contain alphanumerics, hyphens, underscores, and periods")]
    RepositoryNameInvalidCharacters,

    /// A required free-text field is blank.
    #[error("{0} cannot be empty")]
    MissingField(&'static str),
}

/// Errors surfaced by the orchestration engine.
///
/// Only `Validation` and `Persistence` on the initial create ever reach a
/// caller as an `Err`; the provisioning variants are captured into the
/// request's error message.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Bad input rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Resource group creation failed (quota, naming conflict, auth).
    #[error("Azure resource group creation failed: {0}")]
    CloudProvisioning(#[source] ProviderError),

    /// Repository creation failed (name collision, permission denial).
    #[error("GitHub repository creation failed: {0}")]
    RepositoryProvisioning(#[source] ProviderError),

    /// Tracking list unreachable or rejecting the write.
    #[error("Tracking list write failed: {0}")]
    Persistence(#[source] ProviderError),
}
