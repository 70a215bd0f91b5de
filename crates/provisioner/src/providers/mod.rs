//! External collaborators: Azure, GitHub and the tracking list.

pub mod azure;
pub mod github;
pub mod memory;
pub mod sharepoint;
mod token;
mod traits;

pub use token::ClientCredentials;
pub use traits::{CloudProvisioner, ProviderError, RepositoryProvisioner, TrackingList};

use std::time::Duration;

/// Default timeout for adapter API requests.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build the shared HTTP client used by every adapter.
pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .user_agent(concat!("provisioner/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ProviderError::from)
}

/// Map a non-success response to a [`ProviderError`].
///
/// 401/403 become `PermissionDenied`, 404 `NotFound`, 409 `Conflict`.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => ProviderError::PermissionDenied(message),
        404 => ProviderError::NotFound(message),
        409 => ProviderError::Conflict(message),
        code => ProviderError::Api {
            status: code,
            message,
        },
    }
}
