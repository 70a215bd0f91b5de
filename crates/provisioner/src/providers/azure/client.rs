//! Azure Resource Manager client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, info, warn};

use super::models::{
    ArmErrorResponse, AzureResourceGroup, ResourceGroupCreate, ResourceGroupListResponse,
};
use crate::config::AzureConfig;
use crate::models::{ResourceContainer, Tags};
use crate::providers::{http_client, ClientCredentials, CloudProvisioner, ProviderError};

/// Base URL for Azure Resource Manager.
const API_BASE_URL: &str = "https://management.azure.com";

/// Resource groups API version.
const API_VERSION: &str = "2021-04-01";

/// OAuth2 scope for ARM.
const ARM_SCOPE: &str = "https://management.azure.com/.default";

/// Polling interval while a delete operation is running.
const POLL_INTERVAL_SECS: u64 = 10;

/// Give up waiting on a delete after this many polls.
const MAX_DELETE_POLLS: u32 = 90;

/// Azure resource group provisioner.
#[derive(Clone)]
pub struct AzureResourceManager {
    client: Client,
    credentials: ClientCredentials,
    base_url: String,
    subscription_id: String,
    poll_interval: Duration,
}

impl AzureResourceManager {
    /// Create a new resource manager client for the configured subscription.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(config: &AzureConfig) -> Result<Self, ProviderError> {
        let client = http_client()?;
        let credentials = ClientCredentials::new(
            client.clone(),
            &config.tenant_id,
            config.client_id.clone(),
            config.client_secret.clone(),
            ARM_SCOPE,
        );

        Ok(Self {
            client,
            credentials,
            base_url: API_BASE_URL.to_string(),
            subscription_id: config.subscription_id.clone(),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
        })
    }

    /// Point the client at a different ARM endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the token source.
    #[must_use]
    pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Change the delete polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn groups_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups",
            self.base_url, self.subscription_id
        )
    }

    fn group_url(&self, name: &str) -> String {
        format!("{}/{name}", self.groups_url())
    }

    /// Handle API response, parsing JSON or the ARM error envelope.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                ProviderError::Serialization(e)
            })
        } else {
            Err(Self::api_error(status, &text))
        }
    }

    fn api_error(status: StatusCode, body: &str) -> ProviderError {
        let message = serde_json::from_str::<ArmErrorResponse>(body).map_or_else(
            |_| body.to_string(),
            |e| format!("{}: {}", e.error.code, e.error.message),
        );
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::PermissionDenied(message)
            }
            StatusCode::NOT_FOUND => ProviderError::NotFound(message),
            StatusCode::CONFLICT => ProviderError::Conflict(message),
            _ => ProviderError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Poll an async operation `Location` until it stops answering 202.
    async fn wait_for_operation(&self, location: &str, name: &str) -> Result<(), ProviderError> {
        for attempt in 1..=MAX_DELETE_POLLS {
            tokio::time::sleep(self.poll_interval).await;

            let token = self.credentials.access_token().await?;
            let response = self.client.get(location).bearer_auth(&token).send().await?;
            let status = response.status();

            if status == StatusCode::ACCEPTED {
                debug!(name = %name, attempt, "Delete still running");
                continue;
            }
            if status.is_success() {
                return Ok(());
            }
            let text = response.text().await.unwrap_or_default();
            return Err(Self::api_error(status, &text));
        }

        Err(ProviderError::Api {
            status: StatusCode::ACCEPTED.as_u16(),
            message: format!("Timeout waiting for deletion of resource group {name}"),
        })
    }
}

#[async_trait]
impl CloudProvisioner for AzureResourceManager {
    async fn create_resource_container(
        &self,
        name: &str,
        location: &str,
        tags: &Tags,
    ) -> Result<ResourceContainer, ProviderError> {
        info!(name = %name, location = %location, "Creating resource group");

        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .put(self.group_url(name))
            .query(&[("api-version", API_VERSION)])
            .bearer_auth(&token)
            .json(&ResourceGroupCreate { location, tags })
            .send()
            .await?;

        let group: AzureResourceGroup = Self::handle_response(response).await?;
        info!(name = %group.name, id = %group.id, "Resource group created");
        Ok(group.into())
    }

    async fn get_resource_container(
        &self,
        name: &str,
    ) -> Result<Option<ResourceContainer>, ProviderError> {
        debug!(name = %name, "Getting resource group");

        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .get(self.group_url(name))
            .query(&[("api-version", API_VERSION)])
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let group: AzureResourceGroup = Self::handle_response(response).await?;
        Ok(Some(group.into()))
    }

    async fn delete_resource_container(&self, name: &str) -> Result<(), ProviderError> {
        info!(name = %name, "Deleting resource group");

        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .delete(self.group_url(name))
            .query(&[("api-version", API_VERSION)])
            .bearer_auth(&token)
            .send()
            .await?;

        match response.status() {
            StatusCode::ACCEPTED => {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string);
                if let Some(location) = location {
                    self.wait_for_operation(&location, name).await?;
                }
            }
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound(format!("resource group {name}")))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                return Err(Self::api_error(status, &text));
            }
        }

        info!(name = %name, "Resource group deleted");
        Ok(())
    }

    async fn list_resource_containers(&self) -> Result<Vec<ResourceContainer>, ProviderError> {
        let token = self.credentials.access_token().await?;
        let mut groups = Vec::new();
        let mut next = Some(format!("{}?api-version={API_VERSION}", self.groups_url()));

        while let Some(url) = next {
            debug!(url = %url, "Listing resource groups");
            let response = self.client.get(&url).bearer_auth(&token).send().await?;
            let page: ResourceGroupListResponse = Self::handle_response(response).await?;
            groups.extend(page.value.into_iter().map(ResourceContainer::from));
            next = page.next_link;
        }

        Ok(groups)
    }
}
