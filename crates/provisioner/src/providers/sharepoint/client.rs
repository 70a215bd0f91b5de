//! Microsoft Graph list client implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::models::{
    create_fields, update_fields, CreateItemBody, CreatedItem, ListItem, ListItemsPage,
};
use crate::config::SharePointConfig;
use crate::models::{ProvisioningRequest, RequestStatus, StatusUpdate};
use crate::providers::{
    error_from_response, http_client, ClientCredentials, ProviderError, TrackingList,
};

/// Base URL for Microsoft Graph.
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// OAuth2 scope for Graph.
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Graph refuses filters on non-indexed columns without this preference.
const PREFER_NON_INDEXED: &str = "HonorNonIndexedQueriesWarningMayFailRandomly";

/// SharePoint list holding the provisioning requests.
#[derive(Clone)]
pub struct SharePointList {
    client: Client,
    credentials: ClientCredentials,
    base_url: String,
    site: String,
    list_name: String,
}

impl SharePointList {
    /// Create a list client for the configured site.
    ///
    /// # Errors
    /// Returns error if the site URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(config: &SharePointConfig) -> Result<Self, ProviderError> {
        let client = http_client()?;
        let credentials = ClientCredentials::new(
            client.clone(),
            &config.tenant_id,
            config.client_id.clone(),
            config.client_secret.clone(),
            GRAPH_SCOPE,
        );

        Ok(Self {
            client,
            credentials,
            base_url: GRAPH_BASE_URL.to_string(),
            site: site_reference(&config.site_url)?,
            list_name: config.list_name.clone(),
        })
    }

    /// Point the client at a different Graph endpoint.
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

    fn list_url(&self) -> String {
        format!(
            "{}/sites/{}/lists/{}",
            self.base_url, self.site, self.list_name
        )
    }

    fn items_url(&self) -> String {
        format!("{}/items", self.list_url())
    }

    /// Fetch every item matching an optional filter, following `nextLink`.
    async fn query_items(
        &self,
        filter: Option<String>,
    ) -> Result<Vec<ProvisioningRequest>, ProviderError> {
        let token = self.credentials.access_token().await?;

        let mut request = self
            .client
            .get(self.items_url())
            .query(&[("expand", "fields")])
            .bearer_auth(&token);
        if let Some(filter) = &filter {
            request = request
                .query(&[("$filter", filter.as_str())])
                .header("Prefer", PREFER_NON_INDEXED);
        }

        let mut items = Vec::new();
        let mut response = request.send().await?;
        loop {
            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }
            let page: ListItemsPage = response.json().await?;
            items.extend(page.value.into_iter().filter_map(parse_item));

            let Some(next) = page.next_link else { break };
            debug!(url = %next, "Fetching next page of list items");
            response = self
                .client
                .get(&next)
                .bearer_auth(&token)
                .header("Prefer", PREFER_NON_INDEXED)
                .send()
                .await?;
        }

        Ok(items)
    }

    async fn patch_fields(&self, id: &str, update: &StatusUpdate) -> Result<(), ProviderError> {
        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .patch(format!("{}/{id}/fields", self.items_url()))
            .bearer_auth(&token)
            .json(&Value::Object(update_fields(update)))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Convert one raw item, skipping rows that do not parse.
fn parse_item(raw: Value) -> Option<ProvisioningRequest> {
    let item_id = raw.get("id").and_then(Value::as_str).map(ToString::to_string);
    let parsed = serde_json::from_value::<ListItem>(raw)
        .map_err(|e| e.to_string())
        .and_then(ProvisioningRequest::try_from);

    match parsed {
        Ok(request) => Some(request),
        Err(e) => {
            warn!(item_id = ?item_id, error = %e, "Skipping unparseable list item");
            None
        }
    }
}

/// Graph site address for a SharePoint site URL.
///
/// `https://contoso.sharepoint.com/sites/platform` becomes
/// `contoso.sharepoint.com:/sites/platform:`.
fn site_reference(site_url: &str) -> Result<String, ProviderError> {
    let url = Url::parse(site_url).map_err(|e| {
        ProviderError::Config(format!("invalid SharePoint site URL {site_url}: {e}"))
    })?;
    let host = url.host_str().ok_or_else(|| {
        ProviderError::Config(format!("SharePoint site URL has no host: {site_url}"))
    })?;

    let path = url.path().trim_end_matches('/');
    if path.is_empty() {
        Ok(host.to_string())
    } else {
        Ok(format!("{host}:{path}:"))
    }
}

#[async_trait]
impl TrackingList for SharePointList {
    async fn list_pending(&self) -> Result<Vec<ProvisioningRequest>, ProviderError> {
        let filter = format!("fields/Status eq '{}'", RequestStatus::Pending.as_str());
        let items = self.query_items(Some(filter)).await?;
        info!(count = items.len(), "Retrieved pending items");
        Ok(items)
    }

    async fn list_all(&self) -> Result<Vec<ProvisioningRequest>, ProviderError> {
        self.query_items(None).await
    }

    async fn get(&self, id: &str) -> Result<Option<ProvisioningRequest>, ProviderError> {
        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .get(format!("{}/{id}", self.items_url()))
            .query(&[("expand", "fields")])
            .bearer_auth(&token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let item: ListItem = response.json().await?;
                ProvisioningRequest::try_from(item)
                    .map(Some)
                    .map_err(ProviderError::InvalidResponse)
            }
            _ => Err(error_from_response(response).await),
        }
    }

    async fn create(&self, request: &ProvisioningRequest) -> Result<String, ProviderError> {
        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .post(self.items_url())
            .bearer_auth(&token)
            .json(&CreateItemBody {
                fields: create_fields(request),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let created: CreatedItem = response.json().await?;
        info!(item_id = %created.id, "List item created");
        Ok(created.id)
    }

    async fn update_status(&self, id: &str, update: &StatusUpdate) -> bool {
        match self.patch_fields(id, update).await {
            Ok(()) => {
                info!(item_id = %id, status = %update.status, "List item updated");
                true
            }
            Err(e) => {
                error!(
                    item_id = %id,
                    status = %update.status,
                    error = %e,
                    "Failed to update list item"
                );
                false
            }
        }
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        let token = self.credentials.access_token().await?;
        let response = self
            .client
            .get(self.list_url())
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}
