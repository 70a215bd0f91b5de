//! Graph list item wire types and column mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{ProvisioningRequest, RequestStatus, StatusUpdate};

/// Column labels of the tracking list.
pub mod columns {
    pub const TITLE: &str = "Title";
    pub const USER_NAME: &str = "UserName";
    pub const RESOURCE_GROUP_NAME: &str = "ResourceGroupName";
    pub const PROJECT_NAME: &str = "ProjectName";
    pub const DATE_OF_CREATION: &str = "DateOfCreation";
    pub const STATUS: &str = "Status";
    pub const AZURE_RESOURCE_GROUP_ID: &str = "AzureResourceGroupId";
    pub const GITHUB_REPO_URL: &str = "GitHubRepoUrl";
    pub const ERROR_MESSAGE: &str = "ErrorMessage";
}

/// A list item with expanded fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: String,
    #[serde(default)]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: ItemFields,
}

/// Custom columns of a tracking-list item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemFields {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub resource_group_name: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub date_of_creation: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub azure_resource_group_id: Option<String>,
    #[serde(rename = "GitHubRepoUrl", default)]
    pub github_repo_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One page of a list item query.
///
/// Items stay untyped so one malformed row does not fail the page.
#[derive(Debug, Deserialize)]
pub struct ListItemsPage {
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Body of an item create call.
#[derive(Debug, Serialize)]
pub struct CreateItemBody {
    pub fields: Map<String, Value>,
}

/// Response of an item create call.
#[derive(Debug, Deserialize)]
pub struct CreatedItem {
    pub id: String,
}

impl TryFrom<ListItem> for ProvisioningRequest {
    type Error = String;

    fn try_from(item: ListItem) -> Result<Self, Self::Error> {
        let fields = item.fields;
        let status = match fields.status.as_deref() {
            None | Some("") => RequestStatus::Pending,
            Some(label) => label.parse().map_err(|e: crate::models::UnknownStatus| e.to_string())?,
        };

        let created_at = match fields.date_of_creation.as_deref() {
            None | Some("") => item.created_date_time.unwrap_or_else(Utc::now),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map_err(|e| format!("invalid {}: {e}", columns::DATE_OF_CREATION))?
                .with_timezone(&Utc),
        };

        Ok(Self {
            id: Some(item.id),
            requester_name: fields.user_name.unwrap_or_default(),
            resource_name: fields.resource_group_name.unwrap_or_default(),
            project_name: fields.project_name.unwrap_or_default(),
            created_at,
            status,
            cloud_resource_id: fields.azure_resource_group_id.filter(|v| !v.is_empty()),
            repository_url: fields.github_repo_url.filter(|v| !v.is_empty()),
            error_message: fields.error_message.filter(|v| !v.is_empty()),
        })
    }
}

/// Column values for a new item.
#[must_use]
pub fn create_fields(request: &ProvisioningRequest) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(columns::TITLE.into(), request.project_name.clone().into());
    fields.insert(columns::USER_NAME.into(), request.requester_name.clone().into());
    fields.insert(
        columns::RESOURCE_GROUP_NAME.into(),
        request.resource_name.clone().into(),
    );
    fields.insert(columns::PROJECT_NAME.into(), request.project_name.clone().into());
    fields.insert(
        columns::DATE_OF_CREATION.into(),
        request.created_at.to_rfc3339().into(),
    );
    fields.insert(columns::STATUS.into(), request.status.as_str().into());
    fields
}

/// Column values for a partial status update.
#[must_use]
pub fn update_fields(update: &StatusUpdate) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(columns::STATUS.into(), update.status.as_str().into());
    if let Some(id) = &update.cloud_resource_id {
        fields.insert(columns::AZURE_RESOURCE_GROUP_ID.into(), id.clone().into());
    }
    if let Some(url) = &update.repository_url {
        fields.insert(columns::GITHUB_REPO_URL.into(), url.clone().into());
    }
    match &update.error_message {
        Some(message) => {
            fields.insert(columns::ERROR_MESSAGE.into(), message.clone().into());
        }
        None if update.clear_error => {
            fields.insert(columns::ERROR_MESSAGE.into(), Value::Null);
        }
        None => {}
    }
    fields
}
