//! Azure Resource Manager wire types.

use serde::{Deserialize, Serialize};

use crate::models::{ResourceContainer, Tags};

/// Body of a resource group create-or-update call.
#[derive(Debug, Serialize)]
pub struct ResourceGroupCreate<'a> {
    pub location: &'a str,
    pub tags: &'a Tags,
}

/// Resource group as returned by ARM.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureResourceGroup {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

/// One page of a resource group listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupListResponse {
    #[serde(default)]
    pub value: Vec<AzureResourceGroup>,
    #[serde(default)]
    pub next_link: Option<String>,
}

/// ARM error envelope.
#[derive(Debug, Deserialize)]
pub struct ArmErrorResponse {
    pub error: ArmError,
}

#[derive(Debug, Deserialize)]
pub struct ArmError {
    pub code: String,
    pub message: String,
}

impl From<AzureResourceGroup> for ResourceContainer {
    fn from(group: AzureResourceGroup) -> Self {
        Self {
            id: group.id,
            name: group.name,
            location: group.location,
            tags: group.tags.unwrap_or_default(),
            provisioning_state: group
                .properties
                .and_then(|p| p.provisioning_state)
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}
