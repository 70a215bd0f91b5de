//! In-process tracking list.
//!
//! Used when no SharePoint site is configured. Ids are sequential decimal
//! strings starting at `1`. Contents are lost on restart.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{ProvisioningRequest, RequestStatus, StatusUpdate};
use crate::providers::{ProviderError, TrackingList};

/// Tracking list held in memory.
#[derive(Debug, Default)]
pub struct InMemoryTrackingList {
    next_id: AtomicU64,
    items: RwLock<BTreeMap<u64, ProvisioningRequest>>,
}

impl InMemoryTrackingList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl TrackingList for InMemoryTrackingList {
    async fn list_pending(&self) -> Result<Vec<ProvisioningRequest>, ProviderError> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ProvisioningRequest>, ProviderError> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<ProvisioningRequest>, ProviderError> {
        let Ok(key) = id.parse::<u64>() else {
            return Ok(None);
        };
        Ok(self.items.read().await.get(&key).cloned())
    }

    async fn create(&self, request: &ProvisioningRequest) -> Result<String, ProviderError> {
        let key = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = key.to_string();

        let mut stored = request.clone();
        stored.id = Some(id.clone());
        self.items.write().await.insert(key, stored);

        debug!(item_id = %id, "Stored request in memory");
        Ok(id)
    }

    async fn update_status(&self, id: &str, update: &StatusUpdate) -> bool {
        let mut items = self.items.write().await;
        match id.parse::<u64>().ok().and_then(|key| items.get_mut(&key)) {
            Some(request) => {
                update.apply_to(request);
                true
            }
            None => {
                warn!(item_id = %id, "Status update for unknown request");
                false
            }
        }
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
