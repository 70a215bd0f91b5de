//! Health aggregation across the external collaborators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::providers::{CloudProvisioner, ProviderError, RepositoryProvisioner, TrackingList};

/// Per-service probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceHealth {
    Healthy,
    Unhealthy,
}

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Degraded,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallHealth,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub services: BTreeMap<&'static str, ServiceHealth>,
}

impl HealthReport {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == OverallHealth::Healthy
    }
}

fn service_health(service: &'static str, result: Result<(), ProviderError>) -> ServiceHealth {
    match result {
        Ok(()) => ServiceHealth::Healthy,
        Err(e) => {
            warn!(service, error = %e, "Health probe failed");
            ServiceHealth::Unhealthy
        }
    }
}

/// Probe every collaborator concurrently.
pub async fn check_health(
    cloud: &dyn CloudProvisioner,
    repositories: &dyn RepositoryProvisioner,
    tracking: &dyn TrackingList,
    version: &str,
) -> HealthReport {
    let (azure, github, sharepoint) =
        tokio::join!(cloud.probe(), repositories.probe(), tracking.probe());

    let services = BTreeMap::from([
        ("azure", service_health("azure", azure)),
        ("github", service_health("github", github)),
        ("sharepoint", service_health("sharepoint", sharepoint)),
    ]);
    let status = if services.values().all(|s| *s == ServiceHealth::Healthy) {
        OverallHealth::Healthy
    } else {
        OverallHealth::Degraded
    };

    HealthReport {
        status,
        version: version.to_string(),
        timestamp: Utc::now(),
        services,
    }
}
