//! Azure Resource Manager cloud provisioner.
//!
//! Implements the [`CloudProvisioner`](crate::providers::CloudProvisioner)
//! trait for resource groups.
//! API Documentation: <https://learn.microsoft.com/rest/api/resources/resource-groups>

mod client;
mod models;

pub use client::AzureResourceManager;
pub use models::*;
