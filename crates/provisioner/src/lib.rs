//! Azure resource group and GitHub repository provisioning service.
//!
//! This crate provides:
//! - The provisioning request model and the tracking-list contract
//! - The orchestration engine that drives a request to a terminal state
//! - Background dispatch of orchestration runs
//! - Webhook payload classification and signature verification
//! - Name validation and sanitization for cloud and repository names
//! - Azure, GitHub and SharePoint adapters plus an in-memory tracking list
//! - Health aggregation across the external collaborators
//! - HTTP server exposing the webhook, resources and health endpoints

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Most adapter methods are fallible network calls

pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod server;
pub mod validators;
pub mod webhooks;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{ProvisioningError, ValidationError};
pub use models::*;
pub use orchestrator::{Orchestrator, ProvisioningDefaults, ProvisioningJob, RunOptions};
pub use providers::{CloudProvisioner, ProviderError, RepositoryProvisioner, TrackingList};
pub use validators::{sanitize_name, ResourceName};
pub use webhooks::{verify_webhook_signature, WebhookMessage};
