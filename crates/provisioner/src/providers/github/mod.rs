//! GitHub repository provisioner.
//!
//! Implements the [`RepositoryProvisioner`](crate::providers::RepositoryProvisioner)
//! trait against the GitHub REST API.
//! API Documentation: <https://docs.github.com/rest/repos/repos>

mod client;
mod models;

pub use client::GitHubRepositories;
pub use models::*;
