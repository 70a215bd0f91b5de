//! GitHub REST wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CollaboratorPermission, Repository};

/// Body of `POST /orgs/{org}/repos`.
#[derive(Debug, Serialize)]
pub struct CreateRepoBody<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub private: bool,
    pub auto_init: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gitignore_template: Option<&'a str>,
}

/// Body of `PUT /repos/{owner}/{repo}/collaborators/{username}`.
#[derive(Debug, Serialize)]
pub struct CollaboratorBody {
    pub permission: CollaboratorPermission,
}

/// Repository as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub created_at: DateTime<Utc>,
    pub private: bool,
}

/// GitHub error body.
#[derive(Debug, Deserialize)]
pub struct GitHubErrorBody {
    pub message: String,
    #[serde(default)]
    pub errors: Vec<GitHubErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl GitHubErrorBody {
    /// Flatten the top-level message and any detail messages.
    #[must_use]
    pub fn describe(&self) -> String {
        let details: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|e| e.message.as_deref().or(e.code.as_deref()))
            .collect();
        if details.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, details.join("; "))
        }
    }
}

impl From<GitHubRepo> for Repository {
    fn from(repo: GitHubRepo) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            html_url: repo.html_url,
            clone_url: repo.clone_url,
            created_at: repo.created_at,
            private: repo.private,
        }
    }
}
