//! GitHub REST client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::models::{CollaboratorBody, CreateRepoBody, GitHubErrorBody, GitHubRepo};
use crate::config::GitHubConfig;
use crate::models::{CollaboratorPermission, CreateRepositoryRequest, Repository};
use crate::providers::{ProviderError, RepositoryProvisioner, DEFAULT_TIMEOUT_SECS};

const GITHUB_API_URL: &str = "https://api.github.com";

/// `.gitignore` template applied to auto-initialized repositories.
const GITIGNORE_TEMPLATE: &str = "Python";

/// GitHub organization repository provisioner.
#[derive(Debug, Clone)]
pub struct GitHubRepositories {
    client: Client,
    token: String,
    org: String,
    base_url: String,
}

impl GitHubRepositories {
    /// Create a new GitHub client for the configured organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &GitHubConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("provisioner/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            token: config.token.clone(),
            org: config.org.clone(),
            base_url: GITHUB_API_URL.to_string(),
        })
    }

    /// Point the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn api_error(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GitHubErrorBody>(&text)
            .map_or(text, |body| body.describe());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::PermissionDenied(message)
            }
            StatusCode::NOT_FOUND => ProviderError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
                ProviderError::Conflict(message)
            }
            _ => ProviderError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    async fn parse_repo(response: reqwest::Response) -> Result<Repository, ProviderError> {
        let text = response.text().await?;
        let repo: GitHubRepo = serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, "Failed to parse repository response");
            ProviderError::Serialization(e)
        })?;
        Ok(repo.into())
    }
}

#[async_trait]
impl RepositoryProvisioner for GitHubRepositories {
    async fn create_repository(
        &self,
        req: CreateRepositoryRequest,
    ) -> Result<Repository, ProviderError> {
        let url = format!("{}/orgs/{}/repos", self.base_url, self.org);
        info!(org = %self.org, name = %req.name, private = req.private, "Creating repository");

        let body = CreateRepoBody {
            name: &req.name,
            description: &req.description,
            private: req.private,
            auto_init: req.auto_init,
            gitignore_template: req.auto_init.then_some(GITIGNORE_TEMPLATE),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let repo = Self::parse_repo(response).await?;
        info!(full_name = %repo.full_name, url = %repo.html_url, "Repository created");
        Ok(repo)
    }

    async fn get_repository(&self, name: &str) -> Result<Option<Repository>, ProviderError> {
        let url = format!("{}/repos/{}/{name}", self.base_url, self.org);
        debug!(url = %url, "Getting repository");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Self::parse_repo(response).await.map(Some),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn delete_repository(&self, name: &str) -> Result<(), ProviderError> {
        let url = format!("{}/repos/{}/{name}", self.base_url, self.org);
        info!(org = %self.org, name = %name, "Deleting repository");

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::api_error(response).await;
            warn!(name = %name, error = %err, "Repository deletion failed");
            return Err(err);
        }

        info!(name = %name, "Repository deleted");
        Ok(())
    }

    async fn add_collaborator(
        &self,
        repository: &str,
        username: &str,
        permission: CollaboratorPermission,
    ) -> Result<(), ProviderError> {
        let url = format!(
            "{}/repos/{}/{repository}/collaborators/{username}",
            self.base_url, self.org
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&CollaboratorBody { permission })
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                info!(repository, user = username, ?permission, "Collaborator invited");
                Ok(())
            }
            // Already a collaborator, or an org member granted access directly
            StatusCode::NO_CONTENT => {
                info!(repository, user = username, ?permission, "Collaborator added");
                Ok(())
            }
            _ => {
                let err = Self::api_error(response).await;
                warn!(repository, user = username, error = %err, "Adding collaborator failed");
                Err(err)
            }
        }
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(format!("{}/user", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubRepositories {
        let config = GitHubConfig {
            token: "gh-token".to_string(),
            org: "acme".to_string(),
            auto_init: true,
            private: false,
        };
        GitHubRepositories::new(&config)
            .unwrap()
            .with_base_url(server.uri())
    }

    fn repo_json(name: &str) -> serde_json::Value {
        json!({
            "id": 42,
            "name": name,
            "full_name": format!("acme/{name}"),
            "html_url": format!("https://github.com/acme/{name}"),
            "clone_url": format!("https://github.com/acme/{name}.git"),
            "created_at": "2024-05-01T12:00:00Z",
            "private": false
        })
    }

    fn request(name: &str, auto_init: bool) -> CreateRepositoryRequest {
        CreateRepositoryRequest {
            name: name.to_string(),
            description: "Demo - Created for Jane".to_string(),
            private: false,
            auto_init,
        }
    }

    #[tokio::test]
    async fn test_create_repository_with_gitignore_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/repos"))
            .and(header("authorization", "Bearer gh-token"))
            .and(header("accept", "application/vnd.github+json"))
            .and(body_json(json!({
                "name": "analytics-dev",
                "description": "Demo - Created for Jane",
                "private": false,
                "auto_init": true,
                "gitignore_template": "Python"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(repo_json("analytics-dev")))
            .expect(1)
            .mount(&server)
            .await;

        let repo = client(&server)
            .create_repository(request("analytics-dev", true))
            .await
            .unwrap();
        assert_eq!(repo.html_url, "https://github.com/acme/analytics-dev");
        assert_eq!(repo.full_name, "acme/analytics-dev");
    }

    #[tokio::test]
    async fn test_create_without_auto_init_omits_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/repos"))
            .and(body_json(json!({
                "name": "bare",
                "description": "Demo - Created for Jane",
                "private": false,
                "auto_init": false
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(repo_json("bare")))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .create_repository(request("bare", false))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_name_collision_maps_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/repos"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Repository creation failed.",
                "errors": [{"resource": "Repository", "code": "custom", "field": "name",
                            "message": "name already exists on this account"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_repository(request("taken", true))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ProviderError::Conflict(ref m) if m.contains("already exists")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/repos"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"message": "Must have admin rights"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .create_repository(request("repo", true))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::PermissionDenied(ref m) if m == "Must have admin rights"
        ));
    }

    #[tokio::test]
    async fn test_get_repository() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/analytics-dev"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_json("analytics-dev")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let github = client(&server);
        assert_eq!(
            github.get_repository("analytics-dev").await.unwrap().map(|r| r.id),
            Some(42)
        );
        assert!(github.get_repository("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_repository() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/analytics-dev"))
            .and(header("authorization", "Bearer gh-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let github = client(&server);
        github.delete_repository("analytics-dev").await.unwrap();
        assert!(matches!(
            github.delete_repository("missing").await,
            Err(ProviderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_collaborator_sends_permission() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/analytics-dev/collaborators/octocat"))
            .and(body_json(json!({"permission": "push"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/analytics-dev/collaborators/hubot"))
            .and(body_json(json!({"permission": "admin"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let github = client(&server);
        github
            .add_collaborator("analytics-dev", "octocat", CollaboratorPermission::default())
            .await
            .unwrap();
        github
            .add_collaborator("analytics-dev", "hubot", CollaboratorPermission::Admin)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_collaborator_unknown_user() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/analytics-dev/collaborators/ghost"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{"code": "invalid", "message": "User could not be found"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .add_collaborator("analytics-dev", "ghost", CollaboratorPermission::Pull)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ProviderError::Conflict(ref m) if m.contains("could not be found")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).probe().await,
            Err(ProviderError::PermissionDenied(_))
        ));
    }
}
