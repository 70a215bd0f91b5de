//! Configuration for the provisioning service.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file. The resulting [`Config`] is constructed once at startup and
//! handed to each component.

use std::env;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::models::Tags;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Display name reported by the root endpoint.
    pub app_name: String,
    /// Version reported by the root and health endpoints.
    pub app_version: String,
    /// HTTP bind host.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Azure Resource Manager settings.
    pub azure: AzureConfig,
    /// GitHub settings.
    pub github: GitHubConfig,
    /// SharePoint tracking list; `None` selects the in-memory list.
    pub sharepoint: Option<SharePointConfig>,
    /// Webhook ingress settings.
    pub webhook: WebhookConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Azure service principal and resource group defaults.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Region used when a request does not name one.
    pub default_location: String,
    /// Tags applied to every resource group; request tags win on collision.
    pub default_tags: Tags,
}

/// GitHub organization and repository defaults.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub org: String,
    /// Initialize new repositories with a README.
    pub auto_init: bool,
    /// Create new repositories as private.
    pub private: bool,
}

/// SharePoint site and list holding the provisioning requests.
#[derive(Debug, Clone)]
pub struct SharePointConfig {
    /// e.g. `https://contoso.sharepoint.com/sites/platform`.
    pub site_url: String,
    pub list_name: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Webhook signature settings.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Shared secret for `X-Signature` HMAC verification.
    pub secret: String,
    /// Reject requests that carry no signature header.
    pub require_signature: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from the environment, reading `env_file` first if
    /// it exists. Variables already set in the process take precedence.
    pub fn from_env_file(env_file: &Path) -> Result<Self, ConfigError> {
        match dotenvy::from_path(env_file) {
            Ok(()) => debug!(path = %env_file.display(), "Loaded environment file"),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(ConfigError::Invalid {
                    var: "env file",
                    reason: e.to_string(),
                })
            }
        }
        Self::from_env()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let azure = AzureConfig {
            subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
            tenant_id: required("AZURE_TENANT_ID")?,
            client_id: required("AZURE_CLIENT_ID")?,
            client_secret: required("AZURE_CLIENT_SECRET")?,
            default_location: get("AZURE_DEFAULT_LOCATION").unwrap_or_else(|| "eastus".to_string()),
            default_tags: match get("AZURE_DEFAULT_TAGS") {
                Some(raw) => serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
                    var: "AZURE_DEFAULT_TAGS",
                    reason: e.to_string(),
                })?,
                None => default_tags(),
            },
        };

        let github = GitHubConfig {
            token: required("GITHUB_TOKEN")?,
            org: required("GITHUB_ORG")?,
            auto_init: parse_bool(get("GITHUB_AUTO_INIT"), "GITHUB_AUTO_INIT", true)?,
            private: parse_bool(get("GITHUB_PRIVATE"), "GITHUB_PRIVATE", false)?,
        };

        let sharepoint = match get("SHAREPOINT_SITE_URL") {
            Some(site_url) => Some(SharePointConfig {
                site_url,
                list_name: get("SHAREPOINT_LIST_NAME")
                    .unwrap_or_else(|| "ResourceRequests".to_string()),
                tenant_id: get("SHAREPOINT_TENANT_ID").unwrap_or_else(|| azure.tenant_id.clone()),
                client_id: required("SHAREPOINT_CLIENT_ID")?,
                client_secret: required("SHAREPOINT_CLIENT_SECRET")?,
            }),
            None => None,
        };

        let webhook = WebhookConfig {
            secret: required("WEBHOOK_SECRET")?,
            require_signature: parse_bool(
                get("WEBHOOK_REQUIRE_SIGNATURE"),
                "WEBHOOK_REQUIRE_SIGNATURE",
                false,
            )?,
        };

        let logging = LoggingConfig {
            level: get("LOG_LEVEL").map_or_else(|| "info".to_string(), |l| l.to_lowercase()),
            format: match get("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
                None | Some("json") => LogFormat::Json,
                Some("pretty" | "text") => LogFormat::Pretty,
                Some(other) => {
                    return Err(ConfigError::Invalid {
                        var: "LOG_FORMAT",
                        reason: format!("expected json or pretty, got {other}"),
                    })
                }
            },
        };

        let port = match get("API_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "API_PORT",
                reason: format!("not a port number: {raw}"),
            })?,
            None => 8000,
        };

        Ok(Self {
            app_name: get("APP_NAME").unwrap_or_else(|| "Azure Resources Tracker".to_string()),
            app_version: get("APP_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            azure,
            github,
            sharepoint,
            webhook,
            logging,
        })
    }
}

/// Tags applied to every resource group unless overridden.
#[must_use]
pub fn default_tags() -> Tags {
    Tags::from([
        ("ManagedBy".to_string(), "AzureResourcesTracker".to_string()),
        ("AutoCreated".to_string(), "true".to_string()),
    ])
}

fn parse_bool(
    value: Option<String>,
    var: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got {other}"),
        }),
    }
}
