//! HTTP server for webhooks, resource requests and health.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::ProvisioningError;
use crate::health::{check_health, HealthReport};
use crate::models::{
    ProvisioningRequest, Repository, ResourceContainer, ResourceCreationRequest,
    ResourceCreationResponse,
};
use crate::orchestrator::{Orchestrator, ProvisioningDefaults};
use crate::providers::{CloudProvisioner, ProviderError, RepositoryProvisioner, TrackingList};
use crate::webhooks::{verify_webhook_signature, WebhookMessage, SIGNATURE_HEADER};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Arc<Config>,
    /// Orchestration engine.
    pub orchestrator: Arc<Orchestrator>,
    /// Background run dispatcher.
    pub dispatcher: Dispatcher,
    /// Tracking list of provisioning requests.
    pub tracking: Arc<dyn TrackingList>,
    /// Resource group provisioner.
    pub cloud: Arc<dyn CloudProvisioner>,
    /// Repository provisioner.
    pub repositories: Arc<dyn RepositoryProvisioner>,
}

impl AppState {
    /// Wire the orchestrator and dispatcher around the collaborators.
    #[must_use]
    pub fn new(
        config: Config,
        cloud: Arc<dyn CloudProvisioner>,
        repositories: Arc<dyn RepositoryProvisioner>,
        tracking: Arc<dyn TrackingList>,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&cloud),
            Arc::clone(&repositories),
            Arc::clone(&tracking),
            ProvisioningDefaults::from_config(&config),
        ));
        Self {
            config: Arc::new(config),
            dispatcher: Dispatcher::new(Arc::clone(&orchestrator)),
            orchestrator,
            tracking,
            cloud,
            repositories,
        }
    }
}

/// Error response with a `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<ProvisioningError> for ApiError {
    fn from(err: ProvisioningError) -> Self {
        match err {
            ProvisioningError::Validation(e) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(detail) => Self::not_found(detail),
            other => Self::internal(other.to_string()),
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        // Webhook endpoints
        .route("/api/webhook", post(webhook_handler))
        .route("/api/webhook/manual-trigger/{id}", post(manual_trigger))
        // Resource endpoints
        .route("/api/resources", get(list_resources))
        .route("/api/resources/create", post(create_resources))
        .route("/api/resources/{id}", get(get_resource))
        .route(
            "/api/resources/azure/resource-groups",
            get(list_resource_groups),
        )
        .route(
            "/api/resources/azure/resource-groups/{name}",
            get(get_resource_group).delete(delete_resource_group),
        )
        .route(
            "/api/resources/github/repositories/{name}",
            get(get_repository),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": state.config.app_name,
        "version": state.config.app_version,
        "status": "running"
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    let report = check_health(
        state.cloud.as_ref(),
        state.repositories.as_ref(),
        state.tracking.as_ref(),
        &state.config.app_version,
    )
    .await;
    if !report.is_healthy() {
        warn!(services = ?report.services, "Service degraded");
    }
    Json(report)
}

/// Handle tracking-list webhooks.
///
/// This handler:
/// 1. Echoes a `validationtoken` query parameter as plain text
/// 2. Verifies the `X-Signature` header when present (or required)
/// 3. Echoes a JSON handshake, or re-scans pending requests and dispatches
///    one background run per request
pub async fn webhook_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if let Some(token) = query.get("validationtoken") {
        info!("Subscription validation handshake");
        return Ok(([(header::CONTENT_TYPE, "text/plain")], token.clone()).into_response());
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    match signature {
        Some(sig) => {
            if !verify_webhook_signature(&body, sig, &state.config.webhook.secret) {
                warn!("Invalid webhook signature");
                return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid signature"));
            }
            debug!("Webhook signature verified");
        }
        None if state.config.webhook.require_signature => {
            warn!("Missing webhook signature header");
            return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Missing signature"));
        }
        None => debug!("Unsigned webhook accepted"),
    }

    let message = WebhookMessage::parse(&body).map_err(|e| {
        warn!(error = %e, "Rejecting webhook payload");
        ApiError::new(StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let notifications = match message {
        WebhookMessage::Handshake(token) => {
            info!("Webhook validation handshake");
            return Ok(Json(json!({ "validationToken": token })).into_response());
        }
        WebhookMessage::Notifications(notifications) => notifications,
    };

    for notification in &notifications {
        info!(
            subscription_id = %notification.subscription_id,
            resource = %notification.resource,
            "Received change notification"
        );
    }

    let pending = state.tracking.list_pending().await.map_err(|e| {
        error!(error = %e, "Failed to list pending requests");
        ApiError::internal(format!("Failed to list pending requests: {e}"))
    })?;

    let (mut queued, mut skipped) = (0usize, 0usize);
    for request in pending {
        let Some(id) = request.id else { continue };
        if state.dispatcher.dispatch(id) {
            queued += 1;
        } else {
            skipped += 1;
        }
    }

    info!(items_queued = queued, items_skipped = skipped, "Webhook accepted");
    Ok(Json(json!({
        "status": "accepted",
        "items_queued": queued,
        "items_skipped": skipped
    }))
    .into_response())
}

/// Dispatch a background run for one request.
async fn manual_trigger(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    info!(request_id = %id, "Manual trigger requested");

    if state.dispatcher.dispatch(id.clone()) {
        Json(json!({
            "status": "queued",
            "item_id": id,
            "message": "Processing started in background"
        }))
    } else {
        Json(json!({
            "status": "in_progress",
            "item_id": id,
            "message": "Processing already running"
        }))
    }
}

async fn list_resources(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProvisioningRequest>>, ApiError> {
    let items = state.tracking.list_all().await.map_err(|e| {
        error!(error = %e, "Failed to list requests");
        ApiError::internal(e.to_string())
    })?;
    Ok(Json(items))
}

async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProvisioningRequest>, ApiError> {
    state
        .tracking
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Resource not found"))
}

/// Create the resources synchronously and report the outcome.
async fn create_resources(
    State(state): State<AppState>,
    Json(request): Json<ResourceCreationRequest>,
) -> Result<Json<ResourceCreationResponse>, ApiError> {
    info!(
        user_name = %request.user_name,
        resource_group_name = %request.resource_group_name,
        project_name = %request.project_name,
        "Manual resource creation requested"
    );

    let outcome = state.orchestrator.create_and_run(request).await.map_err(|e| {
        warn!(error = %e, "Manual resource creation rejected");
        ApiError::from(e)
    })?;
    Ok(Json(outcome.into()))
}

async fn list_resource_groups(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResourceContainer>>, ApiError> {
    let groups = state.cloud.list_resource_containers().await.map_err(|e| {
        error!(error = %e, "Failed to list resource groups");
        ApiError::internal(e.to_string())
    })?;
    Ok(Json(groups))
}

async fn get_resource_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ResourceContainer>, ApiError> {
    state
        .cloud
        .get_resource_container(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Resource group not found"))
}

async fn delete_resource_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.cloud.delete_resource_container(&name).await?;
    Ok(Json(json!({ "status": "deleted", "name": name })))
}

async fn get_repository(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Repository>, ApiError> {
    state
        .repositories
        .get_repository(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Repository not found"))
}
