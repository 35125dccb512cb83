//! HTTP API for the dashboard

use crate::aggregator::aggregate;
use crate::collector::{sample_blocking, SampleError, Sampler};
use crate::groups::{GroupMatcher, GroupRegistry, NameMatcher};
use crate::protocol::{
    ErrorResponse, GroupUsageData, MonitorResponse, ThresholdsResponse, UptimeResponse,
};
use crate::thresholds::{ThresholdError, ThresholdStore, ThresholdUpdate};
use crate::uptime::Uptime;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Shared state for request handlers.
pub struct ApiState {
    pub sampler: Arc<dyn Sampler>,
    pub registry: Arc<GroupRegistry>,
    pub matcher: Arc<dyn GroupMatcher>,
    pub thresholds: Arc<ThresholdStore>,
}

impl ApiState {
    pub fn new(
        sampler: Arc<dyn Sampler>,
        registry: Arc<GroupRegistry>,
        thresholds: Arc<ThresholdStore>,
    ) -> Self {
        Self {
            sampler,
            registry,
            matcher: Arc::new(NameMatcher),
            thresholds,
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn GroupMatcher>) -> Self {
        self.matcher = matcher;
        self
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<SampleError> for ApiError {
    fn from(e: SampleError) -> Self {
        error!("Sampling failed: {}", e);
        ApiError::Internal(e.to_string())
    }
}

impl From<ThresholdError> for ApiError {
    fn from(e: ThresholdError) -> Self {
        warn!("Rejected threshold update: {}", e);
        ApiError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        warn!("Invalid request body: {}", e);
        ApiError::BadRequest(e.body_text())
    }
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/monitor", get(monitor))
        .route("/set_thresholds", post(set_thresholds))
        .route("/uptime", get(uptime))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn monitor(State(state): State<Arc<ApiState>>) -> Result<Json<MonitorResponse>, ApiError> {
    let (host, samples) =
        sample_blocking(&state.sampler, |s| Ok((s.sample_host()?, s.sample_processes()?))).await?;
    let groups: BTreeMap<String, GroupUsageData> =
        aggregate(&samples, &state.registry, state.matcher.as_ref())
            .into_iter()
            .map(|(name, usage)| (name, GroupUsageData::from(&usage)))
            .collect();
    Ok(Json(MonitorResponse {
        cpu_percent: host.cpu_percent,
        memory_percent: host.memory_percent,
        groups,
    }))
}

async fn set_thresholds(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<ThresholdUpdate>, JsonRejection>,
) -> Result<Json<ThresholdsResponse>, ApiError> {
    let Json(update) = body?;
    let thresholds = state.thresholds.update(&update)?;
    info!(?thresholds, "Thresholds updated");
    Ok(Json(ThresholdsResponse::updated(thresholds)))
}

async fn uptime(State(state): State<Arc<ApiState>>) -> Result<Json<UptimeResponse>, ApiError> {
    let boot_time = sample_blocking(&state.sampler, |s| s.boot_time()).await?;
    Ok(Json(Uptime::from_boot_time(boot_time).into()))
}
