//! Collector ingress: the `POST /api/report` contract and the webhook test-
//! delivery endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentinel_types::{ReportSubmission, ReportValidationError, WebhookConfigId};
use thiserror::Error;
use tracing::{info, warn};

use crate::AppState;

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("malformed report: {0}")]
    Malformed(#[from] ReportValidationError),
    #[error("unknown agentId")]
    UnknownAgent,
    #[error("agent is inactive")]
    AgentInactive,
    #[error("invalid agentApiKey")]
    InvalidApiKey,
    #[error("agent does not belong to validatorId")]
    WrongValidatorScope,
    #[error("validator is inactive")]
    ValidatorInactive,
}

impl IngressError {
    fn reason(&self) -> &'static str {
        match self {
            IngressError::Malformed(_) => "malformed",
            IngressError::UnknownAgent => "unknown_agent",
            IngressError::InvalidApiKey => "invalid_api_key",
            IngressError::AgentInactive => "agent_inactive",
            IngressError::ValidatorInactive => "validator_inactive",
            IngressError::WrongValidatorScope => "wrong_validator_scope",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            IngressError::Malformed(_) => StatusCode::BAD_REQUEST,
            IngressError::UnknownAgent
            | IngressError::InvalidApiKey
            | IngressError::AgentInactive
            | IngressError::ValidatorInactive => StatusCode::UNAUTHORIZED,
            IngressError::WrongValidatorScope => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, self.to_string()).into_response()
    }
}

#[derive(serde::Serialize)]
struct ReportAccepted {
    report_id: sentinel_types::ReportId,
}

/// `POST /api/report`. Validation → auth → persist+handoff, in that order;
/// the aggregator handoff happens before the response is built so `reportId` is
/// meaningful to the caller.
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<ReportSubmission>,
) -> Result<impl IntoResponse, IngressError> {
    let validator_id = submission.validator_id.clone();
    let outcome = submit_report_inner(state, submission).await;
    if let Err(error) = &outcome {
        metrics::increment_counter!(
            sentinel_metrics::names::reports::REJECTED,
            sentinel_metrics::names::reports::labels::REASON => error.reason(),
            sentinel_metrics::names::reports::labels::VALIDATOR_ID => validator_id
        );
    }
    outcome
}

async fn submit_report_inner(
    state: Arc<AppState>,
    submission: ReportSubmission,
) -> Result<impl IntoResponse, IngressError> {
    sentinel_types::validate_submission(&submission)?;

    let agent = state.registry.get_agent(&submission.agent_id).await.ok_or(IngressError::UnknownAgent)?;
    let validator = state.registry.get_validator(&agent.validator_id).await.ok_or(IngressError::UnknownAgent)?;

    if !agent.is_active {
        return Err(IngressError::AgentInactive);
    }
    if !sentinel_credentials::keys_match(&submission.agent_api_key, &validator.validator_api_key) {
        return Err(IngressError::InvalidApiKey);
    }
    if agent.validator_id != submission.validator_id {
        return Err(IngressError::WrongValidatorScope);
    }
    if !validator.is_active {
        return Err(IngressError::ValidatorInactive);
    }

    let report = sentinel_types::AgentReport::new(
        submission.agent_id.clone(),
        submission.validator_id.clone(),
        submission.status,
        submission.message.clone(),
    );
    state.reports.insert(report.clone());
    state.registry.touch_agent_last_seen(&submission.agent_id).await;
    metrics::increment_counter!(
        sentinel_metrics::names::reports::ACCEPTED,
        sentinel_metrics::names::reports::labels::VALIDATOR_ID => submission.validator_id.clone()
    );

    info!(report_id = %report.id, agent_id = %submission.agent_id, status = ?submission.status, "report accepted");

    // Handoff to the aggregator must happen before the 200 is returned.
    state.aggregator.handle_report(report.clone(), &validator).await;

    Ok((StatusCode::OK, Json(ReportAccepted { report_id: report.id })))
}

pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => {
            warn!("metrics endpoint hit but no Prometheus recorder is installed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// `POST /api/webhooks/:id/test`: sends a `webhook.test` delivery directly to
/// one config, bypassing the event-subscription filter, so a user can confirm
/// the endpoint is reachable.
pub async fn test_webhook(
    State(state): State<Arc<AppState>>,
    Path(webhook_id): Path<WebhookConfigId>,
) -> Result<impl IntoResponse, StatusCode> {
    let config = state.webhook_configs.get(&webhook_id).ok_or(StatusCode::NOT_FOUND)?;
    info!(webhook_id = %config.id, "dispatching test webhook");
    state.webhooks.dispatch_test(config).await;
    Ok(StatusCode::ACCEPTED)
}
