use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{OpportunityId, OpportunityStatus, OpportunitySubmission, Verdict};
use super::provider::CompletionClient;
use super::repository::{OpportunityFilter, OpportunityRepository, RepositoryError};
use super::service::{ManagerReviewRequest, OpportunityTriageService, TriageServiceError};

/// Router builder exposing the opportunity intake, analysis, review, and
/// dashboard endpoints.
pub fn triage_router<R, C>(service: Arc<OpportunityTriageService<R, C>>) -> Router
where
    R: OpportunityRepository + 'static,
    C: CompletionClient + 'static,
{
    Router::new()
        .route(
            "/api/v1/opportunities",
            post(submit_handler::<R, C>).get(list_handler::<R, C>),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id",
            get(detail_handler::<R, C>),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/analyze",
            post(analyze_handler::<R, C>),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/review",
            post(review_handler::<R, C>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<R, C>))
        .with_state(service)
}

/// Comma-separated status/decision filters plus a free-text query.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    decision: Option<String>,
    #[serde(default)]
    q: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<OpportunityFilter, String> {
        let mut filter = OpportunityFilter {
            search: self.q,
            ..OpportunityFilter::default()
        };

        if let Some(raw) = self.status {
            for token in raw.split(',').filter(|token| !token.trim().is_empty()) {
                let status = OpportunityStatus::parse(token)
                    .ok_or_else(|| format!("unknown status '{}'", token.trim()))?;
                filter.statuses.push(status);
            }
        }
        if let Some(raw) = self.decision {
            for token in raw.split(',').filter(|token| !token.trim().is_empty()) {
                let verdict = Verdict::parse(token)
                    .ok_or_else(|| format!("unknown decision '{}'", token.trim()))?;
                filter.ai_decisions.push(verdict);
            }
        }

        Ok(filter)
    }
}

pub(crate) async fn submit_handler<R, C>(
    State(service): State<Arc<OpportunityTriageService<R, C>>>,
    axum::Json(submission): axum::Json<OpportunitySubmission>,
) -> Response
where
    R: OpportunityRepository + 'static,
    C: CompletionClient + 'static,
{
    match service.submit(submission) {
        Ok(record) => (StatusCode::ACCEPTED, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, C>(
    State(service): State<Arc<OpportunityTriageService<R, C>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: OpportunityRepository + 'static,
    C: CompletionClient + 'static,
{
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(message) => {
            let payload = json!({ "error": message });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match service.list(&filter) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn detail_handler<R, C>(
    State(service): State<Arc<OpportunityTriageService<R, C>>>,
    Path(opportunity_id): Path<String>,
) -> Response
where
    R: OpportunityRepository + 'static,
    C: CompletionClient + 'static,
{
    let id = OpportunityId(opportunity_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn analyze_handler<R, C>(
    State(service): State<Arc<OpportunityTriageService<R, C>>>,
    Path(opportunity_id): Path<String>,
) -> Response
where
    R: OpportunityRepository + 'static,
    C: CompletionClient + 'static,
{
    let id = OpportunityId(opportunity_id);
    match service.analyze(&id).await {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_handler<R, C>(
    State(service): State<Arc<OpportunityTriageService<R, C>>>,
    Path(opportunity_id): Path<String>,
    axum::Json(request): axum::Json<ManagerReviewRequest>,
) -> Response
where
    R: OpportunityRepository + 'static,
    C: CompletionClient + 'static,
{
    let id = OpportunityId(opportunity_id);
    match service.review(&id, request) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn dashboard_handler<R, C>(
    State(service): State<Arc<OpportunityTriageService<R, C>>>,
) -> Response
where
    R: OpportunityRepository + 'static,
    C: CompletionClient + 'static,
{
    match service.dashboard() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: TriageServiceError) -> Response {
    let status = match &err {
        TriageServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TriageServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        TriageServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        TriageServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        TriageServiceError::AnalysisInFlight(_) => StatusCode::CONFLICT,
        TriageServiceError::Provider(_) => StatusCode::BAD_GATEWAY,
        TriageServiceError::AnalysisTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
