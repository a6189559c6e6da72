use crate::infra::{deserialize_optional_timestamp, deserialize_timestamp, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use courseflow::workflows::assignments::submissions::{
    evaluate, submission_router, Assignment, AssignmentId, CourseworkClient, PaymentGateway,
    SubmissionMode, SubmissionWindow, SubmissionWorkflowService,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct EligibilityPreviewRequest {
    #[serde(default)]
    pub(crate) assignment_id: Option<String>,
    pub(crate) title: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub(crate) start_date: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub(crate) deadline: DateTime<Utc>,
    #[serde(default)]
    pub(crate) allow_late_submission: bool,
    #[serde(default)]
    pub(crate) payment_required: bool,
    #[serde(default)]
    pub(crate) payment_amount_cents: u32,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub(crate) now: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EligibilityPreviewResponse {
    pub(crate) assignment_id: String,
    pub(crate) evaluated_at: DateTime<Utc>,
    pub(crate) can_submit: bool,
    pub(crate) window: SubmissionWindow,
    pub(crate) message: String,
}

pub(crate) fn with_submission_routes<C, P>(
    service: Arc<SubmissionWorkflowService<C, P>>,
) -> axum::Router
where
    C: CourseworkClient + 'static,
    P: PaymentGateway + 'static,
{
    submission_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/assignments/eligibility/preview",
            axum::routing::post(eligibility_preview_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Evaluate the submission window for a hypothetical assignment without
/// touching the coursework backend. Instructors use this to sanity-check
/// deadline and late-fee settings before publishing.
pub(crate) async fn eligibility_preview_endpoint(
    Json(payload): Json<EligibilityPreviewRequest>,
) -> Json<EligibilityPreviewResponse> {
    let EligibilityPreviewRequest {
        assignment_id,
        title,
        start_date,
        deadline,
        allow_late_submission,
        payment_required,
        payment_amount_cents,
        now,
    } = payload;

    let assignment = Assignment {
        id: AssignmentId(assignment_id.unwrap_or_else(|| "preview".to_string())),
        title,
        start_date,
        deadline,
        allow_late_submission,
        payment_required,
        payment_amount_cents,
        max_score: 0,
        submission_mode: SubmissionMode::Both,
    };

    let evaluated_at = now.unwrap_or_else(Utc::now);
    let outcome = evaluate(&assignment, evaluated_at);

    Json(EligibilityPreviewResponse {
        assignment_id: outcome.assignment_id.0,
        evaluated_at,
        can_submit: outcome.window.permits_submission(),
        window: outcome.window,
        message: outcome.message,
    })
}
