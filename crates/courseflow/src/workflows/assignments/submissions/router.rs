use std::sync::Arc;

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::collaborators::{ClientError, CourseworkClient, PaymentGateway};
use super::domain::{AssignmentId, StudentId, SubmissionDraft};
use super::service::{SubmissionWorkflowError, SubmissionWorkflowService};

/// Router builder exposing HTTP endpoints for the submission workflow.
pub fn submission_router<C, P>(service: Arc<SubmissionWorkflowService<C, P>>) -> Router
where
    C: CourseworkClient + 'static,
    P: PaymentGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/assignments/:assignment_id/submission",
            get(context_handler::<C, P>).post(submit_handler::<C, P>),
        )
        .route(
            "/api/v1/assignments/:assignment_id/payment",
            post(begin_payment_handler::<C, P>),
        )
        .route(
            "/api/v1/assignments/:assignment_id/payment/return",
            get(payment_return_handler::<C, P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentQuery {
    pub(crate) student_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    pub(crate) student_id: String,
    #[serde(flatten)]
    pub(crate) draft: SubmissionDraft,
}

pub(crate) async fn context_handler<C, P>(
    State(service): State<Arc<SubmissionWorkflowService<C, P>>>,
    Path(assignment_id): Path<String>,
    Query(query): Query<StudentQuery>,
) -> Response
where
    C: CourseworkClient + 'static,
    P: PaymentGateway + 'static,
{
    let result = service.context(
        &AssignmentId(assignment_id),
        &StudentId(query.student_id),
        Utc::now(),
    );

    match result {
        Ok(context) => (StatusCode::OK, axum::Json(context)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<C, P>(
    State(service): State<Arc<SubmissionWorkflowService<C, P>>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    C: CourseworkClient + 'static,
    P: PaymentGateway + 'static,
{
    let result = service.submit(
        &AssignmentId(assignment_id),
        &StudentId(request.student_id),
        request.draft,
        Utc::now(),
    );

    match result {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn begin_payment_handler<C, P>(
    State(service): State<Arc<SubmissionWorkflowService<C, P>>>,
    Path(assignment_id): Path<String>,
    Query(query): Query<StudentQuery>,
) -> Response
where
    C: CourseworkClient + 'static,
    P: PaymentGateway + 'static,
{
    let result = service.begin_payment(
        &AssignmentId(assignment_id),
        &StudentId(query.student_id),
        Utc::now(),
    );

    match result {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn payment_return_handler<C, P>(
    State(service): State<Arc<SubmissionWorkflowService<C, P>>>,
    Path(assignment_id): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Response
where
    C: CourseworkClient + 'static,
    P: PaymentGateway + 'static,
{
    let raw_query = raw_query.unwrap_or_default();
    let (student_id, query) = match split_student(&raw_query) {
        Some(parts) => parts,
        None => {
            let payload = json!({ "error": "student_id query parameter is required" });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    let result = service.handle_payment_return(
        &AssignmentId(assignment_id),
        &StudentId(student_id),
        &query,
        Utc::now(),
    );

    match result {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Peel `student_id` off the raw query, leaving the rest (including the
/// payment reference aliases) for the workflow to consume.
fn split_student(raw_query: &str) -> Option<(String, String)> {
    let mut student = None;
    let mut rest = Vec::new();

    for pair in raw_query.split('&').filter(|pair| !pair.is_empty()) {
        match pair.split_once('=') {
            Some(("student_id", value)) if !value.is_empty() => {
                student.get_or_insert_with(|| value.to_string());
            }
            _ => rest.push(pair),
        }
    }

    student.map(|student| (student, rest.join("&")))
}

fn error_response(error: SubmissionWorkflowError) -> Response {
    let status = match &error {
        SubmissionWorkflowError::Validation(_) | SubmissionWorkflowError::MissingReference => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SubmissionWorkflowError::NotEligible { .. }
        | SubmissionWorkflowError::EditDenied { .. } => StatusCode::FORBIDDEN,
        SubmissionWorkflowError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
        SubmissionWorkflowError::NoPaymentDue => StatusCode::CONFLICT,
        SubmissionWorkflowError::Client(ClientError::AssignmentNotFound)
        | SubmissionWorkflowError::Client(ClientError::SubmissionNotFound) => {
            StatusCode::NOT_FOUND
        }
        SubmissionWorkflowError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SubmissionWorkflowError::Payment(_) => StatusCode::BAD_GATEWAY,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
