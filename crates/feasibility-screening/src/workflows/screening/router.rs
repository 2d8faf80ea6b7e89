use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::QuestionAnswer;
use super::repository::{FollowUpPublisher, RepositoryError, ScreeningId, ScreeningRepository};
use super::service::{ScreeningService, ScreeningServiceError};
use super::session::SessionError;

/// Router builder exposing the questionnaire over HTTP.
pub fn screening_router<R, A>(service: Arc<ScreeningService<R, A>>) -> Router
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    Router::new()
        .route("/api/v1/screenings", post(start_handler::<R, A>))
        .route(
            "/api/v1/screenings/:screening_id",
            get(status_handler::<R, A>),
        )
        .route(
            "/api/v1/screenings/:screening_id/questions",
            get(questions_handler::<R, A>),
        )
        .route(
            "/api/v1/screenings/:screening_id/answers/:question_id",
            put(answer_handler::<R, A>),
        )
        .route(
            "/api/v1/screenings/:screening_id/submit",
            post(submit_handler::<R, A>),
        )
        .route("/api/v1/screening/template", get(template_handler::<R, A>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StartRequest {
    lead_reference: Option<String>,
}

/// `null` or a missing `value` clears the answer.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AnswerRequest {
    value: Option<QuestionAnswer>,
}

pub(crate) async fn start_handler<R, A>(
    State(service): State<Arc<ScreeningService<R, A>>>,
    axum::Json(request): axum::Json<StartRequest>,
) -> Response
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    let record = match service.start(request.lead_reference) {
        Ok(record) => record,
        Err(error) => return error_response(error),
    };

    match service.snapshot(&record.screening_id) {
        Ok(snapshot) => {
            let payload = json!({
                "screening": record.status_view(),
                "snapshot": snapshot,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, A>(
    State(service): State<Arc<ScreeningService<R, A>>>,
    Path(screening_id): Path<String>,
) -> Response
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    match service.get(&ScreeningId(screening_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn questions_handler<R, A>(
    State(service): State<Arc<ScreeningService<R, A>>>,
    Path(screening_id): Path<String>,
) -> Response
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    let id = ScreeningId(screening_id);
    let questions = match service.visible_questions(&id) {
        Ok(questions) => questions,
        Err(error) => return error_response(error),
    };

    match service.snapshot(&id) {
        Ok(snapshot) => {
            let payload = json!({
                "screening_id": id,
                "questions": questions,
                "progress": snapshot.progress,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn answer_handler<R, A>(
    State(service): State<Arc<ScreeningService<R, A>>>,
    Path((screening_id, question_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    match service.answer(&ScreeningId(screening_id), &question_id, request.value) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, A>(
    State(service): State<Arc<ScreeningService<R, A>>>,
    Path(screening_id): Path<String>,
) -> Response
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    match service.submit(&ScreeningId(screening_id)) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn template_handler<R, A>(
    State(service): State<Arc<ScreeningService<R, A>>>,
) -> Response
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    (StatusCode::OK, axum::Json(service.template().clone())).into_response()
}

fn error_response(error: ScreeningServiceError) -> Response {
    let (status, payload) = match &error {
        ScreeningServiceError::Session(SessionError::Rejected(rejection)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "error": rejection.to_string(),
                "question_id": rejection.question(),
            }),
        ),
        ScreeningServiceError::Session(SessionError::NotSubmittable { missing_required }) => (
            StatusCode::CONFLICT,
            json!({
                "error": error.to_string(),
                "missing_required": missing_required,
            }),
        ),
        ScreeningServiceError::Session(SessionError::AlreadySubmitted)
        | ScreeningServiceError::Repository(RepositoryError::Conflict) => (
            StatusCode::CONFLICT,
            json!({ "error": error.to_string() }),
        ),
        ScreeningServiceError::Session(SessionError::UnknownQuestion(_))
        | ScreeningServiceError::Repository(RepositoryError::NotFound) => (
            StatusCode::NOT_FOUND,
            json!({ "error": error.to_string() }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };

    (status, axum::Json(payload)).into_response()
}
