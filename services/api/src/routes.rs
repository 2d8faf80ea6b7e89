use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use feasibility_screening::error::AppError;
use feasibility_screening::workflows::import::{ResponseImportError, ResponseImporter};
use feasibility_screening::workflows::screening::{
    screening_router, FollowUpPublisher, QuestionnaireProgress, ScreeningRepository,
    ScreeningResult, ScreeningService, ScreeningTemplate,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateRequest {
    pub(crate) responses_csv: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EvaluateResponse {
    pub(crate) template: String,
    pub(crate) template_version: String,
    pub(crate) unknown_questions: Vec<String>,
    pub(crate) progress: QuestionnaireProgress,
    pub(crate) result: ScreeningResult,
}

pub(crate) fn with_screening_routes<R, A>(service: Arc<ScreeningService<R, A>>) -> axum::Router
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    screening_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/screening/evaluate",
            axum::routing::post(evaluate_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };

    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Score a CRM export in one call, without opening a stored screening.
pub(crate) async fn evaluate_endpoint(
    Extension(template): Extension<Arc<ScreeningTemplate>>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let reader = Cursor::new(payload.responses_csv.into_bytes());
    let imported = ResponseImporter::from_reader(reader, Arc::clone(&template))?;
    let mut session = imported.session;
    let progress = session.snapshot().progress;
    let result = session.submit().map_err(ResponseImportError::from)?;

    Ok(Json(EvaluateResponse {
        template: template.name.clone(),
        template_version: template.version.clone(),
        unknown_questions: imported.unknown_questions,
        progress,
        result,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryFollowUpPublisher, InMemoryScreeningRepository};
    use axum::body::Body;
    use axum::http::Request;
    use feasibility_screening::workflows::screening::{FeasibilityRating, QualificationLevel};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let template = ScreeningTemplate::standard().expect("standard template");
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let service = Arc::new(ScreeningService::new(
            Arc::new(InMemoryScreeningRepository::default()),
            Arc::new(InMemoryFollowUpPublisher::default()),
            template.clone(),
        ));

        with_screening_routes(service)
            .layer(Extension(Arc::new(template)))
            .layer(Extension(state))
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let (status, body) = get_json(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let (status, body) = get_json(app(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn health_and_screening_routes_share_one_router() {
        let (status, body) = get_json(app(true), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get_json(app(true), "/api/v1/screening/template").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "solar-site-screening");
    }

    #[tokio::test]
    async fn evaluate_route_accepts_json_exports() {
        let payload = json!({ "responses_csv": OWNER_EXPORT }).to_string();
        let response = app(true)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/screening/evaluate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["result"]["feasibility_rating"], "medium");
    }

    fn standard_template() -> Arc<ScreeningTemplate> {
        Arc::new(ScreeningTemplate::standard().expect("standard template"))
    }

    const OWNER_EXPORT: &str = "Question ID,Answer\n\
property_type,factory\n\
ownership,owner\n\
roof_type,metal-sheet\n\
roof_area_sqm,420\n\
shading,none\n\
monthly_bill,\"85,000\"\n\
grid_connection,three-phase\n\
installation_timeline,within-3-months\n\
contact_email,facilities@example.com\n\
contact_phone,021234567\n\
postal_code,10540\n\
crm_owner,Somchai\n";

    #[tokio::test]
    async fn evaluate_endpoint_scores_an_export() {
        let request = EvaluateRequest {
            responses_csv: OWNER_EXPORT.to_string(),
        };

        let Json(body) = evaluate_endpoint(Extension(standard_template()), Json(request))
            .await
            .expect("export evaluates");

        assert_eq!(body.template, "solar-site-screening");
        assert_eq!(body.unknown_questions, vec!["crm_owner".to_string()]);
        assert!(body.progress.can_submit);
        assert_eq!(body.result.percentage, 75);
        assert_eq!(body.result.feasibility_rating, FeasibilityRating::Medium);
        assert_eq!(body.result.qualification_level, QualificationLevel::Qualified);
    }

    #[tokio::test]
    async fn incomplete_export_is_a_bad_request() {
        let request = EvaluateRequest {
            responses_csv: "Question ID,Answer\nownership,owner\n".to_string(),
        };

        let error = evaluate_endpoint(Extension(standard_template()), Json(request))
            .await
            .err()
            .expect("missing required answers");

        assert!(error.to_string().contains("property_type"));
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
