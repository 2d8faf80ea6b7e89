use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::screening::router::{answer_handler, status_handler, AnswerRequest};
use crate::workflows::screening::ScreeningService;
use crate::workflows::screening::ScreeningTemplate;

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

async fn start(router: &axum::Router) -> String {
    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/screenings", json!({})))
        .await
        .expect("route executes");
    assert_status(&response, StatusCode::CREATED);
    let payload = read_json_body(response).await;
    payload["screening"]["screening_id"]
        .as_str()
        .expect("screening id")
        .to_string()
}

#[tokio::test]
async fn start_route_creates_pending_screening() {
    let (service, _, _) = build_service();
    let router = screening_router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/screenings",
            json!({ "lead_reference": "lead-77" }),
        ))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["screening"]["status"], json!("pending"));
    assert_eq!(payload["screening"]["lead_reference"], json!("lead-77"));
    assert_eq!(payload["snapshot"]["progress"]["can_submit"], json!(false));
}

#[tokio::test]
async fn answer_route_returns_snapshot() {
    let (service, _, _) = build_service();
    let router = screening_router_with_service(service);
    let id = start(&router).await;

    let response = router
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/screenings/{id}/answers/ownership"),
            json!({ "value": "tenant" }),
        ))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    let visible = payload["visible_question_ids"]
        .as_array()
        .expect("visible ids");
    assert!(visible.contains(&json!("landlord_consent")));
    assert_eq!(payload["progress"]["answered_questions"], json!(1));
}

#[tokio::test]
async fn invalid_answer_is_unprocessable() {
    let (service, _, _) = build_service();
    let router = screening_router_with_service(service);
    let id = start(&router).await;

    let response = router
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/screenings/{id}/answers/postal_code"),
            json!({ "value": "ABC" }),
        ))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["question_id"], json!("postal_code"));
    assert_eq!(
        payload["error"],
        json!("Enter the 5-digit postal code of the site")
    );
}

#[tokio::test]
async fn unknown_question_is_not_found() {
    let (service, _, _) = build_service();
    let service = Arc::new(service);
    let record = service.start(None).expect("screening starts");

    let response = answer_handler(
        State(service),
        Path((record.screening_id.0.clone(), "favourite_colour".to_string())),
        axum::Json(AnswerRequest::default()),
    )
    .await;

    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_screening_is_not_found() {
    let (service, _, _) = build_service();

    let response = status_handler(State(Arc::new(service)), Path("scr-404".to_string())).await;

    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn premature_submit_conflicts_with_missing_ids() {
    let (service, _, _) = build_service();
    let router = screening_router_with_service(service);
    let id = start(&router).await;

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/screenings/{id}/submit"),
            json!({}),
        ))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    let missing = payload["missing_required"].as_array().expect("missing ids");
    assert!(missing.contains(&json!("ownership")));
}

#[tokio::test]
async fn full_flow_returns_result_then_conflicts() {
    let (service, _, alerts) = build_service();
    let service = Arc::new(service);
    let router = crate::workflows::screening::screening_router(service.clone());
    let record = service.start(None).expect("screening starts");
    let id = record.screening_id.0.clone();

    for (question_id, value) in complete_answers() {
        let response = router
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/screenings/{id}/answers/{question_id}"),
                json!({ "value": value }),
            ))
            .await
            .expect("route executes");
        assert_status(&response, StatusCode::OK);
    }

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/screenings/{id}/submit"),
            json!({}),
        ))
        .await
        .expect("route executes");
    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["feasibility_rating"], json!("high"));
    assert_eq!(payload["qualification_level"], json!("qualified"));
    assert_eq!(payload["estimated_system_size"]["unit"], json!("kWp"));
    assert_eq!(alerts.events().len(), 1);

    let status = router
        .clone()
        .oneshot(
            Request::get(format!("/api/v1/screenings/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    let status_payload = read_json_body(status).await;
    assert_eq!(status_payload["status"], json!("completed"));

    let again = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/screenings/{id}/submit"),
            json!({}),
        ))
        .await
        .expect("route executes");
    assert_status(&again, StatusCode::CONFLICT);
}

#[tokio::test]
async fn questions_route_lists_visible_questions() {
    let (service, _, _) = build_service();
    let router = screening_router_with_service(service);
    let id = start(&router).await;

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/screenings/{id}/questions"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    let ids: Vec<&str> = payload["questions"]
        .as_array()
        .expect("questions")
        .iter()
        .filter_map(|question| question["id"].as_str())
        .collect();
    assert_eq!(ids.first(), Some(&"property_type"));
    assert!(!ids.contains(&"landlord_consent"));
    assert!(!ids.contains(&"battery_budget"));
}

#[tokio::test]
async fn template_route_serves_loaded_template() {
    let (service, _, _) = build_service();
    let router = screening_router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/screening/template")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["name"], json!("solar-site-screening"));
    assert_eq!(payload["rules"]["bands"]["high"], json!(85));

    let reloaded: ScreeningTemplate =
        serde_json::from_value(payload).expect("served template reloads");
    assert_eq!(reloaded.questions.len(), 21);
}

#[tokio::test]
async fn repository_failure_is_internal_error() {
    let service = ScreeningService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryAlerts::default()),
        ScreeningTemplate::standard().expect("standard template"),
    );
    let router = crate::workflows::screening::screening_router(Arc::new(service));

    let response = router
        .oneshot(json_request("POST", "/api/v1/screenings", json!({})))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::INTERNAL_SERVER_ERROR);
}
