use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::pipeline::memory::InMemoryLeadRepository;
use crate::pipeline::router::{config_handler, pipeline_router};
use crate::pipeline::service::LeadPipelineService;

fn json_request(method: &str, uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn router() -> axum::Router {
    let (service, _, _) = build_service();
    pipeline_router(Arc::new(service))
}

#[tokio::test]
async fn create_lead_route_returns_scored_lead() {
    let response = router()
        .oneshot(json_request(
            "POST",
            "/api/v1/tenants/acme/leads",
            json!({"name": "Priya Raman", "status": "won", "score": 3}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "won");
    assert_eq!(payload["id"], "lead-000001");
    assert_ne!(payload["score"], 3);
}

#[tokio::test]
async fn unknown_status_is_unprocessable() {
    let response = router()
        .oneshot(json_request(
            "POST",
            "/api/v1/tenants/acme/leads",
            json!({"name": "Priya Raman", "status": "negotiation"}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["field"], "status");
}

#[tokio::test]
async fn missing_lead_is_not_found() {
    let response = router()
        .oneshot(empty_request("GET", "/api/v1/tenants/acme/leads/lead-404"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["entity"], "lead");
}

#[tokio::test]
async fn duplicate_stage_is_conflict() {
    let response = router()
        .oneshot(json_request(
            "POST",
            "/api/v1/tenants/acme/stages",
            json!({"name": "Won"}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_config_is_unprocessable() {
    let response = router()
        .oneshot(json_request(
            "PUT",
            "/api/v1/tenants/acme/scoring-config",
            json!({"fields": [{"fieldName": "status", "isActive": true, "weight": 101, "rules": []}]}),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["field"], "fields[0].weight");
}

#[tokio::test]
async fn config_replacement_rescores_through_the_router() {
    let router = router();

    let created = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/tenants/acme/leads",
            json!({"name": "Ana Costa", "status": "qualified"}),
        ))
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);

    let replaced = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/tenants/acme/scoring-config",
            serde_json::to_value(status_only_config()).expect("config serializes"),
        ))
        .await
        .expect("route executes");
    assert_eq!(replaced.status(), StatusCode::OK);
    let payload = read_json_body(replaced).await;
    assert_eq!(payload["rescan"]["rescored"], 1);

    let card = router
        .oneshot(empty_request(
            "GET",
            "/api/v1/tenants/acme/leads/lead-000001/score-card",
        ))
        .await
        .expect("route executes");
    assert_eq!(card.status(), StatusCode::OK);
    let payload = read_json_body(card).await;
    assert_eq!(payload["score"], 100);
}

#[tokio::test]
async fn stage_delete_route_reports_fallback() {
    let router = router();

    let created = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/tenants/acme/leads",
            json!({"name": "Ana Costa", "status": "proposal"}),
        ))
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);

    let deleted = router
        .clone()
        .oneshot(empty_request("DELETE", "/api/v1/tenants/acme/stages/proposal"))
        .await
        .expect("route executes");
    assert_eq!(deleted.status(), StatusCode::OK);
    let payload = read_json_body(deleted).await;
    assert_eq!(payload["fallback"], "new");
    assert_eq!(payload["rescan"]["reassigned"], 1);

    let lead = router
        .oneshot(empty_request("GET", "/api/v1/tenants/acme/leads/lead-000001"))
        .await
        .expect("route executes");
    let payload = read_json_body(lead).await;
    assert_eq!(payload["status"], "new");
}

#[tokio::test]
async fn stage_order_route_renumbers() {
    let response = router()
        .oneshot(json_request(
            "POST",
            "/api/v1/tenants/acme/stage-order",
            json!([{"id": "lost", "order": -1}]),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload[0]["id"], "lost");
    assert_eq!(payload[0]["order"], 0);
}

#[tokio::test]
async fn import_route_accepts_csv_bodies() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/tenants/acme/leads/import")
                .header(header::CONTENT_TYPE, "text/csv")
                .body(Body::from("Name,Status\nPriya Raman,won\n,new\n"))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["created"].as_array().map(Vec::len), Some(1));
    assert_eq!(payload["rejected"][0]["row"], 2);
}

#[tokio::test]
async fn delete_lead_route_returns_no_content() {
    let router = router();
    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/tenants/acme/leads",
            json!({"name": "Ana Costa"}),
        ))
        .await
        .expect("route executes");

    let response = router
        .oneshot(empty_request("DELETE", "/api/v1/tenants/acme/leads/lead-000001"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn config_handler_returns_internal_error_when_settings_are_down() {
    let service = Arc::new(LeadPipelineService::new(
        Arc::new(InMemoryLeadRepository::default()),
        Arc::new(UnavailableSettings),
    ));

    let response = config_handler::<InMemoryLeadRepository, UnavailableSettings>(
        State(service),
        Path("acme".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
