use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{LeadDraft, LeadId, LeadUpdate, TenantId};
use super::error::PipelineError;
use super::repository::{LeadRepository, SettingsRepository};
use super::scoring::ScoringConfig;
use super::service::LeadPipelineService;
use super::stages::{NewStage, StageOrder, StageUpdate};

type Service<L, S> = Arc<LeadPipelineService<L, S>>;

/// HTTP endpoints for scoring configuration, pipeline stages, and leads.
pub fn pipeline_router<L, S>(service: Service<L, S>) -> Router
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/tenants/:tenant_id/scoring-config",
            get(config_handler::<L, S>).put(replace_config_handler::<L, S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/stages",
            get(stages_handler::<L, S>).post(create_stage_handler::<L, S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/stages/:stage_id",
            patch(update_stage_handler::<L, S>)
                .delete(delete_stage_handler::<L, S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/stage-order",
            post(reorder_stages_handler::<L, S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/leads",
            get(leads_handler::<L, S>).post(create_lead_handler::<L, S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/leads/import",
            post(import_handler::<L, S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/leads/:lead_id",
            get(lead_handler::<L, S>)
                .patch(update_lead_handler::<L, S>)
                .delete(delete_lead_handler::<L, S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/leads/:lead_id/score-card",
            get(score_card_handler::<L, S>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/rescore",
            post(rescore_handler::<L, S>),
        )
        .with_state(service)
}

fn error_response(error: PipelineError) -> Response {
    let status = match &error {
        PipelineError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
        PipelineError::Conflict { .. } => StatusCode::CONFLICT,
        PipelineError::Import(_) => StatusCode::BAD_REQUEST,
        PipelineError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &error {
        PipelineError::Validation { field, message } => json!({
            "error": error.to_string(),
            "field": field,
            "message": message,
        }),
        PipelineError::NotFound { entity, id } | PipelineError::Conflict { entity, id } => {
            json!({
                "error": error.to_string(),
                "entity": entity,
                "id": id,
            })
        }
        _ => json!({ "error": error.to_string() }),
    };

    (status, Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, PipelineError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn config_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(StatusCode::OK, service.scoring_config(&TenantId(tenant_id)))
}

pub(crate) async fn replace_config_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
    Json(config): Json<ScoringConfig>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.replace_scoring_config(&TenantId(tenant_id), config),
    )
}

pub(crate) async fn stages_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(StatusCode::OK, service.stages(&TenantId(tenant_id)))
}

pub(crate) async fn create_stage_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
    Json(new_stage): Json<NewStage>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::CREATED,
        service.create_stage(&TenantId(tenant_id), new_stage),
    )
}

pub(crate) async fn update_stage_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path((tenant_id, stage_id)): Path<(String, String)>,
    Json(update): Json<StageUpdate>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.update_stage(&TenantId(tenant_id), &stage_id, update),
    )
}

pub(crate) async fn delete_stage_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path((tenant_id, stage_id)): Path<(String, String)>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.delete_stage(&TenantId(tenant_id), &stage_id),
    )
}

pub(crate) async fn reorder_stages_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
    Json(entries): Json<Vec<StageOrder>>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.reorder_stages(&TenantId(tenant_id), &entries),
    )
}

pub(crate) async fn leads_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(StatusCode::OK, service.leads(&TenantId(tenant_id)))
}

pub(crate) async fn create_lead_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
    Json(draft): Json<LeadDraft>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::CREATED,
        service.create_lead(&TenantId(tenant_id), draft),
    )
}

pub(crate) async fn lead_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path((tenant_id, lead_id)): Path<(String, String)>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.lead(&TenantId(tenant_id), &LeadId(lead_id)),
    )
}

pub(crate) async fn update_lead_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path((tenant_id, lead_id)): Path<(String, String)>,
    Json(update): Json<LeadUpdate>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.update_lead(&TenantId(tenant_id), &LeadId(lead_id), update),
    )
}

pub(crate) async fn delete_lead_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path((tenant_id, lead_id)): Path<(String, String)>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    match service.delete_lead(&TenantId(tenant_id), &LeadId(lead_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn score_card_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path((tenant_id, lead_id)): Path<(String, String)>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.score_card(&TenantId(tenant_id), &LeadId(lead_id)),
    )
}

pub(crate) async fn import_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
    body: String,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.import_leads(&TenantId(tenant_id), body.as_bytes()),
    )
}

pub(crate) async fn rescore_handler<L, S>(
    State(service): State<Service<L, S>>,
    Path(tenant_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    let tenant = TenantId(tenant_id);
    match service.rescore_all(&tenant) {
        Ok(report) => {
            let payload = json!({
                "rescan": report,
                "stale": service.stale_leads(&tenant),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}
