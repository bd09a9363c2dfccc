use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::pipeline::domain::{Lead, LeadDraft, LeadField, LeadId, TenantId};
use crate::pipeline::memory::{InMemoryLeadRepository, InMemorySettingsRepository};
use crate::pipeline::repository::{LeadRepository, RepositoryError, SettingsRepository};
use crate::pipeline::scoring::{
    RuleCondition, RuleValue, ScoringConfig, ScoringFieldConfig, ScoringRule,
};
use crate::pipeline::service::LeadPipelineService;
use crate::pipeline::stages::PipelineStage;

pub(super) type MemoryService =
    LeadPipelineService<InMemoryLeadRepository, InMemorySettingsRepository>;

pub(super) fn tenant() -> TenantId {
    TenantId("acme".to_string())
}

pub(super) fn lead(status: &str) -> Lead {
    let at = Utc
        .with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp");
    Lead {
        id: LeadId("lead-fixture".to_string()),
        name: "Priya Raman".to_string(),
        email: Some("priya@lumenlabs.io".to_string()),
        phone: None,
        company: Some("Lumen Labs".to_string()),
        status: status.to_string(),
        category: None,
        location: None,
        designation: None,
        industry: None,
        source: None,
        score: 0,
        created_at: at,
        updated_at: at,
    }
}

pub(super) fn draft(name: &str, status: Option<&str>) -> LeadDraft {
    LeadDraft {
        name: name.to_string(),
        status: status.map(str::to_string),
        ..LeadDraft::default()
    }
}

pub(super) fn rule(id: &str, condition: RuleCondition, value: RuleValue, points: i32) -> ScoringRule {
    ScoringRule {
        id: id.to_string(),
        condition,
        value,
        points,
    }
}

pub(super) fn equals(id: &str, value: &str, points: i32) -> ScoringRule {
    rule(id, RuleCondition::Equals, RuleValue::Text(value.to_string()), points)
}

pub(super) fn field(
    field_name: LeadField,
    weight: i32,
    rules: Vec<ScoringRule>,
) -> ScoringFieldConfig {
    ScoringFieldConfig {
        field_name,
        label: field_name.label().to_string(),
        is_active: true,
        weight,
        rules,
    }
}

/// One active `status` field worth 100 with `Qualified -> 10` and `New -> 2`.
pub(super) fn status_only_config() -> ScoringConfig {
    ScoringConfig {
        fields: vec![field(
            LeadField::Status,
            100,
            vec![equals("qualified", "Qualified", 10), equals("new", "New", 2)],
        )],
    }
}

pub(super) fn stage(id: &str, order: i32) -> PipelineStage {
    PipelineStage {
        id: id.to_string(),
        name: id.to_uppercase(),
        order,
        color: None,
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryLeadRepository>,
    Arc<InMemorySettingsRepository>,
) {
    let leads = Arc::new(InMemoryLeadRepository::default());
    let settings = Arc::new(InMemorySettingsRepository::default());
    let service = LeadPipelineService::new(leads.clone(), settings.clone());
    (service, leads, settings)
}

/// Service over stages `a(0)`, `b(1)`, `c(2)` and a status field scoring `a -> 10`,
/// `b -> 5`.
pub(super) fn abc_service() -> (MemoryService, Arc<InMemoryLeadRepository>) {
    let (service, leads, settings) = build_service();
    settings
        .save_stages(&tenant(), vec![stage("a", 0), stage("b", 1), stage("c", 2)])
        .expect("stages saved");
    settings
        .save_scoring_config(
            &tenant(),
            ScoringConfig {
                fields: vec![field(
                    LeadField::Status,
                    100,
                    vec![equals("status-a", "a", 10), equals("status-b", "b", 5)],
                )],
            },
        )
        .expect("config saved");
    (service, leads)
}

/// Lead store whose `update` and `list` can be switched to fail, for exercising stale
/// flags and aborted structural changes.
#[derive(Default)]
pub(super) struct FlakyLeadRepository {
    inner: InMemoryLeadRepository,
    fail_updates: AtomicBool,
    fail_lists: AtomicBool,
}

impl FlakyLeadRepository {
    pub(super) fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub(super) fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }
}

impl LeadRepository for FlakyLeadRepository {
    fn insert(&self, tenant: &TenantId, lead: Lead) -> Result<Lead, RepositoryError> {
        self.inner.insert(tenant, lead)
    }

    fn update(&self, tenant: &TenantId, lead: Lead) -> Result<(), RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.inner.update(tenant, lead)
    }

    fn fetch(&self, tenant: &TenantId, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        self.inner.fetch(tenant, id)
    }

    fn delete(&self, tenant: &TenantId, id: &LeadId) -> Result<bool, RepositoryError> {
        self.inner.delete(tenant, id)
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<Lead>, RepositoryError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("read timeout".to_string()));
        }
        self.inner.list(tenant)
    }
}

pub(super) struct UnavailableSettings;

impl SettingsRepository for UnavailableSettings {
    fn scoring_config(&self, _tenant: &TenantId) -> Result<Option<ScoringConfig>, RepositoryError> {
        Err(RepositoryError::Unavailable("settings offline".to_string()))
    }

    fn save_scoring_config(
        &self,
        _tenant: &TenantId,
        _config: ScoringConfig,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("settings offline".to_string()))
    }

    fn stages(&self, _tenant: &TenantId) -> Result<Option<Vec<PipelineStage>>, RepositoryError> {
        Err(RepositoryError::Unavailable("settings offline".to_string()))
    }

    fn save_stages(
        &self,
        _tenant: &TenantId,
        _stages: Vec<PipelineStage>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("settings offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
