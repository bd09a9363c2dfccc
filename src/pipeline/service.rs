use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{Lead, LeadDraft, LeadId, LeadUpdate, TenantId};
use super::error::{ComputationWarning, PipelineError, WarningKind};
use super::import::parse_leads;
use super::repository::{LeadRepository, SettingsRepository};
use super::scoring::{aggregate, score_card, ScoreCard, ScoringConfig};
use super::stages::{
    is_valid_stage_id, NewStage, PipelineStage, StageOrder, StageRegistry, StageUpdate,
};

/// Per-tenant serialization. Structural changes hold `gate` exclusively; lead writes
/// share it.
#[derive(Default)]
struct TenantState {
    gate: RwLock<()>,
    stale: Mutex<BTreeSet<LeadId>>,
}

impl TenantState {
    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_stale(&self, id: &LeadId) {
        self.stale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone());
    }

    fn clear_stale(&self, id: &LeadId) {
        self.stale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    fn has_stale(&self) -> bool {
        !self
            .stale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn stale(&self) -> Vec<LeadId> {
        self.stale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Lead writes decided before a structural change commits.
struct RescanPlan {
    report: RescanReport,
    writes: Vec<PlannedWrite>,
    current: Vec<LeadId>,
}

struct PlannedWrite {
    lead: Lead,
    reassigned: bool,
}

/// Outcome of recomputing scores across a set of leads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescanReport {
    pub scanned: usize,
    pub rescored: usize,
    pub reassigned: usize,
    pub warnings: Vec<ComputationWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReplacement {
    pub config: ScoringConfig,
    pub rescan: RescanReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDeletion {
    pub removed: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub rescan: RescanReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRejection {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub created: Vec<Lead>,
    pub rejected: Vec<ImportRejection>,
}

/// Keeps every stored lead's score and status consistent with the tenant's scoring
/// configuration and stage list.
pub struct LeadPipelineService<L, S> {
    leads: Arc<L>,
    settings: Arc<S>,
    tenants: Mutex<HashMap<TenantId, Arc<TenantState>>>,
    sequence: AtomicU64,
}

impl<L, S> LeadPipelineService<L, S>
where
    L: LeadRepository + 'static,
    S: SettingsRepository + 'static,
{
    pub fn new(leads: Arc<L>, settings: Arc<S>) -> Self {
        Self {
            leads,
            settings,
            tenants: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(1),
        }
    }

    /// State for `tenant`. Entries nobody holds and with no stale leads are dropped, so the
    /// map only tracks tenants with work in flight or pending rescores.
    fn tenant(&self, tenant: &TenantId) -> Arc<TenantState> {
        let mut tenants = self.tenants.lock().unwrap_or_else(PoisonError::into_inner);
        if !tenants.contains_key(tenant) {
            tenants.retain(|_, state| Arc::strong_count(state) > 1 || state.has_stale());
        }
        tenants.entry(tenant.clone()).or_default().clone()
    }

    #[cfg(test)]
    pub(crate) fn tracked_tenants(&self) -> usize {
        self.tenants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_lead_id(&self) -> LeadId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        LeadId(format!("lead-{id:06}"))
    }

    /// Current configuration, persisting the defaults on first access.
    fn load_config(&self, tenant: &TenantId) -> Result<ScoringConfig, PipelineError> {
        if let Some(config) = self.settings.scoring_config(tenant)? {
            return Ok(config);
        }
        let config = ScoringConfig::default();
        self.settings.save_scoring_config(tenant, config.clone())?;
        info!(%tenant, "seeded default scoring configuration");
        Ok(config)
    }

    fn load_stages(&self, tenant: &TenantId) -> Result<StageRegistry, PipelineError> {
        if let Some(stages) = self.settings.stages(tenant)? {
            return Ok(StageRegistry::new(stages));
        }
        let registry = StageRegistry::standard();
        self.settings
            .save_stages(tenant, registry.stages().to_vec())?;
        info!(%tenant, "seeded standard pipeline stages");
        Ok(registry)
    }

    pub fn scoring_config(&self, tenant: &TenantId) -> Result<ScoringConfig, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.shared();
        self.load_config(tenant)
    }

    /// Replaces the whole configuration and rescores every lead of the tenant.
    pub fn replace_scoring_config(
        &self,
        tenant: &TenantId,
        config: ScoringConfig,
    ) -> Result<ConfigReplacement, PipelineError> {
        config.validate()?;
        let config = config.with_default_labels();

        let state = self.tenant(tenant);
        let _gate = state.exclusive();

        let registry = self.load_stages(tenant)?;
        let leads = self.leads.list(tenant)?;
        let plan = plan_rescan(tenant, &registry, &config, leads);

        self.settings.save_scoring_config(tenant, config.clone())?;
        let rescan = self.apply_rescan(tenant, &state, plan);

        info!(
            %tenant,
            fields = config.fields.len(),
            scanned = rescan.scanned,
            rescored = rescan.rescored,
            warnings = rescan.warnings.len(),
            "scoring configuration replaced"
        );
        Ok(ConfigReplacement { config, rescan })
    }

    /// Recomputes every lead under the current configuration and moves leads whose stage
    /// no longer exists to the fallback stage. Stale flags clear once a lead is current.
    pub fn rescore_all(&self, tenant: &TenantId) -> Result<RescanReport, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.exclusive();

        let config = self.load_config(tenant)?;
        let registry = self.load_stages(tenant)?;
        let leads = self.leads.list(tenant)?;
        let plan = plan_rescan(tenant, &registry, &config, leads);
        Ok(self.apply_rescan(tenant, &state, plan))
    }

    fn apply_rescan(&self, tenant: &TenantId, state: &TenantState, plan: RescanPlan) -> RescanReport {
        let RescanPlan {
            mut report,
            writes,
            current,
        } = plan;

        for id in &current {
            state.clear_stale(id);
        }
        for PlannedWrite { lead, reassigned } in writes {
            if self.persist_rescored(tenant, state, lead, &mut report) && reassigned {
                report.reassigned += 1;
            }
        }
        report
    }

    fn persist_rescored(
        &self,
        tenant: &TenantId,
        state: &TenantState,
        lead: Lead,
        report: &mut RescanReport,
    ) -> bool {
        let id = lead.id.clone();
        match self.leads.update(tenant, lead) {
            Ok(()) => {
                state.clear_stale(&id);
                report.rescored += 1;
                true
            }
            Err(err) => {
                warn!(%tenant, lead_id = %id, error = %err, "lead left stale after failed rescore");
                state.mark_stale(&id);
                report.warnings.push(ComputationWarning::new(
                    Some(id),
                    WarningKind::PersistFailed,
                    err.to_string(),
                ));
                false
            }
        }
    }

    /// Stages ordered by `order`.
    pub fn stages(&self, tenant: &TenantId) -> Result<Vec<PipelineStage>, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.shared();
        Ok(self.load_stages(tenant)?.into_stages())
    }

    pub fn create_stage(
        &self,
        tenant: &TenantId,
        new_stage: NewStage,
    ) -> Result<PipelineStage, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.exclusive();

        let mut registry = self.load_stages(tenant)?;
        let stage = registry.add(new_stage)?;
        self.settings.save_stages(tenant, registry.into_stages())?;

        info!(%tenant, stage_id = %stage.id, order = stage.order, "pipeline stage added");
        Ok(stage)
    }

    pub fn update_stage(
        &self,
        tenant: &TenantId,
        stage_id: &str,
        update: StageUpdate,
    ) -> Result<PipelineStage, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.exclusive();

        let mut registry = self.load_stages(tenant)?;
        let stage = registry.update(stage_id, update)?;
        self.settings.save_stages(tenant, registry.into_stages())?;

        info!(%tenant, stage_id = %stage.id, "pipeline stage updated");
        Ok(stage)
    }

    pub fn reorder_stages(
        &self,
        tenant: &TenantId,
        entries: &[StageOrder],
    ) -> Result<Vec<PipelineStage>, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.exclusive();

        let mut registry = self.load_stages(tenant)?;
        let matched = registry.reorder(entries)?;
        let stages = registry.into_stages();
        self.settings.save_stages(tenant, stages.clone())?;

        info!(%tenant, matched, requested = entries.len(), "pipeline stages reordered");
        Ok(stages)
    }

    /// Removes a stage and moves its leads to the lowest-order remaining stage.
    ///
    /// Every affected lead's new status and score is computed before anything is written.
    /// The registry change commits even when a lead cannot be rewritten; such leads are
    /// reported and flagged stale, and [`Self::rescore_all`] moves them once writes succeed.
    pub fn delete_stage(
        &self,
        tenant: &TenantId,
        stage_id: &str,
    ) -> Result<StageDeletion, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.exclusive();

        let mut registry = self.load_stages(tenant)?;
        let removed = registry.remove(stage_id)?;
        let config = self.load_config(tenant)?;
        let affected: Vec<Lead> = self
            .leads
            .list(tenant)?
            .into_iter()
            .filter(|lead| lead.status == removed.id)
            .collect();

        let fallback = valid_fallback(&registry);
        if fallback.is_none() && !affected.is_empty() {
            warn!(
                %tenant,
                stage_id = %removed.id,
                affected = affected.len(),
                "no valid fallback stage; leads keep the deleted status"
            );
        }
        let plan = plan_rescan(tenant, &registry, &config, affected);

        self.settings.save_stages(tenant, registry.into_stages())?;
        let rescan = self.apply_rescan(tenant, &state, plan);

        info!(
            %tenant,
            stage_id = %removed.id,
            fallback = fallback.as_deref().unwrap_or("none"),
            reassigned = rescan.reassigned,
            "pipeline stage deleted"
        );
        Ok(StageDeletion {
            removed,
            fallback,
            rescan,
        })
    }

    pub fn create_lead(&self, tenant: &TenantId, draft: LeadDraft) -> Result<Lead, PipelineError> {
        if draft.name.trim().is_empty() {
            return Err(PipelineError::validation("name", "lead name is required"));
        }

        let state = self.tenant(tenant);
        let _gate = state.shared();

        let registry = self.load_stages(tenant)?;
        let status = match draft.status.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => resolve_status(&registry, raw)?,
            _ => registry
                .fallback()
                .map(|stage| stage.id.clone())
                .ok_or_else(|| {
                    PipelineError::validation("status", "no pipeline stages are configured")
                })?,
        };

        let config = self.load_config(tenant)?;
        let mut lead = Lead::from_draft(self.next_lead_id(), draft, status, Utc::now());
        lead.score = aggregate(&lead, &config);

        let stored = self.leads.insert(tenant, lead)?;
        debug!(%tenant, lead_id = %stored.id, score = stored.score, "lead created");
        Ok(stored)
    }

    pub fn update_lead(
        &self,
        tenant: &TenantId,
        lead_id: &LeadId,
        mut update: LeadUpdate,
    ) -> Result<Lead, PipelineError> {
        if matches!(update.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(PipelineError::validation("name", "lead name cannot be empty"));
        }

        let state = self.tenant(tenant);
        let _gate = state.shared();

        let mut lead = self
            .leads
            .fetch(tenant, lead_id)?
            .ok_or_else(|| PipelineError::not_found("lead", lead_id.0.clone()))?;

        let registry = self.load_stages(tenant)?;
        if let Some(raw) = update.status.take() {
            update.status = Some(resolve_status(&registry, raw.trim())?);
        } else if !registry.contains(&lead.status) {
            update.status = valid_fallback(&registry);
        }

        let config = self.load_config(tenant)?;
        lead.apply(update);
        lead.updated_at = Utc::now();
        lead.score = aggregate(&lead, &config);

        self.leads.update(tenant, lead.clone())?;
        state.clear_stale(&lead.id);
        debug!(%tenant, lead_id = %lead.id, score = lead.score, "lead updated");
        Ok(lead)
    }

    pub fn delete_lead(&self, tenant: &TenantId, lead_id: &LeadId) -> Result<(), PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.shared();

        if !self.leads.delete(tenant, lead_id)? {
            return Err(PipelineError::not_found("lead", lead_id.0.clone()));
        }
        state.clear_stale(lead_id);
        debug!(%tenant, %lead_id, "lead deleted");
        Ok(())
    }

    pub fn lead(&self, tenant: &TenantId, lead_id: &LeadId) -> Result<Lead, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.shared();
        self.leads
            .fetch(tenant, lead_id)?
            .ok_or_else(|| PipelineError::not_found("lead", lead_id.0.clone()))
    }

    pub fn leads(&self, tenant: &TenantId) -> Result<Vec<Lead>, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.shared();
        Ok(self.leads.list(tenant)?)
    }

    /// Breakdown of a stored lead's score under the current configuration.
    pub fn score_card(&self, tenant: &TenantId, lead_id: &LeadId) -> Result<ScoreCard, PipelineError> {
        let state = self.tenant(tenant);
        let _gate = state.shared();
        let lead = self
            .leads
            .fetch(tenant, lead_id)?
            .ok_or_else(|| PipelineError::not_found("lead", lead_id.0.clone()))?;
        let config = self.load_config(tenant)?;
        Ok(score_card(&lead, &config))
    }

    /// Leads whose last rescore could not be saved.
    pub fn stale_leads(&self, tenant: &TenantId) -> Vec<LeadId> {
        self.tenant(tenant).stale()
    }

    /// Creates one lead per CSV row. Rows that fail validation are reported and skipped;
    /// storage failures abort the import.
    pub fn import_leads<R: Read>(
        &self,
        tenant: &TenantId,
        reader: R,
    ) -> Result<ImportReport, PipelineError> {
        let rows = parse_leads(reader)?;
        let mut report = ImportReport::default();

        for row in rows {
            match self.create_lead(tenant, row.draft) {
                Ok(lead) => report.created.push(lead),
                Err(err @ (PipelineError::Validation { .. } | PipelineError::NotFound { .. })) => {
                    report.rejected.push(ImportRejection {
                        row: row.row,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            %tenant,
            created = report.created.len(),
            rejected = report.rejected.len(),
            "lead import finished"
        );
        Ok(report)
    }
}

/// Lowest-order stage, provided its id is well formed.
fn valid_fallback(registry: &StageRegistry) -> Option<String> {
    registry
        .fallback()
        .map(|stage| stage.id.clone())
        .filter(|id| is_valid_stage_id(id))
}

/// Decides the status and score of every lead without writing anything. Leads whose
/// status is not a registered stage move to the fallback stage when one is available.
fn plan_rescan(
    tenant: &TenantId,
    registry: &StageRegistry,
    config: &ScoringConfig,
    leads: Vec<Lead>,
) -> RescanPlan {
    let fallback = valid_fallback(registry);
    let now = Utc::now();
    let mut plan = RescanPlan {
        report: RescanReport {
            scanned: leads.len(),
            ..RescanReport::default()
        },
        writes: Vec::new(),
        current: Vec::new(),
    };

    for mut lead in leads {
        let mut reassigned = false;
        if !registry.contains(&lead.status) {
            match &fallback {
                Some(stage_id) => {
                    debug!(%tenant, lead_id = %lead.id, from = %lead.status, to = %stage_id, "reassigning lead");
                    lead.status = stage_id.clone();
                    lead.updated_at = now;
                    reassigned = true;
                }
                None => plan.report.warnings.push(ComputationWarning::new(
                    Some(lead.id.clone()),
                    WarningKind::FallbackUnavailable,
                    format!("stage '{}' no longer exists and has no fallback", lead.status),
                )),
            }
        }

        let card = score_card(&lead, config);
        plan.report.warnings.extend(card.warnings);
        if !reassigned && card.score == lead.score {
            plan.current.push(lead.id);
            continue;
        }

        debug!(%tenant, lead_id = %lead.id, from = lead.score, to = card.score, "rescoring lead");
        lead.score = card.score;
        plan.writes.push(PlannedWrite { lead, reassigned });
    }

    plan
}

fn resolve_status(registry: &StageRegistry, raw: &str) -> Result<String, PipelineError> {
    registry
        .resolve(raw)
        .map(|stage| stage.id.clone())
        .ok_or_else(|| {
            PipelineError::validation("status", format!("'{raw}' is not a pipeline stage"))
        })
}
