//! Process-local repositories used by the bundled server, the demo, and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Lead, LeadId, TenantId};
use super::repository::{LeadRepository, RepositoryError, SettingsRepository};
use super::scoring::ScoringConfig;
use super::stages::PipelineStage;

fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} lock poisoned")))
}

type LeadBook = HashMap<TenantId, BTreeMap<LeadId, Lead>>;

#[derive(Default, Clone)]
pub struct InMemoryLeadRepository {
    leads: Arc<Mutex<LeadBook>>,
}

impl LeadRepository for InMemoryLeadRepository {
    fn insert(&self, tenant: &TenantId, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut guard = lock(&self.leads, "lead store")?;
        let book = guard.entry(tenant.clone()).or_default();
        if book.contains_key(&lead.id) {
            return Err(RepositoryError::Conflict);
        }
        book.insert(lead.id.clone(), lead.clone());
        Ok(lead)
    }

    fn update(&self, tenant: &TenantId, lead: Lead) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.leads, "lead store")?;
        match guard
            .get_mut(tenant)
            .and_then(|book| book.get_mut(&lead.id))
        {
            Some(slot) => {
                *slot = lead;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, tenant: &TenantId, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let guard = lock(&self.leads, "lead store")?;
        Ok(guard.get(tenant).and_then(|book| book.get(id)).cloned())
    }

    fn delete(&self, tenant: &TenantId, id: &LeadId) -> Result<bool, RepositoryError> {
        let mut guard = lock(&self.leads, "lead store")?;
        Ok(guard
            .get_mut(tenant)
            .map(|book| book.remove(id).is_some())
            .unwrap_or(false))
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<Lead>, RepositoryError> {
        let guard = lock(&self.leads, "lead store")?;
        Ok(guard
            .get(tenant)
            .map(|book| book.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct TenantSettings {
    scoring: Option<ScoringConfig>,
    stages: Option<Vec<PipelineStage>>,
}

#[derive(Default, Clone)]
pub struct InMemorySettingsRepository {
    tenants: Arc<Mutex<HashMap<TenantId, TenantSettings>>>,
}

impl SettingsRepository for InMemorySettingsRepository {
    fn scoring_config(&self, tenant: &TenantId) -> Result<Option<ScoringConfig>, RepositoryError> {
        let guard = lock(&self.tenants, "settings store")?;
        Ok(guard.get(tenant).and_then(|settings| settings.scoring.clone()))
    }

    fn save_scoring_config(
        &self,
        tenant: &TenantId,
        config: ScoringConfig,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.tenants, "settings store")?;
        guard.entry(tenant.clone()).or_default().scoring = Some(config);
        Ok(())
    }

    fn stages(&self, tenant: &TenantId) -> Result<Option<Vec<PipelineStage>>, RepositoryError> {
        let guard = lock(&self.tenants, "settings store")?;
        Ok(guard.get(tenant).and_then(|settings| settings.stages.clone()))
    }

    fn save_stages(
        &self,
        tenant: &TenantId,
        stages: Vec<PipelineStage>,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.tenants, "settings store")?;
        guard.entry(tenant.clone()).or_default().stages = Some(stages);
        Ok(())
    }
}
