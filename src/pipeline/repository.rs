use super::domain::{Lead, LeadId, TenantId};
use super::scoring::ScoringConfig;
use super::stages::PipelineStage;

/// Lead storage, partitioned by tenant.
pub trait LeadRepository: Send + Sync {
    fn insert(&self, tenant: &TenantId, lead: Lead) -> Result<Lead, RepositoryError>;
    fn update(&self, tenant: &TenantId, lead: Lead) -> Result<(), RepositoryError>;
    fn fetch(&self, tenant: &TenantId, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    /// Returns whether a lead was removed.
    fn delete(&self, tenant: &TenantId, id: &LeadId) -> Result<bool, RepositoryError>;
    fn list(&self, tenant: &TenantId) -> Result<Vec<Lead>, RepositoryError>;
}

/// Storage for the two tenant singletons: the scoring configuration and the stage list.
/// `None` means the tenant has never saved one.
pub trait SettingsRepository: Send + Sync {
    fn scoring_config(&self, tenant: &TenantId) -> Result<Option<ScoringConfig>, RepositoryError>;
    fn save_scoring_config(
        &self,
        tenant: &TenantId,
        config: ScoringConfig,
    ) -> Result<(), RepositoryError>;
    fn stages(&self, tenant: &TenantId) -> Result<Option<Vec<PipelineStage>>, RepositoryError>;
    fn save_stages(
        &self,
        tenant: &TenantId,
        stages: Vec<PipelineStage>,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
