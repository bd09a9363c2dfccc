//! Lead scoring and pipeline-stage consistency.
//!
//! Every tenant owns one scoring configuration, one ordered stage list, and a lead book.
//! The service keeps each stored lead's cached score and status consistent with the other
//! two whenever either changes.

pub mod domain;
pub mod error;
pub(crate) mod import;
pub mod memory;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod stages;

#[cfg(test)]
mod tests;

pub use domain::{Lead, LeadDraft, LeadField, LeadId, LeadUpdate, TenantId};
pub use error::{ComputationWarning, PipelineError, WarningKind};
pub use memory::{InMemoryLeadRepository, InMemorySettingsRepository};
pub use repository::{LeadRepository, RepositoryError, SettingsRepository};
pub use router::pipeline_router;
pub use scoring::{
    aggregate, score_card, FieldContribution, RuleCondition, RuleValue, ScoreCard,
    ScoringConfig, ScoringFieldConfig, ScoringRule,
};
pub use service::{
    ConfigReplacement, ImportRejection, ImportReport, LeadPipelineService, RescanReport,
    StageDeletion,
};
pub use stages::{NewStage, PipelineStage, StageOrder, StageRegistry, StageUpdate};
