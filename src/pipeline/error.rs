use serde::Serialize;

use super::domain::LeadId;
use super::repository::RepositoryError;

/// Errors that abort a single pipeline operation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} '{id}' already exists")]
    Conflict { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("invalid lead import: {0}")]
    Import(#[from] csv::Error),
}

impl PipelineError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Category of a non-fatal problem met while scoring or rescanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A rule value did not have the shape its condition expects.
    MalformedRule,
    /// A rescored lead could not be written back.
    PersistFailed,
    /// A deleted stage had no usable fallback, so its leads kept their status.
    FallbackUnavailable,
}

/// Non-fatal problem recorded during scoring. Warnings are logged and reported but never
/// abort the batch they occur in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<LeadId>,
    pub kind: WarningKind,
    pub detail: String,
}

impl ComputationWarning {
    pub(crate) fn new(lead_id: Option<LeadId>, kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            lead_id,
            kind,
            detail: detail.into(),
        }
    }
}
