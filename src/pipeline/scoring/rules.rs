use tracing::warn;

use super::condition::evaluate;
use super::config::ScoringFieldConfig;
use crate::pipeline::domain::Lead;
use crate::pipeline::error::{ComputationWarning, WarningKind};

pub(crate) struct FieldEvaluation {
    pub points: i64,
    pub matched_rules: Vec<String>,
    pub warnings: Vec<ComputationWarning>,
}

/// Raw points a lead earns on one field: the sum over every matching rule.
///
/// Inactive or zero-weight fields score 0; the aggregator also leaves them out of the
/// normalization.
pub fn score_field(field: &ScoringFieldConfig, lead: &Lead) -> i64 {
    if !field.participates() {
        return 0;
    }
    evaluate_field(field, lead).points
}

/// Largest single-rule award on a field, floored at zero.
pub fn max_field_points(field: &ScoringFieldConfig) -> i64 {
    field
        .rules
        .iter()
        .map(|rule| i64::from(rule.points))
        .max()
        .unwrap_or(0)
        .max(0)
}

pub(crate) fn evaluate_field(field: &ScoringFieldConfig, lead: &Lead) -> FieldEvaluation {
    let mut evaluation = FieldEvaluation {
        points: 0,
        matched_rules: Vec::new(),
        warnings: Vec::new(),
    };

    let value = match lead.field(field.field_name) {
        Some(value) if !value.trim().is_empty() => value,
        _ => return evaluation,
    };

    for rule in &field.rules {
        match evaluate(rule.condition, &rule.value, value) {
            Ok(true) => {
                evaluation.points += i64::from(rule.points);
                evaluation.matched_rules.push(rule.id.clone());
            }
            Ok(false) => {}
            Err(mismatch) => {
                warn!(
                    lead_id = %lead.id,
                    field = %field.field_name,
                    rule_id = %rule.id,
                    error = %mismatch,
                    "skipping malformed scoring rule"
                );
                evaluation.warnings.push(ComputationWarning::new(
                    Some(lead.id.clone()),
                    WarningKind::MalformedRule,
                    format!("{}.{}: {}", field.field_name, rule.id, mismatch),
                ));
            }
        }
    }

    evaluation
}
