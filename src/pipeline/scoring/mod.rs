//! Weighted rule scoring for leads.
//!
//! A lead's score is the weighted sum of its field points divided by the weighted sum of
//! the best single-rule award on each field, scaled to 0..=100.

mod condition;
mod config;
mod rules;

pub use condition::{evaluate, RuleValueMismatch};
pub use config::{
    RuleCondition, RuleValue, ScoringConfig, ScoringFieldConfig, ScoringRule, MAX_FIELD_WEIGHT,
};
pub use rules::{max_field_points, score_field};

use serde::Serialize;

use super::domain::{Lead, LeadField, LeadId};
use super::error::ComputationWarning;
use rules::evaluate_field;

/// One field's share of a lead's score, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldContribution {
    pub field: LeadField,
    pub label: String,
    pub weight: i32,
    pub points: i64,
    pub max_points: i64,
    pub weighted_points: f64,
    pub matched_rules: Vec<String>,
}

/// Score with the intermediate sums that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub lead_id: LeadId,
    pub score: u8,
    pub total_active_weight: i64,
    pub weighted_score: f64,
    pub max_weighted_score: f64,
    pub fields: Vec<FieldContribution>,
    pub warnings: Vec<ComputationWarning>,
}

/// Normalized 0..=100 score of `lead` under `config`.
pub fn aggregate(lead: &Lead, config: &ScoringConfig) -> u8 {
    score_card(lead, config).score
}

pub fn score_card(lead: &Lead, config: &ScoringConfig) -> ScoreCard {
    let mut weighted_score = 0.0_f64;
    let mut max_weighted_score = 0.0_f64;
    let mut total_active_weight = 0_i64;
    let mut fields = Vec::new();
    let mut warnings = Vec::new();

    for field in config.fields.iter().filter(|field| field.participates()) {
        let share = f64::from(field.weight) / 100.0;
        let evaluation = evaluate_field(field, lead);
        let max_points = max_field_points(field);

        let weighted_points = evaluation.points as f64 * share;
        weighted_score += weighted_points;
        max_weighted_score += max_points as f64 * share;
        total_active_weight += i64::from(field.weight);

        fields.push(FieldContribution {
            field: field.field_name,
            label: field.label.clone(),
            weight: field.weight,
            points: evaluation.points,
            max_points,
            weighted_points,
            matched_rules: evaluation.matched_rules,
        });
        warnings.extend(evaluation.warnings);
    }

    ScoreCard {
        lead_id: lead.id.clone(),
        score: normalize(weighted_score, max_weighted_score),
        total_active_weight,
        weighted_score,
        max_weighted_score,
        fields,
        warnings,
    }
}

fn normalize(weighted_score: f64, max_weighted_score: f64) -> u8 {
    let raw = if max_weighted_score > 0.0 {
        weighted_score / max_weighted_score * 100.0
    } else {
        0.0
    };

    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}
