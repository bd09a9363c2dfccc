use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::pipeline::domain::LeadField;
use crate::pipeline::error::PipelineError;

pub const MAX_FIELD_WEIGHT: i32 = 100;

/// How a rule compares its value against a lead attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleCondition {
    Equals,
    Contains,
    IsOneOf,
    IsNotEmpty,
}

impl RuleCondition {
    pub const fn label(self) -> &'static str {
        match self {
            RuleCondition::Equals => "equals",
            RuleCondition::Contains => "contains",
            RuleCondition::IsOneOf => "is one of",
            RuleCondition::IsNotEmpty => "is not empty",
        }
    }
}

/// A rule operand: a single string or a list of candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Text(String),
    List(Vec<String>),
}

impl Default for RuleValue {
    fn default() -> Self {
        RuleValue::Text(String::new())
    }
}

impl RuleValue {
    pub(crate) const fn shape(&self) -> &'static str {
        match self {
            RuleValue::Text(_) => "a string",
            RuleValue::List(_) => "a list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRule {
    pub id: String,
    pub condition: RuleCondition,
    #[serde(default)]
    pub value: RuleValue,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringFieldConfig {
    pub field_name: LeadField,
    #[serde(default)]
    pub label: String,
    pub is_active: bool,
    pub weight: i32,
    #[serde(default)]
    pub rules: Vec<ScoringRule>,
}

impl ScoringFieldConfig {
    /// Whether the field takes part in aggregation at all.
    pub fn participates(&self) -> bool {
        self.is_active && self.weight > 0
    }
}

/// Tenant scoring configuration. Replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    pub fields: Vec<ScoringFieldConfig>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fields: vec![
                field(
                    LeadField::Status,
                    40,
                    true,
                    vec![
                        rule("status-won", RuleCondition::Equals, text("won"), 20),
                        rule("status-proposal", RuleCondition::Equals, text("proposal"), 15),
                        rule("status-qualified", RuleCondition::Equals, text("qualified"), 10),
                        rule("status-contacted", RuleCondition::Equals, text("contacted"), 5),
                        rule("status-new", RuleCondition::Equals, text("new"), 2),
                    ],
                ),
                field(
                    LeadField::Designation,
                    25,
                    true,
                    vec![
                        rule(
                            "designation-executive",
                            RuleCondition::IsOneOf,
                            list(&["CEO", "CTO", "CFO", "COO", "Founder", "Owner"]),
                            10,
                        ),
                        rule(
                            "designation-director",
                            RuleCondition::Contains,
                            text("director"),
                            7,
                        ),
                        rule(
                            "designation-manager",
                            RuleCondition::Contains,
                            text("manager"),
                            4,
                        ),
                    ],
                ),
                field(
                    LeadField::Industry,
                    20,
                    true,
                    vec![rule(
                        "industry-priority",
                        RuleCondition::IsOneOf,
                        list(&["Technology", "Software", "Finance", "Healthcare"]),
                        10,
                    )],
                ),
                field(
                    LeadField::Category,
                    10,
                    true,
                    vec![
                        rule("category-enterprise", RuleCondition::Equals, text("enterprise"), 10),
                        rule("category-mid-market", RuleCondition::Equals, text("mid-market"), 6),
                        rule("category-smb", RuleCondition::Equals, text("smb"), 3),
                    ],
                ),
                field(
                    LeadField::Location,
                    5,
                    true,
                    vec![rule(
                        "location-known",
                        RuleCondition::IsNotEmpty,
                        RuleValue::default(),
                        2,
                    )],
                ),
                field(
                    LeadField::Source,
                    0,
                    false,
                    vec![rule("source-referral", RuleCondition::Equals, text("referral"), 10)],
                ),
                field(LeadField::Company, 0, false, Vec::new()),
            ],
        }
    }
}

impl ScoringConfig {
    /// Structural checks run before a configuration replaces the current one.
    ///
    /// A rule whose value has the wrong shape for its condition is accepted here; the
    /// evaluator reports it as a warning and treats it as a non-match.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut seen_fields = HashSet::new();

        for (index, field) in self.fields.iter().enumerate() {
            let path = format!("fields[{index}]");

            if !seen_fields.insert(field.field_name) {
                return Err(PipelineError::validation(
                    format!("{path}.fieldName"),
                    format!("'{}' is configured more than once", field.field_name),
                ));
            }

            if !(0..=MAX_FIELD_WEIGHT).contains(&field.weight) {
                return Err(PipelineError::validation(
                    format!("{path}.weight"),
                    format!(
                        "weight {} must be between 0 and {MAX_FIELD_WEIGHT}",
                        field.weight
                    ),
                ));
            }

            let mut seen_rules = HashSet::new();
            for (rule_index, rule) in field.rules.iter().enumerate() {
                let rule_path = format!("{path}.rules[{rule_index}]");
                let id = rule.id.trim();
                if id.is_empty() {
                    return Err(PipelineError::validation(
                        format!("{rule_path}.id"),
                        "rule id is required",
                    ));
                }
                if !seen_rules.insert(id) {
                    return Err(PipelineError::validation(
                        format!("{rule_path}.id"),
                        format!("rule id '{id}' is duplicated within '{}'", field.field_name),
                    ));
                }
                validate_rule_value(rule, &rule_path)?;
            }
        }

        Ok(())
    }

    pub fn field(&self, name: LeadField) -> Option<&ScoringFieldConfig> {
        self.fields.iter().find(|field| field.field_name == name)
    }

    /// Fills in missing labels from the field catalogue.
    pub(crate) fn with_default_labels(mut self) -> Self {
        for field in &mut self.fields {
            if field.label.trim().is_empty() {
                field.label = field.field_name.label().to_string();
            }
        }
        self
    }
}

fn validate_rule_value(rule: &ScoringRule, rule_path: &str) -> Result<(), PipelineError> {
    let empty = match (rule.condition, &rule.value) {
        (RuleCondition::IsNotEmpty, _) => false,
        (RuleCondition::IsOneOf, RuleValue::List(values)) => {
            values.iter().all(|value| value.trim().is_empty())
        }
        (RuleCondition::Equals | RuleCondition::Contains, RuleValue::Text(value)) => {
            value.trim().is_empty()
        }
        _ => false,
    };

    if empty {
        return Err(PipelineError::validation(
            format!("{rule_path}.value"),
            format!("'{}' requires a non-empty value", rule.condition.label()),
        ));
    }
    Ok(())
}

fn field(
    field_name: LeadField,
    weight: i32,
    is_active: bool,
    rules: Vec<ScoringRule>,
) -> ScoringFieldConfig {
    ScoringFieldConfig {
        field_name,
        label: field_name.label().to_string(),
        is_active,
        weight,
        rules,
    }
}

fn rule(id: &str, condition: RuleCondition, value: RuleValue, points: i32) -> ScoringRule {
    ScoringRule {
        id: id.to_string(),
        condition,
        value,
        points,
    }
}

fn text(value: &str) -> RuleValue {
    RuleValue::Text(value.to_string())
}

fn list(values: &[&str]) -> RuleValue {
    RuleValue::List(values.iter().map(|value| value.to_string()).collect())
}
