use super::config::{RuleCondition, RuleValue};

/// Raised when a rule's value does not have the shape its condition needs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{label}' expects {expected}, rule carries {found}", label = .condition.label())]
pub struct RuleValueMismatch {
    pub condition: RuleCondition,
    pub expected: &'static str,
    pub found: &'static str,
}

/// Evaluates one condition against a lead attribute. Comparisons ignore case.
///
/// Callers only pass values that are present and not blank.
pub fn evaluate(
    condition: RuleCondition,
    rule_value: &RuleValue,
    field_value: &str,
) -> Result<bool, RuleValueMismatch> {
    match (condition, rule_value) {
        (RuleCondition::IsNotEmpty, _) => Ok(!field_value.is_empty()),
        (RuleCondition::Equals, RuleValue::Text(expected)) => {
            Ok(field_value.to_lowercase() == expected.to_lowercase())
        }
        (RuleCondition::Contains, RuleValue::Text(needle)) => Ok(field_value
            .to_lowercase()
            .contains(&needle.to_lowercase())),
        (RuleCondition::IsOneOf, RuleValue::List(candidates)) => {
            let value = field_value.to_lowercase();
            Ok(candidates
                .iter()
                .any(|candidate| candidate.to_lowercase() == value))
        }
        (RuleCondition::IsOneOf, found) => Err(RuleValueMismatch {
            condition,
            expected: "a list",
            found: found.shape(),
        }),
        (RuleCondition::Equals | RuleCondition::Contains, found) => Err(RuleValueMismatch {
            condition,
            expected: "a string",
            found: found.shape(),
        }),
    }
}
