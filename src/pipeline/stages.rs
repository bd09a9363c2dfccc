use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::PipelineError;

/// A step in the sales pipeline. `id` is the value stored in `Lead::status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub id: String,
    pub name: String,
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStage {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOrder {
    pub id: String,
    pub order: i32,
}

/// Ordered stage set for one tenant. Mutations work on a copy so a failed operation
/// leaves the stored registry untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageRegistry {
    stages: Vec<PipelineStage>,
}

impl StageRegistry {
    pub fn new(mut stages: Vec<PipelineStage>) -> Self {
        stages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Self { stages }
    }

    /// Stages seeded for a tenant that has never configured its pipeline.
    pub fn standard() -> Self {
        let seed = [
            ("New", "#64748b"),
            ("Contacted", "#0ea5e9"),
            ("Qualified", "#8b5cf6"),
            ("Proposal", "#f59e0b"),
            ("Won", "#22c55e"),
            ("Lost", "#ef4444"),
        ];
        let stages = seed
            .iter()
            .enumerate()
            .map(|(index, (name, color))| PipelineStage {
                id: slugify(name),
                name: (*name).to_string(),
                order: index as i32,
                color: Some((*color).to_string()),
            })
            .collect();
        Self { stages }
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<PipelineStage> {
        self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&PipelineStage> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    /// Finds the stage a client-supplied status refers to: the id itself, the id its
    /// slug would produce, or a stage name in any case.
    pub fn resolve(&self, raw: &str) -> Option<&PipelineStage> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let slug = slugify(raw);
        self.get(raw)
            .or_else(|| self.get(&slug))
            .or_else(|| {
                self.stages
                    .iter()
                    .find(|stage| stage.name.eq_ignore_ascii_case(raw))
            })
    }

    /// Stage with the lowest order; deleted stages hand their leads to it.
    pub fn fallback(&self) -> Option<&PipelineStage> {
        self.stages.first()
    }

    pub fn add(&mut self, new_stage: NewStage) -> Result<PipelineStage, PipelineError> {
        let name = new_stage.name.trim();
        if name.is_empty() {
            return Err(PipelineError::validation("name", "stage name is required"));
        }

        let id = slugify(name);
        if id.is_empty() {
            return Err(PipelineError::validation(
                "name",
                format!("'{name}' does not produce a usable stage id"),
            ));
        }
        if self.contains(&id) {
            return Err(PipelineError::Conflict {
                entity: "stage",
                id,
            });
        }

        let order = self
            .stages
            .iter()
            .map(|stage| stage.order)
            .max()
            .map_or(0, |max| max + 1);
        let stage = PipelineStage {
            id,
            name: name.to_string(),
            order,
            color: normalize_color(new_stage.color),
        };
        self.stages.push(stage.clone());
        Ok(stage)
    }

    pub fn update(&mut self, id: &str, update: StageUpdate) -> Result<PipelineStage, PipelineError> {
        let name = match update.name {
            Some(name) if name.trim().is_empty() => {
                return Err(PipelineError::validation("name", "stage name cannot be empty"))
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        let stage = self
            .stages
            .iter_mut()
            .find(|stage| stage.id == id)
            .ok_or_else(|| PipelineError::not_found("stage", id))?;

        if let Some(name) = name {
            stage.name = name;
        }
        if let Some(color) = update.color {
            stage.color = normalize_color(Some(color));
        }
        Ok(stage.clone())
    }

    /// Applies the requested orders and renumbers the registry `0..n`. Returns how many
    /// entries referenced a known stage.
    pub fn reorder(&mut self, entries: &[StageOrder]) -> Result<usize, PipelineError> {
        let mut matched = 0;
        for entry in entries {
            match self.stages.iter_mut().find(|stage| stage.id == entry.id) {
                Some(stage) => {
                    stage.order = entry.order;
                    matched += 1;
                }
                None => warn!(stage_id = %entry.id, "ignoring reorder entry for unknown stage"),
            }
        }

        if matched == 0 {
            return Err(PipelineError::validation(
                "stages",
                "no reorder entry referenced an existing stage",
            ));
        }

        // Stable sort keeps the previous relative order for tied requests.
        self.stages.sort_by_key(|stage| stage.order);
        for (index, stage) in self.stages.iter_mut().enumerate() {
            stage.order = index as i32;
        }
        Ok(matched)
    }

    pub fn remove(&mut self, id: &str) -> Result<PipelineStage, PipelineError> {
        let index = self
            .stages
            .iter()
            .position(|stage| stage.id == id)
            .ok_or_else(|| PipelineError::not_found("stage", id))?;
        Ok(self.stages.remove(index))
    }
}

/// Lowercase ASCII alphanumerics joined by single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Whether `id` could have been produced by [`slugify`].
pub fn is_valid_stage_id(id: &str) -> bool {
    !id.is_empty() && slugify(id) == id
}

fn normalize_color(color: Option<String>) -> Option<String> {
    color
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
