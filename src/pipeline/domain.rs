use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Organization that owns a scoring configuration, a stage list, and a lead book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for stored leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Categorical lead attributes that a scoring field may reference. An unknown
/// `fieldName` fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadField {
    Status,
    Category,
    Location,
    #[serde(alias = "title")]
    Designation,
    Industry,
    Company,
    Source,
}

impl LeadField {
    pub const ALL: [LeadField; 7] = [
        LeadField::Status,
        LeadField::Category,
        LeadField::Location,
        LeadField::Designation,
        LeadField::Industry,
        LeadField::Company,
        LeadField::Source,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            LeadField::Status => "status",
            LeadField::Category => "category",
            LeadField::Location => "location",
            LeadField::Designation => "designation",
            LeadField::Industry => "industry",
            LeadField::Company => "company",
            LeadField::Source => "source",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LeadField::Status => "Pipeline Stage",
            LeadField::Category => "Category",
            LeadField::Location => "Location",
            LeadField::Designation => "Designation",
            LeadField::Industry => "Industry",
            LeadField::Company => "Company",
            LeadField::Source => "Lead Source",
        }
    }
}

impl fmt::Display for LeadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored lead. `score` is a cache of the aggregate under the tenant's current
/// configuration and is never accepted from callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub score: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Raw attribute value behind a scoring field, if the lead carries one.
    pub fn field(&self, field: LeadField) -> Option<&str> {
        match field {
            LeadField::Status => Some(self.status.as_str()),
            LeadField::Category => self.category.as_deref(),
            LeadField::Location => self.location.as_deref(),
            LeadField::Designation => self.designation.as_deref(),
            LeadField::Industry => self.industry.as_deref(),
            LeadField::Company => self.company.as_deref(),
            LeadField::Source => self.source.as_deref(),
        }
    }

    pub(crate) fn from_draft(
        id: LeadId,
        draft: LeadDraft,
        status: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            email: normalize(draft.email),
            phone: normalize(draft.phone),
            company: normalize(draft.company),
            status,
            category: normalize(draft.category),
            location: normalize(draft.location),
            designation: normalize(draft.designation),
            industry: normalize(draft.industry),
            source: normalize(draft.source),
            score: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn apply(&mut self, update: LeadUpdate) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(status) = update.status {
            self.status = status.trim().to_string();
        }
        let optional = [
            (&mut self.email, update.email),
            (&mut self.phone, update.phone),
            (&mut self.company, update.company),
            (&mut self.category, update.category),
            (&mut self.location, update.location),
            (&mut self.designation, update.designation),
            (&mut self.industry, update.industry),
            (&mut self.source, update.source),
        ];
        for (slot, value) in optional {
            if let Some(value) = value {
                *slot = normalize(Some(value));
            }
        }
    }
}

/// Payload accepted when creating a lead. Unknown keys, including any client supplied
/// `score`, are dropped during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "title")]
    pub designation: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Partial update. `Some("")` clears an optional attribute; `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "title")]
    pub designation: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
