use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::domain::LeadDraft;

/// A parsed CSV row with its 1-based position among the data rows.
#[derive(Debug)]
pub(crate) struct ImportedRow {
    pub(crate) row: usize,
    pub(crate) draft: LeadDraft,
}

/// Reads lead rows from a headed CSV export. A `Score` column, if present, is ignored.
pub(crate) fn parse_leads<R: Read>(reader: R) -> Result<Vec<ImportedRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<LeadRow>().enumerate() {
        let row = record?;
        rows.push(ImportedRow {
            row: index + 1,
            draft: row.into_draft(),
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct LeadRow {
    #[serde(
        rename = "Name",
        alias = "name",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    name: Option<String>,
    #[serde(
        rename = "Email",
        alias = "email",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    email: Option<String>,
    #[serde(
        rename = "Phone",
        alias = "phone",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    phone: Option<String>,
    #[serde(
        rename = "Company",
        alias = "company",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    company: Option<String>,
    #[serde(
        rename = "Status",
        alias = "status",
        alias = "Stage",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    status: Option<String>,
    #[serde(
        rename = "Category",
        alias = "category",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    category: Option<String>,
    #[serde(
        rename = "Location",
        alias = "location",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    location: Option<String>,
    #[serde(
        rename = "Designation",
        alias = "designation",
        alias = "Title",
        alias = "title",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    designation: Option<String>,
    #[serde(
        rename = "Industry",
        alias = "industry",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    industry: Option<String>,
    #[serde(
        rename = "Source",
        alias = "source",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    source: Option<String>,
}

impl LeadRow {
    fn into_draft(self) -> LeadDraft {
        LeadDraft {
            name: self.name.unwrap_or_default(),
            email: self.email,
            phone: self.phone,
            company: self.company,
            status: self.status,
            category: self.category,
            location: self.location,
            designation: self.designation,
            industry: self.industry,
            source: self.source,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
