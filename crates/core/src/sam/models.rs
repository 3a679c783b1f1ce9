//! Wire types for the SAM.gov opportunities API.
//!
//! Every field the upstream may omit is an `Option` (or defaults to empty),
//! so a record with missing substructure deserializes cleanly instead of
//! failing the whole page. Nested place-of-performance and awardee values
//! occasionally arrive as non-object JSON; those use a lenient deserializer
//! that maps anything unexpected to `None`.

use serde::{Deserialize, Deserializer, Serialize};

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(rename = "opportunitiesData", default)]
    pub opportunities: Vec<Opportunity>,

    #[serde(rename = "totalRecords", default)]
    pub total_records: u64,
}

/// A single SAM.gov contract opportunity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Opportunity {
    pub notice_id: Option<String>,
    pub title: Option<String>,
    pub solicitation_number: Option<String>,

    /// Dot-delimited organization hierarchy, e.g.
    /// `"STATE, DEPARTMENT OF.STATE, DEPARTMENT OF.US EMBASSY BOGOTA"`.
    pub full_parent_path_name: Option<String>,
    pub full_parent_path_code: Option<String>,

    pub posted_date: Option<String>,
    #[serde(rename = "type")]
    pub notice_type: Option<String>,
    pub base_type: Option<String>,
    pub type_of_set_aside: Option<String>,
    #[serde(rename = "responseDeadLine")]
    pub response_deadline: Option<String>,
    pub naics_code: Option<String>,
    pub classification_code: Option<String>,
    pub active: Option<String>,
    pub organization_type: Option<String>,
    pub additional_info_link: Option<String>,
    pub ui_link: Option<String>,

    /// Link to the full description text, exposed as `DescriptionLink`.
    pub description: Option<String>,

    pub point_of_contact: Vec<PointOfContact>,
    pub place_of_performance: Option<PlaceOfPerformance>,
    pub award: Option<Award>,
    pub resource_links: Vec<String>,
}

/// A point-of-contact entry on an opportunity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointOfContact {
    /// Role tag, e.g. `"primary"` or `"secondary"`.
    #[serde(rename = "type")]
    pub contact_type: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
}

/// Place of performance; each sub-object may be absent or malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceOfPerformance {
    #[serde(deserialize_with = "object_or_none")]
    pub city: Option<NamedRef>,
    #[serde(deserialize_with = "object_or_none")]
    pub state: Option<NamedRef>,
    #[serde(deserialize_with = "object_or_none")]
    pub country: Option<NamedRef>,
}

/// A name-bearing sub-object (`{"code": ..., "name": ...}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedRef {
    pub code: Option<String>,
    pub name: Option<String>,
}

/// Award details, present only on awarded notices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Award {
    pub number: Option<String>,
    pub amount: Option<String>,
    pub date: Option<String>,
    #[serde(deserialize_with = "object_or_none")]
    pub awardee: Option<Awardee>,
}

/// Awardee details nested inside an award.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Awardee {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// Deserialize a nested value leniently: anything that is not a valid `T`
/// (a bare string, a number, `null`) becomes `None` instead of an error.
fn object_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
