//! Lenient views over time entries and catalog items returned by the API.
//!
//! The remote records carry many fields this crate never reads. Each view
//! extracts only the handful of fields aggregation needs; unknown fields are
//! ignored and a field holding the wrong JSON type is treated as absent, so a
//! surprising record never fails deserialization.

use serde::Deserialize;
use serde_json::Value;

/// Field names that may carry an explicit duration in minutes, in lookup order.
pub const MINUTE_FIELDS: [&str; 3] = ["duration_minutes", "duration_in_minutes", "minutes"];

/// The project a time entry is booked against, as far as the entry says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: Option<i64>,
    pub name: Option<String>,
}

/// The parts of a time entry that aggregation reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct TimeEntry {
    /// Explicit durations in [`MINUTE_FIELDS`] order; `None` when absent or not a number.
    pub minute_fields: [Option<f64>; 3],
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub project: ProjectRef,
}

impl TimeEntry {
    /// Builds a view over a raw JSON record.
    pub fn from_value(value: &Value) -> Self {
        let minute_fields = MINUTE_FIELDS.map(|field| value.get(field).and_then(finite_number));

        let nested = value.get("project");
        let id = value
            .get("project_id")
            .and_then(as_id)
            .or_else(|| nested.and_then(|p| p.get("id")).and_then(as_id));
        let name = nested
            .and_then(|p| p.get("name"))
            .and_then(non_empty_str)
            .or_else(|| value.get("project_name").and_then(non_empty_str));

        Self {
            minute_fields,
            start_time: value.get("start_time").and_then(Value::as_str).map(String::from),
            end_time: value.get("end_time").and_then(Value::as_str).map(String::from),
            project: ProjectRef { id, name },
        }
    }

    /// Views every element of a response body; a non-array body yields no entries.
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        value
            .as_array()
            .map(|items| items.iter().map(Self::from_value).collect())
            .unwrap_or_default()
    }
}

impl From<Value> for TimeEntry {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

/// A project or task from the catalog endpoints. Only the identifying
/// fields are read; anything else on the record is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct CatalogItem {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub project_id: Option<i64>,
}

impl CatalogItem {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: value.get("id").and_then(as_id),
            name: value.get("name").and_then(Value::as_str).map(String::from),
            project_id: value.get("project_id").and_then(as_id),
        }
    }

    /// Case-insensitive substring match on the item name. Items without a
    /// name only match the empty query.
    pub fn name_contains(&self, query: &str) -> bool {
        let name = self.name.as_deref().unwrap_or_default().to_lowercase();
        name.contains(&query.to_lowercase())
    }
}

impl From<Value> for CatalogItem {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

fn finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

/// Ids arrive as JSON numbers, occasionally as numeric strings.
#[allow(clippy::cast_possible_truncation)]
fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn time_entry_reads_known_fields_and_ignores_the_rest() {
        let entry: TimeEntry = serde_json::from_value(json!({
            "id": 7,
            "duration_in_minutes": 45,
            "start_time": "09:00",
            "end_time": "09:45",
            "project": {"id": 3, "name": "Website"},
            "note": "standup",
            "billable": true
        }))
        .unwrap();

        assert_eq!(entry.minute_fields, [None, Some(45.0), None]);
        assert_eq!(entry.start_time.as_deref(), Some("09:00"));
        assert_eq!(entry.project.id, Some(3));
        assert_eq!(entry.project.name.as_deref(), Some("Website"));
    }

    #[test]
    fn time_entry_treats_wrong_types_as_absent() {
        let entry = TimeEntry::from_value(&json!({
            "duration_minutes": "90",
            "start_time": 900,
            "project_id": {"nested": true}
        }));

        assert_eq!(entry.minute_fields, [None, None, None]);
        assert_eq!(entry.start_time, None);
        assert_eq!(entry.project, ProjectRef::default());
    }

    #[test]
    fn time_entry_prefers_flat_project_id_and_nested_name() {
        let entry = TimeEntry::from_value(&json!({
            "project_id": 1,
            "project": {"id": 2, "name": "Nested"},
            "project_name": "Flat"
        }));
        assert_eq!(entry.project.id, Some(1));
        assert_eq!(entry.project.name.as_deref(), Some("Nested"));

        let entry = TimeEntry::from_value(&json!({"project_name": "Flat", "project": {"name": ""}}));
        assert_eq!(entry.project.name.as_deref(), Some("Flat"));
    }

    #[test]
    fn list_from_non_array_is_empty() {
        assert!(TimeEntry::list_from_value(&json!({"error": "nope"})).is_empty());
        assert_eq!(TimeEntry::list_from_value(&json!([{}, {}])).len(), 2);
    }

    #[test]
    fn catalog_item_accepts_string_ids() {
        let item = CatalogItem::from_value(&json!({"id": "12", "name": "Design", "project_id": 4}));
        assert_eq!(item.id, Some(12));
        assert_eq!(item.project_id, Some(4));
    }

    #[test]
    fn catalog_item_keeps_only_known_fields() {
        let item: CatalogItem = serde_json::from_value(json!({
            "id": 9,
            "name": "Support",
            "archived": true,
            "color": "#ff0000",
            "project_id": "not a number"
        }))
        .unwrap();
        assert_eq!(
            item,
            CatalogItem {
                id: Some(9),
                name: Some("Support".to_string()),
                project_id: None,
            }
        );
    }

    #[test]
    fn catalog_item_name_match_is_case_insensitive() {
        let item = CatalogItem::from_value(&json!({"id": 1, "name": "Internal Tooling"}));
        assert!(item.name_contains("tool"));
        assert!(item.name_contains("INTERNAL"));
        assert!(!item.name_contains("website"));

        let unnamed = CatalogItem::from_value(&json!({"id": 2}));
        assert!(!unnamed.name_contains("x"));
        assert!(unnamed.name_contains(""));
    }
}
