//! Request payloads for the time entry and timer endpoints.
//!
//! Dates are `yyyy-mm-dd` and times are 24-hour `HH:mm`; both are passed
//! through to the API as given. Each payload also describes itself as a JSON
//! schema so tool catalogs can advertise exactly what they accept.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::client::Query;

/// Filters for `GET /time_entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeEntryQuery {
    /// First day, yyyy-mm-dd.
    pub start_date: String,
    /// Last day, yyyy-mm-dd (inclusive).
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl TimeEntryQuery {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
            ..Self::default()
        }
    }

    /// A query covering the single day `date`.
    pub fn day(date: impl Into<String>) -> Self {
        let date = date.into();
        Self::new(date.clone(), date)
    }

    pub fn to_query(&self) -> Query {
        Query::new()
            .param("start_date", &self.start_date)
            .param("end_date", &self.end_date)
            .opt("project_id", self.project_id)
            .opt("task_id", self.task_id)
            .opt("user_id", self.user_id)
    }
}

/// Body of `POST /time_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NewTimeEntry {
    /// yyyy-mm-dd
    pub date: String,
    /// HH:mm (24h)
    pub start_time: String,
    /// HH:mm (24h)
    pub end_time: String,
    pub task_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

/// Body of `PATCH /time_entries/:id`. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeEntryPatch {
    /// yyyy-mm-dd
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// HH:mm (24h)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// HH:mm (24h)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Body of `POST /timer`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimerStart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Query of `PUT /timer`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimerStop {
    /// HH:mm (24h)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl TimerStop {
    pub fn to_query(&self) -> Query {
        Query::new()
            .opt("end_time", self.end_time.as_deref())
            .opt("user_id", self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = TimeEntryPatch {
            note: Some("review".to_string()),
            end_time: Some("12:15".to_string()),
            ..TimeEntryPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"end_time": "12:15", "note": "review"})
        );
    }

    #[test]
    fn new_entry_requires_task_id() {
        let parsed: Result<NewTimeEntry, _> = serde_json::from_value(json!({
            "date": "2025-03-03",
            "start_time": "09:00",
            "end_time": "10:00"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn day_query_uses_date_for_both_bounds() {
        let query = TimeEntryQuery::day("2025-03-03");
        assert_eq!(query.start_date, "2025-03-03");
        assert_eq!(query.end_date, "2025-03-03");
    }

    #[test]
    fn new_entry_schema_lists_required_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(NewTimeEntry)).unwrap();
        assert_eq!(
            schema["required"],
            json!(["date", "end_time", "start_time", "task_id"])
        );
        assert_eq!(schema["properties"]["task_id"]["type"], "integer");
        assert_eq!(schema["properties"]["date"]["description"], "yyyy-mm-dd");
    }
}
