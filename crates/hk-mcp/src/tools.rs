//! Tool catalog and dispatch.
//!
//! Each tool decodes its JSON arguments into a typed request, calls the API
//! client and renders the result as pretty-printed JSON text.

use hk_api::{
    ApiError, Client, NewTimeEntry, TimeEntryPatch, TimeEntryQuery, TimerStart, TimerStop,
    Transport,
};
use hk_core::CatalogItem;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Tool invocation errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool with this name exists.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The arguments did not match the tool's input schema.
    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The result could not be rendered.
    #[error("failed to render result: {0}")]
    Render(#[source] serde_json::Error),
}

/// Static description of one tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    input_schema: fn() -> Value,
}

impl ToolSpec {
    pub fn input_schema(&self) -> Value {
        (self.input_schema)()
    }

    /// The `tools/list` entry for this tool.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "title": self.title,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

/// JSON schema of an argument type, as advertised in `tools/list`.
fn schema_of<A: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(A))
        .unwrap_or_else(|_| json!({"type": "object"}));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
    }
    schema
}

#[derive(Debug, Deserialize, JsonSchema)]
struct IdArgs {
    id: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateArgs {
    id: i64,
    #[serde(flatten)]
    patch: TimeEntryPatch,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct UserArgs {
    #[serde(default)]
    user_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FindProjectsArgs {
    /// Case-insensitive name substring.
    name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FindTasksArgs {
    /// Case-insensitive name substring.
    name: String,
    #[serde(default)]
    project_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DateRangeArgs {
    /// First day, yyyy-mm-dd.
    start_date: String,
    /// Last day, yyyy-mm-dd (inclusive).
    end_date: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DayArgs {
    /// yyyy-mm-dd
    date: String,
    #[serde(default)]
    project_id: Option<i64>,
    #[serde(default)]
    task_id: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct NoArgs {}

/// Every tool, in listing order.
pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_time_entries",
        title: "List time entries",
        description: "List time entries in a date range (yyyy-mm-dd). Optional filters by project_id/task_id/user_id.",
        input_schema: schema_of::<TimeEntryQuery>,
    },
    ToolSpec {
        name: "get_time_entry",
        title: "Get a time entry",
        description: "Fetch a single time entry by id.",
        input_schema: schema_of::<IdArgs>,
    },
    ToolSpec {
        name: "create_time_entry",
        title: "Create time entry",
        description: "Create a time entry. Times must be 'HH:mm' (24h). `task_id` required; `project_id` optional.",
        input_schema: schema_of::<NewTimeEntry>,
    },
    ToolSpec {
        name: "update_time_entry",
        title: "Update time entry",
        description: "PATCH fields on a time entry by id. Any subset of fields allowed.",
        input_schema: schema_of::<UpdateArgs>,
    },
    ToolSpec {
        name: "delete_time_entry",
        title: "Delete time entry (disabled)",
        description: "Deletion is disabled in this server to prevent accidental data loss.",
        input_schema: schema_of::<IdArgs>,
    },
    ToolSpec {
        name: "get_timer",
        title: "Get timer",
        description: "Read current timer.",
        input_schema: schema_of::<UserArgs>,
    },
    ToolSpec {
        name: "start_timer",
        title: "Start timer",
        description: "Start a timer (optional project/task and note).",
        input_schema: schema_of::<TimerStart>,
    },
    ToolSpec {
        name: "stop_timer",
        title: "Stop timer",
        description: "Stop the current timer (optionally set end_time HH:mm).",
        input_schema: schema_of::<TimerStop>,
    },
    ToolSpec {
        name: "find_projects",
        title: "Find projects",
        description: "Find projects by name substring. Returns id and name.",
        input_schema: schema_of::<FindProjectsArgs>,
    },
    ToolSpec {
        name: "find_tasks",
        title: "Find tasks",
        description: "Find tasks by name substring (optionally for a project). Returns id, name, project_id.",
        input_schema: schema_of::<FindTasksArgs>,
    },
    ToolSpec {
        name: "total_hours_in_period",
        title: "Total hours in period",
        description: "Sum durations for entries within [start_date, end_date]. Optional filters by project_id/task_id. Returns decimal hours (e.g., 12.5).",
        input_schema: schema_of::<TimeEntryQuery>,
    },
    ToolSpec {
        name: "hours_by_project",
        title: "Hours by project",
        description: "Group and sum durations by project for entries in [start_date, end_date] (yyyy-mm-dd). Output decimal hours per project.",
        input_schema: schema_of::<DateRangeArgs>,
    },
    ToolSpec {
        name: "hours_on_day",
        title: "Hours on day",
        description: "Sum durations for a single date (yyyy-mm-dd). Optional filters by project_id/task_id. Returns decimal hours.",
        input_schema: schema_of::<DayArgs>,
    },
    ToolSpec {
        name: "clear_catalog_cache",
        title: "Clear catalog cache",
        description: "Clears the in-memory cache for projects/tasks so subsequent lookups fetch fresh data.",
        input_schema: schema_of::<NoArgs>,
    },
];

/// Looks up a tool by name.
pub fn find(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|tool| tool.name == name)
}

/// The `tools/list` payload.
pub fn catalog() -> Value {
    json!({ "tools": TOOLS.iter().map(ToolSpec::to_json).collect::<Vec<_>>() })
}

#[derive(Debug, Serialize)]
struct ProjectHit {
    id: Option<i64>,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct TaskHit {
    id: Option<i64>,
    name: Option<String>,
    project_id: Option<i64>,
}

fn decode<A: DeserializeOwned>(tool: &'static str, arguments: Value) -> Result<A, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|source| ToolError::InvalidArguments { tool, source })
}

fn render(value: &impl Serialize) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(ToolError::Render)
}

/// Rate metadata suffix appended to entry listings.
fn rate_meta(rate: Option<&hk_api::RateInfo>) -> String {
    rate.map_or_else(String::new, |rate| {
        format!(
            " (rate remaining {}/{}, reset in {}s)",
            rate.remaining, rate.limit, rate.reset_seconds
        )
    })
}

/// Runs a tool and returns its text output.
pub async fn call<T: Transport>(
    client: &Client<T>,
    name: &str,
    arguments: Value,
) -> Result<String, ToolError> {
    let spec = find(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
    let tool = spec.name;
    tracing::debug!(tool, "calling tool");

    match tool {
        "list_time_entries" => {
            let query: TimeEntryQuery = decode(tool, arguments)?;
            let response = client.list_time_entries(&query).await?;
            render(&json!({
                "entries": response.data,
                "meta": rate_meta(response.rate.as_ref()),
            }))
        }
        "get_time_entry" => {
            let IdArgs { id } = decode(tool, arguments)?;
            render(&client.get_time_entry(id).await?.data)
        }
        "create_time_entry" => {
            let entry: NewTimeEntry = decode(tool, arguments)?;
            render(&client.create_time_entry(&entry).await?.data)
        }
        "update_time_entry" => {
            let UpdateArgs { id, patch } = decode(tool, arguments)?;
            render(&client.update_time_entry(id, &patch).await?.data)
        }
        "delete_time_entry" => {
            let IdArgs { id } = decode(tool, arguments)?;
            tracing::info!(id, "refused time entry deletion");
            Ok(format!(
                "Refused to delete time_entry {id}. Deletion is disabled in this MCP."
            ))
        }
        "get_timer" => {
            let UserArgs { user_id } = decode(tool, arguments)?;
            render(&client.get_timer(user_id).await?.data)
        }
        "start_timer" => {
            let start: TimerStart = decode(tool, arguments)?;
            render(&client.start_timer(&start).await?.data)
        }
        "stop_timer" => {
            let stop: TimerStop = decode(tool, arguments)?;
            render(&client.stop_timer(&stop).await?.data)
        }
        "find_projects" => {
            let FindProjectsArgs { name } = decode(tool, arguments)?;
            let hits: Vec<ProjectHit> = client
                .find_projects(&name)
                .await?
                .into_iter()
                .map(|CatalogItem { id, name, .. }| ProjectHit { id, name })
                .collect();
            render(&hits)
        }
        "find_tasks" => {
            let FindTasksArgs { name, project_id } = decode(tool, arguments)?;
            let hits: Vec<TaskHit> = client
                .find_tasks(&name, project_id)
                .await?
                .into_iter()
                .map(|CatalogItem { id, name, project_id }| TaskHit { id, name, project_id })
                .collect();
            render(&hits)
        }
        "total_hours_in_period" => {
            let query: TimeEntryQuery = decode(tool, arguments)?;
            let hours = client.total_hours_in_period(&query).await?;
            render(&json!({ "hours_decimal": hours }))
        }
        "hours_by_project" => {
            let DateRangeArgs {
                start_date,
                end_date,
            } = decode(tool, arguments)?;
            render(&client.hours_by_project(&start_date, &end_date).await?)
        }
        "hours_on_day" => {
            let DayArgs {
                date,
                project_id,
                task_id,
            } = decode(tool, arguments)?;
            let hours = client.hours_on_day(&date, project_id, task_id).await?;
            render(&json!({ "date": date, "hours_decimal": hours }))
        }
        "clear_catalog_cache" => {
            let NoArgs {} = decode(tool, arguments)?;
            client.clear_catalog_cache();
            Ok("Catalog cache cleared.".to_string())
        }
        _ => Err(ToolError::UnknownTool(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hk_api::ClientConfig;
    use hk_api::testing::MockTransport;
    use insta::assert_snapshot;

    fn client() -> Client<MockTransport> {
        let config = ClientConfig {
            token: Some("token".to_string()),
            base_url: "https://hakuna.test/api/v1".to_string(),
            ..ClientConfig::default()
        };
        Client::with_transport(config, MockTransport::new()).unwrap()
    }

    #[test]
    fn tool_names_are_unique_and_listed() {
        let names: Vec<_> = TOOLS.iter().map(|t| t.name).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert_snapshot!(names.join(","), @"list_time_entries,get_time_entry,create_time_entry,update_time_entry,delete_time_entry,get_timer,start_timer,stop_timer,find_projects,find_tasks,total_hours_in_period,hours_by_project,hours_on_day,clear_catalog_cache");
    }

    #[test]
    fn schemas_declare_required_fields() {
        let schema = find("create_time_entry").unwrap().input_schema();
        assert_eq!(
            schema["required"],
            json!(["date", "end_time", "start_time", "task_id"])
        );
        assert_eq!(schema["properties"]["task_id"]["type"], "integer");
        assert!(schema.get("$schema").is_none());

        let listed = catalog();
        assert_eq!(listed["tools"].as_array().unwrap().len(), TOOLS.len());
        for tool in listed["tools"].as_array().unwrap() {
            assert_eq!(tool["inputSchema"]["type"], "object", "{}", tool["name"]);
        }
    }

    #[test]
    fn update_schema_follows_patch_fields() {
        let schema = find("update_time_entry").unwrap().input_schema();
        assert_eq!(schema["required"], json!(["id"]));
        let mut properties: Vec<_> = schema["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        properties.sort();
        assert_eq!(
            properties,
            ["date", "end_time", "id", "note", "project_id", "start_time", "task_id"]
        );
    }

    #[test]
    fn day_schema_matches_decoder() {
        let schema = find("hours_on_day").unwrap().input_schema();
        assert_eq!(schema["required"], json!(["date"]));
        let args: DayArgs = decode("hours_on_day", json!({"date": "2025-05-02"})).unwrap();
        assert_eq!(args.date, "2025-05-02");
        assert_eq!(args.project_id, None);
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = call(&client(), "drop_tables", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "drop_tables"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_invalid() {
        let client = client();
        let err = call(&client, "hours_on_day", json!({"project_id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { tool: "hours_on_day", .. }));
        assert_eq!(client.transport().request_count(), 0);
    }

    #[tokio::test]
    async fn delete_is_refused_without_calling_the_api() {
        let client = client();
        let text = call(&client, "delete_time_entry", json!({"id": 42}))
            .await
            .unwrap();
        assert_snapshot!(text, @"Refused to delete time_entry 42. Deletion is disabled in this MCP.");
        assert_eq!(client.transport().request_count(), 0);
    }

    #[tokio::test]
    async fn list_time_entries_includes_rate_meta() {
        let client = client();
        client
            .transport()
            .push_json_with_rate(&json!([{"id": 1}]), 200, 150, 30);

        let text = call(
            &client,
            "list_time_entries",
            json!({"start_date": "2025-01-01", "end_date": "2025-01-07"}),
        )
        .await
        .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["entries"], json!([{"id": 1}]));
        assert_eq!(parsed["meta"], " (rate remaining 150/200, reset in 30s)");
    }

    #[tokio::test]
    async fn list_time_entries_without_rate_has_empty_meta() {
        let client = client();
        let text = call(
            &client,
            "list_time_entries",
            json!({"start_date": "2025-01-01", "end_date": "2025-01-07"}),
        )
        .await
        .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["meta"], "");
    }

    #[tokio::test]
    async fn update_sends_only_patched_fields() {
        let client = client();
        client.transport().push_json(&json!({"id": 5, "note": "new"}));

        call(&client, "update_time_entry", json!({"id": 5, "note": "new"}))
            .await
            .unwrap();
        let request = &client.transport().requests()[0];
        assert_eq!(request.url.path(), "/api/v1/time_entries/5");
        assert_eq!(request.body.as_deref(), Some(r#"{"note":"new"}"#));
    }

    #[tokio::test]
    async fn find_tasks_renders_hits() {
        let client = client();
        client.transport().push_json(&json!([
            {"id": 3, "name": "Code Review", "project_id": 9, "archived": false},
            {"id": 4, "name": "Support"}
        ]));

        let text = call(&client, "find_tasks", json!({"name": "review"}))
            .await
            .unwrap();
        assert_snapshot!(text, @r#"
        [
          {
            "id": 3,
            "name": "Code Review",
            "project_id": 9
          }
        ]
        "#);
    }

    #[tokio::test]
    async fn hours_on_day_renders_date_and_hours() {
        let client = client();
        client
            .transport()
            .push_json(&json!([{"start_time": "09:00", "end_time": "10:30"}]));

        let text = call(&client, "hours_on_day", json!({"date": "2025-05-02"}))
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"date": "2025-05-02", "hours_decimal": 1.5}));
    }

    #[tokio::test]
    async fn total_hours_of_empty_period_renders_zero() {
        let client = client();
        let text = call(
            &client,
            "total_hours_in_period",
            json!({"start_date": "2025-01-01", "end_date": "2025-01-31"}),
        )
        .await
        .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"hours_decimal": 0.0}));
    }

    #[tokio::test]
    async fn clear_catalog_cache_refetches() {
        let client = client();
        call(&client, "find_projects", json!({"name": "x"})).await.unwrap();
        call(&client, "find_projects", json!({"name": "y"})).await.unwrap();
        assert_eq!(client.transport().request_count(), 1);

        let text = call(&client, "clear_catalog_cache", Value::Null).await.unwrap();
        assert_eq!(text, "Catalog cache cleared.");

        call(&client, "find_projects", json!({"name": "x"})).await.unwrap();
        assert_eq!(client.transport().request_count(), 2);
    }

    #[tokio::test]
    async fn api_errors_pass_through() {
        let client = client();
        client.transport().push(403, "forbidden");
        let err = call(&client, "get_timer", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Hakuna 403: forbidden");
    }
}
