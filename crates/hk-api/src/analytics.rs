//! Hour totals computed from fetched time entries.

use hk_core::{ProjectBreakdown, ProjectHours, TimeEntry, total_hours};

use crate::client::Client;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::TimeEntryQuery;

impl<T: Transport> Client<T> {
    /// Fetches entries and views them for aggregation. A non-array response
    /// yields no entries.
    pub async fn time_entries(&self, query: &TimeEntryQuery) -> Result<Vec<TimeEntry>, ApiError> {
        let response = self.list_time_entries(query).await?;
        Ok(TimeEntry::list_from_value(&response.data))
    }

    /// Decimal hours logged within `query`'s date range and filters.
    pub async fn total_hours_in_period(&self, query: &TimeEntryQuery) -> Result<f64, ApiError> {
        let entries = self.time_entries(query).await?;
        Ok(total_hours(&entries))
    }

    /// Decimal hours logged on a single `yyyy-mm-dd` date.
    pub async fn hours_on_day(
        &self,
        date: &str,
        project_id: Option<i64>,
        task_id: Option<i64>,
    ) -> Result<f64, ApiError> {
        let query = TimeEntryQuery {
            project_id,
            task_id,
            ..TimeEntryQuery::day(date)
        };
        self.total_hours_in_period(&query).await
    }

    /// Decimal hours per project in a date range.
    ///
    /// Names come from the entries themselves when present; otherwise one
    /// unfiltered project listing (usually cached) fills them in.
    pub async fn hours_by_project(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<ProjectHours>, ApiError> {
        let entries = self
            .time_entries(&TimeEntryQuery::new(start_date, end_date))
            .await?;
        let mut breakdown = ProjectBreakdown::from_entries(&entries);

        if breakdown.needs_names() {
            let projects = self.list_projects(None).await?;
            breakdown.backfill_names(&projects);
        }

        tracing::debug!(
            entries = entries.len(),
            projects = breakdown.len(),
            "aggregated hours by project"
        );
        Ok(breakdown.into_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::client::ClientConfig;
    use crate::testing::MockTransport;

    fn client() -> Client<MockTransport> {
        let config = ClientConfig {
            token: Some("token".to_string()),
            base_url: "https://hakuna.test/api/v1".to_string(),
            ..ClientConfig::default()
        };
        Client::with_transport(config, MockTransport::new()).unwrap()
    }

    #[tokio::test]
    async fn total_hours_of_empty_period_is_zero() {
        let client = client();
        let hours = client
            .total_hours_in_period(&TimeEntryQuery::new("2025-01-01", "2025-01-31"))
            .await
            .unwrap();
        assert!(hours.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn total_hours_mixes_duration_shapes() {
        let client = client();
        client.transport().push_json(&json!([
            {"duration_minutes": 90},
            {"start_time": "13:00", "end_time": "14:15"},
            {"start_time": "broken"},
            {"minutes": 5}
        ]));
        let hours = client
            .total_hours_in_period(&TimeEntryQuery::new("2025-01-01", "2025-01-31"))
            .await
            .unwrap();
        // 90 + 75 + 0 + 5 = 170 minutes
        assert!((hours - 2.83).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn hours_on_day_queries_single_date_with_filters() {
        let client = client();
        client
            .transport()
            .push_json(&json!([{"start_time": "09:00", "end_time": "17:30"}]));

        let hours = client.hours_on_day("2025-03-14", None, Some(8)).await.unwrap();
        assert!((hours - 8.5).abs() < f64::EPSILON);
        assert_eq!(
            client.transport().request_targets(),
            vec!["/api/v1/time_entries?start_date=2025-03-14&end_date=2025-03-14&task_id=8"]
        );
    }

    #[tokio::test]
    async fn hours_by_project_groups_entries() {
        let client = client();
        client.transport().push_json(&json!([
            {"project_id": 1, "start_time": "09:00", "end_time": "10:00", "project": {"name": "Website"}},
            {"project_id": 1, "start_time": "10:00", "end_time": "10:30"}
        ]));

        let rows = client
            .hours_by_project("2025-01-01", "2025-01-31")
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![ProjectHours {
                project_id: Some(1),
                project_name: Some("Website".to_string()),
                hours_decimal: 1.5,
            }]
        );
        // Names were inline, so no catalog lookup happened.
        assert_eq!(client.transport().request_count(), 1);
    }

    #[tokio::test]
    async fn hours_by_project_backfills_names_from_catalog() {
        let client = client();
        client.transport().push_json(&json!([
            {"project_id": 1, "minutes": 60},
            {"project_id": 2, "minutes": 30},
            {"minutes": 15}
        ]));
        client
            .transport()
            .push_json(&json!([{"id": 1, "name": "Website"}]));

        let rows = client
            .hours_by_project("2025-01-01", "2025-01-31")
            .await
            .unwrap();
        let names: Vec<_> = rows
            .iter()
            .map(|r| (r.project_id, r.project_name.as_deref()))
            .collect();
        assert_eq!(names, vec![(None, None), (Some(1), Some("Website")), (Some(2), None)]);
        assert_eq!(
            client.transport().request_targets()[1],
            "/api/v1/projects"
        );
    }

    #[tokio::test]
    async fn hours_by_project_reuses_cached_catalog() {
        let client = client();
        client.transport().push_json(&json!([{"id": 1, "name": "Website"}]));
        client.list_projects(None).await.unwrap();

        client
            .transport()
            .push_json(&json!([{"project_id": 1, "minutes": 60}]));
        let rows = client
            .hours_by_project("2025-01-01", "2025-01-31")
            .await
            .unwrap();

        assert_eq!(rows[0].project_name.as_deref(), Some("Website"));
        assert_eq!(client.transport().request_count(), 2);
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let client = client();
        client.transport().push(401, "invalid token");
        let err = client
            .hours_by_project("2025-01-01", "2025-01-31")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Hakuna 401: invalid token");
    }
}
