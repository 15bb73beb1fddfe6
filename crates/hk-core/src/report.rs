//! Aggregation of time entries into decimal-hour reports.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::duration::{minutes_from_entry, to_hours_decimal};
use crate::entry::{CatalogItem, TimeEntry};

/// Sums the resolved minutes of every entry.
///
/// The sum is a float, so fractional minutes add up and an absurdly large
/// minute count cannot overflow it.
pub fn total_minutes<'a>(entries: impl IntoIterator<Item = &'a TimeEntry>) -> f64 {
    entries.into_iter().map(minutes_from_entry).sum()
}

/// Sums every entry and converts once to decimal hours.
pub fn total_hours<'a>(entries: impl IntoIterator<Item = &'a TimeEntry>) -> f64 {
    to_hours_decimal(total_minutes(entries))
}

/// One output row of an hours-by-project report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectHours {
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub hours_decimal: f64,
}

#[derive(Debug, Default)]
struct ProjectTally {
    name: Option<String>,
    minutes: f64,
}

/// Minutes accumulated per project; entries without a project share one group.
#[derive(Debug, Default)]
pub struct ProjectBreakdown {
    groups: BTreeMap<Option<i64>, ProjectTally>,
}

impl ProjectBreakdown {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a TimeEntry>) -> Self {
        let mut breakdown = Self::default();
        for entry in entries {
            breakdown.add(entry);
        }
        breakdown
    }

    pub fn add(&mut self, entry: &TimeEntry) {
        let tally = self.groups.entry(entry.project.id).or_default();
        tally.minutes += minutes_from_entry(entry);
        if tally.name.is_none() {
            tally.name.clone_from(&entry.project.name);
        }
    }

    /// Whether some group has a project id but no name yet.
    pub fn needs_names(&self) -> bool {
        self.groups
            .iter()
            .any(|(id, tally)| id.is_some() && tally.name.is_none())
    }

    /// Fills missing names from the project catalog. Groups whose id is not
    /// in the catalog stay unnamed.
    pub fn backfill_names(&mut self, projects: &[CatalogItem]) {
        let names: BTreeMap<i64, &str> = projects
            .iter()
            .filter_map(|p| Some((p.id?, p.name.as_deref().filter(|n| !n.is_empty())?)))
            .collect();

        for (id, tally) in &mut self.groups {
            if tally.name.is_some() {
                continue;
            }
            match id.and_then(|id| names.get(&id)) {
                Some(name) => tally.name = Some((*name).to_string()),
                None => tracing::trace!(project_id = ?id, "no catalog name for project"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_rows(self) -> Vec<ProjectHours> {
        self.groups
            .into_iter()
            .map(|(project_id, tally)| ProjectHours {
                project_id,
                project_name: tally.name,
                hours_decimal: to_hours_decimal(tally.minutes),
            })
            .collect()
    }
}
