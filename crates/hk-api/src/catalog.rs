//! Read-through cache for the project and task catalogs.
//!
//! Unfiltered listings are fetched once and then served from memory until
//! [`Client::clear_catalog_cache`] is called. There is no expiry and no
//! eviction: the task map grows by one slot per distinct project filter.
//! Searched listings always go to the server and never touch the cache,
//! since server-side filtering cannot be reproduced locally.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hk_core::CatalogItem;
use reqwest::Method;
use serde_json::Value;
use tokio::time::Instant;

use crate::client::{Client, Query};
use crate::error::ApiError;
use crate::transport::Transport;

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: Vec<T>,
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
        }
    }
}

/// Cached catalog responses for one client.
#[derive(Debug, Default)]
pub struct CatalogCache {
    projects: Mutex<Option<CacheEntry<Value>>>,
    tasks: Mutex<HashMap<String, CacheEntry<Value>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CatalogCache {
    /// Cache key for a task listing.
    pub fn task_key(project_id: Option<i64>) -> String {
        match project_id {
            Some(id) => format!("project:{id}"),
            None => "project:all".to_string(),
        }
    }

    fn projects(&self) -> Option<Vec<Value>> {
        lock(&self.projects).as_ref().map(|entry| entry.data.clone())
    }

    fn store_projects(&self, data: Vec<Value>) {
        *lock(&self.projects) = Some(CacheEntry::new(data));
    }

    fn tasks(&self, key: &str) -> Option<Vec<Value>> {
        lock(&self.tasks).get(key).map(|entry| entry.data.clone())
    }

    fn store_tasks(&self, key: String, data: Vec<Value>) {
        lock(&self.tasks).insert(key, CacheEntry::new(data));
    }

    /// Drops the project listing and every task listing.
    pub fn clear(&self) {
        *lock(&self.projects) = None;
        lock(&self.tasks).clear();
    }

    /// Number of populated slots, counting the project listing as one.
    pub fn len(&self) -> usize {
        usize::from(lock(&self.projects).is_some()) + lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn into_items(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

fn to_catalog(items: &[Value]) -> Vec<CatalogItem> {
    items.iter().map(CatalogItem::from_value).collect()
}

/// Trims a search term; blank terms count as no search.
fn search_term(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

impl<T: Transport> Client<T> {
    /// Lists projects, optionally filtered server-side by `search`.
    pub async fn list_projects(&self, search: Option<&str>) -> Result<Vec<CatalogItem>, ApiError> {
        if let Some(search) = search_term(search) {
            let query = Query::new().param("search", search);
            let response = self
                .call(Method::GET, "/projects", None, Some(&query))
                .await?;
            return Ok(to_catalog(&into_items(response.data)));
        }

        if let Some(cached) = self.catalog.projects() {
            tracing::debug!(count = cached.len(), "project catalog cache hit");
            return Ok(to_catalog(&cached));
        }

        tracing::debug!("project catalog cache miss");
        let response = self.call(Method::GET, "/projects", None, None).await?;
        let items = into_items(response.data);
        let catalog = to_catalog(&items);
        self.catalog.store_projects(items);
        Ok(catalog)
    }

    /// Lists tasks, optionally for one project and filtered by `search`.
    pub async fn list_tasks(
        &self,
        search: Option<&str>,
        project_id: Option<i64>,
    ) -> Result<Vec<CatalogItem>, ApiError> {
        if let Some(search) = search_term(search) {
            let query = Query::new()
                .param("search", search)
                .opt("project_id", project_id);
            let response = self
                .call(Method::GET, "/tasks", None, Some(&query))
                .await?;
            return Ok(to_catalog(&into_items(response.data)));
        }

        let key = CatalogCache::task_key(project_id);
        if let Some(cached) = self.catalog.tasks(&key) {
            tracing::debug!(%key, count = cached.len(), "task catalog cache hit");
            return Ok(to_catalog(&cached));
        }

        tracing::debug!(%key, "task catalog cache miss");
        let query = Query::new().opt("project_id", project_id);
        let response = self
            .call(Method::GET, "/tasks", None, Some(&query))
            .await?;
        let items = into_items(response.data);
        let catalog = to_catalog(&items);
        self.catalog.store_tasks(key, items);
        Ok(catalog)
    }

    /// Projects whose name contains `name`, ignoring case. Served from the
    /// unfiltered (cached) listing.
    pub async fn find_projects(&self, name: &str) -> Result<Vec<CatalogItem>, ApiError> {
        let projects = self.list_projects(None).await?;
        Ok(projects
            .into_iter()
            .filter(|p| p.name_contains(name))
            .collect())
    }

    /// Tasks whose name contains `name`, ignoring case, optionally within one
    /// project. Served from the unfiltered (cached) listing.
    pub async fn find_tasks(
        &self,
        name: &str,
        project_id: Option<i64>,
    ) -> Result<Vec<CatalogItem>, ApiError> {
        let tasks = self.list_tasks(None, project_id).await?;
        Ok(tasks.into_iter().filter(|t| t.name_contains(name)).collect())
    }

    /// Forgets every cached catalog listing.
    pub fn clear_catalog_cache(&self) {
        self.catalog.clear();
        tracing::debug!("catalog cache cleared");
    }

    pub const fn catalog_cache(&self) -> &CatalogCache {
        &self.catalog
    }
}
