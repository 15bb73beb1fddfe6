//! In-memory [`Transport`] for tests.
//!
//! Responses are served in the order they were queued. Once the queue is
//! empty every request gets `200 OK` with an empty JSON array, which is what
//! the list endpoints return for "nothing found".

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

use crate::error::ApiError;
use crate::rate_limit::{LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER};
use crate::transport::{ApiRequest, RawResponse, Transport};

/// Records every request and replays canned responses.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with the given status and raw body.
    pub fn push(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push_response(RawResponse {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: HeaderMap::new(),
            body: body.into(),
        })
    }

    /// Queues a `200 OK` JSON response.
    pub fn push_json(&self, body: &Value) -> &Self {
        self.push(200, body.to_string())
    }

    /// Queues a `200 OK` JSON response carrying rate-limit headers.
    pub fn push_json_with_rate(&self, body: &Value, limit: i64, remaining: i64, reset: i64) -> &Self {
        let mut headers = HeaderMap::new();
        headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
        headers.insert(RESET_HEADER, HeaderValue::from(reset));
        self.push_response(RawResponse {
            status: StatusCode::OK,
            headers,
            body: body.to_string(),
        })
    }

    pub fn push_response(&self, response: RawResponse) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Path and query of every request, e.g. `/api/v1/projects?search=x`.
    pub fn request_targets(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| match r.url.query() {
                Some(query) => format!("{}?{query}", r.url.path()),
                None => r.url.path().to_string(),
            })
            .collect()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let queued = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        Ok(queued.unwrap_or_else(|| RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: "[]".to_string(),
        }))
    }
}
