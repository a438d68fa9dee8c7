//! Scripted compute API for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::api::{ApiResponse, ComputeApi};
use crate::errors::ApiError;

/// One scripted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The remote answered.
    Response(ApiResponse),
    /// The exchange failed before a response was read.
    Fault(String),
}

impl Reply {
    /// A 200 response with a JSON body.
    #[must_use]
    pub fn json(body: serde_json::Value) -> Self {
        Self::Response(ApiResponse::ok_json(&body))
    }

    /// A 200 response with a text body.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::Response(ApiResponse::new(200, body))
    }

    /// A response with an arbitrary status.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Response(ApiResponse::new(status, body))
    }

    /// A transport failure.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault(message.into())
    }
}

/// HTTP verb of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `submit`.
    Post,
    /// `fetch`.
    Get,
    /// `fetch_raw`.
    Raw,
}

/// A call observed by [`ScriptedComputeApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Which trait method was called.
    pub method: Method,
    /// Endpoint or URL.
    pub endpoint: String,
    /// Body of a `submit`.
    pub body: Option<serde_json::Value>,
}

/// A [`ComputeApi`] answering from per-endpoint scripts.
///
/// Replies queued for an endpoint are consumed in order; the last one keeps
/// being returned. Unscripted endpoints answer 404.
#[derive(Debug, Default)]
pub struct ScriptedComputeApi {
    scripts: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedComputeApi {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, method: Method, endpoint: &str, reply: Reply) -> Self {
        self.scripts
            .lock()
            .entry((method, endpoint.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queues a reply for `submit(endpoint, _)`.
    #[must_use]
    pub fn on_submit(self, endpoint: &str, reply: Reply) -> Self {
        self.push(Method::Post, endpoint, reply)
    }

    /// Queues a reply for `fetch(endpoint)`.
    #[must_use]
    pub fn on_fetch(self, endpoint: &str, reply: Reply) -> Self {
        self.push(Method::Get, endpoint, reply)
    }

    /// Queues several statuses for a status endpoint.
    #[must_use]
    pub fn on_status_sequence(mut self, endpoint: &str, statuses: &[&str]) -> Self {
        for status in statuses {
            self = self.on_fetch(endpoint, Reply::json(serde_json::json!({ "Status": status })));
        }
        self
    }

    /// Queues a reply for `fetch_raw(url)`.
    #[must_use]
    pub fn on_raw(self, url: &str, reply: Reply) -> Self {
        self.push(Method::Raw, url, reply)
    }

    /// Returns every call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the calls made to one endpoint.
    #[must_use]
    pub fn calls_to(&self, endpoint: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .cloned()
            .collect()
    }

    /// Returns the number of calls made to one endpoint.
    #[must_use]
    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls_to(endpoint).len()
    }

    fn next(&self, method: Method, endpoint: &str, body: Option<serde_json::Value>) -> Reply {
        self.calls.lock().push(RecordedCall {
            method,
            endpoint: endpoint.to_string(),
            body,
        });

        let mut scripts = self.scripts.lock();
        match scripts.get_mut(&(method, endpoint.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(unscripted),
            Some(queue) => queue.front().cloned().unwrap_or_else(unscripted),
            None => unscripted(),
        }
    }
}

fn unscripted() -> Reply {
    Reply::status(404, "unscripted endpoint")
}

#[async_trait]
impl ComputeApi for ScriptedComputeApi {
    async fn submit(&self, endpoint: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError> {
        match self.next(Method::Post, endpoint, Some(body.clone())) {
            Reply::Response(response) => Ok(response),
            Reply::Fault(message) => Err(ApiError::decode(endpoint, message)),
        }
    }

    async fn fetch(&self, endpoint: &str) -> Result<ApiResponse, ApiError> {
        match self.next(Method::Get, endpoint, None) {
            Reply::Response(response) => Ok(response),
            Reply::Fault(message) => Err(ApiError::decode(endpoint, message)),
        }
    }

    async fn fetch_raw(&self, url: &str) -> Result<String, ApiError> {
        match self.next(Method::Raw, url, None) {
            Reply::Response(response) if response.is_success() => Ok(response.body),
            Reply::Response(response) => Err(ApiError::status(url, response.status, response.body)),
            Reply::Fault(message) => Err(ApiError::decode(url, message)),
        }
    }
}
