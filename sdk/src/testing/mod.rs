//! Test utilities
//!
//! `MockTransport` replaces the network: responses are queued ahead of
//! time and every executed document is recorded for assertions.

use crate::transport::{GraphQlError, GraphQlResponse, Transport};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value as Json;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<GraphQlResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// One executed document, as the mock saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub document: String,
    pub variables: Json,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response carrying this `data` payload
    pub fn push_data(&self, data: Json) {
        self.responses.lock().unwrap().push_back(GraphQlResponse {
            data,
            errors: Vec::new(),
        });
    }

    /// Queue a response carrying top-level errors
    pub fn push_errors(&self, messages: &[&str]) {
        self.responses.lock().unwrap().push_back(GraphQlResponse {
            data: Json::Null,
            errors: messages
                .iter()
                .map(|m| GraphQlError {
                    message: m.to_string(),
                })
                .collect(),
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(
        &self,
        document: &str,
        variables: Json,
    ) -> std::result::Result<GraphQlResponse, anyhow::Error> {
        self.requests.lock().unwrap().push(RecordedRequest {
            document: document.to_string(),
            variables,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no response queued for document: {}", document))
    }
}
