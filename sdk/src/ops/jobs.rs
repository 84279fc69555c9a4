//! Remote job polling
//!
//! Bulk mutations return a job handle instead of completing inline.

use crate::error::Result;
use crate::transport::{self, Transport, node, string_at};
use serde_json::{Value as Json, json};

const JOB_QUERY: &str = "\
query Job($id: ID!) {
  job(id: $id) { id done }
}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub id: String,
    pub done: bool,
}

/// Fetch the current status of a remote job
pub async fn poll(transport: &dyn Transport, id: &str) -> Result<JobStatus> {
    let data = transport::execute(transport, JOB_QUERY, json!({"id": id})).await?;
    decode_job(node(&data, &["job"])?)
}

pub(crate) fn decode_job(payload: &Json) -> Result<JobStatus> {
    Ok(JobStatus {
        id: string_at(payload, &["id"])?,
        done: payload.get("done").and_then(Json::as_bool).unwrap_or(false),
    })
}
