//! Transport seam: how compiled documents reach the remote
//!
//! The SDK never speaks HTTP itself. Callers hand it anything that can
//! execute a GraphQL document and return the raw response envelope; the
//! helpers here turn that envelope into `Result` values the rest of the
//! crate works with.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;

/// Executes one GraphQL document against the remote admin endpoint.
///
/// Implementations report connectivity and protocol failures through
/// `anyhow::Error`; the SDK wraps those in [`Error::Transport`] unchanged.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        document: &str,
        variables: Json,
    ) -> std::result::Result<GraphQlResponse, anyhow::Error>;
}

/// The raw response envelope a transport hands back
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Json,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Execute a document and surface transport and top-level errors
pub(crate) async fn execute(
    transport: &dyn Transport,
    document: &str,
    variables: Json,
) -> Result<Json> {
    let response = transport
        .execute(document, variables)
        .await
        .map_err(Error::Transport)?;
    if !response.errors.is_empty() {
        let joined = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::Remote(joined));
    }
    Ok(response.data)
}

/// Walk a path of object keys, failing with `Error::Response` when a hop
/// is missing or null
pub(crate) fn node<'a>(data: &'a Json, path: &[&str]) -> Result<&'a Json> {
    let mut current = data;
    for key in path {
        current = match current.get(key) {
            Some(next) if !next.is_null() => next,
            _ => {
                return Err(Error::response(format!(
                    "missing '{}' in response",
                    path.join(".")
                )))
            }
        };
    }
    Ok(current)
}

pub(crate) fn string_at(data: &Json, path: &[&str]) -> Result<String> {
    node(data, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::response(format!("'{}' is not a string", path.join("."))))
}

/// Fail with `Error::User` when the payload carries `userErrors`
pub(crate) fn check_user_errors(payload: &Json) -> Result<()> {
    let Some(errors) = payload.get("userErrors").and_then(Json::as_array) else {
        return Ok(());
    };
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .filter_map(|e| e.get("message").and_then(Json::as_str))
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::User(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_walks_and_rejects_null_hops() {
        let data = json!({"a": {"b": {"c": 1}}, "n": null});
        assert_eq!(node(&data, &["a", "b", "c"]).unwrap(), &json!(1));
        assert!(matches!(node(&data, &["n"]), Err(Error::Response(_))));
        assert!(matches!(node(&data, &["a", "x"]), Err(Error::Response(_))));
    }

    #[test]
    fn test_user_errors_join_messages() {
        let payload = json!({"userErrors": [
            {"field": ["key"], "message": "key taken"},
            {"field": null, "message": "name too long"},
        ]});
        let err = check_user_errors(&payload).unwrap_err();
        assert!(matches!(&err, Error::User(msg) if msg == "key taken, name too long"));
        assert!(check_user_errors(&json!({"userErrors": []})).is_ok());
        assert!(check_user_errors(&json!({})).is_ok());
    }
}
