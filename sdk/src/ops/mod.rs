//! Record-level operations: entities, products, jobs
//!
//! Everything here runs against an already-applied schema. Operations are
//! obtained from the client façade per declared entity type (or for
//! products as a whole) and translate typed calls into GraphQL documents.

pub mod entities;
pub mod jobs;
pub mod products;
pub mod selection;

pub use entities::{EntityOperations, EntityPatch, IterateConfig, ListConfig};
pub use jobs::JobStatus;
pub use products::{ProductListConfig, ProductOperations, ProductPatch, ProductRecord};
pub use selection::{EntityRecord, Projection};

use crate::error::Result;
use crate::transport::node;
use serde_json::Value as Json;

/// Cursor state returned with every page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One page of records
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

pub(crate) fn page_info(connection: &Json) -> Result<PageInfo> {
    let info = node(connection, &["pageInfo"])?;
    Ok(PageInfo {
        has_next_page: info
            .get("hasNextPage")
            .and_then(Json::as_bool)
            .unwrap_or(false),
        end_cursor: info
            .get("endCursor")
            .and_then(Json::as_str)
            .map(str::to_string),
    })
}
