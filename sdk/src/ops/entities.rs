//! Entity record operations
//!
//! One `EntityOperations` instance covers one declared entity type. All
//! methods compile a document around the requested projection, push it
//! through the transport and decode the rows that come back. Aliases are
//! validated against the definition before any call goes out.

use super::jobs::{self, JobStatus};
use super::selection::{
    EntityRecord, EntitySelection, Projection, decode_entity_row, entity_selection,
};
use super::{ListResult, page_info};
use crate::error::{Error, Result};
use crate::query::{EntityQueryField, EntitySortKey, Query};
use crate::schema::EntityDefinition;
use crate::transport::{self, Transport, check_user_errors, node, string_at};
use crate::value::Value;
use futures::Stream;
use serde_json::{Map, Value as Json, json};
use std::collections::VecDeque;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_ITERATE_PAGE_SIZE: u32 = 100;

/// Options for one `list` call
#[derive(Debug, Clone, Default)]
pub struct ListConfig {
    pub projection: Projection,
    pub query: Option<Query<EntityQueryField>>,
    pub first: Option<u32>,
    pub last: Option<u32>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub reverse: bool,
    pub sort_key: Option<EntitySortKey>,
}

/// Options for one `iterate` call
#[derive(Debug, Clone)]
pub struct IterateConfig {
    pub projection: Projection,
    pub query: Option<Query<EntityQueryField>>,
    pub reverse: bool,
    pub sort_key: Option<EntitySortKey>,
    pub page_size: u32,
    /// Stop after this many records even if more pages exist
    pub limit: Option<usize>,
}

impl Default for IterateConfig {
    fn default() -> Self {
        Self {
            projection: Projection::All,
            query: None,
            reverse: false,
            sort_key: None,
            page_size: DEFAULT_ITERATE_PAGE_SIZE,
            limit: None,
        }
    }
}

/// Changes for one `update` call; at least one must be present
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub handle: Option<String>,
    pub fields: Vec<(String, Value)>,
}

pub struct EntityOperations {
    transport: Arc<dyn Transport>,
    entity: Arc<EntityDefinition>,
    prefixed_type: String,
}

impl std::fmt::Debug for EntityOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityOperations")
            .field("entity", &self.entity)
            .field("prefixed_type", &self.prefixed_type)
            .finish_non_exhaustive()
    }
}

impl EntityOperations {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        entity: Arc<EntityDefinition>,
        prefixed_type: String,
    ) -> Self {
        Self {
            transport,
            entity,
            prefixed_type,
        }
    }

    /// Fetch one page of records
    pub async fn list(&self, config: ListConfig) -> Result<ListResult<EntityRecord>> {
        let selection = entity_selection(&self.entity, &config.projection)?;
        let first = match (config.first, config.last) {
            (None, None) => Some(DEFAULT_PAGE_SIZE),
            (first, _) => first,
        };
        let document = list_document(&selection);
        let mut variables = selection_variables(&selection);
        variables.insert("entityType".into(), json!(self.prefixed_type));
        variables.insert("first".into(), json!(first));
        variables.insert("last".into(), json!(config.last));
        variables.insert("after".into(), json!(config.after));
        variables.insert("before".into(), json!(config.before));
        variables.insert(
            "query".into(),
            json!(config.query.as_ref().map(Query::compile)),
        );
        variables.insert(
            "sortKey".into(),
            json!(config.sort_key.map(|k| k.wire_name())),
        );
        variables.insert("reverse".into(), json!(config.reverse));

        let data =
            transport::execute(&*self.transport, &document, Json::Object(variables)).await?;
        let connection = node(&data, &["entities"])?;
        let items = decode_rows(&self.entity, &selection, node(connection, &["nodes"])?)?;
        Ok(ListResult {
            items,
            page_info: page_info(connection)?,
        })
    }

    /// Fetch a single record by id
    pub async fn get(&self, id: &str, projection: Projection) -> Result<Option<EntityRecord>> {
        let selection = entity_selection(&self.entity, &projection)?;
        let document = format!(
            "query Entity($id: ID!{defs}) {{\n  entity(id: $id) {{\n{body}\n  }}\n}}",
            defs = selection.variable_defs,
            body = selection.body,
        );
        let mut variables = selection_variables(&selection);
        variables.insert("id".into(), json!(id));
        let data =
            transport::execute(&*self.transport, &document, Json::Object(variables)).await?;
        match data.get("entity") {
            Some(row) if !row.is_null() => {
                Ok(Some(decode_entity_row(&self.entity, &selection, row)?))
            }
            _ => Ok(None),
        }
    }

    /// Create a record
    pub async fn insert(
        &self,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<EntityRecord> {
        let selection = entity_selection(&self.entity, &Projection::All)?;
        let document = format!(
            "mutation EntityCreate($entity: EntityCreateInput!{defs}) {{\n  entityCreate(entity: $entity) {{\n    entity {{\n{body}\n    }}\n    userErrors {{ field message }}\n  }}\n}}",
            defs = selection.variable_defs,
            body = selection.body,
        );
        let mut variables = selection_variables(&selection);
        variables.insert(
            "entity".into(),
            json!({
                "type": self.prefixed_type,
                "fields": self.encode_fields(fields)?,
            }),
        );
        let data =
            transport::execute(&*self.transport, &document, Json::Object(variables)).await?;
        let payload = node(&data, &["entityCreate"])?;
        check_user_errors(payload)?;
        decode_entity_row(&self.entity, &selection, node(payload, &["entity"])?)
    }

    /// Apply a patch to an existing record
    pub async fn update(&self, id: &str, patch: EntityPatch) -> Result<EntityRecord> {
        if patch.handle.is_none() && patch.fields.is_empty() {
            return Err(Error::EmptyUpdate);
        }
        let selection = entity_selection(&self.entity, &Projection::All)?;
        let document = format!(
            "mutation EntityUpdate($id: ID!, $entity: EntityUpdateInput!{defs}) {{\n  entityUpdate(id: $id, entity: $entity) {{\n    entity {{\n{body}\n    }}\n    userErrors {{ field message }}\n  }}\n}}",
            defs = selection.variable_defs,
            body = selection.body,
        );
        let mut input = Map::new();
        if let Some(handle) = &patch.handle {
            input.insert("handle".into(), json!(handle));
        }
        if !patch.fields.is_empty() {
            input.insert("fields".into(), self.encode_fields(patch.fields)?);
        }
        let mut variables = selection_variables(&selection);
        variables.insert("id".into(), json!(id));
        variables.insert("entity".into(), Json::Object(input));
        let data =
            transport::execute(&*self.transport, &document, Json::Object(variables)).await?;
        let payload = node(&data, &["entityUpdate"])?;
        check_user_errors(payload)?;
        decode_entity_row(&self.entity, &selection, node(payload, &["entity"])?)
    }

    /// Create or update the record carrying this handle
    pub async fn upsert(
        &self,
        handle: &str,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<EntityRecord> {
        let selection = entity_selection(&self.entity, &Projection::All)?;
        let document = format!(
            "mutation EntityUpsert($handle: EntityHandleInput!, $entity: EntityUpsertInput!{defs}) {{\n  entityUpsert(handle: $handle, entity: $entity) {{\n    entity {{\n{body}\n    }}\n    userErrors {{ field message }}\n  }}\n}}",
            defs = selection.variable_defs,
            body = selection.body,
        );
        let mut variables = selection_variables(&selection);
        variables.insert(
            "handle".into(),
            json!({"type": self.prefixed_type, "handle": handle}),
        );
        variables.insert(
            "entity".into(),
            json!({"fields": self.encode_fields(fields)?}),
        );
        let data =
            transport::execute(&*self.transport, &document, Json::Object(variables)).await?;
        let payload = node(&data, &["entityUpsert"])?;
        check_user_errors(payload)?;
        decode_entity_row(&self.entity, &selection, node(payload, &["entity"])?)
    }

    /// Delete one record, returning the deleted id
    pub async fn delete(&self, id: &str) -> Result<String> {
        const DOCUMENT: &str = "\
mutation EntityDelete($id: ID!) {
  entityDelete(id: $id) {
    deletedId
    userErrors { field message }
  }
}";
        let data = transport::execute(&*self.transport, DOCUMENT, json!({"id": id})).await?;
        let payload = node(&data, &["entityDelete"])?;
        check_user_errors(payload)?;
        string_at(payload, &["deletedId"])
    }

    /// Delete many records in one mutation; completion is asynchronous on
    /// the remote side, poll the returned job
    pub async fn delete_many(&self, ids: &[String]) -> Result<JobStatus> {
        const DOCUMENT: &str = "\
mutation EntityBulkDelete($where: EntityBulkDeleteWhereCondition!) {
  entityBulkDelete(where: $where) {
    job { id done }
    userErrors { field message }
  }
}";
        let data =
            transport::execute(&*self.transport, DOCUMENT, json!({"where": {"ids": ids}}))
                .await?;
        let payload = node(&data, &["entityBulkDelete"])?;
        check_user_errors(payload)?;
        jobs::decode_job(node(payload, &["job"])?)
    }

    /// Walk every matching record lazily, one fetch per page. The stream
    /// is finite and not restartable; dropping it issues no further calls.
    pub fn iterate(
        &self,
        config: IterateConfig,
    ) -> Result<impl Stream<Item = Result<EntityRecord>> + 'static> {
        let selection = entity_selection(&self.entity, &config.projection)?;
        let state = IterateState {
            transport: Arc::clone(&self.transport),
            entity: Arc::clone(&self.entity),
            prefixed_type: self.prefixed_type.clone(),
            selection,
            query: config.query.as_ref().map(Query::compile),
            reverse: config.reverse,
            sort_key: config.sort_key,
            page_size: config.page_size,
            remaining: config.limit,
            after: None,
            exhausted: false,
            buffer: VecDeque::new(),
        };
        Ok(futures::stream::try_unfold(state, |mut state| async move {
            if state.remaining == Some(0) {
                return Ok(None);
            }
            while state.buffer.is_empty() {
                if state.exhausted {
                    return Ok(None);
                }
                state.fetch_page().await?;
            }
            match state.buffer.pop_front() {
                Some(record) => {
                    if let Some(remaining) = &mut state.remaining {
                        *remaining -= 1;
                    }
                    Ok(Some((record, state)))
                }
                None => Ok(None),
            }
        }))
    }

    fn encode_fields(
        &self,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<Json> {
        let mut out = Vec::new();
        for (alias, value) in fields {
            let field = self
                .entity
                .field(&alias)
                .ok_or_else(|| Error::UnknownField(alias.clone()))?;
            let wire = field.field_type.encode(&value)?;
            out.push(json!({"key": field.resolved_key(&alias), "value": wire}));
        }
        Ok(Json::Array(out))
    }
}

struct IterateState {
    transport: Arc<dyn Transport>,
    entity: Arc<EntityDefinition>,
    prefixed_type: String,
    selection: EntitySelection,
    query: Option<String>,
    reverse: bool,
    sort_key: Option<EntitySortKey>,
    page_size: u32,
    remaining: Option<usize>,
    after: Option<String>,
    exhausted: bool,
    buffer: VecDeque<EntityRecord>,
}

impl IterateState {
    async fn fetch_page(&mut self) -> Result<()> {
        let document = list_document(&self.selection);
        let mut variables = selection_variables(&self.selection);
        variables.insert("entityType".into(), json!(self.prefixed_type));
        variables.insert("first".into(), json!(self.page_size));
        variables.insert("last".into(), Json::Null);
        variables.insert("after".into(), json!(self.after));
        variables.insert("before".into(), Json::Null);
        variables.insert("query".into(), json!(self.query));
        variables.insert(
            "sortKey".into(),
            json!(self.sort_key.map(|k| k.wire_name())),
        );
        variables.insert("reverse".into(), json!(self.reverse));

        let data =
            transport::execute(&*self.transport, &document, Json::Object(variables)).await?;
        let connection = node(&data, &["entities"])?;
        self.buffer
            .extend(decode_rows(&self.entity, &self.selection, node(connection, &["nodes"])?)?);
        let info = page_info(connection)?;
        self.exhausted = !info.has_next_page;
        self.after = info.end_cursor;
        Ok(())
    }
}

fn list_document(selection: &EntitySelection) -> String {
    format!(
        "query Entities($entityType: String!, $first: Int, $last: Int, $after: String, $before: String, $query: String, $sortKey: EntitySortKeys, $reverse: Boolean{defs}) {{\n  entities(type: $entityType, first: $first, last: $last, after: $after, before: $before, query: $query, sortKey: $sortKey, reverse: $reverse) {{\n    nodes {{\n{body}\n    }}\n    pageInfo {{ hasNextPage endCursor }}\n  }}\n}}",
        defs = selection.variable_defs,
        body = selection.body,
    )
}

fn selection_variables(selection: &EntitySelection) -> Map<String, Json> {
    selection
        .variables
        .iter()
        .map(|(var, key)| (var.clone(), json!(key)))
        .collect()
}

fn decode_rows(
    entity: &EntityDefinition,
    selection: &EntitySelection,
    nodes: &Json,
) -> Result<Vec<EntityRecord>> {
    nodes
        .as_array()
        .into_iter()
        .flatten()
        .map(|row| decode_entity_row(entity, selection, row))
        .collect()
}
