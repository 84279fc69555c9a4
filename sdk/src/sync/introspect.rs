//! Remote definition introspection
//!
//! Fetches the entity and attachment definitions currently installed under
//! the client prefix. Entity-reference validations come back from the
//! remote holding opaque definition ids; introspection reverse-resolves
//! those to prefixed type strings so the diff engine compares one
//! representation throughout.

use crate::error::Result;
use crate::schema::OwnerType;
use crate::transport::{self, Transport, node, string_at};
use crate::validation::ValidationRule;
use serde::Deserialize;
use serde_json::{Value as Json, json};
use std::collections::HashMap;
use tracing::warn;

const PAGE_SIZE: u32 = 250;

const ENTITY_DEFINITIONS_QUERY: &str = "\
query EntityDefinitions($first: Int!, $after: String) {
  entityDefinitions(first: $first, after: $after) {
    nodes {
      id
      type
      name
      description
      displayNameKey
      fieldDefinitions {
        key
        name
        description
        required
        type { name }
        validations { name value }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}";

const ATTACHMENT_DEFINITIONS_QUERY: &str = "\
query AttachmentDefinitions($first: Int!, $after: String, $ownerType: AttachmentOwnerType!, $query: String) {
  attachmentDefinitions(first: $first, after: $after, ownerType: $ownerType, query: $query) {
    nodes {
      id
      namespace
      key
      name
      description
      ownerType
      pinned
      type { name }
      validations { name value }
    }
    pageInfo { hasNextPage endCursor }
  }
}";

const ENTITY_DEFINITION_TYPE_QUERY: &str = "\
query EntityDefinitionType($id: ID!) {
  entityDefinition(id: $id) { type }
}";

/// An entity definition as the remote currently holds it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntityDefinition {
    pub id: String,
    /// Prefixed wire type string
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    pub description: Option<String>,
    pub display_name_key: Option<String>,
    #[serde(rename = "fieldDefinitions")]
    pub fields: Vec<RemoteFieldDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFieldDefinition {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    #[serde(rename = "type", deserialize_with = "wire_type_tag")]
    pub field_type: String,
    #[serde(default)]
    pub validations: Vec<ValidationRule>,
}

/// An attachment definition as the remote currently holds it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAttachmentDefinition {
    pub id: String,
    pub namespace: String,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_type: OwnerType,
    pub pinned: bool,
    #[serde(rename = "type", deserialize_with = "wire_type_tag")]
    pub field_type: String,
    #[serde(default)]
    pub validations: Vec<ValidationRule>,
}

impl RemoteAttachmentDefinition {
    pub fn identity(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }
}

/// The remote nests the type tag under `type { name }`
fn wire_type_tag<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct TypeRef {
        name: String,
    }
    Ok(TypeRef::deserialize(deserializer)?.name)
}

/// Fetch every entity definition under the prefix, reference validations
/// already reverse-resolved to type strings
pub async fn fetch_entity_definitions(
    transport: &dyn Transport,
    prefix: &str,
) -> Result<Vec<RemoteEntityDefinition>> {
    let marker = format!("{}_", prefix);
    let mut out: Vec<RemoteEntityDefinition> = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let data = transport::execute(
            transport,
            ENTITY_DEFINITIONS_QUERY,
            json!({"first": PAGE_SIZE, "after": after}),
        )
        .await?;
        let connection = node(&data, &["entityDefinitions"])?;
        let nodes = node(connection, &["nodes"])?;
        for row in nodes.as_array().into_iter().flatten() {
            match serde_json::from_value::<RemoteEntityDefinition>(row.clone()) {
                Ok(def) if def.entity_type.starts_with(&marker) => out.push(def),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable entity definition"),
            }
        }
        if !has_next_page(connection)? {
            break;
        }
        after = Some(string_at(connection, &["pageInfo", "endCursor"])?);
    }

    let mut resolver = ReferenceResolver::default();
    for def in &mut out {
        for field in &mut def.fields {
            resolver
                .resolve(transport, &mut field.validations)
                .await?;
        }
    }
    Ok(out)
}

/// Fetch the attachment definitions under the prefix for one owner type
pub async fn fetch_attachment_definitions(
    transport: &dyn Transport,
    prefix: &str,
    owner_type: OwnerType,
) -> Result<Vec<RemoteAttachmentDefinition>> {
    let mut out: Vec<RemoteAttachmentDefinition> = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let data = transport::execute(
            transport,
            ATTACHMENT_DEFINITIONS_QUERY,
            json!({
                "first": PAGE_SIZE,
                "after": after,
                "ownerType": owner_type.wire_name(),
                "query": format!("namespace:{}*", prefix),
            }),
        )
        .await?;
        let connection = node(&data, &["attachmentDefinitions"])?;
        let nodes = node(connection, &["nodes"])?;
        for row in nodes.as_array().into_iter().flatten() {
            match serde_json::from_value::<RemoteAttachmentDefinition>(row.clone()) {
                // the namespace search is a prefix match, keep exact hits only
                Ok(def)
                    if def.namespace == prefix
                        || def.namespace.starts_with(&format!("{}_", prefix)) =>
                {
                    out.push(def)
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable attachment definition"),
            }
        }
        if !has_next_page(connection)? {
            break;
        }
        after = Some(string_at(connection, &["pageInfo", "endCursor"])?);
    }

    let mut resolver = ReferenceResolver::default();
    for def in &mut out {
        resolver.resolve(transport, &mut def.validations).await?;
    }
    Ok(out)
}

fn has_next_page(connection: &Json) -> Result<bool> {
    Ok(node(connection, &["pageInfo", "hasNextPage"])?
        .as_bool()
        .unwrap_or(false))
}

/// Rewrites `entity_definition_id` validation values from remote ids to
/// prefixed type strings, one lookup per distinct id
#[derive(Default)]
struct ReferenceResolver {
    cache: HashMap<String, String>,
}

impl ReferenceResolver {
    async fn resolve(
        &mut self,
        transport: &dyn Transport,
        validations: &mut [ValidationRule],
    ) -> Result<()> {
        for rule in validations {
            if rule.name != "entity_definition_id" {
                continue;
            }
            if let Some(ty) = self.cache.get(&rule.value) {
                rule.value = ty.clone();
                continue;
            }
            let data = transport::execute(
                transport,
                ENTITY_DEFINITION_TYPE_QUERY,
                json!({"id": rule.value}),
            )
            .await?;
            let ty = string_at(&data, &["entityDefinition", "type"])?;
            self.cache.insert(rule.value.clone(), ty.clone());
            rule.value = ty;
        }
        Ok(())
    }
}
