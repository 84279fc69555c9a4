//! Product operations
//!
//! Products are native remote resources, so their base fields are always
//! selected; the projection only governs which declared attachments ride
//! along. Attachment values move through the same codec layer as entity
//! fields.

use super::selection::{Projection, decode_attachment_value, graphql_alias};
use super::{ListResult, page_info};
use crate::error::{Error, Result};
use crate::query::{ProductQueryField, Query};
use crate::schema::{AttachmentDefinition, OwnerType, Schema};
use crate::transport::{self, Transport, check_user_errors, node, string_at};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as Json, json};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Default)]
pub struct ProductListConfig {
    pub projection: Projection,
    pub query: Option<Query<ProductQueryField>>,
    pub first: Option<u32>,
    pub after: Option<String>,
}

/// Changes for one product update; at least one must be present
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Declared attachment key to new value
    pub attachments: Vec<(String, Value)>,
}

impl ProductPatch {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.vendor.is_none()
            && self.product_type.is_none()
            && self.tags.is_none()
            && self.attachments.is_empty()
    }
}

/// One decoded product row
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub status: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Declared attachment key to decoded value; `None` when unset
    pub attachments: BTreeMap<String, Option<Value>>,
}

impl ProductRecord {
    pub fn attachment(&self, key: &str) -> Option<&Value> {
        self.attachments.get(key).and_then(|v| v.as_ref())
    }
}

pub struct ProductOperations {
    transport: Arc<dyn Transport>,
    schema: Arc<Schema>,
    prefix: String,
}

impl ProductOperations {
    pub(crate) fn new(transport: Arc<dyn Transport>, schema: Arc<Schema>, prefix: String) -> Self {
        Self {
            transport,
            schema,
            prefix,
        }
    }

    pub async fn list(&self, config: ProductListConfig) -> Result<ListResult<ProductRecord>> {
        let attachments = self.select_attachments(&config.projection)?;
        let document = format!(
            "query Products($first: Int, $after: String, $query: String) {{\n  products(first: $first, after: $after, query: $query) {{\n    nodes {{\n{body}\n    }}\n    pageInfo {{ hasNextPage endCursor }}\n  }}\n}}",
            body = selection_body(&attachments, &self.prefix),
        );
        let data = transport::execute(
            &*self.transport,
            &document,
            json!({
                "first": config.first.unwrap_or(DEFAULT_PAGE_SIZE),
                "after": config.after,
                "query": config.query.as_ref().map(Query::compile),
            }),
        )
        .await?;
        let connection = node(&data, &["products"])?;
        let items = node(connection, &["nodes"])?
            .as_array()
            .into_iter()
            .flatten()
            .map(|row| decode_product_row(&attachments, &self.prefix, row))
            .collect::<Result<Vec<_>>>()?;
        Ok(ListResult {
            items,
            page_info: page_info(connection)?,
        })
    }

    pub async fn get(&self, id: &str, projection: Projection) -> Result<Option<ProductRecord>> {
        let attachments = self.select_attachments(&projection)?;
        let document = format!(
            "query Product($id: ID!) {{\n  product(id: $id) {{\n{body}\n  }}\n}}",
            body = selection_body(&attachments, &self.prefix),
        );
        let data = transport::execute(&*self.transport, &document, json!({"id": id})).await?;
        match data.get("product") {
            Some(row) if !row.is_null() => {
                Ok(Some(decode_product_row(&attachments, &self.prefix, row)?))
            }
            _ => Ok(None),
        }
    }

    pub async fn update(&self, id: &str, patch: ProductPatch) -> Result<ProductRecord> {
        if patch.is_empty() {
            return Err(Error::EmptyUpdate);
        }
        let attachments = self.select_attachments(&Projection::All)?;
        let document = format!(
            "mutation ProductUpdate($input: ProductInput!) {{\n  productUpdate(input: $input) {{\n    product {{\n{body}\n    }}\n    userErrors {{ field message }}\n  }}\n}}",
            body = selection_body(&attachments, &self.prefix),
        );

        let mut input = Map::new();
        input.insert("id".into(), json!(id));
        if let Some(title) = &patch.title {
            input.insert("title".into(), json!(title));
        }
        if let Some(vendor) = &patch.vendor {
            input.insert("vendor".into(), json!(vendor));
        }
        if let Some(product_type) = &patch.product_type {
            input.insert("productType".into(), json!(product_type));
        }
        if let Some(tags) = &patch.tags {
            input.insert("tags".into(), json!(tags));
        }
        if !patch.attachments.is_empty() {
            let mut values = Vec::with_capacity(patch.attachments.len());
            for (key, value) in &patch.attachments {
                let definition = self
                    .product_attachment(key)
                    .ok_or_else(|| Error::UnknownField(key.clone()))?;
                values.push(json!({
                    "namespace": definition.prefixed_namespace(&self.prefix),
                    "key": definition.key,
                    "type": definition.field.field_type.wire_name(),
                    "value": definition.field.field_type.encode(value)?,
                }));
            }
            input.insert("attachments".into(), Json::Array(values));
        }

        let data = transport::execute(
            &*self.transport,
            &document,
            json!({"input": Json::Object(input)}),
        )
        .await?;
        let payload = node(&data, &["productUpdate"])?;
        check_user_errors(payload)?;
        decode_product_row(&attachments, &self.prefix, node(payload, &["product"])?)
    }

    fn product_attachment(&self, key: &str) -> Option<&AttachmentDefinition> {
        self.schema
            .attachments
            .iter()
            .find(|a| a.owner_type == OwnerType::Product && a.key == key)
    }

    /// Resolve the projection against product-owned attachment keys
    fn select_attachments(&self, projection: &Projection) -> Result<Vec<AttachmentDefinition>> {
        let declared: Vec<&AttachmentDefinition> = self
            .schema
            .attachments
            .iter()
            .filter(|a| a.owner_type == OwnerType::Product)
            .collect();
        let check = |keys: &[String]| -> Result<()> {
            for key in keys {
                if !declared.iter().any(|a| &a.key == key) {
                    return Err(Error::UnknownField(key.clone()));
                }
            }
            Ok(())
        };
        let selected = match projection {
            Projection::All => declared,
            Projection::Include(keys) => {
                check(keys)?;
                declared
                    .into_iter()
                    .filter(|a| keys.contains(&a.key))
                    .collect()
            }
            Projection::Exclude(keys) => {
                check(keys)?;
                declared
                    .into_iter()
                    .filter(|a| !keys.contains(&a.key))
                    .collect()
            }
        };
        Ok(selected.into_iter().cloned().collect())
    }
}

fn selection_body(attachments: &[AttachmentDefinition], prefix: &str) -> String {
    let mut body = String::from(
        "id\ntitle\nhandle\nstatus\nvendor\nproductType\ntags\ncreatedAt\nupdatedAt",
    );
    for attachment in attachments {
        let namespace = attachment.prefixed_namespace(prefix);
        let _ = write!(
            body,
            "\n{alias}: attachment(namespace: \"{ns}\", key: \"{key}\") {{ id key value }}",
            alias = graphql_alias(&namespace, &attachment.key),
            ns = namespace,
            key = attachment.key,
        );
    }
    body
}

fn decode_product_row(
    attachments: &[AttachmentDefinition],
    prefix: &str,
    row: &Json,
) -> Result<ProductRecord> {
    let mut decoded = BTreeMap::new();
    for attachment in attachments {
        let alias = graphql_alias(&attachment.prefixed_namespace(prefix), &attachment.key);
        let cell = row.get(&alias).filter(|c| !c.is_null());
        decoded.insert(
            attachment.key.clone(),
            decode_attachment_value(attachment.field.field_type, cell)?,
        );
    }
    Ok(ProductRecord {
        id: string_at(row, &["id"])?,
        title: string_at(row, &["title"])?,
        handle: string_at(row, &["handle"])?,
        status: opt_string(row, "status"),
        vendor: opt_string(row, "vendor"),
        product_type: opt_string(row, "productType"),
        tags: row
            .get("tags")
            .and_then(Json::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Json::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        created_at: timestamp(row, "createdAt")?,
        updated_at: timestamp(row, "updatedAt")?,
        attachments: decoded,
    })
}

fn opt_string(row: &Json, key: &str) -> Option<String> {
    row.get(key).and_then(Json::as_str).map(str::to_string)
}

fn timestamp(row: &Json, key: &str) -> Result<Option<DateTime<Utc>>> {
    match row.get(key).and_then(Json::as_str) {
        Some(wire) => DateTime::parse_from_rfc3339(wire)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| Error::response(format!("bad {} timestamp: {}", key, e))),
        None => Ok(None),
    }
}
