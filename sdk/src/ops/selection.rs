//! Field selection and result decoding
//!
//! A `Projection` names which declared fields an operation should fetch.
//! From it we render the GraphQL selection body (meta fields aliased with
//! a leading underscore, declared fields fetched by key through variables
//! named `field0..fieldN`) and decode returned rows back through the
//! field codecs.

use crate::codec::FieldType;
use crate::error::{Error, Result};
use crate::schema::EntityDefinition;
use crate::transport::{node, string_at};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Which declared fields to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Meta fields plus every declared field
    All,
    /// Meta fields plus exactly these aliases
    Include(Vec<String>),
    /// Meta fields plus every declared field except these aliases
    Exclude(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::All
    }
}

impl Projection {
    pub fn include<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Include(aliases.into_iter().map(Into::into).collect())
    }

    pub fn exclude<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Exclude(aliases.into_iter().map(Into::into).collect())
    }

    /// Build a projection from per-alias flags. All `true` flags select
    /// those aliases; all `false` flags deselect them; mixing the two is
    /// an error, as is an empty map.
    pub fn from_flags<I, S>(flags: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        for (alias, flag) in flags {
            if flag {
                included.push(alias.into());
            } else {
                excluded.push(alias.into());
            }
        }
        match (included.is_empty(), excluded.is_empty()) {
            (true, true) => Err(Error::EmptySelection),
            (false, false) => Err(Error::MixedProjection),
            (false, true) => Ok(Projection::Include(included)),
            (true, false) => Ok(Projection::Exclude(excluded)),
        }
    }

    /// Resolve against a definition into selection order, rejecting
    /// unknown aliases before anything reaches the wire
    pub(crate) fn resolve(&self, entity: &EntityDefinition) -> Result<Vec<String>> {
        let declared: Vec<&str> = entity.fields.iter().map(|(a, _)| a.as_str()).collect();
        let check = |aliases: &[String]| -> Result<()> {
            for alias in aliases {
                if !declared.contains(&alias.as_str()) {
                    return Err(Error::UnknownField(alias.clone()));
                }
            }
            Ok(())
        };
        match self {
            Projection::All => Ok(declared.iter().map(|a| a.to_string()).collect()),
            Projection::Include(aliases) => {
                check(aliases)?;
                if aliases.is_empty() {
                    return Err(Error::EmptySelection);
                }
                Ok(declared
                    .iter()
                    .filter(|a| aliases.iter().any(|x| x == *a))
                    .map(|a| a.to_string())
                    .collect())
            }
            Projection::Exclude(aliases) => {
                check(aliases)?;
                let selected: Vec<String> = declared
                    .iter()
                    .filter(|a| !aliases.iter().any(|x| x == *a))
                    .map(|a| a.to_string())
                    .collect();
                // excluding every declared field leaves nothing to fetch
                if selected.is_empty() && !declared.is_empty() {
                    return Err(Error::EmptySelection);
                }
                Ok(selected)
            }
        }
    }
}

/// A rendered selection over one entity definition
#[derive(Debug, Clone)]
pub(crate) struct EntitySelection {
    /// Selected aliases, in declaration order
    pub aliases: Vec<String>,
    /// GraphQL selection body
    pub body: String,
    /// Extra variable definitions, e.g. `, $field0: String!`
    pub variable_defs: String,
    /// Variable name to remote key
    pub variables: Vec<(String, String)>,
}

pub(crate) fn entity_selection(
    entity: &EntityDefinition,
    projection: &Projection,
) -> Result<EntitySelection> {
    let aliases = projection.resolve(entity)?;
    let mut body = String::from("_id: id\n_handle: handle\n_updatedAt: updatedAt");
    let mut variable_defs = String::new();
    let mut variables = Vec::with_capacity(aliases.len());
    for (i, alias) in aliases.iter().enumerate() {
        let var = format!("field{}", i);
        let field = entity
            .field(alias)
            .ok_or_else(|| Error::UnknownField(alias.clone()))?;
        let _ = write!(body, "\n{}: field(key: ${}) {{ value }}", var, var);
        let _ = write!(variable_defs, ", ${}: String!", var);
        variables.push((var, field.resolved_key(alias).to_string()));
    }
    Ok(EntitySelection {
        aliases,
        body,
        variable_defs,
        variables,
    })
}

/// One decoded entity row
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: String,
    pub handle: String,
    pub updated_at: Option<DateTime<Utc>>,
    /// Alias to decoded value; `None` when the remote holds no value
    pub fields: BTreeMap<String, Option<Value>>,
}

impl EntityRecord {
    pub fn field(&self, alias: &str) -> Option<&Value> {
        self.fields.get(alias).and_then(|v| v.as_ref())
    }
}

pub(crate) fn decode_entity_row(
    entity: &EntityDefinition,
    selection: &EntitySelection,
    row: &Json,
) -> Result<EntityRecord> {
    let id = string_at(row, &["_id"])?;
    let handle = string_at(row, &["_handle"])?;
    let updated_at = match row.get("_updatedAt").and_then(Json::as_str) {
        Some(wire) => Some(
            DateTime::parse_from_rfc3339(wire)
                .map_err(|e| Error::response(format!("bad _updatedAt timestamp: {}", e)))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    let mut fields = BTreeMap::new();
    for (i, alias) in selection.aliases.iter().enumerate() {
        let field = entity
            .field(alias)
            .ok_or_else(|| Error::UnknownField(alias.clone()))?;
        let wire = row
            .get(format!("field{}", i))
            .and_then(|f| f.get("value"))
            .and_then(Json::as_str);
        let value = match wire {
            Some(wire) => Some(field.field_type.decode(wire)?),
            None => None,
        };
        fields.insert(alias.clone(), value);
    }
    Ok(EntityRecord {
        id,
        handle,
        updated_at,
        fields,
    })
}

/// GraphQL aliases cannot carry hyphens; declared identifiers can
pub(crate) fn graphql_alias(namespace: &str, key: &str) -> String {
    format!("{}_{}", namespace, key).replace('-', "_")
}

pub(crate) fn decode_attachment_value(
    field_type: FieldType,
    cell: Option<&Json>,
) -> Result<Option<Value>> {
    let Some(cell) = cell else { return Ok(None) };
    let Some(wire) = node(cell, &["value"]).ok().and_then(Json::as_str) else {
        return Ok(None);
    };
    Ok(Some(field_type.decode(wire)?))
}
