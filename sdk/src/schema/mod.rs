//! Schema declaration: entities, attachments and build-time checks
//!
//! A `Schema` is the full local declaration a client reconciles against
//! the remote. It is built exactly once through `SchemaBuilder`, which
//! rejects declarations the remote would refuse anyway (bad charsets,
//! duplicate keys, out-of-range lengths) so those surface at startup
//! instead of mid-reconciliation.

pub mod attachment;
pub mod entity;
pub mod field;

pub use attachment::{AttachmentDefinition, OwnerType};
pub use entity::EntityDefinition;
pub use field::FieldDefinition;

use crate::error::{Error, Result};
use std::collections::HashSet;

const TYPE_MIN_LEN: usize = 3;
const TYPE_MAX_LEN: usize = 255;
const KEY_MIN_LEN: usize = 3;
const KEY_MAX_LEN: usize = 64;

/// The complete local declaration for one installation
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub entities: Vec<EntityDefinition>,
    pub attachments: Vec<AttachmentDefinition>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn entity(&self, entity_type: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.entity_type == entity_type)
    }
}

#[derive(Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityDefinition>,
    attachments: Vec<AttachmentDefinition>,
}

impl SchemaBuilder {
    pub fn entity(mut self, definition: impl Into<EntityDefinition>) -> Self {
        self.entities.push(definition.into());
        self
    }

    pub fn attachment(mut self, definition: impl Into<AttachmentDefinition>) -> Self {
        self.attachments.push(definition.into());
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut types = HashSet::new();
        for entity in &self.entities {
            validate_identifier("entity type", &entity.entity_type, TYPE_MIN_LEN, TYPE_MAX_LEN)?;
            if !types.insert(entity.entity_type.as_str()) {
                return Err(Error::schema(format!(
                    "duplicate entity type '{}'",
                    entity.entity_type
                )));
            }
            validate_fields(entity)?;
        }

        let mut identities = HashSet::new();
        for attachment in &self.attachments {
            validate_identifier("attachment key", &attachment.key, KEY_MIN_LEN, KEY_MAX_LEN)?;
            if let Some(ns) = &attachment.namespace {
                validate_identifier("attachment namespace", ns, KEY_MIN_LEN, KEY_MAX_LEN)?;
            }
            let identity = (
                attachment.namespace.clone(),
                attachment.owner_type,
                attachment.key.clone(),
            );
            if !identities.insert(identity) {
                return Err(Error::schema(format!(
                    "duplicate attachment key '{}'",
                    attachment.key
                )));
            }
        }

        Ok(Schema {
            entities: self.entities,
            attachments: self.attachments,
        })
    }
}

fn validate_fields(entity: &EntityDefinition) -> Result<()> {
    let mut aliases = HashSet::new();
    let mut keys = HashSet::new();
    for (alias, field) in &entity.fields {
        if alias.is_empty() {
            return Err(Error::schema(format!(
                "entity '{}' declares a field with an empty alias",
                entity.entity_type
            )));
        }
        if !aliases.insert(alias.as_str()) {
            return Err(Error::schema(format!(
                "entity '{}' declares alias '{}' twice",
                entity.entity_type, alias
            )));
        }
        let key = field.resolved_key(alias);
        validate_identifier("field key", key, KEY_MIN_LEN, KEY_MAX_LEN)?;
        if !keys.insert(key.to_string()) {
            return Err(Error::schema(format!(
                "entity '{}' declares field key '{}' twice",
                entity.entity_type, key
            )));
        }
    }
    Ok(())
}

fn validate_identifier(what: &str, value: &str, min: usize, max: usize) -> Result<()> {
    if value.len() < min || value.len() > max {
        return Err(Error::schema(format!(
            "{} '{}' must be between {} and {} characters",
            what, value, min, max
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::schema(format!(
            "{} '{}' may only contain alphanumerics, hyphens and underscores",
            what, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field as f;

    fn book() -> EntityDefinition {
        EntityDefinition::build("book")
            .field("title", f::single_line_text().required())
            .field("pages", f::integer())
            .into()
    }

    #[test]
    fn test_valid_schema_builds() {
        let schema = Schema::builder()
            .entity(book())
            .attachment(AttachmentDefinition::build(
                "warranty_months",
                OwnerType::Product,
                f::integer(),
            ))
            .build()
            .unwrap();
        assert_eq!(schema.entities.len(), 1);
        assert_eq!(schema.attachments.len(), 1);
        assert!(schema.entity("book").is_some());
    }

    #[test]
    fn test_duplicate_entity_type_rejected() {
        let err = Schema::builder()
            .entity(book())
            .entity(book())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_duplicate_field_key_rejected() {
        let entity: EntityDefinition = EntityDefinition::build("book")
            .field("title", f::single_line_text())
            .field("subtitle", f::single_line_text().key("title"))
            .into();
        let err = Schema::builder().entity(entity).build().unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_identifier_charset_enforced() {
        let entity: EntityDefinition = EntityDefinition::build("bad type").into();
        assert!(Schema::builder().entity(entity).build().is_err());

        let entity: EntityDefinition = EntityDefinition::build("ok")
            .field("x", f::integer())
            .into();
        // type below the minimum length
        assert!(Schema::builder().entity(entity).build().is_err());
    }
}
