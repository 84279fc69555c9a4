//! Attachment definitions: single typed fields pinned onto native resources
//!
//! Where an entity definition declares a whole new record type, an
//! attachment bolts one extra field onto a resource the remote already
//! has (a product, a customer, ...). Attachments are addressed by
//! `namespace.key`; the namespace is always derived from the client
//! prefix so reconciliation only ever sees this installation's rows.

use super::field::FieldDefinition;
use serde::{Deserialize, Serialize};

/// The native resource an attachment hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    Product,
    ProductVariant,
    Collection,
    Customer,
    Order,
}

impl OwnerType {
    pub const ALL: [OwnerType; 5] = [
        OwnerType::Product,
        OwnerType::ProductVariant,
        OwnerType::Collection,
        OwnerType::Customer,
        OwnerType::Order,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            OwnerType::Product => "PRODUCT",
            OwnerType::ProductVariant => "PRODUCT_VARIANT",
            OwnerType::Collection => "COLLECTION",
            OwnerType::Customer => "CUSTOMER",
            OwnerType::Order => "ORDER",
        }
    }
}

/// One declared attachment field
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDefinition {
    pub name: String,
    pub key: String,
    /// Suffix appended to the client prefix. `None` means the namespace is
    /// the bare prefix.
    pub namespace: Option<String>,
    pub description: Option<String>,
    pub owner_type: OwnerType,
    pub pinned: bool,
    pub field: FieldDefinition,
}

impl AttachmentDefinition {
    pub fn build(
        key: impl Into<String>,
        owner_type: OwnerType,
        field: impl Into<FieldDefinition>,
    ) -> AttachmentDefinitionBuilder {
        let key = key.into();
        AttachmentDefinitionBuilder {
            def: AttachmentDefinition {
                name: key.clone(),
                key,
                namespace: None,
                description: None,
                owner_type,
                pinned: false,
                field: field.into(),
            },
        }
    }

    /// The wire namespace under the given client prefix
    pub fn prefixed_namespace(&self, prefix: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}_{}", prefix, ns),
            None => prefix.to_string(),
        }
    }

    /// The `namespace.key` identity used to match local against remote
    pub fn identity(&self, prefix: &str) -> String {
        format!("{}.{}", self.prefixed_namespace(prefix), self.key)
    }
}

pub struct AttachmentDefinitionBuilder {
    def: AttachmentDefinition,
}

impl AttachmentDefinitionBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.def.name = name.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.def.namespace = Some(namespace.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.def.description = Some(description.into());
        self
    }

    /// Show the field in the remote admin surface by default
    pub fn pinned(mut self) -> Self {
        self.def.pinned = true;
        self
    }
}

impl From<AttachmentDefinitionBuilder> for AttachmentDefinition {
    fn from(builder: AttachmentDefinitionBuilder) -> Self {
        builder.def
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field;

    #[test]
    fn test_namespace_defaults_to_bare_prefix() {
        let def: AttachmentDefinition =
            AttachmentDefinition::build("warranty", OwnerType::Product, field::integer()).into();
        assert_eq!(def.prefixed_namespace("acme"), "acme");
        assert_eq!(def.identity("acme"), "acme.warranty");
    }

    #[test]
    fn test_declared_namespace_is_prefixed() {
        let def: AttachmentDefinition =
            AttachmentDefinition::build("warranty", OwnerType::Product, field::integer())
                .namespace("support")
                .into();
        assert_eq!(def.prefixed_namespace("acme"), "acme_support");
        assert_eq!(def.identity("acme"), "acme_support.warranty");
    }
}
