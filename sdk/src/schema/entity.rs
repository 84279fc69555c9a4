//! Entity definitions: named bags of typed fields
//!
//! An entity definition declares a custom record type the remote should
//! carry. The declared `entity_type` is always namespaced with the client
//! prefix before it reaches the wire, so two installations can share a
//! store without colliding.

use super::field::FieldDefinition;

/// A declared entity type and its ordered fields
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDefinition {
    pub name: String,
    pub entity_type: String,
    pub description: Option<String>,
    pub display_name_key: Option<String>,
    /// Alias to definition, in declaration order
    pub fields: Vec<(String, FieldDefinition)>,
}

impl EntityDefinition {
    pub fn build(entity_type: impl Into<String>) -> EntityDefinitionBuilder {
        let entity_type = entity_type.into();
        EntityDefinitionBuilder {
            def: EntityDefinition {
                name: entity_type.clone(),
                entity_type,
                description: None,
                display_name_key: None,
                fields: Vec::new(),
            },
        }
    }

    /// The wire type string under the given client prefix
    pub fn prefixed_type(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.entity_type)
    }

    pub fn field(&self, alias: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, f)| f)
    }

    /// The remote key each alias resolves to, in declaration order
    pub fn resolved_keys(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.fields
            .iter()
            .map(|(alias, field)| (field.resolved_key(alias), field))
    }
}

pub struct EntityDefinitionBuilder {
    def: EntityDefinition,
}

impl EntityDefinitionBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.def.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.def.description = Some(description.into());
        self
    }

    /// Which field supplies the record's display name
    pub fn display_name_key(mut self, key: impl Into<String>) -> Self {
        self.def.display_name_key = Some(key.into());
        self
    }

    pub fn field(mut self, alias: impl Into<String>, field: impl Into<FieldDefinition>) -> Self {
        self.def.fields.push((alias.into(), field.into()));
        self
    }
}

impl From<EntityDefinitionBuilder> for EntityDefinition {
    fn from(builder: EntityDefinitionBuilder) -> Self {
        builder.def
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field;

    #[test]
    fn test_builder_preserves_declaration_order() {
        let def: EntityDefinition = EntityDefinition::build("book")
            .name("Book")
            .field("title", field::single_line_text().required())
            .field("pages", field::integer())
            .into();
        let aliases: Vec<&str> = def.fields.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(aliases, ["title", "pages"]);
        assert!(def.field("title").unwrap().required);
    }

    #[test]
    fn test_prefixed_type() {
        let def: EntityDefinition = EntityDefinition::build("book").into();
        assert_eq!(def.prefixed_type("acme"), "acme_book");
    }

    #[test]
    fn test_resolved_keys_honor_overrides() {
        let def: EntityDefinition = EntityDefinition::build("book")
            .field("title", field::single_line_text())
            .field("pages", field::integer().key("page_count"))
            .into();
        let keys: Vec<&str> = def.resolved_keys().map(|(k, _)| k).collect();
        assert_eq!(keys, ["title", "page_count"]);
    }
}
