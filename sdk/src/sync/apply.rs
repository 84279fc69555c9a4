//! Plan execution
//!
//! Runs a `SchemaPlan` strictly in order: entity creates, entity updates,
//! entity deletes, then the same three phases for attachments. One
//! mutation per definition; the first failure aborts the remainder, so a
//! partially applied plan is simply re-diffed and re-applied.
//!
//! Entity-reference validations enter the plan as prefixed type strings
//! and leave here as remote definition ids. Ids are learned from the
//! introspected remote state and from create responses as they arrive,
//! which means a definition may only reference types declared before it.

use super::diff::{
    AttachmentCreate, AttachmentUpdate, EntityCreate, EntityUpdate, FieldCreate, FieldPatch,
    SchemaPlan,
};
use super::introspect::RemoteEntityDefinition;
use crate::error::{Error, Result};
use crate::transport::{self, Transport, check_user_errors, node, string_at};
use crate::validation::ValidationRule;
use serde_json::{Map, Value as Json, json};
use std::collections::HashMap;
use tracing::{debug, info};

const ENTITY_CREATE: &str = "\
mutation EntityDefinitionCreate($definition: EntityDefinitionCreateInput!) {
  entityDefinitionCreate(definition: $definition) {
    entityDefinition { id type }
    userErrors { field message }
  }
}";

const ENTITY_UPDATE: &str = "\
mutation EntityDefinitionUpdate($id: ID!, $definition: EntityDefinitionUpdateInput!) {
  entityDefinitionUpdate(id: $id, definition: $definition) {
    entityDefinition { id }
    userErrors { field message }
  }
}";

const ENTITY_DELETE: &str = "\
mutation EntityDefinitionDelete($id: ID!) {
  entityDefinitionDelete(id: $id) {
    deletedId
    userErrors { field message }
  }
}";

const ATTACHMENT_CREATE: &str = "\
mutation AttachmentDefinitionCreate($definition: AttachmentDefinitionInput!) {
  attachmentDefinitionCreate(definition: $definition) {
    createdDefinition { id }
    userErrors { field message }
  }
}";

const ATTACHMENT_UPDATE: &str = "\
mutation AttachmentDefinitionUpdate($definition: AttachmentDefinitionUpdateInput!) {
  attachmentDefinitionUpdate(definition: $definition) {
    updatedDefinition { id }
    userErrors { field message }
  }
}";

const ATTACHMENT_DELETE: &str = "\
mutation AttachmentDefinitionDelete($id: ID!) {
  attachmentDefinitionDelete(id: $id) {
    deletedDefinitionId
    userErrors { field message }
  }
}";

const ENTITY_DEFINITION_ID_QUERY: &str = "\
query EntityDefinitionId($type: String!) {
  entityDefinitionByType(type: $type) { id }
}";

/// Execute the plan against the remote
pub async fn apply_plan(
    transport: &dyn Transport,
    plan: &SchemaPlan,
    remote_entities: &[RemoteEntityDefinition],
) -> Result<()> {
    info!(
        entity_creates = plan.entities.create.len(),
        entity_updates = plan.entities.update.len(),
        entity_deletes = plan.entities.delete.len(),
        attachment_creates = plan.attachments.create.len(),
        attachment_updates = plan.attachments.update.len(),
        attachment_deletes = plan.attachments.delete.len(),
        "applying schema plan"
    );

    let mut refs = ReferenceIds::new(remote_entities);

    for create in &plan.entities.create {
        debug!(entity_type = %create.entity_type, "creating entity definition");
        let data = transport::execute(
            transport,
            ENTITY_CREATE,
            json!({"definition": entity_create_input(transport, create, &mut refs).await?}),
        )
        .await?;
        let payload = node(&data, &["entityDefinitionCreate"])?;
        check_user_errors(payload)?;
        let id = string_at(payload, &["entityDefinition", "id"])?;
        refs.learn(create.entity_type.clone(), id);
    }

    for update in &plan.entities.update {
        debug!(entity_type = %update.entity_type, "updating entity definition");
        let data = transport::execute(
            transport,
            ENTITY_UPDATE,
            json!({
                "id": update.id,
                "definition": entity_update_input(transport, update, &mut refs).await?,
            }),
        )
        .await?;
        check_user_errors(node(&data, &["entityDefinitionUpdate"])?)?;
    }

    for id in &plan.entities.delete {
        debug!(%id, "deleting entity definition");
        let data = transport::execute(transport, ENTITY_DELETE, json!({"id": id})).await?;
        check_user_errors(node(&data, &["entityDefinitionDelete"])?)?;
    }

    for create in &plan.attachments.create {
        debug!(namespace = %create.namespace, key = %create.key, "creating attachment definition");
        let data = transport::execute(
            transport,
            ATTACHMENT_CREATE,
            json!({"definition": attachment_create_input(transport, create, &mut refs).await?}),
        )
        .await?;
        check_user_errors(node(&data, &["attachmentDefinitionCreate"])?)?;
    }

    for update in &plan.attachments.update {
        debug!(namespace = %update.namespace, key = %update.key, "updating attachment definition");
        let data = transport::execute(
            transport,
            ATTACHMENT_UPDATE,
            json!({"definition": attachment_update_input(transport, update, &mut refs).await?}),
        )
        .await?;
        check_user_errors(node(&data, &["attachmentDefinitionUpdate"])?)?;
    }

    for id in &plan.attachments.delete {
        debug!(%id, "deleting attachment definition");
        let data = transport::execute(transport, ATTACHMENT_DELETE, json!({"id": id})).await?;
        check_user_errors(node(&data, &["attachmentDefinitionDelete"])?)?;
    }

    Ok(())
}

/// Prefixed type string to remote definition id
struct ReferenceIds {
    ids: HashMap<String, String>,
}

impl ReferenceIds {
    fn new(remote: &[RemoteEntityDefinition]) -> Self {
        Self {
            ids: remote
                .iter()
                .map(|r| (r.entity_type.clone(), r.id.clone()))
                .collect(),
        }
    }

    fn learn(&mut self, entity_type: String, id: String) {
        self.ids.insert(entity_type, id);
    }

    async fn resolve(&mut self, transport: &dyn Transport, entity_type: &str) -> Result<String> {
        if let Some(id) = self.ids.get(entity_type) {
            return Ok(id.clone());
        }
        // last resort: the definition may exist outside the introspected set
        let data = transport::execute(
            transport,
            ENTITY_DEFINITION_ID_QUERY,
            json!({"type": entity_type}),
        )
        .await?;
        match string_at(&data, &["entityDefinitionByType", "id"]) {
            Ok(id) => {
                self.learn(entity_type.to_string(), id.clone());
                Ok(id)
            }
            Err(_) => Err(Error::schema(format!(
                "referenced entity type '{}' does not exist yet; declare it earlier in the schema",
                entity_type
            ))),
        }
    }
}

async fn validations_input(
    transport: &dyn Transport,
    rules: &[ValidationRule],
    refs: &mut ReferenceIds,
) -> Result<Json> {
    let mut out = Vec::with_capacity(rules.len());
    for rule in rules {
        let value = if rule.name == "entity_definition_id" {
            refs.resolve(transport, &rule.value).await?
        } else {
            rule.value.clone()
        };
        out.push(json!({"name": rule.name, "value": value}));
    }
    Ok(Json::Array(out))
}

async fn field_create_input(
    transport: &dyn Transport,
    field: &FieldCreate,
    refs: &mut ReferenceIds,
) -> Result<Json> {
    Ok(json!({
        "key": field.key,
        "name": field.name,
        "description": field.description,
        "required": field.required,
        "type": field.field_type,
        "validations": validations_input(transport, &field.validations, refs).await?,
    }))
}

async fn entity_create_input(
    transport: &dyn Transport,
    create: &EntityCreate,
    refs: &mut ReferenceIds,
) -> Result<Json> {
    let mut fields = Vec::with_capacity(create.fields.len());
    for field in &create.fields {
        fields.push(field_create_input(transport, field, refs).await?);
    }
    let mut input = Map::new();
    input.insert("type".into(), json!(create.entity_type));
    input.insert("name".into(), json!(create.name));
    if let Some(description) = &create.description {
        input.insert("description".into(), json!(description));
    }
    if let Some(key) = &create.display_name_key {
        input.insert("displayNameKey".into(), json!(key));
    }
    input.insert("fieldDefinitions".into(), Json::Array(fields));
    Ok(Json::Object(input))
}

async fn entity_update_input(
    transport: &dyn Transport,
    update: &EntityUpdate,
    refs: &mut ReferenceIds,
) -> Result<Json> {
    let mut input = Map::new();
    if let Some(name) = &update.name {
        input.insert("name".into(), json!(name));
    }
    if let Some(description) = &update.description {
        input.insert("description".into(), json!(description));
    }
    if let Some(key) = &update.display_name_key {
        input.insert("displayNameKey".into(), json!(key));
    }
    if !update.field_patches.is_empty() {
        let mut patches = Vec::with_capacity(update.field_patches.len());
        for patch in &update.field_patches {
            patches.push(match patch {
                FieldPatch::Create(field) => {
                    json!({"create": field_create_input(transport, field, refs).await?})
                }
                FieldPatch::Update(field) => {
                    let mut inner = Map::new();
                    inner.insert("key".into(), json!(field.key));
                    if let Some(name) = &field.name {
                        inner.insert("name".into(), json!(name));
                    }
                    if let Some(description) = &field.description {
                        inner.insert("description".into(), json!(description));
                    }
                    if let Some(required) = field.required {
                        inner.insert("required".into(), json!(required));
                    }
                    if let Some(validations) = &field.validations {
                        inner.insert(
                            "validations".into(),
                            validations_input(transport, validations, refs).await?,
                        );
                    }
                    json!({"update": Json::Object(inner)})
                }
                FieldPatch::Delete { key } => json!({"delete": {"key": key}}),
            });
        }
        input.insert("fieldDefinitions".into(), Json::Array(patches));
    }
    Ok(Json::Object(input))
}

async fn attachment_create_input(
    transport: &dyn Transport,
    create: &AttachmentCreate,
    refs: &mut ReferenceIds,
) -> Result<Json> {
    let mut input = Map::new();
    input.insert("namespace".into(), json!(create.namespace));
    input.insert("key".into(), json!(create.key));
    input.insert("name".into(), json!(create.name));
    if let Some(description) = &create.description {
        input.insert("description".into(), json!(description));
    }
    input.insert("ownerType".into(), json!(create.owner_type.wire_name()));
    input.insert("pin".into(), json!(create.pinned));
    input.insert("type".into(), json!(create.field_type));
    input.insert(
        "validations".into(),
        validations_input(transport, &create.validations, refs).await?,
    );
    Ok(Json::Object(input))
}

async fn attachment_update_input(
    transport: &dyn Transport,
    update: &AttachmentUpdate,
    refs: &mut ReferenceIds,
) -> Result<Json> {
    let mut input = Map::new();
    input.insert("namespace".into(), json!(update.namespace));
    input.insert("key".into(), json!(update.key));
    input.insert("ownerType".into(), json!(update.owner_type.wire_name()));
    if let Some(name) = &update.name {
        input.insert("name".into(), json!(name));
    }
    if let Some(description) = &update.description {
        input.insert("description".into(), json!(description));
    }
    if let Some(pinned) = update.pinned {
        input.insert("pin".into(), json!(pinned));
    }
    if let Some(validations) = &update.validations {
        input.insert(
            "validations".into(),
            validations_input(transport, validations, refs).await?,
        );
    }
    Ok(Json::Object(input))
}
