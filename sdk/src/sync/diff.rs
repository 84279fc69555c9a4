//! Schema diff: local declarations against remote definitions
//!
//! Produces the minimal set of create/update/delete mutations that make
//! the remote match the local schema. Pure and synchronous: both inputs
//! are already in memory, so diffing the same pair twice yields the same
//! plan, and diffing right after a successful apply yields an empty one.
//!
//! Comparison defaults mirror what the remote fills in on create: a field
//! name defaults to its key, descriptions default to the empty string,
//! required defaults to false. Validations are compared order-insensitively
//! by sorting both sides by rule name first. Entity-reference validations
//! are compared as prefixed type strings; the remote ids only appear again
//! at apply time.

use super::introspect::{RemoteAttachmentDefinition, RemoteEntityDefinition};
use super::ReconcileMode;
use crate::schema::{AttachmentDefinition, EntityDefinition, FieldDefinition, OwnerType, Schema};
use crate::validation::{self, ValidationRule};
use std::collections::{HashMap, HashSet};

/// Everything `apply` needs to reconcile one schema
#[derive(Debug, Clone, Default)]
pub struct SchemaPlan {
    pub entities: DefinitionPlan<EntityCreate, EntityUpdate>,
    pub attachments: DefinitionPlan<AttachmentCreate, AttachmentUpdate>,
}

impl SchemaPlan {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.attachments.is_empty()
    }
}

/// Mutations for one definition kind, executed create → update → delete
#[derive(Debug, Clone)]
pub struct DefinitionPlan<C, U> {
    pub create: Vec<C>,
    pub update: Vec<U>,
    /// Remote definition ids to delete
    pub delete: Vec<String>,
}

impl<C, U> Default for DefinitionPlan<C, U> {
    fn default() -> Self {
        Self {
            create: Vec::new(),
            update: Vec::new(),
            delete: Vec::new(),
        }
    }
}

impl<C, U> DefinitionPlan<C, U> {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// A full entity definition ready to create, already prefixed
#[derive(Debug, Clone)]
pub struct EntityCreate {
    pub entity_type: String,
    pub name: String,
    pub description: Option<String>,
    pub display_name_key: Option<String>,
    pub fields: Vec<FieldCreate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCreate {
    pub key: String,
    pub name: String,
    pub description: String,
    pub required: bool,
    /// Wire type tag
    pub field_type: String,
    pub validations: Vec<ValidationRule>,
}

/// The changed attributes of one matched entity definition
#[derive(Debug, Clone)]
pub struct EntityUpdate {
    pub id: String,
    pub entity_type: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_name_key: Option<String>,
    pub field_patches: Vec<FieldPatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch {
    Create(FieldCreate),
    Update(FieldUpdate),
    Delete { key: String },
}

/// Changed attributes only; `None` means unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub key: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub validations: Option<Vec<ValidationRule>>,
}

impl FieldUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.required.is_none()
            && self.validations.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct AttachmentCreate {
    pub namespace: String,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_type: OwnerType,
    pub pinned: bool,
    pub field_type: String,
    pub validations: Vec<ValidationRule>,
}

/// Update inputs always re-state the attachment identity alongside the
/// changed attributes
#[derive(Debug, Clone)]
pub struct AttachmentUpdate {
    pub id: String,
    pub namespace: String,
    pub key: String,
    pub owner_type: OwnerType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub pinned: Option<bool>,
    pub validations: Option<Vec<ValidationRule>>,
}

/// Compare the local schema against the remote state and build the plan
pub fn diff_schema(
    schema: &Schema,
    prefix: &str,
    remote_entities: &[RemoteEntityDefinition],
    remote_attachments: &[RemoteAttachmentDefinition],
    mode: ReconcileMode,
) -> SchemaPlan {
    SchemaPlan {
        entities: diff_entities(schema, prefix, remote_entities, mode),
        attachments: diff_attachments(schema, prefix, remote_attachments, mode),
    }
}

fn diff_entities(
    schema: &Schema,
    prefix: &str,
    remote: &[RemoteEntityDefinition],
    mode: ReconcileMode,
) -> DefinitionPlan<EntityCreate, EntityUpdate> {
    let local_types: HashSet<String> = schema
        .entities
        .iter()
        .map(|e| e.prefixed_type(prefix))
        .collect();
    let remote: Vec<&RemoteEntityDefinition> = remote
        .iter()
        .filter(|r| mode == ReconcileMode::Delete || local_types.contains(&r.entity_type))
        .collect();
    let by_type: HashMap<&str, &RemoteEntityDefinition> =
        remote.iter().map(|r| (r.entity_type.as_str(), *r)).collect();

    let mut plan = DefinitionPlan::default();
    for entity in &schema.entities {
        let prefixed = entity.prefixed_type(prefix);
        match by_type.get(prefixed.as_str()) {
            None => plan.create.push(entity_create(entity, prefix, &prefixed)),
            Some(existing) => {
                if let Some(update) = entity_update(entity, prefix, &prefixed, existing) {
                    plan.update.push(update);
                }
            }
        }
    }
    for r in &remote {
        if !local_types.contains(&r.entity_type) {
            plan.delete.push(r.id.clone());
        }
    }
    plan
}

fn entity_create(entity: &EntityDefinition, prefix: &str, prefixed: &str) -> EntityCreate {
    EntityCreate {
        entity_type: prefixed.to_string(),
        name: entity.name.clone(),
        description: entity.description.clone(),
        display_name_key: entity.display_name_key.clone(),
        fields: entity
            .resolved_keys()
            .map(|(key, field)| field_create(key, field, prefix))
            .collect(),
    }
}

fn entity_update(
    entity: &EntityDefinition,
    prefix: &str,
    prefixed: &str,
    remote: &RemoteEntityDefinition,
) -> Option<EntityUpdate> {
    let mut update = EntityUpdate {
        id: remote.id.clone(),
        entity_type: prefixed.to_string(),
        name: None,
        description: None,
        display_name_key: None,
        field_patches: Vec::new(),
    };

    if entity.name != remote.name {
        update.name = Some(entity.name.clone());
    }
    let local_description = entity.description.as_deref().unwrap_or("");
    if local_description != remote.description.as_deref().unwrap_or("") {
        update.description = Some(local_description.to_string());
    }
    if entity.display_name_key != remote.display_name_key {
        update.display_name_key = entity.display_name_key.clone();
    }

    let remote_fields: HashMap<&str, _> =
        remote.fields.iter().map(|f| (f.key.as_str(), f)).collect();
    let mut local_keys = HashSet::new();
    for (key, field) in entity.resolved_keys() {
        local_keys.insert(key.to_string());
        let local = field_create(key, field, prefix);
        match remote_fields.get(key) {
            None => update.field_patches.push(FieldPatch::Create(local)),
            Some(existing) => {
                let mut patch = FieldUpdate {
                    key: key.to_string(),
                    ..FieldUpdate::default()
                };
                if local.name != existing.name {
                    patch.name = Some(local.name.clone());
                }
                if local.description != existing.description.as_deref().unwrap_or("") {
                    patch.description = Some(local.description.clone());
                }
                if local.required != existing.required {
                    patch.required = Some(local.required);
                }
                if validation::sorted(&local.validations) != validation::sorted(&existing.validations)
                {
                    patch.validations = Some(local.validations.clone());
                }
                if !patch.is_empty() {
                    update.field_patches.push(FieldPatch::Update(patch));
                }
            }
        }
    }
    for f in &remote.fields {
        if !local_keys.contains(&f.key) {
            update
                .field_patches
                .push(FieldPatch::Delete { key: f.key.clone() });
        }
    }

    let unchanged = update.name.is_none()
        && update.description.is_none()
        && update.display_name_key.is_none()
        && update.field_patches.is_empty();
    (!unchanged).then_some(update)
}

fn field_create(key: &str, field: &FieldDefinition, prefix: &str) -> FieldCreate {
    FieldCreate {
        key: key.to_string(),
        name: field.name.clone().unwrap_or_else(|| key.to_string()),
        description: field.description.clone().unwrap_or_default(),
        required: field.required,
        field_type: field.field_type.wire_name().to_string(),
        validations: prefix_references(&field.validations, prefix),
    }
}

/// Entity-reference validations hold the declared (unprefixed) type; the
/// remote side holds the prefixed one
fn prefix_references(rules: &[ValidationRule], prefix: &str) -> Vec<ValidationRule> {
    rules
        .iter()
        .map(|rule| {
            if rule.name == "entity_definition_id" {
                ValidationRule::new(rule.name.clone(), format!("{}_{}", prefix, rule.value))
            } else {
                rule.clone()
            }
        })
        .collect()
}

fn diff_attachments(
    schema: &Schema,
    prefix: &str,
    remote: &[RemoteAttachmentDefinition],
    mode: ReconcileMode,
) -> DefinitionPlan<AttachmentCreate, AttachmentUpdate> {
    let local_identities: HashSet<(OwnerType, String)> = schema
        .attachments
        .iter()
        .map(|a| (a.owner_type, a.identity(prefix)))
        .collect();
    let remote: Vec<&RemoteAttachmentDefinition> = remote
        .iter()
        .filter(|r| {
            mode == ReconcileMode::Delete
                || local_identities.contains(&(r.owner_type, r.identity()))
        })
        .collect();
    let by_identity: HashMap<(OwnerType, String), &RemoteAttachmentDefinition> = remote
        .iter()
        .map(|r| ((r.owner_type, r.identity()), *r))
        .collect();

    let mut plan = DefinitionPlan::default();
    for attachment in &schema.attachments {
        let identity = (attachment.owner_type, attachment.identity(prefix));
        match by_identity.get(&identity) {
            None => plan.create.push(attachment_create(attachment, prefix)),
            Some(existing) => {
                if let Some(update) = attachment_update(attachment, prefix, existing) {
                    plan.update.push(update);
                }
            }
        }
    }
    for r in &remote {
        if !local_identities.contains(&(r.owner_type, r.identity())) {
            plan.delete.push(r.id.clone());
        }
    }
    plan
}

fn attachment_create(attachment: &AttachmentDefinition, prefix: &str) -> AttachmentCreate {
    AttachmentCreate {
        namespace: attachment.prefixed_namespace(prefix),
        key: attachment.key.clone(),
        name: attachment.name.clone(),
        description: attachment.description.clone(),
        owner_type: attachment.owner_type,
        pinned: attachment.pinned,
        field_type: attachment.field.field_type.wire_name().to_string(),
        validations: prefix_references(&attachment.field.validations, prefix),
    }
}

fn attachment_update(
    attachment: &AttachmentDefinition,
    prefix: &str,
    remote: &RemoteAttachmentDefinition,
) -> Option<AttachmentUpdate> {
    let mut update = AttachmentUpdate {
        id: remote.id.clone(),
        namespace: attachment.prefixed_namespace(prefix),
        key: attachment.key.clone(),
        owner_type: attachment.owner_type,
        name: None,
        description: None,
        pinned: None,
        validations: None,
    };

    if attachment.name != remote.name {
        update.name = Some(attachment.name.clone());
    }
    let local_description = attachment.description.as_deref().unwrap_or("");
    if local_description != remote.description.as_deref().unwrap_or("") {
        update.description = Some(local_description.to_string());
    }
    if attachment.pinned != remote.pinned {
        update.pinned = Some(attachment.pinned);
    }
    let local_validations = prefix_references(&attachment.field.validations, prefix);
    if validation::sorted(&local_validations) != validation::sorted(&remote.validations) {
        update.validations = Some(local_validations);
    }

    let unchanged = update.name.is_none()
        && update.description.is_none()
        && update.pinned.is_none()
        && update.validations.is_none();
    (!unchanged).then_some(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field as f;
    use crate::sync::introspect::RemoteFieldDefinition;

    const PREFIX: &str = "acme";

    fn book_schema() -> Schema {
        Schema::builder()
            .entity(
                EntityDefinition::build("book")
                    .name("Book")
                    .field("title", f::single_line_text().required().min(1))
                    .field("pages", f::integer()),
            )
            .build()
            .unwrap()
    }

    fn remote_book() -> RemoteEntityDefinition {
        RemoteEntityDefinition {
            id: "gid://storecraft/EntityDefinition/1".into(),
            entity_type: "acme_book".into(),
            name: "Book".into(),
            description: None,
            display_name_key: None,
            fields: vec![
                RemoteFieldDefinition {
                    key: "title".into(),
                    name: "title".into(),
                    description: None,
                    required: true,
                    field_type: "single_line_text_field".into(),
                    validations: vec![ValidationRule::min("1")],
                },
                RemoteFieldDefinition {
                    key: "pages".into(),
                    name: "pages".into(),
                    description: Some("".into()),
                    required: false,
                    field_type: "number_integer".into(),
                    validations: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_missing_entity_is_created_with_prefixed_type() {
        let plan = diff_schema(&book_schema(), PREFIX, &[], &[], ReconcileMode::Delete);
        assert_eq!(plan.entities.create.len(), 1);
        let create = &plan.entities.create[0];
        assert_eq!(create.entity_type, "acme_book");
        assert_eq!(create.fields.len(), 2);
        assert_eq!(create.fields[0].name, "title");
        assert!(plan.entities.update.is_empty());
        assert!(plan.entities.delete.is_empty());
    }

    #[test]
    fn test_matching_state_yields_empty_plan() {
        let plan = diff_schema(
            &book_schema(),
            PREFIX,
            &[remote_book()],
            &[],
            ReconcileMode::Delete,
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_update_carries_only_changed_attributes() {
        let mut remote = remote_book();
        remote.fields[0].required = false;
        let plan = diff_schema(
            &book_schema(),
            PREFIX,
            &[remote],
            &[],
            ReconcileMode::Delete,
        );
        assert_eq!(plan.entities.update.len(), 1);
        let update = &plan.entities.update[0];
        assert!(update.name.is_none());
        assert_eq!(update.field_patches.len(), 1);
        let FieldPatch::Update(patch) = &update.field_patches[0] else {
            panic!("expected a field update");
        };
        assert_eq!(patch.key, "title");
        assert_eq!(patch.required, Some(true));
        assert!(patch.name.is_none());
        assert!(patch.validations.is_none());
    }

    #[test]
    fn test_validation_order_does_not_trigger_updates() {
        let schema = Schema::builder()
            .entity(
                EntityDefinition::build("book")
                    .name("Book")
                    .field("title", f::single_line_text().min(1).max(80)),
            )
            .build()
            .unwrap();
        let remote = RemoteEntityDefinition {
            id: "gid://storecraft/EntityDefinition/1".into(),
            entity_type: "acme_book".into(),
            name: "Book".into(),
            description: None,
            display_name_key: None,
            fields: vec![RemoteFieldDefinition {
                key: "title".into(),
                name: "title".into(),
                description: None,
                required: false,
                field_type: "single_line_text_field".into(),
                // reversed relative to the declaration
                validations: vec![ValidationRule::max("80"), ValidationRule::min("1")],
            }],
        };
        let plan = diff_schema(&schema, PREFIX, &[remote], &[], ReconcileMode::Delete);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_remote_only_field_is_deleted() {
        let mut remote = remote_book();
        remote.fields.push(RemoteFieldDefinition {
            key: "stale".into(),
            name: "stale".into(),
            description: None,
            required: false,
            field_type: "number_integer".into(),
            validations: vec![],
        });
        let plan = diff_schema(
            &book_schema(),
            PREFIX,
            &[remote],
            &[],
            ReconcileMode::Delete,
        );
        let update = &plan.entities.update[0];
        assert_eq!(
            update.field_patches,
            vec![FieldPatch::Delete { key: "stale".into() }]
        );
    }

    #[test]
    fn test_unknown_remote_entity_deleted_or_ignored() {
        let stranger = RemoteEntityDefinition {
            id: "gid://storecraft/EntityDefinition/9".into(),
            entity_type: "acme_legacy".into(),
            name: "Legacy".into(),
            description: None,
            display_name_key: None,
            fields: vec![],
        };
        let remotes = [remote_book(), stranger];

        let plan = diff_schema(&book_schema(), PREFIX, &remotes, &[], ReconcileMode::Delete);
        assert_eq!(plan.entities.delete, vec!["gid://storecraft/EntityDefinition/9"]);

        let plan = diff_schema(&book_schema(), PREFIX, &remotes, &[], ReconcileMode::Ignore);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_entity_reference_compares_as_prefixed_type() {
        let schema = Schema::builder()
            .entity(EntityDefinition::build("author").field("name", f::single_line_text()))
            .entity(
                EntityDefinition::build("book")
                    .field("author", f::entity_reference("author")),
            )
            .build()
            .unwrap();
        let remotes = [
            RemoteEntityDefinition {
                id: "gid://storecraft/EntityDefinition/1".into(),
                entity_type: "acme_author".into(),
                name: "author".into(),
                description: None,
                display_name_key: None,
                fields: vec![RemoteFieldDefinition {
                    key: "name".into(),
                    name: "name".into(),
                    description: None,
                    required: false,
                    field_type: "single_line_text_field".into(),
                    validations: vec![],
                }],
            },
            RemoteEntityDefinition {
                id: "gid://storecraft/EntityDefinition/2".into(),
                entity_type: "acme_book".into(),
                name: "book".into(),
                description: None,
                display_name_key: None,
                fields: vec![RemoteFieldDefinition {
                    key: "author".into(),
                    name: "author".into(),
                    description: None,
                    required: false,
                    field_type: "entity_reference".into(),
                    // introspection has already reverse-resolved the id
                    validations: vec![ValidationRule::new(
                        "entity_definition_id",
                        "acme_author",
                    )],
                }],
            },
        ];
        let plan = diff_schema(&schema, PREFIX, &remotes, &[], ReconcileMode::Delete);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_attachments_match_on_prefixed_namespace_and_key() {
        let schema = Schema::builder()
            .attachment(
                AttachmentDefinition::build(
                    "warranty_months",
                    OwnerType::Product,
                    f::integer().min(0),
                )
                .name("Warranty months"),
            )
            .build()
            .unwrap();
        let remote = RemoteAttachmentDefinition {
            id: "gid://storecraft/AttachmentDefinition/5".into(),
            namespace: "acme".into(),
            key: "warranty_months".into(),
            name: "Warranty months".into(),
            description: None,
            owner_type: OwnerType::Product,
            pinned: false,
            field_type: "number_integer".into(),
            validations: vec![ValidationRule::min("0")],
        };
        let plan = diff_schema(&schema, PREFIX, &[], &[], ReconcileMode::Delete);
        assert_eq!(plan.attachments.create.len(), 1);
        assert_eq!(plan.attachments.create[0].namespace, "acme");

        let plan = diff_schema(&schema, PREFIX, &[], &[remote], ReconcileMode::Delete);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_attachment_update_restates_identity() {
        let schema = Schema::builder()
            .attachment(
                AttachmentDefinition::build("warranty_months", OwnerType::Product, f::integer())
                    .name("Warranty months")
                    .pinned(),
            )
            .build()
            .unwrap();
        let remote = RemoteAttachmentDefinition {
            id: "gid://storecraft/AttachmentDefinition/5".into(),
            namespace: "acme".into(),
            key: "warranty_months".into(),
            name: "Warranty months".into(),
            description: None,
            owner_type: OwnerType::Product,
            pinned: false,
            field_type: "number_integer".into(),
            validations: vec![],
        };
        let plan = diff_schema(&schema, PREFIX, &[], &[remote], ReconcileMode::Delete);
        assert_eq!(plan.attachments.update.len(), 1);
        let update = &plan.attachments.update[0];
        assert_eq!(update.pinned, Some(true));
        assert_eq!(update.namespace, "acme");
        assert_eq!(update.key, "warranty_months");
        assert!(update.name.is_none());
    }
}
