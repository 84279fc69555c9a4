//! Client façade
//!
//! `Storecraft` ties a transport, an immutable schema and the namespace
//! prefix together. Everything the SDK does starts here: reconciling the
//! schema, opening per-type entity operations, product operations, job
//! polling.

use crate::error::{Error, Result};
use crate::ops::entities::EntityOperations;
use crate::ops::jobs::{self, JobStatus};
use crate::ops::products::ProductOperations;
use crate::schema::{OwnerType, Schema};
use crate::sync::{
    DefinitionPlan, ReconcileMode, SchemaPlan, apply, diff, introspect,
};
use crate::transport::Transport;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Client-wide settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Namespace prefix isolating this installation's definitions
    pub namespace_prefix: String,
}

impl ClientConfig {
    pub fn new(namespace_prefix: impl Into<String>) -> Self {
        Self {
            namespace_prefix: namespace_prefix.into(),
        }
    }
}

pub struct Storecraft {
    transport: Arc<dyn Transport>,
    schema: Arc<Schema>,
    config: ClientConfig,
}

impl Storecraft {
    pub fn new(transport: Arc<dyn Transport>, schema: Schema, config: ClientConfig) -> Self {
        Self {
            transport,
            schema: Arc::new(schema),
            config,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Operations over one declared entity type
    pub fn entities(&self, entity_type: &str) -> Result<EntityOperations> {
        let entity = self
            .schema
            .entity(entity_type)
            .ok_or_else(|| Error::UnknownAlias(entity_type.to_string()))?;
        Ok(EntityOperations::new(
            Arc::clone(&self.transport),
            Arc::new(entity.clone()),
            entity.prefixed_type(&self.config.namespace_prefix),
        ))
    }

    /// Operations over native products and their declared attachments
    pub fn products(&self) -> ProductOperations {
        ProductOperations::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.schema),
            self.config.namespace_prefix.clone(),
        )
    }

    /// Current status of a remote job
    pub async fn job(&self, id: &str) -> Result<JobStatus> {
        jobs::poll(&*self.transport, id).await
    }

    /// Introspect the remote and compute the plan without applying it
    pub async fn plan(&self, mode: ReconcileMode) -> Result<SchemaPlan> {
        let (plan, _) = self.introspect_and_diff(mode).await?;
        Ok(plan)
    }

    /// Reconcile the remote with the declared schema
    pub async fn apply_schema(&self, mode: ReconcileMode) -> Result<()> {
        let (plan, remote_entities) = self.introspect_and_diff(mode).await?;
        if plan.is_empty() {
            info!("schema already up to date");
            return Ok(());
        }
        apply::apply_plan(&*self.transport, &plan, &remote_entities).await
    }

    /// Delete the remote definitions living under the prefix. `Delete`
    /// removes everything prefixed; `Ignore` removes only definitions the
    /// schema declares.
    pub async fn remove_schema(&self, mode: ReconcileMode) -> Result<()> {
        let prefix = &self.config.namespace_prefix;
        let remote_entities =
            introspect::fetch_entity_definitions(&*self.transport, prefix).await?;
        let declared_types: HashSet<String> = self
            .schema
            .entities
            .iter()
            .map(|e| e.prefixed_type(prefix))
            .collect();
        let entity_deletes: Vec<String> = remote_entities
            .iter()
            .filter(|r| mode == ReconcileMode::Delete || declared_types.contains(&r.entity_type))
            .map(|r| r.id.clone())
            .collect();

        let owner_types = match mode {
            ReconcileMode::Delete => OwnerType::ALL.to_vec(),
            ReconcileMode::Ignore => self.declared_owner_types(),
        };
        let declared_identities: HashSet<(OwnerType, String)> = self
            .schema
            .attachments
            .iter()
            .map(|a| (a.owner_type, a.identity(prefix)))
            .collect();
        let mut attachment_deletes = Vec::new();
        for owner_type in owner_types {
            let remote =
                introspect::fetch_attachment_definitions(&*self.transport, prefix, owner_type)
                    .await?;
            for r in remote {
                if mode == ReconcileMode::Delete
                    || declared_identities.contains(&(r.owner_type, r.identity()))
                {
                    attachment_deletes.push(r.id);
                }
            }
        }

        let plan = SchemaPlan {
            entities: DefinitionPlan {
                delete: entity_deletes,
                ..DefinitionPlan::default()
            },
            attachments: DefinitionPlan {
                delete: attachment_deletes,
                ..DefinitionPlan::default()
            },
        };
        if plan.is_empty() {
            info!("nothing to remove");
            return Ok(());
        }
        apply::apply_plan(&*self.transport, &plan, &[]).await
    }

    async fn introspect_and_diff(
        &self,
        mode: ReconcileMode,
    ) -> Result<(SchemaPlan, Vec<introspect::RemoteEntityDefinition>)> {
        let prefix = &self.config.namespace_prefix;
        let remote_entities =
            introspect::fetch_entity_definitions(&*self.transport, prefix).await?;
        let mut remote_attachments = Vec::new();
        for owner_type in self.declared_owner_types() {
            remote_attachments.extend(
                introspect::fetch_attachment_definitions(&*self.transport, prefix, owner_type)
                    .await?,
            );
        }
        let plan = diff::diff_schema(
            &self.schema,
            prefix,
            &remote_entities,
            &remote_attachments,
            mode,
        );
        Ok((plan, remote_entities))
    }

    fn declared_owner_types(&self) -> Vec<OwnerType> {
        let mut seen = HashSet::new();
        self.schema
            .attachments
            .iter()
            .map(|a| a.owner_type)
            .filter(|t| seen.insert(*t))
            .collect()
    }
}
