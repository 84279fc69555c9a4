//! Schema reconciliation: introspect, diff, apply
//!
//! Reconciliation is a three-step pipeline. `introspect` fetches the
//! remote definitions living under the client prefix, `diff` compares
//! them against the local `Schema` and produces a minimal mutation plan,
//! and `apply` executes that plan strictly in order. Each step is usable
//! on its own; the façade wires them together.

pub mod apply;
pub mod diff;
pub mod introspect;

pub use diff::{
    AttachmentCreate, AttachmentUpdate, DefinitionPlan, EntityCreate, EntityUpdate, FieldCreate,
    FieldPatch, FieldUpdate, SchemaPlan, diff_schema,
};
pub use introspect::{
    RemoteAttachmentDefinition, RemoteEntityDefinition, RemoteFieldDefinition,
};

/// What to do with remote definitions under the prefix that the local
/// schema no longer declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Delete unknown remote definitions
    Delete,
    /// Leave unknown remote definitions untouched
    Ignore,
}
