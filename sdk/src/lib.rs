//! Storecraft SDK: typed schema-as-code client for a commerce metadata API
//!
//! Declare entity and attachment definitions in Rust, reconcile them
//! against the remote store, then read and write records through typed
//! operations. The network is abstracted behind the [`Transport`] trait;
//! any implementation that can execute a GraphQL document works.

pub mod client;
pub mod codec;
pub mod error;
pub mod ops;
pub mod query;
pub mod schema;
pub mod sync;
pub mod testing;
pub mod transport;
pub mod validation;
pub mod value;

pub use client::{ClientConfig, Storecraft};
pub use codec::FieldType;
pub use error::{Error, Result};
pub use ops::{
    EntityOperations, EntityPatch, EntityRecord, IterateConfig, JobStatus, ListConfig,
    ListResult, PageInfo, ProductListConfig, ProductOperations, ProductPatch, ProductRecord,
    Projection,
};
pub use query::{
    Comparison, EntityQueryField, EntitySortKey, ProductQueryField, Query, QueryValue,
};
pub use schema::{
    AttachmentDefinition, EntityDefinition, FieldDefinition, OwnerType, Schema, field,
};
pub use sync::{ReconcileMode, SchemaPlan};
pub use transport::{GraphQlResponse, Transport};
pub use validation::ValidationRule;
pub use value::{DimensionUnit, Measurement, Value, VolumeUnit, WeightUnit};

// Re-export async_trait for transport implementations
pub use async_trait::async_trait;
