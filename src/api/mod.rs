//! Resource model
//!
//! Kubernetes-style manifests (`apiVersion`/`kind`/`metadata`/`spec`) for
//! every object the engine reads or writes.

mod connection;
mod core;
mod dataset;
mod resource;
mod schema;
mod value;
mod workflow;

pub use connection::{Connection, ConnectionSpec, ConnectionType};
pub use core::{ConfigMap, KeySelector, LocalObjectReference, ObjectMeta, Secret, DEFAULT_NAMESPACE};
pub use dataset::{ConnectionFrom, DataSet, DataSetSpec, DataSetType, DataSetTypeSpec, StorageType};
pub use resource::{Resource, ResourceKind};
pub use schema::{CredentialFieldSpec, FieldSchema, Validation};
pub use value::{Credentials, Value, ValueSource};
pub use workflow::{
    name_with_hash, CronWorkflow, CronWorkflowSpec, Delivery, InjectableValue, InjectionSource,
    Owner, TemplateRef, Workflow, WorkflowKind, WorkflowSpec, WorkflowTemplate,
    WorkflowTemplateSpec,
};

/// API group/version of the credflow resource kinds
pub const API_VERSION: &str = "etl.credflow.io/v1alpha1";
