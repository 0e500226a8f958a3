//! # Backing Store Abstraction
//!
//! The engine reads ConfigMaps, Secrets and the credflow resource kinds from
//! an external key/value store, and writes exactly one object back: the
//! generated Secret of a workflow.
//!
//! - [`ObjectStore`] - Core trait: `get` + `update_secret`, with typed helpers
//! - [`MemoryStore`] - `DashMap`-backed store for tests and embedding
//! - [`FileStore`] - Directory of YAML manifests; secrets are written back into
//!   the document they were loaded from

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::api::{
    ConfigMap, Connection, ConnectionType, DataSet, DataSetType, Owner, Resource, ResourceKind, Secret,
    WorkflowKind, WorkflowSpec,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {details}")]
    Parse { path: PathBuf, details: String },

    #[error("{kind} '{namespace}/{name}' does not exist")]
    NotFound {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Key of one stored object
pub(crate) type ObjectKey = (ResourceKind, String, String);

pub(crate) fn object_key(kind: ResourceKind, namespace: &str, name: &str) -> ObjectKey {
    (kind, namespace.to_string(), name.to_string())
}

// ============================================================================
// STORE TRAIT (ASYNC)
// ============================================================================

/// Read access to every kind, write access to Secrets
///
/// Calls block from the caller's perspective; no retries happen here.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object, `None` when absent
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Option<Resource>, StoreError>;

    /// Replace an existing Secret
    async fn update_secret(&self, secret: Secret) -> Result<(), StoreError>;

    async fn config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>, StoreError> {
        Ok(match self.get(ResourceKind::ConfigMap, namespace, name).await? {
            Some(Resource::ConfigMap(cm)) => Some(cm),
            _ => None,
        })
    }

    async fn secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        Ok(match self.get(ResourceKind::Secret, namespace, name).await? {
            Some(Resource::Secret(secret)) => Some(secret),
            _ => None,
        })
    }

    async fn connection(&self, namespace: &str, name: &str) -> Result<Option<Connection>, StoreError> {
        Ok(match self.get(ResourceKind::Connection, namespace, name).await? {
            Some(Resource::Connection(conn)) => Some(conn),
            _ => None,
        })
    }

    async fn connection_type(&self, namespace: &str, name: &str) -> Result<Option<ConnectionType>, StoreError> {
        Ok(match self.get(ResourceKind::ConnectionType, namespace, name).await? {
            Some(Resource::ConnectionType(ct)) => Some(ct),
            _ => None,
        })
    }

    async fn dataset(&self, namespace: &str, name: &str) -> Result<Option<DataSet>, StoreError> {
        Ok(match self.get(ResourceKind::DataSet, namespace, name).await? {
            Some(Resource::DataSet(ds)) => Some(ds),
            _ => None,
        })
    }

    async fn dataset_type(&self, namespace: &str, name: &str) -> Result<Option<DataSetType>, StoreError> {
        Ok(match self.get(ResourceKind::DataSetType, namespace, name).await? {
            Some(Resource::DataSetType(dt)) => Some(dt),
            _ => None,
        })
    }

    /// Workflow spec of a Workflow, WorkflowTemplate or CronWorkflow
    async fn workflow_spec(
        &self,
        kind: WorkflowKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<(Owner, WorkflowSpec)>, StoreError> {
        let resource = self.get(kind.into(), namespace, name).await?;
        Ok(resource
            .as_ref()
            .and_then(Resource::workflow_spec)
            .map(|(owner, spec)| (owner, spec.clone())))
    }
}
