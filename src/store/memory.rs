//! In-memory object store

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{object_key, ObjectKey, ObjectStore, StoreError};
use crate::api::{Resource, ResourceKind, Secret};

/// Thread-safe object store (lock-free reads)
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<ObjectKey, Resource>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources<I>(resources: I) -> Self
    where
        I: IntoIterator<Item = Resource>,
    {
        let store = Self::new();
        for resource in resources {
            store.insert(resource);
        }
        store
    }

    /// Insert or replace an object
    pub fn insert(&self, resource: impl Into<Resource>) {
        let resource = resource.into();
        let key = object_key(resource.kind(), resource.namespace(), resource.name());
        self.objects.insert(key, resource);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Option<Resource>, StoreError> {
        Ok(self
            .objects
            .get(&object_key(kind, namespace, name))
            .map(|entry| entry.value().clone()))
    }

    async fn update_secret(&self, secret: Secret) -> Result<(), StoreError> {
        let key = object_key(ResourceKind::Secret, &secret.metadata.namespace, &secret.metadata.name);
        match self.objects.get_mut(&key) {
            Some(mut entry) => {
                debug!(secret = %secret.metadata.name, namespace = %secret.metadata.namespace, "updating secret");
                *entry = Resource::Secret(secret);
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: ResourceKind::Secret,
                namespace: secret.metadata.namespace,
                name: secret.metadata.name,
            }),
        }
    }
}
