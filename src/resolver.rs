//! Credential value resolution
//!
//! Turns a [`Value`] into a concrete string: a non-empty literal wins, then a
//! `configMapKeyRef`, then a `secretKeyRef`, all looked up in the owner's
//! namespace.

use std::collections::BTreeMap;

use tracing::debug;

use crate::api::{Credentials, Value};
use crate::error::{CredflowError, Result};
use crate::store::ObjectStore;

pub struct CredentialResolver<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> CredentialResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve one value in `namespace`
    pub async fn resolve(&self, value: &Value, namespace: &str) -> Result<String> {
        if value.has_literal() {
            return Ok(value.value.clone());
        }

        if let Some(selector) = value.config_map_key_ref() {
            let config_map = self
                .store
                .config_map(namespace, &selector.name)
                .await?
                .ok_or_else(|| CredflowError::BackingStoreNotFound {
                    kind: "ConfigMap".to_string(),
                    namespace: namespace.to_string(),
                    name: selector.name.clone(),
                })?;
            return config_map
                .data
                .get(&selector.key)
                .cloned()
                .ok_or_else(|| CredflowError::KeyNotFound {
                    kind: "ConfigMap".to_string(),
                    name: selector.name.clone(),
                    key: selector.key.clone(),
                });
        }

        if let Some(selector) = value.secret_key_ref() {
            let secret = self
                .store
                .secret(namespace, &selector.name)
                .await?
                .ok_or_else(|| CredflowError::BackingStoreNotFound {
                    kind: "Secret".to_string(),
                    namespace: namespace.to_string(),
                    name: selector.name.clone(),
                })?;
            let value = secret
                .get(&selector.key)
                .map_err(|_| CredflowError::InvalidEncoding {
                    name: selector.name.clone(),
                    key: selector.key.clone(),
                })?;
            return value.map(str::to_string).ok_or_else(|| CredflowError::KeyNotFound {
                kind: "Secret".to_string(),
                name: selector.name.clone(),
                key: selector.key.clone(),
            });
        }

        Err(CredflowError::ValueSourceUnspecified)
    }

    /// Resolve a whole credential map into field → value
    ///
    /// The first failing field aborts; `owner` names the declaring resource in
    /// the error.
    pub async fn resolve_all(
        &self,
        values: &Credentials,
        namespace: &str,
        owner: &str,
    ) -> Result<BTreeMap<String, String>> {
        let mut resolved = BTreeMap::new();
        for (field, value) in values {
            let concrete = self
                .resolve(value, namespace)
                .await
                .map_err(|source| CredflowError::FieldResolution {
                    field: field.clone(),
                    owner: owner.to_string(),
                    source: Box::new(source),
                })?;
            resolved.insert(field.clone(), concrete);
        }
        debug!(owner, namespace, fields = resolved.len(), "resolved credentials");
        Ok(resolved)
    }
}
