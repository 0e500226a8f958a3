//! Secret materialization
//!
//! Runs inside the planned graph (`credflow inject`): resolves and renders
//! every injectable value of a workflow, then writes the results into the
//! workflow's generated secret in a single update.

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::api::{name_with_hash, InjectableValue, InjectionSource, Secret, WorkflowKind};
use crate::error::{CredflowError, Result};
use crate::resolver::CredentialResolver;
use crate::store::ObjectStore;
use crate::template::{TemplateRenderer, TEMPLATE_RENDERER};

pub struct SecretMaterializer<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    renderer: &'a TemplateRenderer,
}

impl<'a, S: ObjectStore + ?Sized> SecretMaterializer<'a, S> {
    /// Materializer sharing the global template cache
    pub fn new(store: &'a S) -> Self {
        Self::with_renderer(store, &TEMPLATE_RENDERER)
    }

    pub fn with_renderer(store: &'a S, renderer: &'a TemplateRenderer) -> Self {
        Self { store, renderer }
    }

    /// Populate the generated secret of `workflow`; returns the written secret
    ///
    /// Nothing is written unless every value rendered.
    pub async fn populate(&self, workflow: &str, namespace: &str, kind: WorkflowKind) -> Result<Secret> {
        let (owner, spec) = self
            .store
            .workflow_spec(kind, namespace, workflow)
            .await?
            .ok_or_else(|| CredflowError::ResourceNotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: workflow.to_string(),
            })?;

        let secret_name = name_with_hash(&owner.name);
        let mut secret = self
            .store
            .secret(namespace, &secret_name)
            .await?
            .ok_or_else(|| CredflowError::ResourceNotFound {
                kind: "Secret".to_string(),
                namespace: namespace.to_string(),
                name: secret_name.clone(),
            })?;

        let rendered = self.render_values(&spec.injectable_values, namespace).await?;
        let count = rendered.len();
        secret.string_data = rendered;
        self.store.update_secret(secret.clone()).await?;

        info!(
            workflow = %owner.name,
            namespace,
            secret = %secret_name,
            values = count,
            "populated workflow secret"
        );
        Ok(secret)
    }

    /// Render every value, keyed by value name
    pub async fn render_values(
        &self,
        values: &[InjectableValue],
        namespace: &str,
    ) -> Result<BTreeMap<String, String>> {
        let mut rendered = BTreeMap::new();
        for value in values {
            if rendered.contains_key(&value.name) {
                warn!(value = %value.name, "duplicate injectable value, keeping the first");
                continue;
            }
            let content = self
                .render_value(value, namespace)
                .await
                .map_err(|source| CredflowError::RenderFailed {
                    name: value.name.clone(),
                    source: Box::new(source),
                })?;
            rendered.insert(value.name.clone(), content);
        }
        Ok(rendered)
    }

    async fn render_value(&self, value: &InjectableValue, namespace: &str) -> Result<String> {
        let data = match &value.source {
            InjectionSource::Connection(name) => self.connection_data(name, namespace).await?,
            InjectionSource::DataSet(name) => self.dataset_data(name, namespace).await?,
        };
        debug!(value = %value.name, "rendering content");
        self.renderer.render(&value.content, &data)
    }

    /// Connection credentials as a flat map
    async fn connection_data(&self, name: &str, namespace: &str) -> Result<JsonValue> {
        let connection = self
            .store
            .connection(namespace, name)
            .await?
            .ok_or_else(|| CredflowError::ResourceNotFound {
                kind: "Connection".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        let resolved = CredentialResolver::new(self.store)
            .resolve_all(&connection.spec.credentials, namespace, &format!("Connection '{}'", name))
            .await?;
        Ok(serde_json::to_value(resolved)?)
    }

    /// DataSet metadata under `metadata`, its Connection under `connection`
    async fn dataset_data(&self, name: &str, namespace: &str) -> Result<JsonValue> {
        let dataset = self
            .store
            .dataset(namespace, name)
            .await?
            .ok_or_else(|| CredflowError::ResourceNotFound {
                kind: "DataSet".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let metadata = CredentialResolver::new(self.store)
            .resolve_all(&dataset.spec.metadata, namespace, &format!("DataSet '{}'", name))
            .await?;

        let mut data = Map::new();
        data.insert("metadata".to_string(), serde_json::to_value(metadata)?);
        if let Some(connection) = dataset.spec.connection_name() {
            data.insert(
                "connection".to_string(),
                self.connection_data(connection, namespace).await?,
            );
        }
        Ok(JsonValue::Object(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        Connection, ConnectionFrom, ConnectionSpec, Credentials, DataSet, DataSetSpec, LocalObjectReference,
        ObjectMeta, TemplateRef, Value, Workflow, WorkflowSpec, API_VERSION,
    };
    use crate::store::MemoryStore;

    fn credentials(pairs: &[(&str, Value)]) -> Credentials {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn fixture(values: Vec<InjectableValue>) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(Connection {
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta::new("pg", "etl"),
            spec: ConnectionSpec {
                type_name: "postgres".to_string(),
                credentials: credentials(&[
                    ("inline", Value::literal("inline-value")),
                    ("password", Value::from_secret("pg-secret", "password")),
                ]),
            },
        });
        let mut pg_secret = Secret::empty("pg-secret", "etl");
        pg_secret.string_data.insert("password".to_string(), "hunter2".to_string());
        store.insert(pg_secret);

        store.insert(DataSet {
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta::new("sales", "etl"),
            spec: DataSetSpec {
                type_name: "table".to_string(),
                metadata: credentials(&[("inline", Value::literal("dataset-value"))]),
                connection: Some(ConnectionFrom {
                    connection_from: Some(LocalObjectReference { name: "pg".to_string() }),
                }),
                ..DataSetSpec::default()
            },
        });

        store.insert(Workflow {
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta::new("nightly", "etl"),
            spec: WorkflowSpec {
                inject_into: vec![TemplateRef::new("main", values.iter().map(|v| v.name.clone()))],
                injectable_values: values,
                ..WorkflowSpec::default()
            },
        });
        store.insert(Secret::empty(name_with_hash("nightly"), "etl"));
        store
    }

    #[tokio::test]
    async fn test_populate_connection_and_dataset_values() {
        let store = fixture(vec![
            InjectableValue::env(
                "pgpass",
                InjectionSource::Connection("pg".to_string()),
                "PGPASSWORD",
                "{{ .password }}",
            ),
            InjectableValue::file(
                "summary",
                InjectionSource::DataSet("sales".to_string()),
                "/etc/summary",
                "{{metadata.inline}} {{connection.inline}}",
            ),
        ]);

        SecretMaterializer::new(&store)
            .populate("nightly", "etl", WorkflowKind::Workflow)
            .await
            .unwrap();

        let secret = store.secret("etl", &name_with_hash("nightly")).await.unwrap().unwrap();
        assert_eq!(secret.get("pgpass").unwrap(), Some("hunter2"));
        assert_eq!(secret.get("summary").unwrap(), Some("dataset-value inline-value"));
    }

    #[tokio::test]
    async fn test_failure_leaves_secret_untouched() {
        let store = fixture(vec![
            InjectableValue::env("ok", InjectionSource::Connection("pg".to_string()), "OK", "{{ .inline }}"),
            InjectableValue::env("bad", InjectionSource::Connection("pg".to_string()), "BAD", "{{ .nope }}"),
        ]);

        let err = SecretMaterializer::new(&store)
            .populate("nightly", "etl", WorkflowKind::Workflow)
            .await
            .unwrap_err();
        assert!(matches!(&err, CredflowError::RenderFailed { name, .. } if name == "bad"));
        assert!(matches!(err.root_cause(), CredflowError::MissingKey { key } if key == "nope"));

        let secret = store.secret("etl", &name_with_hash("nightly")).await.unwrap().unwrap();
        assert!(secret.string_data.is_empty());
    }

    #[tokio::test]
    async fn test_missing_workflow_or_secret() {
        let store = fixture(Vec::new());
        let materializer = SecretMaterializer::new(&store);

        let err = materializer
            .populate("weekly", "etl", WorkflowKind::Workflow)
            .await
            .unwrap_err();
        assert!(matches!(err, CredflowError::ResourceNotFound { kind, .. } if kind == "Workflow"));

        let err = materializer
            .populate("nightly", "etl", WorkflowKind::CronWorkflow)
            .await
            .unwrap_err();
        assert!(matches!(err, CredflowError::ResourceNotFound { kind, .. } if kind == "CronWorkflow"));
    }

    #[tokio::test]
    async fn test_missing_connection_is_reported_per_value() {
        let store = fixture(vec![InjectableValue::env(
            "x",
            InjectionSource::Connection("ghost".to_string()),
            "X",
            "{{ . }}",
        )]);
        let err = SecretMaterializer::new(&store)
            .populate("nightly", "etl", WorkflowKind::Workflow)
            .await
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            CredflowError::ResourceNotFound { kind, name, .. } if kind == "Connection" && name == "ghost"
        ));
    }
}
