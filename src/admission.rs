//! Admission review of incoming resources
//!
//! Connections are checked against their ConnectionType and DataSets against
//! their DataSetType, both looked up in the resource's namespace. Every
//! violation is reported at once; other kinds are admitted unchecked.

use tracing::{debug, info};

use crate::api::{Resource, ResourceKind};
use crate::error::Result;
use crate::store::ObjectStore;
use crate::validation::{ErrorList, Validator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionResponse {
    pub allowed: bool,
    pub message: String,
    pub errors: ErrorList,
}

impl AdmissionResponse {
    pub fn allowed(message: impl Into<String>) -> Self {
        Self {
            allowed: true,
            message: message.into(),
            errors: ErrorList::new(),
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: message.into(),
            errors: ErrorList::new(),
        }
    }

    /// Allowed when `errors` is empty, otherwise denied with the aggregate message
    fn from_errors(kind: ResourceKind, errors: ErrorList) -> Self {
        match errors.to_aggregate() {
            None => Self::allowed(format!("valid {} resource", kind)),
            Some(message) => Self {
                allowed: false,
                message,
                errors,
            },
        }
    }
}

pub struct AdmissionReviewer<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    validator: Validator,
}

impl<'a, S: ObjectStore + ?Sized> AdmissionReviewer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            validator: Validator::new(),
        }
    }

    /// Review one resource; `Err` only for store failures
    pub async fn review(&self, resource: &Resource) -> Result<AdmissionResponse> {
        let kind = resource.kind();
        let namespace = resource.namespace();
        debug!(kind = %kind, name = %resource.name(), namespace, "admission request");

        let response = match resource {
            Resource::Connection(connection) => {
                let type_name = &connection.spec.type_name;
                match self.store.connection_type(namespace, type_name).await? {
                    Some(connection_type) => AdmissionResponse::from_errors(
                        kind,
                        self.validator.validate_connection(connection, &connection_type),
                    ),
                    None => AdmissionResponse::denied(format!(
                        "ConnectionType '{}' not found in namespace '{}'",
                        type_name, namespace
                    )),
                }
            }
            Resource::DataSet(dataset) => {
                let type_name = &dataset.spec.type_name;
                match self.store.dataset_type(namespace, type_name).await? {
                    Some(dataset_type) => AdmissionResponse::from_errors(
                        kind,
                        self.validator.validate_dataset(dataset, &dataset_type),
                    ),
                    None => AdmissionResponse::denied(format!(
                        "DataSetType '{}' not found in namespace '{}'",
                        type_name, namespace
                    )),
                }
            }
            _ => AdmissionResponse::allowed(format!("valid {} resource", kind)),
        };

        info!(
            kind = %kind,
            name = %resource.name(),
            allowed = response.allowed,
            "admission reviewed"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Secret;
    use crate::store::MemoryStore;

    const TYPES: &str = r#"
kind: ConnectionType
metadata: { name: postgres, namespace: etl }
spec:
  fields:
    - name: username
      validation: { minLength: 3, maxLength: 9, regex: "^[0-9]*$" }
    - name: password
      sensitive: true
---
kind: DataSetType
metadata: { name: table, namespace: etl }
spec:
  metadata:
    allowExtraFields: true
    fields:
      - name: table
        required: true
"#;

    fn store() -> MemoryStore {
        MemoryStore::from_resources(Resource::parse_all(TYPES).unwrap())
    }

    fn parse(yaml: &str) -> Resource {
        Resource::parse_all(yaml).unwrap().remove(0)
    }

    #[tokio::test]
    async fn test_valid_connection_allowed() {
        let store = store();
        let conn = parse(
            r#"
kind: Connection
metadata: { name: pg, namespace: etl }
spec:
  type: postgres
  credentials:
    username: { value: "1234" }
    password: { valueFrom: { secretKeyRef: { name: pg, key: password } } }
"#,
        );
        let response = AdmissionReviewer::new(&store).review(&conn).await.unwrap();
        assert!(response.allowed, "{}", response.message);
        assert_eq!(response.message, "valid Connection resource");
    }

    #[tokio::test]
    async fn test_invalid_connection_aggregates_all_errors() {
        let store = store();
        let conn = parse(
            r#"
kind: Connection
metadata: { name: pg, namespace: etl }
spec:
  type: postgres
  credentials:
    username: { value: "12" }
    password: { value: "hunter2" }
"#,
        );
        let response = AdmissionReviewer::new(&store).review(&conn).await.unwrap();
        assert!(!response.allowed);
        assert_eq!(response.errors.len(), 2);
        assert_eq!(
            response.message,
            "[credentials.username: Invalid value: \"12\": Value below MinLength, \
             credentials.password: Invalid value: \"hunter2\": Sensitive field must be sourced from a secretKeyRef]"
        );
    }

    #[tokio::test]
    async fn test_unknown_type_denied() {
        let store = store();
        let conn = parse(
            r#"
kind: Connection
metadata: { name: pg, namespace: other }
spec:
  type: postgres
"#,
        );
        let response = AdmissionReviewer::new(&store).review(&conn).await.unwrap();
        assert!(!response.allowed);
        assert_eq!(response.message, "ConnectionType 'postgres' not found in namespace 'other'");
    }

    #[tokio::test]
    async fn test_dataset_required_field() {
        let store = store();
        let ds = parse(
            r#"
kind: DataSet
metadata: { name: sales, namespace: etl }
spec:
  type: table
  metadata:
    region: { value: eu }
"#,
        );
        let response = AdmissionReviewer::new(&store).review(&ds).await.unwrap();
        assert!(!response.allowed);
        assert_eq!(
            response.message,
            "metadata.table: Required value: DataSetType requires this field"
        );
    }

    #[tokio::test]
    async fn test_other_kinds_allowed() {
        let store = MemoryStore::new();
        let secret = Resource::from(Secret::empty("x", "etl"));
        let response = AdmissionReviewer::new(&store).review(&secret).await.unwrap();
        assert!(response.allowed);
        assert_eq!(response.message, "valid Secret resource");
    }
}
