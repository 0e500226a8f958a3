//! DataSet and DataSetType resources

use serde::{Deserialize, Serialize};

use super::core::{LocalObjectReference, ObjectMeta};
use super::schema::FieldSchema;
use super::value::Credentials;
use super::API_VERSION;

fn api_version() -> String {
    API_VERSION.to_string()
}

/// Typed metadata record, optionally backed by a Connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    #[serde(default = "api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: DataSetSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetSpec {
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<StorageType>,
    #[serde(default)]
    pub metadata: Credentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionFrom>,
}

impl DataSetSpec {
    /// Name of the backing Connection, if linked
    pub fn connection_name(&self) -> Option<&str> {
        self.connection
            .as_ref()
            .and_then(|c| c.connection_from.as_ref())
            .map(|r| r.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_from: Option<LocalObjectReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    Persistent,
    Ephemeral,
}

/// Schema for DataSets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetType {
    #[serde(default = "api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DataSetTypeSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSetTypeSpec {
    #[serde(default)]
    pub metadata: FieldSchema,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dataset_with_connection() {
        let ds: DataSet = serde_yaml::from_str(
            r#"
metadata:
  name: sales
  namespace: etl
spec:
  type: table
  storageType: Persistent
  metadata:
    inline:
      value: dataset-value
  connection:
    connectionFrom:
      name: warehouse
"#,
        )
        .unwrap();

        assert_eq!(ds.spec.connection_name(), Some("warehouse"));
        assert_eq!(ds.spec.storage_type, Some(StorageType::Persistent));
        assert_eq!(ds.spec.metadata["inline"].value, "dataset-value");
    }

    #[test]
    fn test_dataset_without_connection() {
        let ds: DataSet = serde_yaml::from_str(
            r#"
metadata:
  name: scratch
spec:
  type: bucket
"#,
        )
        .unwrap();
        assert_eq!(ds.spec.connection_name(), None);
        assert!(ds.spec.metadata.is_empty());
    }
}
