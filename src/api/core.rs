//! Core object types shared by every resource kind
//!
//! Mirrors the backing store's object shapes: metadata, local references,
//! key selectors, ConfigMaps and Secrets.

use std::collections::BTreeMap;
use std::str::Utf8Error;

use serde::{Deserialize, Serialize};

/// Namespace used when a manifest omits `metadata.namespace`
pub const DEFAULT_NAMESPACE: &str = "default";

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }
}

/// Reference to an object in the same namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    pub name: String,
}

/// Selects one key of a ConfigMap or Secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySelector {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    #[serde(default = "core_api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Secret object; `data` is base64 on the wire, `stringData` is plain text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default = "core_api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", with = "base64_map")]
    pub data: BTreeMap<String, Vec<u8>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub string_data: BTreeMap<String, String>,
}

impl Secret {
    /// Empty secret, as created at plan time
    pub fn empty(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_version: core_api_version(),
            metadata: ObjectMeta::new(name, namespace),
            data: BTreeMap::new(),
            string_data: BTreeMap::new(),
        }
    }

    /// Value of `key`; `stringData` shadows `data`
    ///
    /// `data` bytes that are not UTF-8 are an error, never replaced.
    pub fn get(&self, key: &str) -> Result<Option<&str>, Utf8Error> {
        if let Some(value) = self.string_data.get(key) {
            return Ok(Some(value.as_str()));
        }
        self.data.get(key).map(|bytes| std::str::from_utf8(bytes)).transpose()
    }
}

fn core_api_version() -> String {
    "v1".to_string()
}

mod base64_map {
    use std::collections::BTreeMap;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(map: &BTreeMap<String, Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: BTreeMap<&str, String> = map
            .iter()
            .map(|(k, v)| (k.as_str(), STANDARD.encode(v)))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(v.trim())
                    .map(|bytes| (k.clone(), bytes))
                    .map_err(|e| D::Error::custom(format!("secret key '{}' is not valid base64: {}", k, e)))
            })
            .collect()
    }
}
