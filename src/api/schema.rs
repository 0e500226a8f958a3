//! Type schemas for credential and metadata fields

use serde::{Deserialize, Serialize};

/// Field list of a ConnectionType or DataSetType
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    #[serde(default)]
    pub fields: Vec<CredentialFieldSpec>,
    /// Accept fields that match no declared spec
    #[serde(default)]
    pub allow_extra_fields: bool,
}

impl FieldSchema {
    pub fn field(&self, name: &str) -> Option<&CredentialFieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialFieldSpec {
    pub name: String,
    /// Environment variable name hint for consumers
    #[serde(default, rename = "envName", skip_serializing_if = "Option::is_none")]
    pub env_key: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Sensitive fields may only be sourced from a secretKeyRef
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

/// Content rules applied to literal values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// RE2-class pattern; the whole value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}
