//! Connection and ConnectionType resources

use serde::{Deserialize, Serialize};

use super::core::ObjectMeta;
use super::schema::FieldSchema;
use super::value::Credentials;
use super::API_VERSION;

fn api_version() -> String {
    API_VERSION.to_string()
}

/// A named credential bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default = "api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: ConnectionSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Name of the ConnectionType this connection conforms to
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Schema for Connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionType {
    #[serde(default = "api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: FieldSchema,
}
