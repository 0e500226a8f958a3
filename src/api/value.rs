//! Credential field values: a literal or a reference into the backing store

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::core::KeySelector;

/// Field name → value, in declaration order
pub type Credentials = IndexMap<String, Value>;

/// Either a literal string or a `valueFrom` reference
///
/// Exactly one of the two must be set. The validator reports violations; the
/// resolver gives a non-empty literal precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ValueSource>,
}

impl Value {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            value_from: None,
        }
    }

    pub fn from_secret(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            value: String::new(),
            value_from: Some(ValueSource {
                config_map_key_ref: None,
                secret_key_ref: Some(KeySelector {
                    name: name.into(),
                    key: key.into(),
                }),
            }),
        }
    }

    pub fn from_config_map(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            value: String::new(),
            value_from: Some(ValueSource {
                config_map_key_ref: Some(KeySelector {
                    name: name.into(),
                    key: key.into(),
                }),
                secret_key_ref: None,
            }),
        }
    }

    pub fn has_literal(&self) -> bool {
        !self.value.is_empty()
    }

    pub fn secret_key_ref(&self) -> Option<&KeySelector> {
        self.value_from.as_ref().and_then(|vf| vf.secret_key_ref.as_ref())
    }

    pub fn config_map_key_ref(&self) -> Option<&KeySelector> {
        self.value_from.as_ref().and_then(|vf| vf.config_map_key_ref.as_ref())
    }
}

/// Literals print quoted, references as compact JSON
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value_from.is_none() {
            return write!(f, "{:?}", self.value);
        }
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("<unprintable>"),
        }
    }
}

/// Reference to one key of a ConfigMap or a Secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<KeySelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<KeySelector>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_literal_is_quoted() {
        assert_eq!(Value::literal("12").to_string(), "\"12\"");
    }

    #[test]
    fn test_display_reference_is_json() {
        let v = Value::from_secret("pg", "password");
        assert_eq!(
            v.to_string(),
            r#"{"valueFrom":{"secretKeyRef":{"name":"pg","key":"password"}}}"#
        );
    }

    #[test]
    fn test_credentials_keep_declaration_order() {
        let creds: Credentials = serde_yaml::from_str(
            r#"
zeta: { value: "1" }
alpha: { value: "2" }
mid: { valueFrom: { configMapKeyRef: { name: cm, key: k } } }
"#,
        )
        .unwrap();

        let keys: Vec<&str> = creds.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(creds["mid"].config_map_key_ref().unwrap().key, "k");
    }
}
