//! Schema validation of credential and metadata fields
//!
//! Checks declared values against a [`FieldSchema`]:
//! - source invariant (exactly one of literal / `valueFrom`)
//! - extra fields, when the schema disallows them
//! - sensitive fields, which must come from a secret
//! - length and regex rules on literal values
//! - required fields that are absent

mod field;

pub use field::{ErrorList, FieldError, FieldErrorKind, FieldPath};

use dashmap::DashMap;
use regex::Regex;
use tracing::debug;

use crate::api::{Connection, ConnectionType, Credentials, DataSet, DataSetType, FieldSchema, Validation, Value};

/// Placeholder for sensitive literals in error messages
pub const REDACTED: &str = "\"<redacted>\"";

/// Validator with a compiled-regex cache
#[derive(Default)]
pub struct Validator {
    regex_cache: DashMap<String, Regex>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a Connection against its ConnectionType (root path `credentials`)
    pub fn validate_connection(&self, connection: &Connection, connection_type: &ConnectionType) -> ErrorList {
        debug!(
            connection = %connection.metadata.name,
            connection_type = %connection_type.metadata.name,
            "validating connection"
        );
        self.validate_fields(
            &connection.spec.credentials,
            &connection_type.spec,
            &FieldPath::new("credentials"),
            "ConnectionType",
        )
    }

    /// Validate a DataSet against its DataSetType (root path `metadata`)
    pub fn validate_dataset(&self, dataset: &DataSet, dataset_type: &DataSetType) -> ErrorList {
        debug!(
            dataset = %dataset.metadata.name,
            dataset_type = %dataset_type.metadata.name,
            "validating dataset"
        );
        self.validate_fields(
            &dataset.spec.metadata,
            &dataset_type.spec.metadata,
            &FieldPath::new("metadata"),
            "DataSetType",
        )
    }

    /// Validate `values` against `schema`, with field paths under `path`
    pub fn validate_values(&self, values: &Credentials, schema: &FieldSchema, path: &FieldPath) -> ErrorList {
        self.validate_fields(values, schema, path, "Schema")
    }

    fn validate_fields(
        &self,
        values: &Credentials,
        schema: &FieldSchema,
        path: &FieldPath,
        type_kind: &str,
    ) -> ErrorList {
        let mut errors = ErrorList::new();

        for (name, value) in values {
            let field_path = path.child(name.as_str());
            let spec = schema.field(name);

            // Literals of sensitive fields never appear in messages
            let shown = match spec {
                Some(spec) if spec.sensitive && value.has_literal() => REDACTED.to_string(),
                _ => value.to_string(),
            };

            if let Some(detail) = source_violation(value) {
                errors.push(FieldError::new(&field_path, FieldErrorKind::InvalidValueSource, &shown, detail));
                continue;
            }

            let Some(spec) = spec else {
                if !schema.allow_extra_fields {
                    errors.push(FieldError::new(
                        &field_path,
                        FieldErrorKind::ExtraFieldDisallowed,
                        &shown,
                        format!("{} does not allow extra fields", type_kind),
                    ));
                }
                continue;
            };

            if spec.sensitive && !is_secret_sourced(value) {
                errors.push(FieldError::new(
                    &field_path,
                    FieldErrorKind::SensitiveFieldViolation,
                    &shown,
                    "Sensitive field must be sourced from a secretKeyRef",
                ));
            }

            // Referenced content is unknown until resolution
            if value.has_literal() {
                if let Some(validation) = &spec.validation {
                    errors.append(self.check_literal(&value.value, &shown, &field_path, validation));
                }
            }
        }

        for spec in schema.fields.iter().filter(|f| f.required) {
            if !values.contains_key(&spec.name) {
                errors.push(FieldError::new(
                    &path.child(spec.name.as_str()),
                    FieldErrorKind::RequiredFieldMissing,
                    "",
                    format!("{} requires this field", type_kind),
                ));
            }
        }

        errors
    }

    /// Length and regex checks on a literal value; checks are independent
    pub fn validate_value(&self, value: &str, path: &FieldPath, validation: &Validation) -> ErrorList {
        self.check_literal(value, &format!("{:?}", value), path, validation)
    }

    /// `shown` stands in for the value in error messages
    fn check_literal(&self, value: &str, shown: &str, path: &FieldPath, validation: &Validation) -> ErrorList {
        let mut errors = ErrorList::new();
        let length = value.chars().count();

        if let Some(min) = validation.min_length {
            if length < min as usize {
                errors.push(FieldError::new(path, FieldErrorKind::TooShort, shown, "Value below MinLength"));
            }
        }

        if let Some(max) = validation.max_length {
            if length > max as usize {
                errors.push(FieldError::new(path, FieldErrorKind::TooLong, shown, "Value above MaxLength"));
            }
        }

        if let Some(pattern) = &validation.regex {
            match self.compiled(pattern) {
                Ok(re) if re.is_match(value) => {}
                Ok(_) => errors.push(FieldError::new(
                    path,
                    FieldErrorKind::RegexMismatch,
                    shown,
                    "Value does not match regex pattern",
                )),
                Err(e) => errors.push(FieldError::new(
                    path,
                    FieldErrorKind::InternalValidationError,
                    shown,
                    format!("invalid regex pattern '{}': {}", pattern, e),
                )),
            }
        }

        errors
    }

    /// Compile `pattern` anchored to the whole value, with caching
    fn compiled(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Some(re) = self.regex_cache.get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(&format!("^(?:{})$", pattern))?;
        self.regex_cache.insert(pattern.to_string(), re.clone());
        Ok(re)
    }
}

fn source_violation(value: &Value) -> Option<&'static str> {
    match (&value.value_from, value.has_literal()) {
        (Some(_), true) => Some("Exactly one of value or valueFrom must be set"),
        (None, false) => Some("One of value or valueFrom must be set"),
        (Some(source), false) => match (&source.config_map_key_ref, &source.secret_key_ref) {
            (Some(_), None) | (None, Some(_)) => None,
            _ => Some("valueFrom must set exactly one of configMapKeyRef or secretKeyRef"),
        },
        (None, true) => None,
    }
}

fn is_secret_sourced(value: &Value) -> bool {
    !value.has_literal() && value.secret_key_ref().is_some() && value.config_map_key_ref().is_none()
}
