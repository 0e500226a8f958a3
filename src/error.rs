//! Error types with fix suggestions
//!
//! Error code ranges:
//! - CREDFLOW-000-009: Manifest / IO / config errors
//! - CREDFLOW-010-019: Resource construction errors
//! - CREDFLOW-020-029: Credential resolution errors
//! - CREDFLOW-030-039: Template errors
//! - CREDFLOW-040-049: Planning errors
//! - CREDFLOW-050-059: Materialization errors
//! - CREDFLOW-060-069: Store errors

use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, CredflowError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum CredflowError {
    // ─────────────────────────────────────────────────────────────
    // Manifest / IO / config errors (000-009)
    // ─────────────────────────────────────────────────────────────
    #[error("[CREDFLOW-001] Failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("[CREDFLOW-002] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[CREDFLOW-003] Configuration error: {reason}")]
    Config { reason: String },

    #[error("[CREDFLOW-004] JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Resource construction errors (010-019)
    // ─────────────────────────────────────────────────────────────
    #[error("[CREDFLOW-010] InjectableValue '{name}' is invalid: {reason}")]
    InvalidInjectableValue { name: String, reason: String },

    #[error("[CREDFLOW-011] Resource kind '{kind}' cannot be planned")]
    NotPlannable { kind: String },

    // ─────────────────────────────────────────────────────────────
    // Credential resolution errors (020-029)
    // ─────────────────────────────────────────────────────────────
    #[error("[CREDFLOW-020] Value has neither a literal nor a configMapKeyRef/secretKeyRef")]
    ValueSourceUnspecified,

    #[error("[CREDFLOW-021] {kind} '{name}' not found in namespace '{namespace}'")]
    BackingStoreNotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("[CREDFLOW-022] Key '{key}' not found in {kind} '{name}'")]
    KeyNotFound {
        kind: String,
        name: String,
        key: String,
    },

    #[error("[CREDFLOW-023] Failed to resolve field '{field}' of {owner}: {source}")]
    FieldResolution {
        field: String,
        owner: String,
        #[source]
        source: Box<CredflowError>,
    },

    #[error("[CREDFLOW-024] Key '{key}' of Secret '{name}' is not valid UTF-8")]
    InvalidEncoding { name: String, key: String },

    // ─────────────────────────────────────────────────────────────
    // Template errors (030-039)
    // ─────────────────────────────────────────────────────────────
    #[error("[CREDFLOW-030] Template parse error at position {position}: {details}")]
    TemplateParse { position: usize, details: String },

    #[error("[CREDFLOW-031] Template references missing key '{key}'")]
    MissingKey { key: String },

    // ─────────────────────────────────────────────────────────────
    // Planning errors (040-049)
    // ─────────────────────────────────────────────────────────────
    #[error("[CREDFLOW-040] InjectInto '{template}' references unknown InjectableValue '{name}'")]
    UnknownInjectableValue { name: String, template: String },

    #[error("[CREDFLOW-041] InjectInto contains missing template: {name}")]
    MissingTemplate { name: String },

    #[error("[CREDFLOW-042] Cycle detected in task graph: {cycle}")]
    CycleDetected { cycle: String },

    #[error("[CREDFLOW-043] Template '{name}' is defined more than once")]
    DuplicateTemplate { name: String },

    #[error("[CREDFLOW-044] Template name '{name}' is reserved for credential injection")]
    ReservedTemplateName { name: String },

    // ─────────────────────────────────────────────────────────────
    // Materialization errors (050-059)
    // ─────────────────────────────────────────────────────────────
    #[error("[CREDFLOW-050] {kind} '{name}' not found in namespace '{namespace}'")]
    ResourceNotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("[CREDFLOW-051] Failed to render InjectableValue '{name}': {source}")]
    RenderFailed {
        name: String,
        #[source]
        source: Box<CredflowError>,
    },

    // ─────────────────────────────────────────────────────────────
    // Store errors (060-069)
    // ─────────────────────────────────────────────────────────────
    #[error("[CREDFLOW-060] Store error: {0}")]
    Store(#[from] StoreError),
}

impl CredflowError {
    /// Innermost error, unwrapping resolution and render context
    pub fn root_cause(&self) -> &CredflowError {
        match self {
            CredflowError::FieldResolution { source, .. }
            | CredflowError::RenderFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl FixSuggestion for CredflowError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            CredflowError::Parse(_) => Some("Check YAML syntax: indentation, quoting and 'kind'"),
            CredflowError::Io(_) => Some("Check file path and permissions"),
            CredflowError::Config { .. } => Some("Check config.toml and CREDFLOW_* environment variables"),
            CredflowError::Json(_) => None,
            CredflowError::InvalidInjectableValue { .. } => {
                Some("Set exactly one of connectionRef/dataSetRef and exactly one of envName/mountPath")
            }
            CredflowError::NotPlannable { .. } => {
                Some("Only Workflow, WorkflowTemplate and CronWorkflow can be planned")
            }
            CredflowError::ValueSourceUnspecified => {
                Some("Set 'value' or 'valueFrom' with a configMapKeyRef or secretKeyRef")
            }
            CredflowError::BackingStoreNotFound { .. } => {
                Some("Create the referenced ConfigMap/Secret in the same namespace")
            }
            CredflowError::KeyNotFound { .. } => Some("Add the key to the referenced ConfigMap/Secret"),
            CredflowError::InvalidEncoding { .. } => {
                Some("Store credential values as UTF-8 text; binary keys cannot be templated")
            }
            CredflowError::FieldResolution { source, .. }
            | CredflowError::RenderFailed { source, .. } => source.fix_suggestion(),
            CredflowError::TemplateParse { .. } => {
                Some("Check template syntax: {{.field}} or {{.metadata.field}}")
            }
            CredflowError::MissingKey { .. } => {
                Some("Reference only fields declared on the Connection or DataSet")
            }
            CredflowError::UnknownInjectableValue { .. } => {
                Some("Declare the value under 'injectable' before referencing it in injectInto")
            }
            CredflowError::MissingTemplate { .. } => {
                Some("Verify the template name exists in the workflow's templates")
            }
            CredflowError::CycleDetected { .. } => {
                Some("Remove the circular template reference from steps/dag")
            }
            CredflowError::DuplicateTemplate { .. } => Some("Give every template a unique name"),
            CredflowError::ReservedTemplateName { .. } => {
                Some("Rename the template; 'run-injection' and 'injection-entrypoint' are reserved")
            }
            CredflowError::ResourceNotFound { .. } => {
                Some("Check the resource name and namespace, and that the workflow was planned")
            }
            CredflowError::Store(_) => Some("Check the store directory and its manifests"),
        }
    }
}
