//! Workflow resources and the injection declarations they carry

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use super::core::{LocalObjectReference, ObjectMeta};
use super::API_VERSION;
use crate::error::CredflowError;
use crate::graph::{Extra, TaskGraph};

fn api_version() -> String {
    API_VERSION.to_string()
}

/// Deterministic artifact name for a workflow's generated secret and volume
pub fn name_with_hash(name: &str) -> String {
    format!("{}-{:016x}", name, xxh3_64(name.as_bytes()))
}

// ─────────────────────────────────────────────────────────────
// Workflow kinds
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowKind {
    #[default]
    Workflow,
    WorkflowTemplate,
    CronWorkflow,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Workflow => "Workflow",
            WorkflowKind::WorkflowTemplate => "WorkflowTemplate",
            WorkflowKind::CronWorkflow => "CronWorkflow",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "workflow" => Ok(WorkflowKind::Workflow),
            "workflowtemplate" => Ok(WorkflowKind::WorkflowTemplate),
            "cronworkflow" => Ok(WorkflowKind::CronWorkflow),
            other => Err(format!(
                "unknown workflow kind '{}' (expected Workflow, WorkflowTemplate or CronWorkflow)",
                other
            )),
        }
    }
}

/// The resource a planned graph belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub kind: WorkflowKind,
    pub name: String,
    pub namespace: String,
}

impl Owner {
    pub fn new(kind: WorkflowKind, metadata: &ObjectMeta) -> Self {
        Self {
            kind,
            name: metadata.name.clone(),
            namespace: metadata.namespace.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Resources
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default = "api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: WorkflowSpec,
}

/// Task graph plus injection declarations
///
/// Graph fields sit inline next to the injection fields, as in the engine's
/// own workflow spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    #[serde(flatten)]
    pub graph: TaskGraph,
    #[serde(rename = "injectable", default, skip_serializing_if = "Vec::is_empty")]
    pub injectable_values: Vec<InjectableValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inject_into: Vec<TemplateRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_service_account: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    #[serde(default = "api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: WorkflowTemplateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplateSpec {
    #[serde(flatten)]
    pub workflow: WorkflowSpec,
    /// Labels/annotations stamped on workflows created from this template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronWorkflow {
    #[serde(default = "api_version")]
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: CronWorkflowSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronWorkflowSpec {
    pub schedule: String,
    pub workflow_spec: WorkflowSpec,
    /// Scheduling policy (concurrency, history limits, suspend, ...)
    #[serde(flatten)]
    pub extra: Extra,
}

// ─────────────────────────────────────────────────────────────
// Injection declarations
// ─────────────────────────────────────────────────────────────

/// Where an injectable value's data comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionSource {
    Connection(String),
    DataSet(String),
}

/// How the rendered content reaches a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Env { env_name: String },
    File { mount_path: String },
}

/// A named piece of rendered credential content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InjectableValueSpec", into = "InjectableValueSpec")]
pub struct InjectableValue {
    pub name: String,
    pub source: InjectionSource,
    pub delivery: Delivery,
    /// Template rendered against the source's resolved values
    pub content: String,
}

impl InjectableValue {
    pub fn env(name: impl Into<String>, source: InjectionSource, env_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source,
            delivery: Delivery::Env {
                env_name: env_name.into(),
            },
            content: content.into(),
        }
    }

    pub fn file(name: impl Into<String>, source: InjectionSource, mount_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source,
            delivery: Delivery::File {
                mount_path: mount_path.into(),
            },
            content: content.into(),
        }
    }
}

/// Wire shape of [`InjectableValue`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InjectableValueSpec {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection_ref: Option<LocalObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_set_ref: Option<LocalObjectReference>,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    env_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mount_path: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl TryFrom<InjectableValueSpec> for InjectableValue {
    type Error = CredflowError;

    fn try_from(spec: InjectableValueSpec) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| CredflowError::InvalidInjectableValue {
            name: spec.name.clone(),
            reason: reason.to_string(),
        };

        let connection = spec.connection_ref.as_ref().map(|r| r.name.clone()).filter(|n| !n.is_empty());
        let dataset = spec.data_set_ref.as_ref().map(|r| r.name.clone()).filter(|n| !n.is_empty());
        let source = match (connection, dataset) {
            (Some(name), None) => InjectionSource::Connection(name),
            (None, Some(name)) => InjectionSource::DataSet(name),
            (Some(_), Some(_)) => return Err(invalid("both connectionRef and dataSetRef are set")),
            (None, None) => return Err(invalid("one of connectionRef or dataSetRef is required")),
        };

        let delivery = match (non_empty(spec.env_name.clone()), non_empty(spec.mount_path.clone())) {
            (Some(env_name), None) => Delivery::Env { env_name },
            (None, Some(mount_path)) => Delivery::File { mount_path },
            (Some(_), Some(_)) => return Err(invalid("both envName and mountPath are set")),
            (None, None) => return Err(invalid("one of envName or mountPath is required")),
        };

        Ok(Self {
            name: spec.name,
            source,
            delivery,
            content: spec.content,
        })
    }
}

impl From<InjectableValue> for InjectableValueSpec {
    fn from(value: InjectableValue) -> Self {
        let mut spec = InjectableValueSpec {
            name: value.name,
            content: value.content,
            ..Default::default()
        };
        match value.source {
            InjectionSource::Connection(name) => spec.connection_ref = Some(LocalObjectReference { name }),
            InjectionSource::DataSet(name) => spec.data_set_ref = Some(LocalObjectReference { name }),
        }
        match value.delivery {
            Delivery::Env { env_name } => spec.env_name = Some(env_name),
            Delivery::File { mount_path } => spec.mount_path = Some(mount_path),
        }
        spec
    }
}

/// Graph node that should receive a set of injectable values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub name: String,
    #[serde(rename = "inject", default)]
    pub injected_values: Vec<String>,
}

impl TemplateRef {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            injected_values: values.into_iter().map(Into::into).collect(),
        }
    }
}
