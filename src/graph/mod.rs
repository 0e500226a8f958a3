//! Task graph model of the external execution engine
//!
//! Only the parts the planner reads or rewrites are typed. Every other field
//! is kept in `extra` so a rewritten graph round-trips untouched content.

mod index;

pub use index::TemplateIndex;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::api::KeySelector;

/// Fields the planner does not interpret, preserved verbatim
pub type Extra = BTreeMap<String, serde_json::Value>;

/// One parallel group of steps; groups run sequentially
pub type ParallelSteps = Vec<WorkflowStep>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGraph {
    #[serde(default)]
    pub entrypoint: String,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Node kinds, derived from whichever body a template carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateType {
    Container,
    Script,
    Steps,
    Dag,
    Suspend,
    Resource,
    Unknown,
}

/// A graph node ("template")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    /// Runs alongside its dependents without blocking their scheduling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<ParallelSteps>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dag: Option<DagTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Template {
    pub fn container(name: impl Into<String>, container: Container) -> Self {
        Self {
            name: name.into(),
            container: Some(container),
            ..Self::default()
        }
    }

    pub fn steps(name: impl Into<String>, groups: Vec<ParallelSteps>) -> Self {
        Self {
            name: name.into(),
            steps: Some(groups),
            ..Self::default()
        }
    }

    pub fn dag(name: impl Into<String>, tasks: Vec<DagTask>) -> Self {
        Self {
            name: name.into(),
            dag: Some(DagTemplate {
                tasks,
                extra: Extra::new(),
            }),
            ..Self::default()
        }
    }

    pub fn template_type(&self) -> TemplateType {
        if self.container.is_some() {
            TemplateType::Container
        } else if self.script.is_some() {
            TemplateType::Script
        } else if self.steps.is_some() {
            TemplateType::Steps
        } else if self.dag.is_some() {
            TemplateType::Dag
        } else if self.suspend.is_some() {
            TemplateType::Suspend
        } else if self.resource.is_some() {
            TemplateType::Resource
        } else {
            TemplateType::Unknown
        }
    }

    /// Container that receives env vars and mounts, for leaf kinds
    pub fn leaf_container_mut(&mut self) -> Option<&mut Container> {
        if let Some(container) = self.container.as_mut() {
            return Some(container);
        }
        self.script.as_mut().map(|s| &mut s.container)
    }

    /// Names of templates this node references, in execution order
    ///
    /// Steps and tasks that point at external templates (`templateRef`) have no
    /// local name and are not listed.
    pub fn child_refs(&self) -> Vec<&str> {
        match self.template_type() {
            TemplateType::Steps => self
                .steps
                .iter()
                .flatten()
                .flatten()
                .filter_map(|step| step.template.as_deref())
                .collect(),
            TemplateType::Dag => self
                .dag
                .iter()
                .flat_map(|dag| dag.tasks.iter())
                .filter_map(|task| task.template.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Names of steps and tasks that point at external templates
    pub fn external_refs(&self) -> Vec<&str> {
        match self.template_type() {
            TemplateType::Steps => self
                .steps
                .iter()
                .flatten()
                .flatten()
                .filter(|step| step.template.is_none())
                .map(|step| step.name.as_str())
                .collect(),
            TemplateType::Dag => self
                .dag
                .iter()
                .flat_map(|dag| dag.tasks.iter())
                .filter(|task| task.template.is_none())
                .map(|task| task.name.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Script leaf: a container plus inline source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptTemplate {
    #[serde(flatten)]
    pub container: Container,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

impl EnvVar {
    /// Env var sourced from one key of a secret
    pub fn from_secret(name: impl Into<String>, secret: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(KeySelector {
                    name: secret.into(),
                    key: key.into(),
                }),
                config_map_key_ref: None,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<KeySelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<KeySelector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretVolumeSource>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Volume {
    pub fn from_secret(name: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: Some(SecretVolumeSource {
                secret_name: secret_name.into(),
            }),
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretVolumeSource {
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: Some(template.into()),
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagTemplate {
    #[serde(default)]
    pub tasks: Vec<DagTask>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagTask {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl DagTask {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: Some(template.into()),
            dependencies: Vec::new(),
            extra: Extra::new(),
        }
    }
}
