//! Translation of credflow workflow kinds into execution-engine manifests

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::Planner;
use crate::api::{name_with_hash, ObjectMeta, Owner, Resource, Secret};
use crate::error::{CredflowError, Result};
use crate::graph::TaskGraph;

/// API version of the execution engine's resource kinds
pub const ENGINE_API_VERSION: &str = "argoproj.io/v1alpha1";

/// Label linking generated objects to their workflow
pub const WORKFLOW_LABEL: &str = "credflow.io/workflow";

/// Engine-side resource; `kind` matches the credflow resource it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: JsonValue,
}

/// Everything a plan produces for one workflow
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedResources {
    pub workload: EngineManifest,
    /// Empty until the materializer populates it at run time
    pub secret: Secret,
}

impl PlannedResources {
    /// Multi-document YAML: workload first, then the secret
    pub fn to_yaml(&self) -> Result<String> {
        let mut out = String::from("---\n");
        out.push_str(&serde_yaml::to_string(&self.workload)?);
        out.push_str(&Resource::to_yaml_stream([&Resource::Secret(self.secret.clone())])?);
        Ok(out)
    }
}

impl Planner {
    /// Plan a Workflow, WorkflowTemplate or CronWorkflow
    pub fn plan_resource(&self, resource: &Resource) -> Result<PlannedResources> {
        let (owner, spec) = resource.workflow_spec().ok_or_else(|| CredflowError::NotPlannable {
            kind: resource.kind().to_string(),
        })?;
        let graph = self.plan(spec, &owner)?;

        let engine_spec = match resource {
            Resource::WorkflowTemplate(wt) => {
                let mut spec = graph_value(&graph)?;
                if let (JsonValue::Object(map), Some(meta)) = (&mut spec, &wt.spec.workflow_metadata) {
                    map.insert("workflowMetadata".to_string(), meta.clone());
                }
                spec
            }
            Resource::CronWorkflow(cw) => {
                let mut map: serde_json::Map<String, JsonValue> = cw
                    .spec
                    .extra
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                map.insert("schedule".to_string(), JsonValue::String(cw.spec.schedule.clone()));
                map.insert("workflowSpec".to_string(), graph_value(&graph)?);
                JsonValue::Object(map)
            }
            _ => graph_value(&graph)?,
        };

        Ok(PlannedResources {
            workload: EngineManifest {
                api_version: ENGINE_API_VERSION.to_string(),
                kind: owner.kind.to_string(),
                metadata: resource.metadata().clone(),
                spec: engine_spec,
            },
            secret: generated_secret(&owner),
        })
    }
}

fn graph_value(graph: &TaskGraph) -> Result<JsonValue> {
    Ok(serde_json::to_value(graph)?)
}

fn generated_secret(owner: &Owner) -> Secret {
    let mut secret = Secret::empty(name_with_hash(&owner.name), owner.namespace.as_str());
    secret.metadata.labels = BTreeMap::from([(WORKFLOW_LABEL.to_string(), owner.name.clone())]);
    secret
}
