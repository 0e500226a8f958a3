//! Kind-tagged union over every manifest the engine understands

use std::fmt;

use serde::{Deserialize, Serialize};

use super::connection::{Connection, ConnectionType};
use super::core::{ConfigMap, ObjectMeta, Secret};
use super::dataset::{DataSet, DataSetType};
use super::workflow::{CronWorkflow, Owner, Workflow, WorkflowKind, WorkflowSpec, WorkflowTemplate};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Connection,
    ConnectionType,
    DataSet,
    DataSetType,
    Workflow,
    WorkflowTemplate,
    CronWorkflow,
    ConfigMap,
    Secret,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Connection => "Connection",
            ResourceKind::ConnectionType => "ConnectionType",
            ResourceKind::DataSet => "DataSet",
            ResourceKind::DataSetType => "DataSetType",
            ResourceKind::Workflow => "Workflow",
            ResourceKind::WorkflowTemplate => "WorkflowTemplate",
            ResourceKind::CronWorkflow => "CronWorkflow",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<WorkflowKind> for ResourceKind {
    fn from(kind: WorkflowKind) -> Self {
        match kind {
            WorkflowKind::Workflow => ResourceKind::Workflow,
            WorkflowKind::WorkflowTemplate => ResourceKind::WorkflowTemplate,
            WorkflowKind::CronWorkflow => ResourceKind::CronWorkflow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    Connection(Connection),
    ConnectionType(ConnectionType),
    DataSet(DataSet),
    DataSetType(DataSetType),
    Workflow(Workflow),
    WorkflowTemplate(WorkflowTemplate),
    CronWorkflow(CronWorkflow),
    ConfigMap(ConfigMap),
    Secret(Secret),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Connection(_) => ResourceKind::Connection,
            Resource::ConnectionType(_) => ResourceKind::ConnectionType,
            Resource::DataSet(_) => ResourceKind::DataSet,
            Resource::DataSetType(_) => ResourceKind::DataSetType,
            Resource::Workflow(_) => ResourceKind::Workflow,
            Resource::WorkflowTemplate(_) => ResourceKind::WorkflowTemplate,
            Resource::CronWorkflow(_) => ResourceKind::CronWorkflow,
            Resource::ConfigMap(_) => ResourceKind::ConfigMap,
            Resource::Secret(_) => ResourceKind::Secret,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Resource::Connection(r) => &r.metadata,
            Resource::ConnectionType(r) => &r.metadata,
            Resource::DataSet(r) => &r.metadata,
            Resource::DataSetType(r) => &r.metadata,
            Resource::Workflow(r) => &r.metadata,
            Resource::WorkflowTemplate(r) => &r.metadata,
            Resource::CronWorkflow(r) => &r.metadata,
            Resource::ConfigMap(r) => &r.metadata,
            Resource::Secret(r) => &r.metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata().namespace
    }

    /// Owner and workflow spec, for the kinds that carry a task graph
    pub fn workflow_spec(&self) -> Option<(Owner, &WorkflowSpec)> {
        match self {
            Resource::Workflow(wf) => Some((Owner::new(WorkflowKind::Workflow, &wf.metadata), &wf.spec)),
            Resource::WorkflowTemplate(wt) => Some((
                Owner::new(WorkflowKind::WorkflowTemplate, &wt.metadata),
                &wt.spec.workflow,
            )),
            Resource::CronWorkflow(cw) => Some((
                Owner::new(WorkflowKind::CronWorkflow, &cw.metadata),
                &cw.spec.workflow_spec,
            )),
            _ => None,
        }
    }

    /// Parse a multi-document YAML stream; empty documents are skipped
    pub fn parse_all(yaml: &str) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = serde_yaml::Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            resources.push(serde_yaml::from_value(value)?);
        }
        Ok(resources)
    }

    /// Render resources as one multi-document YAML stream
    pub fn to_yaml_stream<'a, I>(resources: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a Resource>,
    {
        let mut out = String::new();
        for resource in resources {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(resource)?);
        }
        Ok(out)
    }
}

macro_rules! impl_from_resource {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Resource {
                fn from(value: $variant) -> Self {
                    Resource::$variant(value)
                }
            }
        )*
    };
}

impl_from_resource!(
    Connection,
    ConnectionType,
    DataSet,
    DataSetType,
    Workflow,
    WorkflowTemplate,
    CronWorkflow,
    ConfigMap,
    Secret,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_document_stream() {
        let resources = Resource::parse_all(
            r#"
---
kind: ConfigMap
metadata:
  name: pg-config
  namespace: etl
data:
  host: db.local
---
---
kind: Connection
metadata:
  name: pg
  namespace: etl
spec:
  type: postgres
  credentials:
    host:
      valueFrom:
        configMapKeyRef: { name: pg-config, key: host }
"#,
        )
        .unwrap();

        let kinds: Vec<ResourceKind> = resources.iter().map(Resource::kind).collect();
        assert_eq!(kinds, vec![ResourceKind::ConfigMap, ResourceKind::Connection]);
        assert_eq!(resources[1].namespace(), "etl");
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let result = Resource::parse_all("kind: Pod\nmetadata: { name: x }\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_stream_carries_kind() {
        let secret = Resource::from(Secret::empty("out", "etl"));
        let yaml = Resource::to_yaml_stream([&secret]).unwrap();
        assert!(yaml.starts_with("---\n"));
        assert!(yaml.contains("kind: Secret"));
        assert_eq!(Resource::parse_all(&yaml).unwrap(), vec![secret]);
    }

    #[test]
    fn test_workflow_spec_only_for_graph_kinds() {
        let secret = Resource::from(Secret::empty("out", "etl"));
        assert!(secret.workflow_spec().is_none());
    }
}
