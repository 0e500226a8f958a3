//! End-to-end: plan a workflow, then materialize its secret from an in-memory store

use credflow::api::{name_with_hash, Resource, WorkflowKind};
use credflow::{MemoryStore, ObjectStore, Planner, PlannerConfig, SecretMaterializer};
use pretty_assertions::assert_eq;

const MANIFESTS: &str = r#"
kind: Secret
apiVersion: v1
metadata:
  name: warehouse-secret
  namespace: etl
stringData:
  password: hunter2
---
kind: Connection
metadata:
  name: warehouse
  namespace: etl
spec:
  type: postgres
  credentials:
    user:
      value: loader
    password:
      valueFrom:
        secretKeyRef: { name: warehouse-secret, key: password }
---
kind: DataSet
metadata:
  name: sales
  namespace: etl
spec:
  type: table
  metadata:
    table:
      value: sales_2024
  connection:
    connectionFrom:
      name: warehouse
---
kind: WorkflowTemplate
metadata:
  name: loader
  namespace: etl
spec:
  entrypoint: main
  workflowMetadata:
    labels:
      team: data
  templates:
    - name: main
      steps:
        - - name: load
            template: load
    - name: load
      container:
        image: loader:1
  injectable:
    - name: dsn
      connectionRef:
        name: warehouse
      envName: DSN
      content: "postgres://{{ .user }}:{{ .password }}@db/app"
    - name: table-config
      dataSetRef:
        name: sales
      mountPath: /etc/loader/table
      content: "{{ .metadata.table }} via {{ .connection.user }}"
  injectInto:
    - name: main
      inject: [dsn, table-config]
"#;

#[tokio::test]
async fn test_plan_then_materialize_workflow_template() {
    let resources = Resource::parse_all(MANIFESTS).unwrap();
    let template = resources
        .iter()
        .find(|r| r.kind().as_str() == "WorkflowTemplate")
        .unwrap();

    let planned = Planner::new(PlannerConfig::default())
        .plan_resource(template)
        .unwrap();
    assert_eq!(planned.workload.kind, "WorkflowTemplate");
    assert_eq!(planned.secret.metadata.name, name_with_hash("loader"));
    assert!(planned.secret.string_data.is_empty());

    let spec = &planned.workload.spec;
    assert_eq!(spec["entrypoint"], "injection-entrypoint");
    assert_eq!(spec["workflowMetadata"]["labels"]["team"], "data");

    let load = spec["templates"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "load")
        .unwrap();
    assert_eq!(load["container"]["env"][0]["name"], "DSN");
    assert_eq!(
        load["container"]["env"][0]["valueFrom"]["secretKeyRef"]["key"],
        "dsn"
    );
    assert_eq!(load["container"]["volumeMounts"][0]["mountPath"], "/etc/loader/table");
    assert_eq!(load["container"]["volumeMounts"][0]["subPath"], "table-config");

    // The controller creates the planned secret; the injector then fills it
    let store = MemoryStore::from_resources(resources);
    store.insert(planned.secret.clone());

    let secret = SecretMaterializer::new(&store)
        .populate("loader", "etl", WorkflowKind::WorkflowTemplate)
        .await
        .unwrap();
    assert_eq!(secret.get("dsn").unwrap().unwrap(), "postgres://loader:hunter2@db/app");
    assert_eq!(secret.get("table-config").unwrap().unwrap(), "sales_2024 via loader");

    let stored = store
        .secret("etl", &name_with_hash("loader"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, secret);
}

#[tokio::test]
async fn test_materialize_reports_missing_backing_key() {
    let manifests = MANIFESTS.replace("key: password", "key: pass");
    let resources = Resource::parse_all(&manifests).unwrap();
    let store = MemoryStore::from_resources(resources);
    store.insert(credflow::api::Secret::empty(name_with_hash("loader"), "etl"));

    let err = SecretMaterializer::new(&store)
        .populate("loader", "etl", WorkflowKind::WorkflowTemplate)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("dsn"), "{}", message);
    assert!(
        err.root_cause().to_string().contains("Key 'pass' not found"),
        "{}",
        err.root_cause()
    );
}
