//! # Workflow Injection Planner
//!
//! Rewrites a task graph so the steps named in `injectInto` receive their
//! injectable values from the workflow's generated secret:
//!
//! 1. a secret-backed volume named `name_with_hash(workflow)`
//! 2. a daemon `run-injection` node that populates the secret at run time
//! 3. a wrapper `injection-entrypoint` Steps node: `[[run-injection], [entrypoint]]`
//! 4. env vars / read-only mounts on every leaf reachable from each target
//!
//! Planning is pure and fail-closed: every lookup succeeds before the graph
//! is touched, and `inject(inject(g)) == inject(g)`.

mod mutate;
pub mod translate;
mod walk;

pub use mutate::{add_env_var, add_volume_mount};
pub use translate::{EngineManifest, PlannedResources, ENGINE_API_VERSION};

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::api::{name_with_hash, InjectableValue, Owner, TemplateRef, WorkflowKind, WorkflowSpec};
use crate::error::{CredflowError, Result};
use crate::graph::{Container, TaskGraph, Template, TemplateIndex, Volume, WorkflowStep};

/// Daemon node that populates the generated secret
pub const INJECTION_TEMPLATE: &str = "run-injection";

/// Steps node that runs injection before the original entrypoint
pub const WRAPPER_TEMPLATE: &str = "injection-entrypoint";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Image of the `run-injection` container
    pub image: String,
    pub command: Vec<String>,
    /// Used when a workflow sets no `injectionServiceAccount`
    pub service_account: Option<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            image: "credflow:latest".to_string(),
            command: vec!["credflow".to_string(), "inject".to_string()],
            service_account: None,
        }
    }
}

pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan a workflow spec; its `injectionServiceAccount` overrides the default
    pub fn plan(&self, spec: &WorkflowSpec, owner: &Owner) -> Result<TaskGraph> {
        let service_account = spec
            .injection_service_account
            .as_deref()
            .or(self.config.service_account.as_deref());
        self.inject_with_account(
            spec.graph.clone(),
            owner,
            &spec.injectable_values,
            &spec.inject_into,
            service_account,
        )
    }

    /// Rewrite `graph` so every TemplateRef target receives its values
    pub fn inject(
        &self,
        graph: TaskGraph,
        owner: &Owner,
        injectable_values: &[InjectableValue],
        inject_into: &[TemplateRef],
    ) -> Result<TaskGraph> {
        self.inject_with_account(
            graph,
            owner,
            injectable_values,
            inject_into,
            self.config.service_account.as_deref(),
        )
    }

    fn inject_with_account(
        &self,
        mut graph: TaskGraph,
        owner: &Owner,
        injectable_values: &[InjectableValue],
        inject_into: &[TemplateRef],
        service_account: Option<&str>,
    ) -> Result<TaskGraph> {
        let mut index = TemplateIndex::build(&graph.templates)?;
        let artifact = name_with_hash(&owner.name);
        let entrypoint = original_entrypoint(&graph, &index)?;

        // Phase 1: every lookup, no mutation
        let mut values: FxHashMap<&str, &InjectableValue> = FxHashMap::default();
        for iv in injectable_values {
            if values.contains_key(iv.name.as_str()) {
                warn!(value = %iv.name, "duplicate injectable value, keeping the first");
                continue;
            }
            values.insert(iv.name.as_str(), iv);
        }

        let mut bindings: Vec<(usize, Vec<&InjectableValue>)> = Vec::with_capacity(inject_into.len());
        for target in inject_into {
            if is_reserved(&target.name) {
                return Err(CredflowError::ReservedTemplateName {
                    name: target.name.clone(),
                });
            }
            let resolved = target
                .injected_values
                .iter()
                .map(|name| {
                    values
                        .get(name.as_str())
                        .copied()
                        .ok_or_else(|| CredflowError::UnknownInjectableValue {
                            name: name.clone(),
                            template: target.name.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            let root = index.get(&target.name).ok_or_else(|| CredflowError::MissingTemplate {
                name: target.name.clone(),
            })?;

            for leaf in walk::reachable_leaves(&graph.templates, &index, root)? {
                bindings.push((leaf, resolved.clone()));
            }
            debug!(target = %target.name, values = resolved.len(), "injection target resolved");
        }

        // Phase 2: apply
        for (leaf, values) in &bindings {
            if let Some(container) = graph.templates[*leaf].leaf_container_mut() {
                mutate::inject_container(container, &artifact, values);
            }
        }

        if !graph.volumes.iter().any(|v| v.name == artifact) {
            graph.volumes.push(Volume::from_secret(artifact.as_str(), artifact.as_str()));
        }
        index.upsert(&mut graph.templates, self.injection_template(owner, service_account));
        index.upsert(&mut graph.templates, wrapper_template(&entrypoint));
        graph.entrypoint = WRAPPER_TEMPLATE.to_string();

        info!(
            workflow = %owner.name,
            namespace = %owner.namespace,
            secret = %artifact,
            bindings = bindings.len(),
            "planned credential injection"
        );
        Ok(graph)
    }

    fn injection_template(&self, owner: &Owner, service_account: Option<&str>) -> Template {
        let mut args = vec![
            "--workflow".to_string(),
            owner.name.clone(),
            "--namespace".to_string(),
            owner.namespace.clone(),
        ];
        if owner.kind != WorkflowKind::Workflow {
            args.push("--kind".to_string());
            args.push(owner.kind.to_string());
        }

        let container = Container {
            image: Some(self.config.image.clone()),
            command: self.config.command.clone(),
            args,
            ..Container::default()
        };
        Template {
            daemon: Some(true),
            service_account_name: service_account.map(str::to_string),
            ..Template::container(INJECTION_TEMPLATE, container)
        }
    }
}

fn is_reserved(name: &str) -> bool {
    name == INJECTION_TEMPLATE || name == WRAPPER_TEMPLATE
}

fn wrapper_template(entrypoint: &str) -> Template {
    Template::steps(
        WRAPPER_TEMPLATE,
        vec![
            vec![WorkflowStep::new(INJECTION_TEMPLATE, INJECTION_TEMPLATE)],
            vec![WorkflowStep::new(entrypoint, entrypoint)],
        ],
    )
}

/// Entrypoint inside a wrapper built by [`wrapper_template`]
fn wrapped_entrypoint(wrapper: &Template) -> Option<&str> {
    match wrapper.steps.as_deref()? {
        [first, second]
            if first.len() == 1
                && first[0].template.as_deref() == Some(INJECTION_TEMPLATE)
                && second.len() == 1 =>
        {
            second[0].template.as_deref()
        }
        _ => None,
    }
}

/// Entrypoint the wrapper must run, looking through a previous plan
fn original_entrypoint(graph: &TaskGraph, index: &TemplateIndex) -> Result<String> {
    let wrapped = match index.get(WRAPPER_TEMPLATE) {
        Some(position) => Some(wrapped_entrypoint(&graph.templates[position]).ok_or_else(|| {
            CredflowError::ReservedTemplateName {
                name: WRAPPER_TEMPLATE.to_string(),
            }
        })?),
        None if index.contains(INJECTION_TEMPLATE) => {
            return Err(CredflowError::ReservedTemplateName {
                name: INJECTION_TEMPLATE.to_string(),
            })
        }
        None => None,
    };

    let entrypoint = match wrapped {
        Some(inner) if graph.entrypoint == WRAPPER_TEMPLATE => inner,
        _ => graph.entrypoint.as_str(),
    };
    if entrypoint.is_empty() || is_reserved(entrypoint) || !index.contains(entrypoint) {
        return Err(CredflowError::MissingTemplate {
            name: entrypoint.to_string(),
        });
    }
    Ok(entrypoint.to_string())
}
