//! Quick benchmark to verify template rendering and planning performance

use credflow::api::{InjectableValue, InjectionSource, Owner, TemplateRef, WorkflowKind};
use credflow::graph::{Container, DagTask, TaskGraph, Template};
use credflow::template::render;
use credflow::{Planner, PlannerConfig};
use serde_json::json;
use std::time::Instant;

fn main() {
    let data = json!({
        "user": "admin",
        "password": "hunter2",
        "host": "db.local",
        "metadata": {"table": "sales", "region": "eu"},
        "connection": {"host": "db.local", "port": "5432"}
    });

    // Test templates of varying complexity
    let templates = vec![
        "Simple text with no templates",
        "{{ .password }}",
        "postgres://{{ .user }}:{{ .password }}@{{ .host }}/app",
        "{{metadata.table}}@{{metadata.region}} via {{connection.host}}:{{connection.port}}",
        "{{- .user -}}\n  {{ .metadata }}",
    ];

    println!("Template Rendering Performance Test");
    println!("===================================\n");

    // Warm up the cache
    for template in &templates {
        let _ = render(template, &data);
    }

    for template in &templates {
        let iterations = 100_000;
        let start = Instant::now();

        for _ in 0..iterations {
            let _ = render(template, &data);
        }

        let elapsed = start.elapsed();
        let per_op = elapsed / iterations;

        println!("Template: {:60}", format!("{:?}", template));
        println!("  Time for {} iterations: {:?}", iterations, elapsed);
        println!("  Per operation: {:?}\n", per_op);
    }

    println!("Injection Planning Performance");
    println!("==============================\n");

    for width in [10usize, 100, 1_000] {
        let mut templates: Vec<Template> = (0..width)
            .map(|i| Template::container(format!("leaf-{}", i), Container::default()))
            .collect();
        templates.push(Template::dag(
            "main",
            (0..width)
                .map(|i| DagTask::new(format!("t{}", i), format!("leaf-{}", i)))
                .collect(),
        ));
        let graph = TaskGraph {
            entrypoint: "main".to_string(),
            templates,
            ..TaskGraph::default()
        };
        let owner = Owner {
            kind: WorkflowKind::Workflow,
            name: "bench".to_string(),
            namespace: "default".to_string(),
        };
        let values = [InjectableValue::env(
            "pgpass",
            InjectionSource::Connection("pg".to_string()),
            "PGPASSWORD",
            "{{ .password }}",
        )];
        let refs = [TemplateRef::new("main", ["pgpass"])];
        let planner = Planner::new(PlannerConfig::default());

        let iterations = 1_000u32;
        let start = Instant::now();
        for _ in 0..iterations {
            let _ = planner.inject(graph.clone(), &owner, &values, &refs);
        }
        let elapsed = start.elapsed();

        println!("DAG width {:>5}: {:?} per plan", width, elapsed / iterations);
    }
}
