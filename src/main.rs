//! credflow CLI - validate, plan and materialize credential injection

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use credflow::api::{Resource, WorkflowKind};
use credflow::{
    AdmissionReviewer, Config, CredflowError, FileStore, FixSuggestion, MemoryStore, Planner,
    SecretMaterializer,
};

#[derive(Parser)]
#[command(name = "credflow")]
#[command(about = "credflow - credential resolution and workflow injection")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/credflow/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review Connections and DataSets against their types
    Validate {
        /// Manifest files (multi-document YAML)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory of manifests holding the referenced types
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Rewrite workflows for credential injection
    Plan {
        /// Manifest file with Workflow, WorkflowTemplate or CronWorkflow documents
        file: PathBuf,

        /// Write planned manifests here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Populate a workflow's generated secret (runs inside the planned graph)
    Inject {
        #[arg(long)]
        workflow: String,

        #[arg(long)]
        namespace: String,

        /// Kind of the owning resource
        #[arg(long, default_value = "Workflow")]
        kind: WorkflowKind,

        /// Directory of manifests backing the object store
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config.with_env(),
        Err(e) => exit_with(anyhow::Error::new(e)),
    };

    // Logs go to stderr so planned manifests on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate { files, store } => {
            validate_manifests(&files, store.as_deref().or(config.store.dir.as_deref())).await
        }
        Commands::Plan { file, output } => plan_manifests(&file, output.as_deref(), &config),
        Commands::Inject {
            workflow,
            namespace,
            kind,
            store,
        } => {
            let store = store.or_else(|| config.store.dir.clone());
            inject_secret(&workflow, &namespace, kind, store.as_deref()).await
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => exit_with(e),
    }
}

fn exit_with(e: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), e);
    if let Some(suggestion) = e.downcast_ref::<CredflowError>().and_then(|e| e.fix_suggestion()) {
        eprintln!("  {} {}", "Fix:".yellow(), suggestion);
    }
    std::process::exit(1);
}

fn read_manifests(path: &Path) -> anyhow::Result<Vec<Resource>> {
    let yaml = fs::read_to_string(path)
        .map_err(CredflowError::from)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Resource::parse_all(&yaml).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Returns `false` when any resource was denied
async fn validate_manifests(files: &[PathBuf], store_dir: Option<&Path>) -> anyhow::Result<bool> {
    let mut documents = Vec::new();
    for file in files {
        for resource in read_manifests(file)? {
            documents.push((file.clone(), resource));
        }
    }

    // Types may live in the store directory or next to the resources
    let store = MemoryStore::new();
    if let Some(dir) = store_dir {
        let file_store = FileStore::open(dir)
            .map_err(CredflowError::from)
            .with_context(|| format!("Failed to open store {}", dir.display()))?;
        for resource in file_store.resources() {
            store.insert(resource);
        }
    }
    for (_, resource) in &documents {
        store.insert(resource.clone());
    }

    let reviewer = AdmissionReviewer::new(&store);
    let mut all_allowed = true;
    for (file, resource) in &documents {
        let response = reviewer.review(resource).await?;
        let label = format!("{} '{}'", resource.kind(), resource.name());
        if response.allowed {
            println!("{} {} ({})", "✓".green(), label, file.display());
        } else {
            all_allowed = false;
            println!("{} {} ({})", "✗".red(), label, file.display());
            println!("  {}", response.message);
        }
    }

    Ok(all_allowed)
}

fn plan_manifests(file: &Path, output: Option<&Path>, config: &Config) -> anyhow::Result<bool> {
    let planner = Planner::new(config.planner_config());

    let mut planned = String::new();
    let mut count = 0;
    for resource in read_manifests(file)? {
        if resource.workflow_spec().is_none() {
            tracing::debug!(kind = %resource.kind(), name = %resource.name(), "not plannable, skipped");
            continue;
        }
        planned.push_str(&planner.plan_resource(&resource)?.to_yaml()?);
        count += 1;
    }

    if count == 0 {
        return Err(CredflowError::NotPlannable {
            kind: "any document".to_string(),
        })
        .with_context(|| format!("{} contains no Workflow, WorkflowTemplate or CronWorkflow", file.display()));
    }

    match output {
        Some(path) => {
            fs::write(path, planned)
                .map_err(CredflowError::from)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Planned {} workflow(s) into {}", "✓".green(), count, path.display());
        }
        None => print!("{}", planned),
    }
    Ok(true)
}

async fn inject_secret(
    workflow: &str,
    namespace: &str,
    kind: WorkflowKind,
    store_dir: Option<&Path>,
) -> anyhow::Result<bool> {
    let dir = store_dir.ok_or_else(|| CredflowError::Config {
        reason: "no store directory: pass --store or set CREDFLOW_STORE_DIR".to_string(),
    })?;
    let store = FileStore::open(dir).map_err(CredflowError::from)?;

    let secret = SecretMaterializer::new(&store)
        .populate(workflow, namespace, kind)
        .await?;

    println!(
        "{} Populated secret '{}' with {} value(s)",
        "✓".green(),
        secret.metadata.name,
        secret.string_data.len()
    );
    Ok(true)
}
