//! credflow - credential resolution and workflow injection engine
//!
//! Validates Connections and DataSets against their types, resolves credential
//! values from ConfigMaps and Secrets, renders content templates, and rewrites
//! task graphs so the right steps receive secret-backed env vars and files.

pub mod admission;
pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod materializer;
pub mod planner;
pub mod resolver;
pub mod store;
pub mod template;
pub mod validation;

pub use admission::{AdmissionResponse, AdmissionReviewer};
pub use config::Config;
pub use error::{CredflowError, FixSuggestion, Result};
pub use graph::{TaskGraph, Template, TemplateIndex};
pub use materializer::SecretMaterializer;
pub use planner::{PlannedResources, Planner, PlannerConfig};
pub use resolver::CredentialResolver;
pub use store::{FileStore, MemoryStore, ObjectStore, StoreError};
pub use template::TemplateRenderer;
pub use validation::{ErrorList, FieldError, FieldErrorKind, Validator};
