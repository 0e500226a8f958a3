//! Directory-of-manifests object store
//!
//! Every `*.yaml`/`*.yml` file under the root is loaded at open time. Only
//! documents in the core (`v1`) or credflow API group are managed; anything
//! else (e.g. planned engine manifests) is left alone.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{object_key, ObjectKey, ObjectStore, StoreError};
use crate::api::{Resource, ResourceKind, Secret, API_VERSION};

#[derive(Debug, Clone)]
struct Stored {
    resource: Resource,
    origin: PathBuf,
    /// Position among the non-empty documents of `origin`
    document: usize,
}

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    objects: DashMap<ObjectKey, Stored>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Load every manifest under `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let objects = DashMap::new();

        let walker = WalkDir::new(&root).sort_by_file_name().into_iter();
        for entry in walker {
            let entry = entry.map_err(|e| StoreError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                source: e.into_io_error().unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            })?;
            if !entry.file_type().is_file() || !is_manifest(entry.path()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            let yaml = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

            for (document, value) in documents(&yaml, &path)?.into_iter().enumerate() {
                if !is_managed(&value) {
                    debug!(path = %path.display(), document, "skipping unmanaged document");
                    continue;
                }
                let resource: Resource = serde_yaml::from_value(value).map_err(|e| StoreError::Parse {
                    path: path.clone(),
                    details: e.to_string(),
                })?;
                let key = object_key(resource.kind(), resource.namespace(), resource.name());
                let stored = Stored {
                    resource,
                    origin: path.clone(),
                    document,
                };
                if let Some(previous) = objects.insert(key, stored) {
                    warn!(
                        kind = %previous.resource.kind(),
                        name = %previous.resource.name(),
                        shadowed = %previous.origin.display(),
                        by = %path.display(),
                        "duplicate object in store directory"
                    );
                }
            }
        }

        info!(root = %root.display(), objects = objects.len(), "opened manifest store");
        Ok(Self {
            root,
            objects,
            write_lock: Mutex::new(()),
        })
    }

    /// Snapshot of every managed object
    pub fn resources(&self) -> Vec<Resource> {
        self.objects.iter().map(|entry| entry.resource.clone()).collect()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Option<Resource>, StoreError> {
        Ok(self
            .objects
            .get(&object_key(kind, namespace, name))
            .map(|entry| entry.resource.clone()))
    }

    async fn update_secret(&self, secret: Secret) -> Result<(), StoreError> {
        let key = object_key(ResourceKind::Secret, &secret.metadata.namespace, &secret.metadata.name);
        let (origin, document) = match self.objects.get(&key) {
            Some(entry) => (entry.origin.clone(), entry.document),
            None => {
                return Err(StoreError::NotFound {
                    kind: ResourceKind::Secret,
                    namespace: secret.metadata.namespace,
                    name: secret.metadata.name,
                })
            }
        };

        let _guard = self.write_lock.lock().await;

        let yaml = tokio::fs::read_to_string(&origin).await.map_err(|source| StoreError::Io {
            path: origin.clone(),
            source,
        })?;
        let mut docs = documents(&yaml, &origin)?;
        let resource = Resource::Secret(secret);
        let replacement = serde_yaml::to_value(&resource).map_err(|e| StoreError::Backend(e.to_string()))?;
        match docs.get_mut(document) {
            Some(slot) => *slot = replacement,
            None => {
                return Err(StoreError::Parse {
                    path: origin,
                    details: format!("document {} disappeared since the store was opened", document),
                })
            }
        }

        let mut out = String::new();
        for doc in &docs {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(doc).map_err(|e| StoreError::Backend(e.to_string()))?);
        }
        let target = origin.clone();
        tokio::task::spawn_blocking(move || replace_file(&target, out.as_bytes()))
            .await
            .map_err(|e| StoreError::Backend(format!("write task failed: {}", e)))??;

        debug!(secret = %resource.name(), path = %origin.display(), "secret written back");
        self.objects.insert(
            key,
            Stored {
                resource,
                origin,
                document,
            },
        );
        Ok(())
    }
}

/// Swap `path` for `contents` via a sibling temp file and a rename
///
/// Readers see either the old file or the new one, never a truncated mix.
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let io_error = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;
    staged.write_all(contents).map_err(io_error)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        staged.as_file().set_permissions(metadata.permissions()).map_err(io_error)?;
    }
    staged.as_file().sync_all().map_err(io_error)?;
    staged.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Non-empty documents of a YAML stream
fn documents(yaml: &str, path: &Path) -> Result<Vec<serde_yaml::Value>, StoreError> {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(yaml) {
        let value = serde_yaml::Value::deserialize(document).map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

fn is_managed(value: &serde_yaml::Value) -> bool {
    match value.get("apiVersion").and_then(serde_yaml::Value::as_str) {
        None => true,
        Some(version) => version == "v1" || version == API_VERSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MANIFESTS: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: pg-config
  namespace: etl
data:
  host: db.local
---
apiVersion: v1
kind: Secret
metadata:
  name: nightly-out
  namespace: etl
---
apiVersion: argoproj.io/v1alpha1
kind: Workflow
metadata:
  name: nightly
spec:
  entrypoint: main
"#;

    fn store_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/objects.yaml"), MANIFESTS).unwrap();
        fs::write(dir.path().join("README.md"), "not a manifest").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_open_loads_managed_documents() {
        let dir = store_dir();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.config_map("etl", "pg-config").await.unwrap().is_some());
        assert!(store
            .get(ResourceKind::Workflow, "default", "nightly")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_secret_writes_back_in_place() {
        let dir = store_dir();
        let store = FileStore::open(dir.path()).unwrap();

        let mut secret = store.secret("etl", "nightly-out").await.unwrap().unwrap();
        secret.string_data.insert("pgpass".to_string(), "hunter2".to_string());
        store.update_secret(secret).await.unwrap();

        let written = fs::read_to_string(dir.path().join("nested/objects.yaml")).unwrap();
        assert!(written.contains("pgpass: hunter2"));
        assert!(written.contains("argoproj.io/v1alpha1"));

        let reopened = FileStore::open(dir.path()).unwrap();
        let secret = reopened.secret("etl", "nightly-out").await.unwrap().unwrap();
        assert_eq!(secret.get("pgpass").unwrap(), Some("hunter2"));
        assert!(reopened.config_map("etl", "pg-config").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_secret_leaves_no_staging_files() {
        let dir = store_dir();
        let store = FileStore::open(dir.path()).unwrap();

        for round in 0..3 {
            let mut secret = store.secret("etl", "nightly-out").await.unwrap().unwrap();
            secret.string_data.insert("round".to_string(), round.to_string());
            store.update_secret(secret).await.unwrap();

            // Every write leaves a complete, parseable store behind
            let reopened = FileStore::open(dir.path()).unwrap();
            assert_eq!(reopened.len(), 2);
            let secret = reopened.secret("etl", "nightly-out").await.unwrap().unwrap();
            assert_eq!(secret.get("round").unwrap(), Some(round.to_string().as_str()));
        }

        let entries: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("objects.yaml")]);
    }

    #[test]
    fn test_replace_file_swaps_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("objects.yaml");
        fs::write(&path, "old: true\n").unwrap();

        replace_file(&path, b"new: true\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new: true\n");
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.yaml"), "kind: Secret\nmetadata: 12\n").unwrap();
        let err = FileStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }
}
