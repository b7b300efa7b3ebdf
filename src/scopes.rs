use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::backend::IniStore;
use crate::config::HostConfig;
use crate::document::{DocumentNode, DocumentStore};
use crate::error::SettingsError;
use crate::namespace;
use crate::traits::{require_key, ScopeStore};

/// Path of the currently open document — injected so the directory scope can
/// derive its working directory without touching host globals.
pub trait DocumentLocator: Send + Sync {
    fn document_path(&self) -> Result<PathBuf, SettingsError>;
}

/// Locator pinned to one path. Suits hosts with a single active document per
/// process, and tests.
#[derive(Debug, Clone)]
pub struct FixedDocumentLocator {
    path: PathBuf,
}

impl FixedDocumentLocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentLocator for FixedDocumentLocator {
    fn document_path(&self) -> Result<PathBuf, SettingsError> {
        Ok(self.path.clone())
    }
}

/// Settings file of the directory scope: sibling of the open document.
pub(crate) fn directory_settings_file(
    config: &HostConfig,
    locator: &dyn DocumentLocator,
) -> Result<PathBuf, SettingsError> {
    let doc = locator.document_path()?;
    let dir = doc.parent().ok_or_else(|| {
        SettingsError::Storage(format!("document path {:?} has no parent directory", doc))
    })?;
    Ok(config.directory_file(dir))
}

// The three INI-backed scopes share these wrappers; only the file they open
// differs.
fn ini_get(store: &IniStore, group: &str, key: &str) -> Result<Vec<u8>, SettingsError> {
    require_key(key)?;
    store
        .get(group, key)?
        .ok_or_else(|| SettingsError::NotFound(key.to_string()))
}

fn ini_set(store: &IniStore, group: &str, key: &str, value: &[u8]) -> Result<(), SettingsError> {
    require_key(key)?;
    store.set(group, key, value)
}

fn ini_delete(store: &IniStore, group: &str, key: &str) -> Result<(), SettingsError> {
    require_key(key)?;
    store.remove(group, key)
}

// ── system scope ────────────────────────────────────────────────────

/// Machine-wide settings, stored in the system settings file.
pub struct SystemScope {
    store: IniStore,
    namespace: String,
}

impl SystemScope {
    pub fn new(config: &HostConfig, namespace: &str) -> Result<Self, SettingsError> {
        Ok(Self::with_validated(config, namespace::checked(namespace)?))
    }

    pub(crate) fn with_validated(config: &HostConfig, namespace: String) -> Self {
        Self {
            store: IniStore::open(config.system_file()),
            namespace,
        }
    }

    /// Drop every key in this namespace.
    pub fn clear(&self) -> Result<(), SettingsError> {
        self.store.remove_group(&self.namespace)
    }
}

impl ScopeStore for SystemScope {
    fn get(&self, key: &str) -> Result<Vec<u8>, SettingsError> {
        ini_get(&self.store, &self.namespace, key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        ini_set(&self.store, &self.namespace, key, value)
    }

    fn delete(&self, key: &str) -> Result<(), SettingsError> {
        ini_delete(&self.store, &self.namespace, key)
    }

    fn keys(&self) -> Result<Vec<String>, SettingsError> {
        self.store.keys(&self.namespace)
    }
}

// ── user scope ──────────────────────────────────────────────────────

/// Per-user settings, stored in the user settings file.
pub struct UserScope {
    store: IniStore,
    namespace: String,
}

impl UserScope {
    pub fn new(config: &HostConfig, namespace: &str) -> Result<Self, SettingsError> {
        Ok(Self::with_validated(config, namespace::checked(namespace)?))
    }

    pub(crate) fn with_validated(config: &HostConfig, namespace: String) -> Self {
        Self {
            store: IniStore::open(config.user_file()),
            namespace,
        }
    }

    pub fn clear(&self) -> Result<(), SettingsError> {
        self.store.remove_group(&self.namespace)
    }
}

impl ScopeStore for UserScope {
    fn get(&self, key: &str) -> Result<Vec<u8>, SettingsError> {
        ini_get(&self.store, &self.namespace, key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        ini_set(&self.store, &self.namespace, key, value)
    }

    fn delete(&self, key: &str) -> Result<(), SettingsError> {
        ini_delete(&self.store, &self.namespace, key)
    }

    fn keys(&self) -> Result<Vec<String>, SettingsError> {
        self.store.keys(&self.namespace)
    }
}

// ── directory scope ─────────────────────────────────────────────────

/// Settings local to the open document's directory, stored in a dot-file
/// next to the document. The directory is re-resolved from the locator on
/// every operation, so switching documents switches the file.
pub struct DirectoryScope {
    config: HostConfig,
    locator: Arc<dyn DocumentLocator>,
    namespace: String,
}

impl DirectoryScope {
    pub fn new(
        config: &HostConfig,
        locator: Arc<dyn DocumentLocator>,
        namespace: &str,
    ) -> Result<Self, SettingsError> {
        Ok(Self::with_validated(
            config,
            locator,
            namespace::checked(namespace)?,
        ))
    }

    pub(crate) fn with_validated(
        config: &HostConfig,
        locator: Arc<dyn DocumentLocator>,
        namespace: String,
    ) -> Self {
        Self {
            config: config.clone(),
            locator,
            namespace,
        }
    }

    fn store(&self) -> Result<IniStore, SettingsError> {
        Ok(IniStore::open(directory_settings_file(
            &self.config,
            self.locator.as_ref(),
        )?))
    }

    pub fn clear(&self) -> Result<(), SettingsError> {
        self.store()?.remove_group(&self.namespace)
    }
}

impl ScopeStore for DirectoryScope {
    fn get(&self, key: &str) -> Result<Vec<u8>, SettingsError> {
        ini_get(&self.store()?, &self.namespace, key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        ini_set(&self.store()?, &self.namespace, key, value)
    }

    fn delete(&self, key: &str) -> Result<(), SettingsError> {
        ini_delete(&self.store()?, &self.namespace, key)
    }

    fn keys(&self) -> Result<Vec<String>, SettingsError> {
        self.store()?.keys(&self.namespace)
    }
}

// ── document scope ──────────────────────────────────────────────────

// The registry lives in a node whose name starts with a character the
// namespace policy rejects, so it can never collide with a plugin node.
const REGISTRY_NODE: &str = "$ namespaces";
const REGISTRY_KEY: &str = "namespaces";

pub(crate) fn registry_namespaces(
    store: &dyn DocumentStore,
) -> Result<Vec<String>, SettingsError> {
    let node = store.open_node(REGISTRY_NODE)?;
    match node.hash_get(REGISTRY_KEY)? {
        Some(raw) => serde_json::from_slice(&raw)
            .map_err(|e| SettingsError::Storage(format!("corrupt namespace registry: {}", e))),
        None => Ok(Vec::new()),
    }
}

fn registry_write(store: &dyn DocumentStore, names: &[String]) -> Result<(), SettingsError> {
    let node = store.open_node(REGISTRY_NODE)?;
    let raw = serde_json::to_vec(names)
        .map_err(|e| SettingsError::Storage(format!("namespace registry encode: {}", e)))?;
    node.hash_set(REGISTRY_KEY, &raw)
}

fn registry_add(store: &dyn DocumentStore, namespace: &str) -> Result<(), SettingsError> {
    let mut names = registry_namespaces(store)?;
    if names.iter().any(|n| n == namespace) {
        debug!("namespace {:?} already registered", namespace);
        return Ok(());
    }
    names.push(namespace.to_string());
    names.sort();
    registry_write(store, &names)
}

fn registry_drop(store: &dyn DocumentStore, namespace: &str) -> Result<(), SettingsError> {
    let mut names = registry_namespaces(store)?;
    let before = names.len();
    names.retain(|n| n != namespace);
    if names.len() == before {
        return Ok(());
    }
    registry_write(store, &names)
}

/// Settings embedded in the open document itself — the highest-priority
/// scope. Every access also records the namespace in the document-wide
/// registry (skipping the write when already present); the registry update
/// and the key write are two separate operations, so a crash between them
/// can leave the registry stale.
pub struct DocumentScope {
    documents: Arc<dyn DocumentStore>,
    organization: String,
    namespace: String,
}

impl DocumentScope {
    pub fn new(
        config: &HostConfig,
        documents: Arc<dyn DocumentStore>,
        namespace: &str,
    ) -> Result<Self, SettingsError> {
        Ok(Self::with_validated(
            config,
            documents,
            namespace::checked(namespace)?,
        ))
    }

    pub(crate) fn with_validated(
        config: &HostConfig,
        documents: Arc<dyn DocumentStore>,
        namespace: String,
    ) -> Self {
        Self {
            documents,
            organization: config.organization.clone(),
            namespace,
        }
    }

    fn node_name(&self) -> String {
        format!("{}.{}", self.organization, self.namespace)
    }

    fn node(&self) -> Result<Box<dyn DocumentNode>, SettingsError> {
        registry_add(self.documents.as_ref(), &self.namespace)?;
        self.documents.open_node(&self.node_name())
    }

    /// Destroy every key in this namespace and drop it from the registry.
    pub fn clear(&self) -> Result<(), SettingsError> {
        self.documents.open_node(&self.node_name())?.kill()?;
        registry_drop(self.documents.as_ref(), &self.namespace)
    }
}

impl ScopeStore for DocumentScope {
    fn get(&self, key: &str) -> Result<Vec<u8>, SettingsError> {
        require_key(key)?;
        self.node()?
            .hash_get(key)?
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        require_key(key)?;
        self.node()?.hash_set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), SettingsError> {
        require_key(key)?;
        self.node()?.hash_del(key)
    }

    fn keys(&self) -> Result<Vec<String>, SettingsError> {
        self.node()?.hash_keys()
    }
}
