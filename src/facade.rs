use std::sync::Arc;

use crate::backend::IniStore;
use crate::config::HostConfig;
use crate::document::DocumentStore;
use crate::error::SettingsError;
use crate::namespace;
use crate::scopes::{
    directory_settings_file, registry_namespaces, DirectoryScope, DocumentLocator,
    DocumentScope, SystemScope, UserScope,
};
use crate::traits::{require_key, Scope, ScopeStore};

/// Entry point for one plugin's settings.
///
/// Holds a validated namespace plus the injected collaborators, and hands
/// out per-scope stores on demand. Scope handles are throwaway — they carry
/// no cache, so a freshly constructed handle and a long-lived one always
/// agree with the backend.
///
/// ```text
/// let settings = PluginSettings::new("MSDN-doc", config, locator, documents)?;
/// settings.user().set("verbosity", b"high")?;
/// let effective = settings.resolve("verbosity")?;
/// ```
pub struct PluginSettings {
    namespace: String,
    config: HostConfig,
    locator: Arc<dyn DocumentLocator>,
    documents: Arc<dyn DocumentStore>,
}

impl PluginSettings {
    /// Validates the namespace once; everything downstream relies on it.
    pub fn new(
        namespace: &str,
        config: HostConfig,
        locator: Arc<dyn DocumentLocator>,
        documents: Arc<dyn DocumentStore>,
    ) -> Result<Self, SettingsError> {
        Ok(Self {
            namespace: namespace::checked(namespace)?,
            config,
            locator,
            documents,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn system(&self) -> SystemScope {
        SystemScope::with_validated(&self.config, self.namespace.clone())
    }

    pub fn user(&self) -> UserScope {
        UserScope::with_validated(&self.config, self.namespace.clone())
    }

    pub fn directory(&self) -> DirectoryScope {
        DirectoryScope::with_validated(&self.config, self.locator.clone(), self.namespace.clone())
    }

    pub fn document(&self) -> DocumentScope {
        DocumentScope::with_validated(&self.config, self.documents.clone(), self.namespace.clone())
    }

    /// The store for an arbitrary tier, behind the common contract.
    pub fn store(&self, scope: Scope) -> Box<dyn ScopeStore> {
        match scope {
            Scope::System => Box::new(self.system()),
            Scope::User => Box::new(self.user()),
            Scope::Directory => Box::new(self.directory()),
            Scope::Document => Box::new(self.document()),
        }
    }

    /// Resolve a key across scopes, most specific first: Document, then
    /// Directory, then User, then System. The first scope holding the key
    /// wins. A scope's `NotFound` means "keep probing"; any other error
    /// aborts the scan unchanged — no retry, no downgrade to a lower scope.
    /// `NotFound` is returned only once all four scopes have missed.
    pub fn resolve(&self, key: &str) -> Result<Vec<u8>, SettingsError> {
        require_key(key)?;
        for scope in Scope::DESCENDING {
            match self.store(scope).get(key) {
                Ok(value) => return Ok(value),
                Err(SettingsError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(SettingsError::NotFound(key.to_string()))
    }

    // Namespace listings cover every namespace with data in the tier, not
    // just this facade's own.

    pub fn system_namespaces(&self) -> Result<Vec<String>, SettingsError> {
        IniStore::open(self.config.system_file()).groups()
    }

    pub fn user_namespaces(&self) -> Result<Vec<String>, SettingsError> {
        IniStore::open(self.config.user_file()).groups()
    }

    pub fn directory_namespaces(&self) -> Result<Vec<String>, SettingsError> {
        let file = directory_settings_file(&self.config, self.locator.as_ref())?;
        IniStore::open(file).groups()
    }

    pub fn document_namespaces(&self) -> Result<Vec<String>, SettingsError> {
        registry_namespaces(self.documents.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocumentStore;
    use crate::scopes::FixedDocumentLocator;
    use tempfile::TempDir;

    fn settings_in(tmp: &TempDir, namespace: &str) -> PluginSettings {
        let config = HostConfig::new(
            "com.example",
            "gridworks",
            tmp.path().join("system"),
            tmp.path().join("user"),
        )
        .unwrap();
        let locator = Arc::new(FixedDocumentLocator::new(tmp.path().join("sample.doc")));
        let documents = Arc::new(MemoryDocumentStore::new());
        PluginSettings::new(namespace, config, locator, documents).unwrap()
    }

    #[test]
    fn construction_validates_namespace() {
        let tmp = TempDir::new().unwrap();
        let config =
            HostConfig::new("com.example", "gridworks", tmp.path(), tmp.path()).unwrap();
        let locator = Arc::new(FixedDocumentLocator::new(tmp.path().join("d")));
        let documents = Arc::new(MemoryDocumentStore::new());

        assert!(PluginSettings::new("My-Plugin 1.0", config.clone(), locator.clone(), documents.clone()).is_ok());
        assert!(matches!(
            PluginSettings::new("my/plugin", config.clone(), locator.clone(), documents.clone()),
            Err(SettingsError::InvalidNamespace(_))
        ));
        assert!(matches!(
            PluginSettings::new("", config, locator, documents),
            Err(SettingsError::InvalidNamespace(_))
        ));
    }

    #[test]
    fn resolve_walks_scopes_most_specific_first() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_in(&tmp, "plugin");

        settings.system().set("k", b"a").unwrap();
        assert_eq!(settings.resolve("k").unwrap(), b"a");

        settings.user().set("k", b"b").unwrap();
        assert_eq!(settings.resolve("k").unwrap(), b"b");

        settings.directory().set("k", b"c").unwrap();
        assert_eq!(settings.resolve("k").unwrap(), b"c");

        settings.document().set("k", b"d").unwrap();
        assert_eq!(settings.resolve("k").unwrap(), b"d");

        // clearing the document tier falls back to the directory value
        settings.document().clear().unwrap();
        assert_eq!(settings.resolve("k").unwrap(), b"c");
    }

    #[test]
    fn resolve_misses_with_not_found() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_in(&tmp, "plugin");
        assert!(matches!(
            settings.resolve("absent"),
            Err(SettingsError::NotFound(_))
        ));
    }

    #[test]
    fn resolve_does_not_leak_across_namespaces() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_in(&tmp, "plugin-a");
        settings.user().set("k", b"v").unwrap();

        let config = HostConfig::new(
            "com.example",
            "gridworks",
            tmp.path().join("system"),
            tmp.path().join("user"),
        )
        .unwrap();
        let locator = Arc::new(FixedDocumentLocator::new(tmp.path().join("sample.doc")));
        let documents = Arc::new(MemoryDocumentStore::new());
        let other = PluginSettings::new("plugin-b", config, locator, documents).unwrap();
        assert!(matches!(
            other.resolve("k"),
            Err(SettingsError::NotFound(_))
        ));
    }

    #[test]
    fn namespace_listings_per_scope() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_in(&tmp, "plugin-a");

        settings.system().set("k", b"1").unwrap();
        settings.user().set("k", b"2").unwrap();
        settings.directory().set("k", b"3").unwrap();
        settings.document().set("k", b"4").unwrap();

        assert_eq!(settings.system_namespaces().unwrap(), vec!["plugin-a"]);
        assert_eq!(settings.user_namespaces().unwrap(), vec!["plugin-a"]);
        assert_eq!(settings.directory_namespaces().unwrap(), vec!["plugin-a"]);
        assert_eq!(settings.document_namespaces().unwrap(), vec!["plugin-a"]);
    }

    #[test]
    fn store_accessor_matches_typed_accessors() {
        let tmp = TempDir::new().unwrap();
        let settings = settings_in(&tmp, "plugin");

        settings.store(Scope::User).set("k", b"via-store").unwrap();
        assert_eq!(settings.user().get("k").unwrap(), b"via-store");
    }
}
