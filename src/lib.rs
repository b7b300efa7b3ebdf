//! Layered key-value settings for plugins of a document-centric host
//! application.
//!
//! A plugin's settings live under a validated namespace and are resolved
//! across four tiers of increasing priority: system-wide, current user,
//! working directory, and the open document itself. Reads either target one
//! tier directly or resolve across all four, most specific tier first:
//!
//! ```text
//! let settings = PluginSettings::new("MSDN-doc", config, locator, documents)?;
//!
//! settings.user().set("verbosity", b"high")?;      // one explicit tier
//! let v = settings.resolve("verbosity")?;          // first tier that hits
//! ```
//!
//! Writes always name an explicit tier; only reads resolve. The system,
//! user, and directory tiers are backed by INI-style settings files; the
//! document tier by the host's document store ([`RedbDocumentStore`] by
//! default, or any [`DocumentStore`] implementation the host supplies).

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod facade;
mod ini;
pub mod namespace;
pub mod scopes;
pub mod traits;
pub mod transfer;

pub use backend::IniStore;
pub use config::HostConfig;
pub use document::{DocumentNode, DocumentStore, MemoryDocumentStore, RedbDocumentStore};
pub use error::SettingsError;
pub use facade::PluginSettings;
pub use namespace::validate;
pub use scopes::{
    DirectoryScope, DocumentLocator, DocumentScope, FixedDocumentLocator, SystemScope,
    UserScope,
};
pub use traits::{Scope, ScopeStore};
pub use transfer::{export_settings, import_settings};
