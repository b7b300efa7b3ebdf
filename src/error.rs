use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    /// Key is absent in the probed scope. Recoverable: multi-scope readers
    /// catch this per scope and keep probing.
    #[error("key not found: {0}")]
    NotFound(String),

    /// Namespace (or organization/application name) fails the
    /// allowed-character policy. Raised at construction time.
    #[error("invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// Key is not usable with the backing stores (currently: empty).
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Backend failure: I/O, database, or a malformed settings file.
    /// Propagates unchanged; the caller decides what to do.
    #[error("storage error: {0}")]
    Storage(String),
}
