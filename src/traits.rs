use crate::error::SettingsError;

/// The four settings tiers, ordered by priority: `System` is the lowest,
/// `Document` the highest. The order is fixed; resolution walks it from the
/// most specific tier down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    System,
    User,
    Directory,
    Document,
}

impl Scope {
    /// All scopes, highest priority first — the probe order for resolution.
    pub const DESCENDING: [Scope; 4] =
        [Scope::Document, Scope::Directory, Scope::User, Scope::System];
}

/// ScopeStore is the key-value contract every scope backend implements.
///
/// A store is a thin, stateless handle: each operation re-reads the backend,
/// so two handles over the same (namespace, scope) always observe the same
/// committed data. Resolution across scopes is not a store concern — a store
/// only ever answers for its own tier.
pub trait ScopeStore {
    /// Value for a key. Fails with `NotFound` if the key is absent in this
    /// scope — never falls back to another scope, never returns a default.
    fn get(&self, key: &str) -> Result<Vec<u8>, SettingsError>;

    /// Idempotent upsert; overwrites silently.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), SettingsError>;

    /// Remove a key. Deleting an absent key is a no-op, so clear/reset
    /// paths can call it unconditionally.
    fn delete(&self, key: &str) -> Result<(), SettingsError>;

    /// Enumerate keys. Each call re-reads the backend. Only the Document
    /// scope guarantees an order (insertion order).
    fn keys(&self) -> Result<Vec<String>, SettingsError>;

    /// Membership: `get` succeeds and returns a non-empty value. An
    /// explicitly stored empty value is absent for `contains`, but `get`
    /// still returns it.
    fn contains(&self, key: &str) -> Result<bool, SettingsError> {
        match self.get(key) {
            Ok(value) => Ok(!value.is_empty()),
            Err(SettingsError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Values in `keys()` order, fetched one `get` at a time — no snapshot.
    /// A concurrent external removal between the enumeration and the fetch
    /// surfaces as `NotFound`.
    fn values(&self) -> Result<Vec<Vec<u8>>, SettingsError> {
        self.keys()?.iter().map(|key| self.get(key)).collect()
    }

    /// (key, value) pairs, with the same derivation and caveat as `values`.
    fn entries(&self) -> Result<Vec<(String, Vec<u8>)>, SettingsError> {
        self.keys()?
            .into_iter()
            .map(|key| {
                let value = self.get(&key)?;
                Ok((key, value))
            })
            .collect()
    }
}

/// Keys must be non-empty; beyond that any string is accepted and the
/// backends escape as needed.
pub(crate) fn require_key(key: &str) -> Result<(), SettingsError> {
    if key.is_empty() {
        Err(SettingsError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}
