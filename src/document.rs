use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::SettingsError;

/// One named sub-store inside a document: a hash of key → bytes plus the
/// order in which keys were first inserted.
pub trait DocumentNode {
    /// Value for a key, or None if absent.
    fn hash_get(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError>;

    /// Upsert a key. Re-setting an existing key keeps its original position
    /// in the enumeration order.
    fn hash_set(&self, key: &str, value: &[u8]) -> Result<(), SettingsError>;

    /// Delete a key. Deleting an absent key is a no-op.
    fn hash_del(&self, key: &str) -> Result<(), SettingsError>;

    /// All keys in insertion order.
    fn hash_keys(&self) -> Result<Vec<String>, SettingsError>;

    /// Destroy the whole node and every key under it.
    fn kill(&self) -> Result<(), SettingsError>;
}

/// The host's per-document store: named nodes created on first open.
///
/// The default implementation is [`RedbDocumentStore`]; hosts with their own
/// document model implement this pair of traits instead.
pub trait DocumentStore: Send + Sync {
    fn open_node(&self, name: &str) -> Result<Box<dyn DocumentNode>, SettingsError>;
}

// ── redb-backed document store ──────────────────────────────────────

const VALUES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("node_values");
const ORDER: TableDefinition<&[u8], u64> = TableDefinition::new("node_order");
const COUNTER: TableDefinition<&str, u64> = TableDefinition::new("node_seq");

// Entries for all nodes share one table, keyed by a length-prefixed
// (node, key) encoding. The length prefix keeps node names that are
// prefixes of each other from colliding.
fn node_prefix(node: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + node.len());
    buf.extend_from_slice(&(node.len() as u32).to_be_bytes());
    buf.extend_from_slice(node.as_bytes());
    buf
}

fn entry_key(node: &str, key: &str) -> Vec<u8> {
    let mut buf = node_prefix(node);
    buf.extend_from_slice(key.as_bytes());
    buf
}

/// Document store backed by redb — one embedded database per document.
///
/// A second table records the sequence number assigned when a key was first
/// inserted; enumeration sorts by it, so `hash_keys` yields insertion order.
pub struct RedbDocumentStore {
    db: Arc<Database>,
}

impl RedbDocumentStore {
    /// Open or create the document database at the given path.
    pub fn open(path: &Path) -> Result<Self, SettingsError> {
        let db = Database::create(path).map_err(|e| SettingsError::Storage(e.to_string()))?;

        // Ensure the tables exist by doing a write transaction.
        let write_txn = db
            .begin_write()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        {
            let _values = write_txn
                .open_table(VALUES)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
            let _order = write_txn
                .open_table(ORDER)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
            let _counter = write_txn
                .open_table(COUNTER)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl DocumentStore for RedbDocumentStore {
    fn open_node(&self, name: &str) -> Result<Box<dyn DocumentNode>, SettingsError> {
        Ok(Box::new(RedbNode {
            db: self.db.clone(),
            name: name.to_string(),
        }))
    }
}

struct RedbNode {
    db: Arc<Database>,
    name: String,
}

impl DocumentNode for RedbNode {
    fn hash_get(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(VALUES)
            .map_err(|e| SettingsError::Storage(e.to_string()))?;

        let ek = entry_key(&self.name, key);
        match table.get(ek.as_slice()) {
            Ok(Some(val)) => Ok(Some(val.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(SettingsError::Storage(e.to_string())),
        }
    }

    fn hash_set(&self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        {
            let mut values = write_txn
                .open_table(VALUES)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
            let ek = entry_key(&self.name, key);
            let existing = values
                .get(ek.as_slice())
                .map_err(|e| SettingsError::Storage(e.to_string()))?
                .is_some();
            values
                .insert(ek.as_slice(), value)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;

            if !existing {
                let mut counter = write_txn
                    .open_table(COUNTER)
                    .map_err(|e| SettingsError::Storage(e.to_string()))?;
                let next = counter
                    .get("next")
                    .map_err(|e| SettingsError::Storage(e.to_string()))?
                    .map(|g| g.value())
                    .unwrap_or(0);
                counter
                    .insert("next", next + 1)
                    .map_err(|e| SettingsError::Storage(e.to_string()))?;
                let mut order = write_txn
                    .open_table(ORDER)
                    .map_err(|e| SettingsError::Storage(e.to_string()))?;
                order
                    .insert(ek.as_slice(), next)
                    .map_err(|e| SettingsError::Storage(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        Ok(())
    }

    fn hash_del(&self, key: &str) -> Result<(), SettingsError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        {
            let ek = entry_key(&self.name, key);
            let mut values = write_txn
                .open_table(VALUES)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
            values
                .remove(ek.as_slice())
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
            let mut order = write_txn
                .open_table(ORDER)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
            order
                .remove(ek.as_slice())
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        Ok(())
    }

    fn hash_keys(&self) -> Result<Vec<String>, SettingsError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(ORDER)
            .map_err(|e| SettingsError::Storage(e.to_string()))?;

        let prefix = node_prefix(&self.name);
        let mut entries: Vec<(u64, String)> = Vec::new();
        let iter = table
            .range(prefix.as_slice()..)
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        for item in iter {
            let (key_guard, seq_guard) =
                item.map_err(|e| SettingsError::Storage(e.to_string()))?;
            let raw = key_guard.value();
            if !raw.starts_with(&prefix) {
                break;
            }
            let key = String::from_utf8(raw[prefix.len()..].to_vec()).map_err(|_| {
                SettingsError::Storage("non-UTF-8 key in document store".to_string())
            })?;
            entries.push((seq_guard.value(), key));
        }

        entries.sort_by_key(|(seq, _)| *seq);
        Ok(entries.into_iter().map(|(_, key)| key).collect())
    }

    fn kill(&self) -> Result<(), SettingsError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        {
            let mut values = write_txn
                .open_table(VALUES)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;
            let mut order = write_txn
                .open_table(ORDER)
                .map_err(|e| SettingsError::Storage(e.to_string()))?;

            let prefix = node_prefix(&self.name);
            let mut doomed: Vec<Vec<u8>> = Vec::new();
            {
                let iter = values
                    .range(prefix.as_slice()..)
                    .map_err(|e| SettingsError::Storage(e.to_string()))?;
                for item in iter {
                    let entry = item.map_err(|e| SettingsError::Storage(e.to_string()))?;
                    let raw = entry.0.value();
                    if !raw.starts_with(&prefix) {
                        break;
                    }
                    doomed.push(raw.to_vec());
                }
            }
            for ek in &doomed {
                values
                    .remove(ek.as_slice())
                    .map_err(|e| SettingsError::Storage(e.to_string()))?;
                order
                    .remove(ek.as_slice())
                    .map_err(|e| SettingsError::Storage(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ── in-memory document store ────────────────────────────────────────

type NodeEntries = Vec<(String, Vec<u8>)>;

/// In-memory document store. Useful for hosts whose document model lives in
/// memory and as a substitute in tests. Insertion order is the Vec order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    nodes: Arc<RwLock<BTreeMap<String, NodeEntries>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn open_node(&self, name: &str) -> Result<Box<dyn DocumentNode>, SettingsError> {
        Ok(Box::new(MemoryNode {
            nodes: self.nodes.clone(),
            name: name.to_string(),
        }))
    }
}

struct MemoryNode {
    nodes: Arc<RwLock<BTreeMap<String, NodeEntries>>>,
    name: String,
}

impl DocumentNode for MemoryNode {
    fn hash_get(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError> {
        let nodes = self.nodes.read().unwrap();
        Ok(nodes.get(&self.name).and_then(|entries| {
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }))
    }

    fn hash_set(&self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        let mut nodes = self.nodes.write().unwrap();
        let entries = nodes.entry(self.name.clone()).or_default();
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_vec(),
            None => entries.push((key.to_string(), value.to_vec())),
        }
        Ok(())
    }

    fn hash_del(&self, key: &str) -> Result<(), SettingsError> {
        let mut nodes = self.nodes.write().unwrap();
        if let Some(entries) = nodes.get_mut(&self.name) {
            entries.retain(|(k, _)| k != key);
        }
        Ok(())
    }

    fn hash_keys(&self) -> Result<Vec<String>, SettingsError> {
        let nodes = self.nodes.read().unwrap();
        Ok(nodes
            .get(&self.name)
            .map(|entries| entries.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    fn kill(&self) -> Result<(), SettingsError> {
        let mut nodes = self.nodes.write().unwrap();
        nodes.remove(&self.name);
        Ok(())
    }
}
