use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::SettingsError;
use crate::ini::{escape, IniDocument};
use crate::traits::ScopeStore;

/// Write every (key, value) pair from the store to a flat INI-style file,
/// in the store's enumeration order. Returns the number of pairs written.
/// Overwrites the target file.
pub fn export_settings(store: &dyn ScopeStore, path: &Path) -> Result<usize, SettingsError> {
    let entries = store.entries()?;
    let mut out = String::new();
    for (key, value) in &entries {
        out.push_str(&escape(key.as_bytes()));
        out.push('=');
        out.push_str(&escape(value));
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| SettingsError::Storage(e.to_string()))?;
    debug!("exported {} settings to {:?}", entries.len(), path);
    Ok(entries.len())
}

/// Read every key from an INI-style file and `set` it on the store.
/// Duplicate keys in the file: last one wins. Keys under a `[group]` header
/// are applied as `group/key`. Returns the number of keys applied.
pub fn import_settings(store: &dyn ScopeStore, path: &Path) -> Result<usize, SettingsError> {
    let text = fs::read_to_string(path).map_err(|e| SettingsError::Storage(e.to_string()))?;
    let doc = IniDocument::parse(&text)?;

    let mut count = 0;
    for (group, key, value) in doc.entries() {
        let name = if group.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", group, key)
        };
        store.set(&name, value)?;
        count += 1;
    }
    debug!("imported {} settings from {:?}", count, path);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::scopes::UserScope;
    use std::fs;
    use tempfile::TempDir;

    fn user_scope(tmp: &TempDir, namespace: &str) -> UserScope {
        let config = HostConfig::new(
            "com.example",
            "gridworks",
            tmp.path().join("system"),
            tmp.path().join("user"),
        )
        .unwrap();
        UserScope::new(&config, namespace).unwrap()
    }

    #[test]
    fn export_then_import_round_trips() {
        let tmp = TempDir::new().unwrap();
        let source = user_scope(&tmp, "source");
        source.set("plain", b"value").unwrap();
        source.set("binary", &[0u8, 0xff, b'=']).unwrap();

        let file = tmp.path().join("transfer.ini");
        assert_eq!(export_settings(&source, &file).unwrap(), 2);

        let target = user_scope(&tmp, "target");
        assert_eq!(import_settings(&target, &file).unwrap(), 2);
        assert_eq!(target.get("plain").unwrap(), b"value");
        assert_eq!(target.get("binary").unwrap(), &[0u8, 0xff, b'=']);
    }

    #[test]
    fn import_last_write_wins_on_duplicates() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("dup.ini");
        fs::write(&file, "k=first\nk=second\n").unwrap();

        let target = user_scope(&tmp, "target");
        import_settings(&target, &file).unwrap();
        assert_eq!(target.get("k").unwrap(), b"second");
    }

    #[test]
    fn import_flattens_grouped_keys() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("grouped.ini");
        fs::write(&file, "top=1\n[section]\ninner=2\n").unwrap();

        let target = user_scope(&tmp, "target");
        assert_eq!(import_settings(&target, &file).unwrap(), 2);
        assert_eq!(target.get("top").unwrap(), b"1");
        assert_eq!(target.get("section/inner").unwrap(), b"2");
    }

    #[test]
    fn export_empty_store_writes_empty_file() {
        let tmp = TempDir::new().unwrap();
        let source = user_scope(&tmp, "empty");
        let file = tmp.path().join("empty.ini");
        assert_eq!(export_settings(&source, &file).unwrap(), 0);
        assert_eq!(fs::read_to_string(&file).unwrap(), "");
    }
}
