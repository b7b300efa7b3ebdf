use std::collections::BTreeMap;

use tracing::warn;

use crate::error::SettingsError;

// Keys and values are percent-escaped so arbitrary byte sequences survive
// the line-oriented format: `%`, `=`, `[`, `]`, `;`, `#`, and every byte
// outside printable ASCII (including space) become `%XX`.
fn needs_escape(b: u8) -> bool {
    matches!(b, b'%' | b'=' | b'[' | b']' | b';' | b'#') || !(0x21..=0x7e).contains(&b)
}

/// Escape a byte sequence into the printable-ASCII form used on disk.
pub(crate) fn escape(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &b in data {
        if needs_escape(b) {
            out.push_str(&format!("%{:02X}", b));
        } else {
            out.push(b as char);
        }
    }
    out
}

/// Reverse [`escape`]. Fails on truncated or non-hex escape sequences.
pub(crate) fn unescape(text: &str) -> Result<Vec<u8>, SettingsError> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| {
                    SettingsError::Storage(format!("malformed escape in {:?}", text))
                })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// In-memory form of one INI-style settings file.
///
/// ```text
/// root-key=root-value          ← entries before any header ("root" group)
/// [namespace-a]
/// key=value
/// [namespace-b]
/// other%20key=other%20value
/// ```
///
/// Groups and keys serialize in sorted order, so rewriting an unchanged
/// document is byte-stable. Duplicate keys within a group: last one wins.
#[derive(Debug, Default)]
pub(crate) struct IniDocument {
    sections: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        let mut doc = IniDocument::default();
        let mut current = String::new();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = name.trim().to_string();
                doc.sections.entry(current.clone()).or_default();
                continue;
            }
            let Some(eq) = line.find('=') else {
                warn!("skipping unrecognized settings line: {:?}", line);
                continue;
            };
            let key_bytes = unescape(line[..eq].trim())?;
            let key = String::from_utf8(key_bytes).map_err(|_| {
                SettingsError::Storage(format!("non-UTF-8 key in settings line {:?}", line))
            })?;
            let value = unescape(line[eq + 1..].trim())?;
            doc.sections.entry(current.clone()).or_default().insert(key, value);
        }
        Ok(doc)
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        // Root entries first, then named groups under their headers.
        if let Some(root) = self.sections.get("") {
            for (key, value) in root {
                out.push_str(&escape(key.as_bytes()));
                out.push('=');
                out.push_str(&escape(value));
                out.push('\n');
            }
        }
        for (name, entries) in &self.sections {
            if name.is_empty() || entries.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", name));
            for (key, value) in entries {
                out.push_str(&escape(key.as_bytes()));
                out.push('=');
                out.push_str(&escape(value));
                out.push('\n');
            }
        }
        out
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&Vec<u8>> {
        self.sections.get(group).and_then(|g| g.get(key))
    }

    pub fn set(&mut self, group: &str, key: &str, value: &[u8]) {
        self.sections
            .entry(group.to_string())
            .or_default()
            .insert(key.to_string(), value.to_vec());
    }

    /// Remove a key; absent group or key is a no-op.
    pub fn remove(&mut self, group: &str, key: &str) {
        if let Some(entries) = self.sections.get_mut(group) {
            entries.remove(key);
            if entries.is_empty() {
                self.sections.remove(group);
            }
        }
    }

    /// Drop an entire group; absent group is a no-op.
    pub fn remove_group(&mut self, group: &str) {
        self.sections.remove(group);
    }

    pub fn keys(&self, group: &str) -> Vec<String> {
        self.sections
            .get(group)
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of all non-empty named groups.
    pub fn groups(&self) -> Vec<String> {
        self.sections
            .iter()
            .filter(|(name, entries)| !name.is_empty() && !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every (group, key, value) entry, root group included.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &[u8])> {
        self.sections.iter().flat_map(|(name, entries)| {
            entries
                .iter()
                .map(move |(k, v)| (name.as_str(), k.as_str(), v.as_slice()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_round_trip() {
        let samples: &[&[u8]] = &[
            b"plain",
            b"has space",
            b"a=b;c#d[e]f%g",
            b"line\nbreak\r\ttab",
            &[0x00, 0xff, 0xfe, 0x80],
            b"",
        ];
        for sample in samples {
            let escaped = escape(sample);
            assert!(escaped.bytes().all(|b| (0x21..=0x7e).contains(&b)));
            assert_eq!(unescape(&escaped).unwrap(), *sample);
        }
    }

    #[test]
    fn unescape_rejects_malformed() {
        assert!(unescape("%").is_err());
        assert!(unescape("%Z1").is_err());
        assert!(unescape("abc%4").is_err());
    }

    #[test]
    fn parse_groups_and_root() {
        let doc = IniDocument::parse(
            "top=1\n; comment\n# also comment\n[alpha]\nk=v\n[beta two]\nx=%20y\n",
        )
        .unwrap();
        assert_eq!(doc.get("", "top").unwrap(), b"1");
        assert_eq!(doc.get("alpha", "k").unwrap(), b"v");
        assert_eq!(doc.get("beta two", "x").unwrap(), b" y");
        assert_eq!(doc.groups(), vec!["alpha".to_string(), "beta two".to_string()]);
    }

    #[test]
    fn duplicate_keys_last_wins() {
        let doc = IniDocument::parse("[g]\nk=first\nk=second\n").unwrap();
        assert_eq!(doc.get("g", "k").unwrap(), b"second");
    }

    #[test]
    fn unrecognized_lines_are_skipped() {
        let doc = IniDocument::parse("[g]\nnot a pair\nk=v\n").unwrap();
        assert_eq!(doc.get("g", "k").unwrap(), b"v");
    }

    #[test]
    fn serialize_is_stable_and_parseable() {
        let mut doc = IniDocument::default();
        doc.set("zeta", "k1", b"v=1");
        doc.set("alpha", "spaced key", &[0x00, 0x61]);
        doc.set("", "root", b"r");
        let text = doc.serialize();
        assert_eq!(text, IniDocument::parse(&text).unwrap().serialize());
        let reparsed = IniDocument::parse(&text).unwrap();
        assert_eq!(reparsed.get("zeta", "k1").unwrap(), b"v=1");
        assert_eq!(reparsed.get("alpha", "spaced key").unwrap(), &[0x00, 0x61]);
        assert_eq!(reparsed.get("", "root").unwrap(), b"r");
    }

    #[test]
    fn remove_drops_empty_groups() {
        let mut doc = IniDocument::default();
        doc.set("g", "k", b"v");
        doc.remove("g", "k");
        assert!(doc.groups().is_empty());
        // removing again is a no-op
        doc.remove("g", "k");
        doc.remove_group("g");
    }
}
