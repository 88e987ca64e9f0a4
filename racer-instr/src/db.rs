//! Compile-info database.
//!
//! A read-only document with two query surfaces: `special` maps module-name
//! suffixes to a directive tag, `ignored` maps function names to an opt-out
//! flag. The database is loaded once at pass construction; a parse failure
//! is fatal.

use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Default, Deserialize)]
pub struct CompileDb {
    #[serde(default)]
    special: BTreeMap<String, String>,
    #[serde(default)]
    ignored: BTreeMap<String, bool>,
}

impl CompileDb {
    pub fn load(path: &Path) -> Result<CompileDb, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| Error::Database {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse from an in-memory document (used by tests and embedders).
    pub fn from_str(text: &str) -> Result<CompileDb, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Directive tag for a module, matched by module-name suffix.
    pub fn special_tag(&self, module_name: &str) -> Option<&str> {
        self.special
            .iter()
            .find(|(suffix, _)| module_name.ends_with(suffix.as_str()))
            .map(|(_, tag)| tag.as_str())
    }

    pub fn is_ignored(&self, function_name: &str) -> bool {
        self.ignored.get(function_name).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_match_suffix_and_name() {
        let db = CompileDb::from_str(
            r#"{
                "special": { "crypto/aead.c": "skip-vector" },
                "ignored": { "trace_hardirqs_on": true, "printk": false }
            }"#,
        )
        .unwrap();

        assert_eq!(
            db.special_tag("linux/crypto/aead.c"),
            Some("skip-vector")
        );
        assert_eq!(db.special_tag("crypto/rng.c"), None);
        assert!(db.is_ignored("trace_hardirqs_on"));
        assert!(!db.is_ignored("printk"));
        assert!(!db.is_ignored("vfs_read"));
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let db = CompileDb::from_str("{}").unwrap();
        assert_eq!(db.special_tag("fs/inode.c"), None);
        assert!(!db.is_ignored("anything"));
    }
}
