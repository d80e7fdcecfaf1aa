//! Description lexica: name → human-readable description lookup tables
//! injected into the editor (concept frames, relation labels).
//!
//! A lexicon file is a JSON object. Values may be plain strings, or objects
//! whose entries are flattened to `key: value` lines (the shape frame
//! dictionaries ship in). Missing names are `None`, never errors.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CoreError;

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: BTreeMap<String, String>,
}

impl Lexicon {
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let mut entries = BTreeMap::new();
        if let serde_json::Value::Object(map) = value {
            for (name, v) in map {
                match v {
                    serde_json::Value::String(s) => {
                        entries.insert(name, s);
                    }
                    serde_json::Value::Object(fields) => {
                        let lines: Vec<String> = fields
                            .iter()
                            .map(|(k, v)| match v {
                                serde_json::Value::String(s) => format!("{k}: {s}"),
                                other => format!("{k}: {other}"),
                            })
                            .collect();
                        entries.insert(name, lines.join("\n"));
                    }
                    other => {
                        entries.insert(name, other.to_string());
                    }
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        let lexicon = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), entries = lexicon.len(), "lexicon loaded");
        Ok(lexicon)
    }

    pub fn describe(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
