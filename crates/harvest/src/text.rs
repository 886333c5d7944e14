use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Localized strings. Used by the activation-verb pass and notification text.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("failed to read translations {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One `key<whitespace>value` pair per line.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: HashMap<String, String>,
}

impl TranslationTable {
    pub fn load(path: &Path) -> Result<Self, TranslationError> {
        let raw = fs::read_to_string(path).map_err(|source| TranslationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&raw);
        info!(path = %path.display(), entries = table.len(), "translations_loaded");
        Ok(table)
    }

    pub fn parse(raw: &str) -> Self {
        let mut entries = HashMap::new();
        for line in raw.lines() {
            let line = line.trim_start_matches('\u{feff}');
            let (key, value) = match line.find(char::is_whitespace) {
                Some(split) => (&line[..split], line[split..].trim()),
                None => (line, ""),
            };
            if key.is_empty() {
                continue;
            }
            debug!(key, value, "translation_entry");
            entries.insert(key.to_string(), value.to_string());
        }
        Self { entries }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translator for TranslationTable {
    fn translate(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}
