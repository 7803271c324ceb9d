//! Localized string tables and the dotted-key resolver.
//!
//! Tables are nested TOML, one per language code. Resolution never fails:
//! a missing segment, an unknown language, a non-string leaf or an empty
//! string all resolve to the key itself.

use std::collections::HashMap;
use std::path::Path;
use toml::{Table, Value};
use tracing::{debug, info};

use crate::error::{Result, VidtransError};

const BUILTIN_TABLES: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.toml")),
    ("mn", include_str!("../../locales/mn.toml")),
    ("ja", include_str!("../../locales/ja.toml")),
];

#[derive(Debug, Clone, Default)]
pub struct Localizer {
    tables: HashMap<String, Table>,
}

impl Localizer {
    /// A localizer with no tables; every key resolves to itself.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The embedded `en`, `mn` and `ja` tables.
    pub fn builtin() -> Result<Self> {
        let mut localizer = Self::empty();
        for (code, content) in BUILTIN_TABLES {
            localizer.insert_str(code, content)?;
        }
        Ok(localizer)
    }

    /// Parse a TOML table and merge it over whatever is loaded for `code`.
    pub fn insert_str(&mut self, code: &str, content: &str) -> Result<()> {
        let table: Table = content.parse()?;
        self.insert_table(code, table);
        Ok(())
    }

    pub fn insert_table(&mut self, code: &str, table: Table) {
        match self.tables.get_mut(code) {
            Some(existing) => merge_tables(existing, table),
            None => {
                self.tables.insert(code.to_string(), table);
            }
        }
    }

    /// Merge every `<code>.toml` in `dir` over the loaded tables.
    /// Partial tables are fine: keys they omit keep their current value.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(VidtransError::Config(format!(
                "Locales directory not found: {}",
                dir.display()
            )));
        }

        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            self.insert_str(code, &content).map_err(|e| {
                VidtransError::Config(format!("Failed to load {}: {}", path.display(), e))
            })?;
            debug!("Loaded string table for '{}' from {}", code, path.display());
            loaded += 1;
        }

        info!("Loaded {} string table(s) from {}", loaded, dir.display());
        Ok(loaded)
    }

    pub fn has_language(&self, code: &str) -> bool {
        self.tables.contains_key(code)
    }

    /// Look up `key` (e.g. "translate.uploadButton") for `language`.
    pub fn resolve(&self, key: &str, language: &str) -> String {
        self.lookup(key, language)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }

    fn lookup(&self, key: &str, language: &str) -> Option<&str> {
        let table = self.tables.get(language)?;
        let mut segments = key.split('.');
        let mut current = table.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        match current {
            Value::String(s) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        if let Value::Table(incoming) = value {
            if let Some(Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}
