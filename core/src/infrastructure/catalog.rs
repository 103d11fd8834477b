// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Tool catalog loader and registry.
//!
//! The catalog is a read-only YAML file listing tools grouped by category.
//! Each entry is deserialized and validated individually: a malformed entry
//! is logged and skipped, the rest of the catalog loads. A missing or
//! unreadable catalog degrades to an empty registry so the engine stays
//! available; lookups simply miss.
//!
//! # Catalog Format
//!
//! ```yaml
//! categories:
//!   marketing:
//!     - id: email_sensor
//!       name: Email Health Sensor
//!       description: Polls the mail platform and scores email pressure
//!       executable: tools/email_sensor
//!   commerce:
//!     - id: store_sensor
//!       name: Storefront Sensor
//!       executable: tools/store_sensor
//! ```

use crate::domain::tool::{ToolDescriptor, ToolId};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    categories: BTreeMap<String, Vec<serde_yaml::Value>>,
}

#[derive(Debug, Deserialize)]
struct RawToolEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    executable: PathBuf,
}

/// Immutable registry of tool descriptors, keyed by normalized id.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    /// Load the catalog, degrading to empty on any file-level failure.
    ///
    /// The error that caused the degradation is logged, not returned: a bad
    /// catalog must not take down the rest of the engine.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(error) => {
                warn!(%error, path = %path.display(), "catalog load failed, serving empty catalog");
                Self::default()
            }
        }
    }

    /// Load and parse the catalog file. Entry-level problems are skipped
    /// with a warning; only file-level problems return an error.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CatalogFile =
            serde_yaml::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut catalog = Self::default();
        for (category, entries) in file.categories {
            for entry in entries {
                let raw_entry: RawToolEntry = match serde_yaml::from_value(entry) {
                    Ok(e) => e,
                    Err(error) => {
                        warn!(%error, category, "skipping malformed catalog entry");
                        continue;
                    }
                };
                let descriptor = ToolDescriptor {
                    id: ToolId::new(raw_entry.id),
                    display_name: raw_entry.name,
                    description: raw_entry.description,
                    executable: raw_entry.executable,
                    category: category.clone(),
                };
                if let Err(error) = descriptor.validate() {
                    warn!(%error, category, "skipping invalid catalog entry");
                    continue;
                }
                catalog.insert(descriptor);
            }
        }

        info!(tools = catalog.len(), path = %path.display(), "tool catalog loaded");
        Ok(catalog)
    }

    /// Build a catalog from already-validated descriptors (embedding and
    /// tests; file loading goes through [`ToolCatalog::load`]).
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        let mut catalog = Self::default();
        for descriptor in descriptors {
            catalog.insert(descriptor);
        }
        catalog
    }

    fn insert(&mut self, descriptor: ToolDescriptor) {
        let key = descriptor.id.normalized();
        if self.tools.contains_key(&key) {
            warn!(tool = %descriptor.id, "duplicate tool id in catalog, keeping first entry");
            return;
        }
        self.tools.insert(key, descriptor);
    }

    /// Separator-insensitive lookup. Never fails; a miss is `None`.
    pub fn lookup(&self, id: &ToolId) -> Option<&ToolDescriptor> {
        self.tools.get(&id.normalized())
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    pub fn tools_in_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a ToolDescriptor> {
        self.tools.values().filter(move |t| t.category == category)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_entries_grouped_by_category() {
        let file = write_catalog(
            r#"
categories:
  marketing:
    - id: email_sensor
      name: Email Health Sensor
      description: Scores email pressure
      executable: tools/email_sensor
  commerce:
    - id: store_sensor
      name: Storefront Sensor
      executable: tools/store_sensor
"#,
        );
        let catalog = ToolCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let tool = catalog.lookup(&ToolId::new("email_sensor")).unwrap();
        assert_eq!(tool.category, "marketing");
        assert_eq!(tool.display_name, "Email Health Sensor");
        assert_eq!(catalog.tools_in_category("commerce").count(), 1);
    }

    #[test]
    fn lookup_is_separator_insensitive() {
        let file = write_catalog(
            r#"
categories:
  commerce:
    - id: store_sensor
      name: Storefront Sensor
      executable: tools/store_sensor
"#,
        );
        let catalog = ToolCatalog::load(file.path()).unwrap();
        assert!(catalog.lookup(&ToolId::new("Store-Sensor")).is_some());
        assert!(catalog.lookup(&ToolId::new("STORE_SENSOR")).is_some());
        assert!(catalog.lookup(&ToolId::new("store sensor")).is_some());
        assert!(catalog.lookup(&ToolId::new("missing")).is_none());
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        let file = write_catalog(
            r#"
categories:
  commerce:
    - id: store_sensor
      name: Storefront Sensor
      executable: tools/store_sensor
    - name: missing the id and executable
  marketing:
    - id: ""
      name: Empty Id
      executable: tools/empty
"#,
        );
        let catalog = ToolCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup(&ToolId::new("store_sensor")).is_some());
    }

    #[test]
    fn unreadable_catalog_degrades_to_empty() {
        let catalog = ToolCatalog::load_or_empty(Path::new("/nonexistent/tools.yaml"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn unparsable_catalog_degrades_to_empty() {
        let file = write_catalog("categories: [broken");
        let catalog = ToolCatalog::load_or_empty(file.path());
        assert!(catalog.is_empty());
    }
}
