//! Project-file persistence for browse settings
//!
//! Saves the per-table browse state of one session to a JSON project file
//! and restores it later. Tables are stored as an array of schema/name
//! pairs so the file format stays independent of map-key encodings, with
//! entries sorted by table identity for reproducible output.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rowscope_browse::{BrowseSettings, SettingsStore};
use rowscope_core::TableId;

/// Current project file version - increment when the structure changes
pub const PROJECT_VERSION: usize = 1;

/// One table's browse settings inside a project file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub settings: BrowseSettings,
}

/// Persisted project data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Version for migration purposes
    pub version: usize,
    /// Session-wide default text encoding
    #[serde(default)]
    pub default_encoding: Option<String>,
    /// Browse settings per table, sorted by schema then name
    #[serde(default)]
    pub tables: Vec<TableEntry>,
}

impl ProjectFile {
    /// Snapshot a settings store for saving
    pub fn from_store(store: &SettingsStore) -> Self {
        Self {
            version: PROJECT_VERSION,
            default_encoding: store.default_encoding().map(str::to_string),
            tables: store
                .iter()
                .map(|(table, settings)| TableEntry {
                    schema: table.schema.clone(),
                    name: table.name.clone(),
                    settings: settings.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a settings store from this file
    pub fn into_store(self) -> SettingsStore {
        let mut store = SettingsStore::new();
        store.set_default_encoding(self.default_encoding);
        for entry in self.tables {
            store.insert(TableId::new(entry.schema, entry.name), entry.settings);
        }
        store
    }
}

/// Load a project file. Returns `Ok(None)` when the file does not exist or
/// was written by an incompatible version.
pub fn load_project(path: &Path) -> Result<Option<ProjectFile>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read project from {:?}", path))?;

    let project: ProjectFile =
        serde_json::from_str(&content).with_context(|| "Failed to parse project JSON")?;

    if project.version != PROJECT_VERSION {
        tracing::warn!(
            "Project version mismatch: expected {}, got {}. Starting with fresh settings.",
            PROJECT_VERSION,
            project.version
        );
        return Ok(None);
    }

    Ok(Some(project))
}

/// Save a settings store to a project file
pub fn save_project(path: &Path, store: &SettingsStore) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create project directory: {:?}", parent))?;
    }

    let project = ProjectFile::from_store(store);
    let content = serde_json::to_string_pretty(&project)?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write project to {:?}", path))?;

    tracing::debug!("Saved project to {:?}", path);
    Ok(())
}

/// Delete a project file if it exists
pub fn delete_project(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete project at {:?}", path))?;
    }

    Ok(())
}
