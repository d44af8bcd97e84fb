//! Pokémon id to 3D asset table
//!
//! Ids missing from the table have no model; the viewer reports them as
//! unavailable instead of attempting a load.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One registered model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// National Pokédex number
    pub id: u32,
    /// Pokémon name (informational)
    #[serde(default)]
    pub name: String,
    /// glTF binary path, relative to the asset root or an absolute URL
    pub path: String,
}

impl ModelEntry {
    pub fn new(id: u32, name: &str, path: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            path: normalize_model_path(path),
        }
    }
}

/// Lookup table from Pokémon id to model path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry {
    entries: BTreeMap<u32, ModelEntry>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::from_entries([
            ModelEntry::new(1, "bulbasaur", "/models/bulbasaur.glb"),
            ModelEntry::new(2, "ivysaur", "/models/ivysaur.glb"),
            ModelEntry::new(3, "venusaur", "/models/venusaur.glb"),
            ModelEntry::new(4, "charmander", "/models/charmander.glb"),
            ModelEntry::new(5, "charmeleon", "/models/charmeleon.glb"),
            ModelEntry::new(6, "charizard", "/models/charizard.glb"),
            ModelEntry::new(25, "pikachu", "/models/pikachu.glb"),
        ])
    }
}

impl ModelRegistry {
    /// Build a registry; later entries replace earlier ones with the same id
    pub fn from_entries(entries: impl IntoIterator<Item = ModelEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|mut e| {
                e.path = normalize_model_path(&e.path);
                (e.id, e)
            })
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, id: u32) -> Option<&ModelEntry> {
        self.entries.get(&id)
    }

    /// Asset path for an id, if a model is registered
    pub fn model_path(&self, id: u32) -> Option<&str> {
        self.lookup(id).map(|e| e.path.as_str())
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.values()
    }
}

/// Normalize a model path for the asset server
///
/// Absolute URLs pass through. Local paths lose their leading slash and are
/// placed under `models/`.
pub fn normalize_model_path(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let path = path.trim_start_matches('/');

    if path.starts_with("models/") {
        path.to_string()
    } else {
        format!("models/{}", path)
    }
}
