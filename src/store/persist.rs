//! Config Store persistence (spec §6): a single JSON document mirroring the
//! data model 1:1. `ConfigPersistence` is the external-collaborator seam —
//! the default implementation reads/writes a file, but callers may swap in
//! anything that can produce/consume a `ConfigDocument`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ShellError;
use crate::store::endpoint::ConnectionStatus;
use crate::store::store::ConfigStore;
use crate::store::system::System;
use crate::value::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub systems: IndexMap<String, System>,
    #[serde(default)]
    pub global_settings: IndexMap<String, Value>,
}

pub trait ConfigPersistence {
    fn load(&self) -> Result<ConfigStore, ShellError>;
    fn save(&self, store: &ConfigStore) -> Result<(), ShellError>;
}

pub struct JsonFilePersistence {
    pub path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Path::new(&home).join(".fleet_shell").join("config.json")
    }
}

impl Default for JsonFilePersistence {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl ConfigPersistence for JsonFilePersistence {
    fn load(&self) -> Result<ConfigStore, ShellError> {
        if !self.path.exists() {
            return Ok(ConfigStore::new());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| ShellError::other(format!("reading config: {}", e)))?;
        let mut doc: ConfigDocument = serde_json::from_str(&text).map_err(|e| ShellError::other(format!("parsing config: {}", e)))?;
        for system in doc.systems.values_mut() {
            system.endpoint.status = ConnectionStatus::Disconnected;
            system.agent = None;
        }
        Ok(document_to_store(doc))
    }

    fn save(&self, store: &ConfigStore) -> Result<(), ShellError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ShellError::other(format!("creating config dir: {}", e)))?;
        }
        let doc = store_to_document(store);
        let text = serde_json::to_string_pretty(&doc).map_err(|e| ShellError::other(format!("serializing config: {}", e)))?;
        std::fs::write(&self.path, text).map_err(|e| ShellError::other(format!("writing config: {}", e)))
    }
}

/// A persistence backend that never touches disk: `load` always returns an
/// empty store, `save` is a no-op. Used by `Shell::new_in_memory` and by
/// discovery-only tests that have no interest in the filesystem.
#[derive(Debug, Default)]
pub struct NullPersistence;

impl ConfigPersistence for NullPersistence {
    fn load(&self) -> Result<ConfigStore, ShellError> {
        Ok(ConfigStore::new())
    }

    fn save(&self, _store: &ConfigStore) -> Result<(), ShellError> {
        Ok(())
    }
}

fn document_to_store(doc: ConfigDocument) -> ConfigStore {
    let mut store = ConfigStore::new();
    for (_, system) in doc.systems {
        // Already validated unique by construction of the map; ignore the
        // (impossible) duplicate-name error here.
        let _ = store.add_system(system);
    }
    for (k, v) in doc.global_settings {
        store.set_global_setting(k, v);
    }
    store
}

fn store_to_document(store: &ConfigStore) -> ConfigDocument {
    let mut systems = IndexMap::new();
    for system in store.list_systems() {
        systems.insert(system.name.clone(), system.clone());
    }
    ConfigDocument { systems, global_settings: store.list_global_settings().clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::endpoint::Endpoint;

    #[test]
    fn round_trips_through_a_temp_file() {
        let dir = std::env::temp_dir().join(format!("fleetsh-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        let persistence = JsonFilePersistence::new(&path);

        let mut store = ConfigStore::new();
        let mut system = System::new("web1", Endpoint::new("web1.example.com", 22));
        system.endpoint.mark_connected();
        store.add_system(system).unwrap();

        persistence.save(&store).unwrap();
        let loaded = persistence.load().unwrap();

        let reloaded = loaded.get_system("web1").unwrap();
        assert_eq!(reloaded.endpoint.status, ConnectionStatus::Disconnected);
        assert!(reloaded.agent.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_loads_empty_store() {
        let persistence = JsonFilePersistence::new("/nonexistent/path/config.json");
        let store = persistence.load().unwrap();
        assert!(store.list_systems().is_empty());
    }
}
