//! ConfigStore (spec C3): the single source of truth for system identity
//! within a process.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::error::ShellError;
use crate::store::system::System;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    systems: IndexMap<String, System>,
    global_settings: IndexMap<String, Value>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self { systems: IndexMap::new(), global_settings: IndexMap::new() }
    }

    pub fn add_system(&mut self, system: System) -> Result<(), ShellError> {
        if self.systems.contains_key(&system.name) {
            return Err(ShellError::ServerAlreadyExistsError(system.name.clone()));
        }
        self.systems.insert(system.name.clone(), system);
        Ok(())
    }

    pub fn remove_system(&mut self, name: &str) -> Result<System, ShellError> {
        self.systems.shift_remove(name).ok_or_else(|| ShellError::ServerNotFoundError(name.to_string()))
    }

    pub fn get_system(&self, name: &str) -> Option<&System> {
        self.systems.get(name)
    }

    pub fn get_system_mut(&mut self, name: &str) -> Option<&mut System> {
        self.systems.get_mut(name)
    }

    pub fn list_systems(&self) -> Vec<&System> {
        self.systems.values().collect()
    }

    pub fn find_systems<F: Fn(&System) -> bool>(&self, predicate: F) -> Vec<&System> {
        self.systems.values().filter(|s| predicate(s)).collect()
    }

    /// All tags in `tags` must be present on a system for it to match
    /// (subset semantics, not "any of").
    pub fn filter_by_tags(&self, tags: &BTreeSet<String>) -> Vec<&System> {
        self.find_systems(|s| tags.iter().all(|t| s.has_tag(t)))
    }

    pub fn filter_by_role(&self, role_name: &str) -> Vec<&System> {
        self.find_systems(|s| s.roles.contains_key(role_name))
    }

    pub fn filter_connected(&self) -> Vec<&System> {
        self.find_systems(|s| s.is_connected())
    }

    pub fn set_global_setting(&mut self, key: impl Into<String>, value: Value) {
        self.global_settings.insert(key.into(), value);
    }

    pub fn get_global_setting(&self, key: &str) -> Option<&Value> {
        self.global_settings.get(key)
    }

    pub fn unset_global_setting(&mut self, key: &str) -> bool {
        self.global_settings.shift_remove(key).is_some()
    }

    pub fn list_global_settings(&self) -> &IndexMap<String, Value> {
        &self.global_settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::endpoint::Endpoint;

    fn system(name: &str) -> System {
        System::new(name, Endpoint::new(format!("{}.example.com", name), 22))
    }

    #[test]
    fn add_system_rejects_duplicate_names() {
        let mut store = ConfigStore::new();
        store.add_system(system("web1")).unwrap();
        let err = store.add_system(system("web1")).unwrap_err();
        assert!(matches!(err, ShellError::ServerAlreadyExistsError(_)));
    }

    #[test]
    fn filter_by_tags_requires_all_tags() {
        let mut store = ConfigStore::new();
        let mut s = system("web1");
        s.add_tag("nfs");
        s.add_tag("prod");
        store.add_system(s).unwrap();
        let mut query = BTreeSet::new();
        query.insert("nfs".to_string());
        query.insert("staging".to_string());
        assert!(store.filter_by_tags(&query).is_empty());
    }

    #[test]
    fn remove_system_reports_not_found() {
        let mut store = ConfigStore::new();
        assert!(matches!(store.remove_system("ghost").unwrap_err(), ShellError::ServerNotFoundError(_)));
    }
}
