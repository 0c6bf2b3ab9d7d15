//! System — a managed host record in the Config Store.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::agent::RemoteAgent;
use crate::store::endpoint::Endpoint;
use crate::store::role::Role;
use crate::value::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSetting {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub endpoint: Endpoint,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub roles: IndexMap<String, Role>,
    #[serde(default)]
    pub local_settings: IndexMap<String, LocalSetting>,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,

    /// A live handle, held only while `endpoint.status == Connected`. Never
    /// serialized — reconnecting after load is an explicit `connect`.
    #[serde(skip)]
    pub agent: Option<Arc<dyn RemoteAgent>>,
}

impl System {
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            endpoint,
            tags: BTreeSet::new(),
            roles: IndexMap::new(),
            local_settings: IndexMap::new(),
            properties: IndexMap::new(),
            agent: None,
        }
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn add_role(&mut self, role: Role) {
        self.roles.insert(role.name.clone(), role);
    }

    pub fn remove_role(&mut self, name: &str) -> bool {
        self.roles.shift_remove(name).is_some()
    }

    pub fn add_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.endpoint.status, crate::store::endpoint::ConnectionStatus::Connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> System {
        System::new("db1", Endpoint::new("db1.example.com", 22))
    }

    #[test]
    fn tags_are_a_set() {
        let mut s = sample();
        s.add_tag("nfs");
        s.add_tag("nfs");
        assert_eq!(s.tags.len(), 1);
    }

    #[test]
    fn remove_role_reports_whether_it_existed() {
        let mut s = sample();
        s.add_role(Role::new("database"));
        assert!(s.remove_role("database"));
        assert!(!s.remove_role("database"));
    }

    #[test]
    fn new_system_is_disconnected_and_agentless() {
        let s = sample();
        assert!(!s.is_connected());
        assert!(s.agent.is_none());
    }
}
