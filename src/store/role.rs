//! Role — a tagged capability attached to a System.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, properties: IndexMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_role_has_no_properties() {
        let r = Role::new("database");
        assert!(r.properties.is_empty());
    }
}
