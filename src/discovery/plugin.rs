//! `DiscoveryPlugin` (spec C10): a unit of fan-out discovery work. Plugins
//! declare their dependencies so the Coordinator can schedule them in
//! dependency order, and mutate the Config Store through System-level
//! setters rather than touching its internals directly.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::ConfigStore;

#[derive(Debug, Clone)]
pub struct PluginError {
    pub system: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct PluginResult {
    pub systems_checked: usize,
    pub systems_updated: usize,
    pub errors: Vec<PluginError>,
}

impl PluginResult {
    pub fn merge(&mut self, other: PluginResult) {
        self.systems_checked += other.systems_checked;
        self.systems_updated += other.systems_updated;
        self.errors.extend(other.errors);
    }
}

#[async_trait]
pub trait DiscoveryPlugin: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// Names of plugins that must complete before this one runs.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Store properties/tags this plugin is expected to contribute, for
    /// documentation and `discover --list` purposes.
    fn contributions(&self) -> &'static [&'static str] {
        &[]
    }

    /// Runs against every system in `store`, or only `target_system_names`
    /// when given. Per-system failures are collected in the result rather
    /// than propagated — only a panic or a systemic error aborts the level.
    async fn run(&self, store: &Arc<Mutex<ConfigStore>>, target_system_names: Option<&[String]>) -> PluginResult;
}
