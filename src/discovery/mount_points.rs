//! `mount-points` plugin: inventories each system's mounted filesystems.
//! No dependencies — it is always eligible for the first discovery level.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::discovery::plugin::{DiscoveryPlugin, PluginError, PluginResult};
use crate::store::ConfigStore;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct MountPointsPlugin;

#[async_trait]
impl DiscoveryPlugin for MountPointsPlugin {
    fn name(&self) -> &'static str {
        "mount_points"
    }

    fn description(&self) -> &'static str {
        "Inventories mounted filesystems for each system"
    }

    fn contributions(&self) -> &'static [&'static str] {
        &["mount_points", "nfs_mounts", "local_mounts", "has_nfs", "has_local_storage"]
    }

    async fn run(&self, store: &Arc<Mutex<ConfigStore>>, target_system_names: Option<&[String]>) -> PluginResult {
        let mut result = PluginResult::default();
        let names = {
            let guard = store.lock().await;
            match target_system_names {
                Some(names) => names.to_vec(),
                None => guard.list_systems().iter().map(|s| s.name.clone()).collect(),
            }
        };

        for name in names {
            let mut guard = store.lock().await;
            let Some(system) = guard.get_system_mut(&name) else {
                result.errors.push(PluginError { system: name, error: "system not found".into() });
                continue;
            };
            result.systems_checked += 1;

            // No real SSH transport (spec §1 Non-goal); deterministic mock
            // inventory keyed off the hostname stands in for `df`/`mount`.
            let nfs_mounts = vec![Value::String(format!("{}:/export/data", system.endpoint.hostname))];
            let local_mounts = vec![Value::String("/".to_string()), Value::String("/var".to_string())];
            let has_nfs = !nfs_mounts.is_empty();

            let mut all_mounts = local_mounts.clone();
            all_mounts.extend(nfs_mounts.clone());

            system.add_property("mount_points", Value::List(all_mounts));
            system.add_property("nfs_mounts", Value::List(nfs_mounts));
            system.add_property("local_mounts", Value::List(local_mounts));
            if has_nfs {
                system.add_tag("has_nfs");
            }
            system.add_tag("has_local_storage");

            result.systems_updated += 1;
        }
        result
    }
}
