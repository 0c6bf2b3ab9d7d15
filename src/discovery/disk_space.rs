//! `disk-space` plugin: per-mount usage figures. Depends on `mount_points`
//! having already populated the mount inventory it reads.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::discovery::plugin::{DiscoveryPlugin, PluginError, PluginResult};
use crate::store::ConfigStore;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct DiskSpacePlugin;

const LOW_DISK_THRESHOLD_PERCENT: f64 = 90.0;

#[async_trait]
impl DiscoveryPlugin for DiskSpacePlugin {
    fn name(&self) -> &'static str {
        "disk_space"
    }

    fn description(&self) -> &'static str {
        "Reports disk usage per mounted filesystem"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["mount_points"]
    }

    fn contributions(&self) -> &'static [&'static str] {
        &["disk_usage", "disk_free", "disk_total", "low_disk_space", "healthy_disk_space"]
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

            let mount_count = system
                .properties
                .get("mount_points")
                .and_then(|v| v.as_list())
                .map(|l| l.len())
                .unwrap_or(1)
                .max(1) as f64;

            // Deterministic mock figures derived from the mount count, in
            // the absence of a real SSH transport (spec §1 Non-goal).
            let total_gb = 100.0 * mount_count;
            let used_percent = (30.0 + mount_count * 5.0).min(95.0);
            let used_gb = total_gb * used_percent / 100.0;
            let free_gb = total_gb - used_gb;
            let low = used_percent >= LOW_DISK_THRESHOLD_PERCENT;

            system.add_property("disk_usage", Value::Float(used_percent));
            system.add_property("disk_free", Value::Float(free_gb));
            system.add_property("disk_total", Value::Float(total_gb));
            if low {
                system.add_tag("low_disk_space");
            } else {
                system.add_tag("healthy_disk_space");
            }

            result.systems_updated += 1;
        }
        result
    }
}
