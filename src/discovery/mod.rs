//! Discovery Coordinator (spec C10): resolves declared plugin dependencies
//! into levels (Kahn's algorithm) and dispatches each level to a bounded
//! worker pool, draining one level before starting the next.

pub mod disk_space;
pub mod mount_points;
pub mod plugin;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::error::DiscoveryError;
use crate::store::ConfigStore;

pub use plugin::{DiscoveryPlugin, PluginError, PluginResult};

#[derive(Clone)]
pub struct DiscoveryCoordinator {
    plugins: Arc<Vec<Arc<dyn DiscoveryPlugin>>>,
    pub max_workers: usize,
    pub parallel: bool,
}

impl DiscoveryCoordinator {
    pub fn new() -> Self {
        Self { plugins: Arc::new(Vec::new()), max_workers: 4, parallel: true }
    }

    /// The coordinator shipped with the default set of discovery plugins.
    pub fn with_builtin_plugins() -> Self {
        let mut c = Self::new();
        c.register(Arc::new(mount_points::MountPointsPlugin));
        c.register(Arc::new(disk_space::DiskSpacePlugin));
        c
    }

    pub fn register(&mut self, plugin: Arc<dyn DiscoveryPlugin>) {
        Arc::get_mut(&mut self.plugins)
            .expect("coordinator not yet shared when registering plugins")
            .push(plugin);
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn DiscoveryPlugin>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// Runs `requested` plugins (or every registered plugin, if `None`)
    /// plus their transitive dependencies, level by level.
    pub async fn run(
        &self,
        store: &Arc<Mutex<ConfigStore>>,
        requested: Option<&[String]>,
        target_system_names: Option<&[String]>,
    ) -> Result<IndexMap<String, PluginResult>, DiscoveryError> {
        let selected = self.resolve_closure(requested)?;
        let levels = self.build_levels(&selected)?;

        let mut results = IndexMap::new();
        for level in levels {
            if !self.parallel || level.len() <= 1 {
                for name in &level {
                    let plugin = self.find(name).expect("level built from known plugins");
                    let r = plugin.run(store, target_system_names).await;
                    results.insert(name.clone(), r);
                }
                continue;
            }

            let bound = level.len().min(self.max_workers).max(1);
            let semaphore = Arc::new(Semaphore::new(bound));
            let mut set: JoinSet<(String, PluginResult)> = JoinSet::new();
            for name in &level {
                let plugin = self.find(name).expect("level built from known plugins").clone();
                let store = store.clone();
                let sem = semaphore.clone();
                let targets = target_system_names.map(|t| t.to_vec());
                let name = name.clone();
                set.spawn(async move {
                    let _permit = sem.acquire_owned().await.expect("semaphore never closed");
                    let r = plugin.run(&store, targets.as_deref()).await;
                    (name, r)
                });
            }
            while let Some(joined) = set.join_next().await {
                let (name, r) = joined.map_err(|e| DiscoveryError::PluginFailed { plugin: "<unknown>".into(), message: e.to_string() })?;
                results.insert(name, r);
            }
        }
        Ok(results)
    }

    /// `requested` plus every plugin transitively required by it.
    fn resolve_closure(&self, requested: Option<&[String]>) -> Result<HashSet<String>, DiscoveryError> {
        let mut selected: HashSet<String> = match requested {
            Some(names) => names.iter().cloned().collect(),
            None => self.plugins.iter().map(|p| p.name().to_string()).collect(),
        };

        let mut queue: VecDeque<String> = selected.iter().cloned().collect();
        while let Some(name) = queue.pop_front() {
            let plugin = self.find(&name).ok_or_else(|| DiscoveryError::PluginNotFound(name.clone()))?;
            for dep in plugin.dependencies() {
                if selected.insert(dep.to_string()) {
                    queue.push_back(dep.to_string());
                }
            }
        }
        Ok(selected)
    }

    /// Kahn's algorithm: each returned level is the maximal set of
    /// not-yet-placed plugins whose dependencies are all already placed.
    fn build_levels(&self, selected: &HashSet<String>) -> Result<Vec<Vec<String>>, DiscoveryError> {
        let mut in_degree: HashMap<String, usize> = HashMap::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

        for name in selected {
            let plugin = self.find(name).ok_or_else(|| DiscoveryError::PluginNotFound(name.clone()))?;
            let deps: Vec<&str> = plugin.dependencies().iter().filter(|d| selected.contains(**d)).copied().collect();
            in_degree.insert(name.clone(), deps.len());
            for dep in deps {
                dependents.entry(dep.to_string()).or_default().push(name.clone());
            }
        }

        let mut levels = Vec::new();
        let mut placed = 0;
        loop {
            let level: Vec<String> = in_degree.iter().filter(|(_, &d)| d == 0).map(|(n, _)| n.clone()).collect();
            if level.is_empty() {
                break;
            }
            for name in &level {
                in_degree.remove(name);
                placed += 1;
                if let Some(deps) = dependents.get(name) {
                    for dependent in deps {
                        if let Some(d) = in_degree.get_mut(dependent) {
                            *d -= 1;
                        }
                    }
                }
            }
            levels.push(level);
        }

        if placed != selected.len() {
            return Err(DiscoveryError::CircularDependency);
        }
        Ok(levels)
    }
}

impl Default for DiscoveryCoordinator {
    fn default() -> Self {
        Self::with_builtin_plugins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Endpoint, System};

    fn store_with_one_system() -> Arc<Mutex<ConfigStore>> {
        let mut store = ConfigStore::new();
        store.add_system(System::new("web1", Endpoint::new("web1.example.com", 22))).unwrap();
        Arc::new(Mutex::new(store))
    }

    #[tokio::test]
    async fn disk_space_runs_after_mount_points() {
        let coordinator = DiscoveryCoordinator::with_builtin_plugins();
        let store = store_with_one_system();
        let results = coordinator.run(&store, None, None).await.unwrap();
        assert!(results.contains_key("mount_points"));
        assert!(results.contains_key("disk_space"));

        let guard = store.lock().await;
        let system = guard.get_system("web1").unwrap();
        assert!(system.properties.contains_key("mount_points"));
        assert!(system.properties.contains_key("disk_usage"));
    }

    #[tokio::test]
    async fn requesting_disk_space_pulls_in_its_dependency() {
        let coordinator = DiscoveryCoordinator::with_builtin_plugins();
        let store = store_with_one_system();
        let requested = vec!["disk_space".to_string()];
        let results = coordinator.run(&store, Some(&requested), None).await.unwrap();
        assert!(results.contains_key("mount_points"));
    }

    #[derive(Debug)]
    struct CyclicA;
    #[derive(Debug)]
    struct CyclicB;

    #[async_trait::async_trait]
    impl DiscoveryPlugin for CyclicA {
        fn name(&self) -> &'static str {
            "a"
        }
        fn dependencies(&self) -> &'static [&'static str] {
            &["b"]
        }
        async fn run(&self, _store: &Arc<Mutex<ConfigStore>>, _targets: Option<&[String]>) -> PluginResult {
            PluginResult::default()
        }
    }

    #[async_trait::async_trait]
    impl DiscoveryPlugin for CyclicB {
        fn name(&self) -> &'static str {
            "b"
        }
        fn dependencies(&self) -> &'static [&'static str] {
            &["a"]
        }
        async fn run(&self, _store: &Arc<Mutex<ConfigStore>>, _targets: Option<&[String]>) -> PluginResult {
            PluginResult::default()
        }
    }

    #[tokio::test]
    async fn circular_dependency_is_rejected() {
        let mut coordinator = DiscoveryCoordinator::new();
        coordinator.register(Arc::new(CyclicA));
        coordinator.register(Arc::new(CyclicB));
        let store = store_with_one_system();
        let err = coordinator.run(&store, None, None).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::CircularDependency));
    }
}
