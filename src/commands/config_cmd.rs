use async_trait::async_trait;
use indexmap::IndexMap;

use crate::commands::types::Command;
use crate::error::ShellError;
use crate::shell::Shell;
use crate::value::Value;

pub struct SaveConfigCommand;

#[async_trait]
impl Command for SaveConfigCommand {
    fn name(&self) -> &'static str {
        "save-config"
    }

    fn description(&self) -> &'static str {
        "Persist the config store to disk"
    }

    async fn execute_command(&self, shell: &mut Shell, _args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        shell.save_config().await?;
        shell.print("Configuration saved");
        Ok(true)
    }
}

pub struct LoadConfigCommand;

#[async_trait]
impl Command for LoadConfigCommand {
    fn name(&self) -> &'static str {
        "load-config"
    }

    fn description(&self) -> &'static str {
        "Reload the config store from disk, discarding in-memory changes"
    }

    async fn execute_command(&self, shell: &mut Shell, _args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let loaded = shell.persistence.load()?;
        *shell.store.lock().await = loaded;
        shell.print("Configuration loaded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Endpoint, System};

    #[tokio::test]
    async fn save_then_load_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("fleetsh-config-cmd-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut shell = Shell::new(crate::shell::ShellOptions { config_path: Some(path), verbose: false }).unwrap();
        shell.store.lock().await.add_system(System::new("web1", Endpoint::new("web1.example.com", 22))).unwrap();

        SaveConfigCommand.execute_command(&mut shell, &IndexMap::new()).await.unwrap();
        shell.store.lock().await.remove_system("web1").unwrap();
        assert!(shell.store.lock().await.get_system("web1").is_none());

        LoadConfigCommand.execute_command(&mut shell, &IndexMap::new()).await.unwrap();
        assert!(shell.store.lock().await.get_system("web1").is_some());

        std::fs::remove_dir_all(&dir).ok();
    }
}
