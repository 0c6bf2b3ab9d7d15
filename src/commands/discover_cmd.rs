use async_trait::async_trait;
use indexmap::IndexMap;

use crate::commands::types::Command;
use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::value::{TypeSpec, Value};

pub struct DiscoverCommand;

#[async_trait]
impl Command for DiscoverCommand {
    fn name(&self) -> &'static str {
        "discover"
    }

    fn description(&self) -> &'static str {
        "Run discovery plugins (and their dependencies) against known systems"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new("plugins", TypeSpec::optional(TypeSpec::list_of(TypeSpec::Str))),
            ParameterDefinition::new("systems", TypeSpec::optional(TypeSpec::list_of(TypeSpec::Str))),
        ]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let requested: Option<Vec<String>> = args.get("plugins").and_then(Value::as_list).map(|vs| vs.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
        let targets: Option<Vec<String>> = args.get("systems").and_then(Value::as_list).map(|vs| vs.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());

        let results = shell.discovery.run(&shell.store, requested.as_deref(), targets.as_deref()).await?;

        for (plugin, result) in &results {
            shell.print(format!("{}: checked {}, updated {}, {} error(s)", plugin, result.systems_checked, result.systems_updated, result.errors.len()));
            for err in &result.errors {
                shell.print(format!("  {}: {}", err.system, err.error));
            }
        }
        Ok(true)
    }
}

pub struct DiskUsageCommand;

#[async_trait]
impl Command for DiskUsageCommand {
    fn name(&self) -> &'static str {
        "disk-usage"
    }

    fn description(&self) -> &'static str {
        "Show the most recently discovered disk usage for a system"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0)]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("name".into()))?.to_string();

        let store = shell.store.lock().await;
        let system = store.get_system(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;

        let usage = system.properties.get("disk_usage");
        let free = system.properties.get("disk_free");
        let total = system.properties.get("disk_total");
        match (usage, free, total) {
            (Some(usage), Some(free), Some(total)) => {
                drop(store);
                shell.print(format!("{}: {}% used, {} free of {}", name, usage, free, total));
                Ok(true)
            }
            _ => {
                drop(store);
                Err(ShellError::DiskOperationError(format!("no disk discovery data for '{}'; run discover first", name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Endpoint, System};

    #[tokio::test]
    async fn discover_populates_disk_usage_then_disk_usage_command_reads_it() {
        let mut shell = Shell::new_in_memory();
        shell.store.lock().await.add_system(System::new("web1", Endpoint::new("web1.example.com", 22))).unwrap();

        DiscoverCommand.execute_command(&mut shell, &IndexMap::new()).await.unwrap();

        let mut args = IndexMap::new();
        args.insert("name".to_string(), Value::String("web1".to_string()));
        DiskUsageCommand.execute_command(&mut shell, &args).await.unwrap();
        assert!(shell.last_output().unwrap().contains("web1"));
    }

    #[tokio::test]
    async fn disk_usage_without_discovery_errors() {
        let mut shell = Shell::new_in_memory();
        shell.store.lock().await.add_system(System::new("web1", Endpoint::new("web1.example.com", 22))).unwrap();

        let mut args = IndexMap::new();
        args.insert("name".to_string(), Value::String("web1".to_string()));
        let err = DiskUsageCommand.execute_command(&mut shell, &args).await.unwrap_err();
        assert!(matches!(err, ShellError::DiskOperationError(_)));
    }
}
