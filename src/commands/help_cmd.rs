use async_trait::async_trait;
use indexmap::IndexMap;

use crate::commands::types::Command;
use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::value::{TypeSpec, Value};

pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "List available commands, or describe one"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("command", TypeSpec::optional(TypeSpec::Str))]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let requested = args.get("command").and_then(Value::as_str);
        let commands = shell.registry.get_all_commands();

        if let Some(name) = requested {
            match commands.iter().find(|c| c.name() == name) {
                Some(cmd) => shell.print(format!("{} - {}", cmd.name(), cmd.description())),
                None => shell.print(format!("No such command: {}", name)),
            }
            return Ok(true);
        }

        let mut names: Vec<&str> = commands.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        shell.print(format!("Available commands: {}", names.join(", ")));
        Ok(true)
    }
}

/// Replays the Update-Info Tree's root-level entries as a flat command
/// history. The tree, not a side log, is the system of record.
pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    fn name(&self) -> &'static str {
        "history"
    }

    fn description(&self) -> &'static str {
        "Show recently executed commands"
    }

    async fn execute_command(&self, shell: &mut Shell, _args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let lines: Vec<String> = {
            let tree = shell.tree.lock().await;
            tree.roots().iter().enumerate().map(|(i, node)| format!("{}: {}", i + 1, node.command)).collect()
        };
        for line in lines {
            shell.print(line);
        }
        Ok(true)
    }
}
