//! CommandRegistry (spec C5): process-wide mapping from command name (and
//! aliases) to a command class. Registration is last-wins; no stable
//! enumeration order is guaranteed beyond insertion order.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::commands::types::{Command, Completion};
use crate::error::ShellError;
use crate::params::{assign_positions, bind};
use crate::shell::Shell;

#[derive(Clone, Default)]
pub struct CommandRegistry {
    by_name: IndexMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { by_name: IndexMap::new() }
    }

    /// Registers `command` under its own name plus every alias. A later
    /// registration under the same name overwrites an earlier one.
    pub fn register(&mut self, command: Arc<dyn Command>, aliases: &[&str]) {
        self.by_name.insert(command.name().to_string(), command.clone());
        for alias in aliases {
            self.by_name.insert(alias.to_string(), command.clone());
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.by_name.get(name).cloned()
    }

    /// The unique set of registered commands (aliases collapsed by
    /// pointer identity), for help and completion.
    pub fn get_all_commands(&self) -> Vec<Arc<dyn Command>> {
        let mut seen: Vec<*const ()> = Vec::new();
        let mut out = Vec::new();
        for cmd in self.by_name.values() {
            let ptr = Arc::as_ptr(cmd) as *const ();
            if !seen.contains(&ptr) {
                seen.push(ptr);
                out.push(cmd.clone());
            }
        }
        out
    }

    /// Look up the class, construct the bound-argument map via C4, and
    /// invoke `execute_command` exactly once (spec P4).
    pub async fn execute(&self, name: &str, args_text: &str, shell: &mut Shell) -> Result<bool, ShellError> {
        let command = self.resolve(name).ok_or_else(|| ShellError::UnknownCommand(name.to_string()))?;
        let params = assign_positions(command.parameters());
        let args = bind(&params, args_text)?;
        command.execute_command(shell, &args).await
    }

    pub fn completions(&self, prefix: &str) -> Vec<Completion> {
        self.get_all_commands()
            .iter()
            .filter(|c| c.name().starts_with(prefix))
            .map(|c| Completion {
                text: c.name().to_string(),
                start_position: 0,
                display: c.name().to_string(),
                display_meta: c.description().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::Command;
    use crate::value::Value;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct PingCommand;

    #[async_trait]
    impl Command for PingCommand {
        fn name(&self) -> &'static str {
            "ping"
        }

        async fn execute_command(&self, shell: &mut Shell, _args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
            shell.print("pong");
            Ok(true)
        }
    }

    #[tokio::test]
    async fn unknown_command_errors() {
        let registry = CommandRegistry::new();
        let mut shell = Shell::new_in_memory();
        let err = registry.execute("nope", "", &mut shell).await.unwrap_err();
        assert!(matches!(err, ShellError::UnknownCommand(_)));
    }

    #[tokio::test]
    async fn aliases_resolve_to_the_same_command() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(PingCommand), &["p"]);
        assert_eq!(registry.get_all_commands().len(), 1);
        let mut shell = Shell::new_in_memory();
        assert!(registry.execute("p", "", &mut shell).await.unwrap());
    }
}
