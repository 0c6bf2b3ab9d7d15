use async_trait::async_trait;
use indexmap::IndexMap;

use crate::commands::types::Command;
use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::value::{TypeSpec, Value};

/// Registered under `exit`, with `quit`/`bye` as aliases.
pub struct ExitCommand;

#[async_trait]
impl Command for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn description(&self) -> &'static str {
        "Leave the shell, optionally with an exit code"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("code", TypeSpec::Int).with_default(Value::Int(0))]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let code = args.get("code").and_then(Value::as_int).unwrap_or(0) as i32;
        shell.exit_shell(code);
        Ok(true)
    }
}
