use async_trait::async_trait;
use indexmap::IndexMap;

use crate::commands::types::Command;
use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::value::{TypeSpec, Value};

/// Prints its argument after `$name`/`${expr}` interpolation — the
/// scripting surface's equivalent of the teacher's `echo`, minus the
/// `-n`/`-e` flag handling this shell has no use for.
pub struct EchoCommand;

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Print a message, expanding $name/${expr} references first"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("message", TypeSpec::Str).at_position(0).with_default(Value::String(String::new()))]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let message = args.get("message").and_then(Value::as_str).unwrap_or("");
        let expanded = shell.vars.expand_variables(message);
        shell.print(expanded);
        Ok(true)
    }
}

/// A duration-bearing no-op used by `parallel` blocks in place of a real
/// `sleep`, so concurrency-bound tests and demos stay fast and
/// deterministic instead of costing real wall-clock seconds.
pub struct SleepMockCommand;

#[async_trait]
impl Command for SleepMockCommand {
    fn name(&self) -> &'static str {
        "sleep-mock"
    }

    fn description(&self) -> &'static str {
        "Yield briefly, scaled down from the given duration (for parallel-block tests)"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("seconds", TypeSpec::Float).at_position(0).with_default(Value::Float(0.0))]
    }

    async fn execute_command(&self, _shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let seconds = match args.get("seconds") {
            Some(Value::Float(f)) => *f,
            Some(Value::Int(i)) => *i as f64,
            _ => 0.0,
        }
        .max(0.0);
        let millis = (seconds * 10.0).min(50.0) as u64;
        tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_expands_bare_and_braced_references() {
        let mut shell = Shell::new_in_memory();
        shell.vars.set_value("name", Value::String("prod01".into()));

        let mut args = IndexMap::new();
        args.insert("message".to_string(), Value::String("host $name ready: ${1 + 1}".to_string()));
        EchoCommand.execute_command(&mut shell, &args).await.unwrap();

        assert_eq!(shell.last_output().unwrap(), "host prod01 ready: 2");
    }

    #[tokio::test]
    async fn sleep_mock_returns_success() {
        let mut shell = Shell::new_in_memory();
        let mut args = IndexMap::new();
        args.insert("seconds".to_string(), Value::Float(1.0));
        assert!(SleepMockCommand.execute_command(&mut shell, &args).await.unwrap());
    }
}
