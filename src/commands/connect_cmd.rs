use async_trait::async_trait;
use indexmap::IndexMap;

use crate::agent;
use crate::commands::types::Command;
use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::value::{TypeSpec, Value};

pub struct ConnectCommand;

#[async_trait]
impl Command for ConnectCommand {
    fn name(&self) -> &'static str {
        "connect"
    }

    fn description(&self) -> &'static str {
        "Open a live connection to a system by name"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("server_name", TypeSpec::Str).mandatory().at_position(0)]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("server_name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("server_name".into()))?.to_string();

        let endpoint = {
            let store = shell.store.lock().await;
            let system = store.get_system(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
            system.endpoint.clone()
        };

        match agent::connect(&endpoint) {
            Ok(handle) => {
                let mut store = shell.store.lock().await;
                let system = store.get_system_mut(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
                system.agent = Some(handle);
                system.endpoint.mark_connected();
                drop(store);
                shell.context.insert("current_server".to_string(), name.clone());
                shell.print(format!("Connected to {}", name));
                Ok(true)
            }
            Err(e) => {
                let mut store = shell.store.lock().await;
                if let Some(system) = store.get_system_mut(&name) {
                    system.endpoint.mark_error(e.to_string());
                }
                Err(ShellError::ServerConnectionError(name, e.to_string()))
            }
        }
    }
}

pub struct DisconnectCommand;

#[async_trait]
impl Command for DisconnectCommand {
    fn name(&self) -> &'static str {
        "disconnect"
    }

    fn description(&self) -> &'static str {
        "Close the live connection to a system by name"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![ParameterDefinition::new("server_name", TypeSpec::Str).mandatory().at_position(0)]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = args.get("server_name").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("server_name".into()))?.to_string();

        {
            let mut store = shell.store.lock().await;
            let system = store.get_system_mut(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
            system.agent = None;
            system.endpoint.mark_disconnected();
        }

        if shell.context.get("current_server") == Some(&name) {
            shell.context.shift_remove("current_server");
        }
        shell.print(format!("Disconnected from {}", name));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Endpoint, System};

    #[tokio::test]
    async fn connect_then_disconnect_round_trips_current_server() {
        let mut shell = Shell::new_in_memory();
        {
            let mut store = shell.store.lock().await;
            store.add_system(System::new("web1", Endpoint::new("web1.example.com", 22))).unwrap();
        }

        let mut args = IndexMap::new();
        args.insert("server_name".to_string(), Value::String("web1".to_string()));

        ConnectCommand.execute_command(&mut shell, &args).await.unwrap();
        assert_eq!(shell.context.get("current_server"), Some(&"web1".to_string()));

        DisconnectCommand.execute_command(&mut shell, &args).await.unwrap();
        assert_eq!(shell.context.get("current_server"), None);
    }

    #[tokio::test]
    async fn connect_to_unknown_system_errors() {
        let mut shell = Shell::new_in_memory();
        let mut args = IndexMap::new();
        args.insert("server_name".to_string(), Value::String("ghost".to_string()));
        let err = ConnectCommand.execute_command(&mut shell, &args).await.unwrap_err();
        assert!(matches!(err, ShellError::ServerNotFoundError(_)));
    }
}
