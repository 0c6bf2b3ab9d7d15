use async_trait::async_trait;
use indexmap::IndexMap;

use crate::commands::types::Command;
use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::store::Role;
use crate::value::{TypeSpec, Value};

fn require_system_name(args: &IndexMap<String, Value>) -> Result<String, ShellError> {
    args.get("name").and_then(Value::as_str).map(str::to_string).ok_or_else(|| ShellError::MissingMandatoryParameter("name".into()))
}

pub struct TagCommand;

#[async_trait]
impl Command for TagCommand {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn description(&self) -> &'static str {
        "Attach a tag to a system"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0),
            ParameterDefinition::new("tag", TypeSpec::Str).mandatory().at_position(1),
        ]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = require_system_name(args)?;
        let tag = args.get("tag").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("tag".into()))?.to_string();

        let mut store = shell.store.lock().await;
        let system = store.get_system_mut(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
        system.add_tag(tag);
        Ok(true)
    }
}

pub struct UntagCommand;

#[async_trait]
impl Command for UntagCommand {
    fn name(&self) -> &'static str {
        "untag"
    }

    fn description(&self) -> &'static str {
        "Remove a tag from a system"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0),
            ParameterDefinition::new("tag", TypeSpec::Str).mandatory().at_position(1),
        ]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = require_system_name(args)?;
        let tag = args.get("tag").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("tag".into()))?.to_string();

        let mut store = shell.store.lock().await;
        let system = store.get_system_mut(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
        Ok(system.remove_tag(&tag))
    }
}

pub struct AddRoleCommand;

#[async_trait]
impl Command for AddRoleCommand {
    fn name(&self) -> &'static str {
        "add-role"
    }

    fn description(&self) -> &'static str {
        "Attach a role to a system"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0),
            ParameterDefinition::new("role", TypeSpec::Str).mandatory().at_position(1),
        ]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = require_system_name(args)?;
        let role = args.get("role").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("role".into()))?.to_string();

        let mut store = shell.store.lock().await;
        let system = store.get_system_mut(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
        system.add_role(Role::new(role));
        Ok(true)
    }
}

pub struct RemoveRoleCommand;

#[async_trait]
impl Command for RemoveRoleCommand {
    fn name(&self) -> &'static str {
        "remove-role"
    }

    fn description(&self) -> &'static str {
        "Remove a role from a system"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0),
            ParameterDefinition::new("role", TypeSpec::Str).mandatory().at_position(1),
        ]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = require_system_name(args)?;
        let role = args.get("role").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("role".into()))?.to_string();

        let mut store = shell.store.lock().await;
        let system = store.get_system_mut(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
        Ok(system.remove_role(&role))
    }
}

pub struct SetPropertyCommand;

#[async_trait]
impl Command for SetPropertyCommand {
    fn name(&self) -> &'static str {
        "set-property"
    }

    fn description(&self) -> &'static str {
        "Set a property on a system"
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::new("name", TypeSpec::Str).mandatory().at_position(0),
            ParameterDefinition::new("key", TypeSpec::Str).mandatory().at_position(1),
            ParameterDefinition::new("value", TypeSpec::Any).mandatory().at_position(2),
        ]
    }

    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError> {
        let name = require_system_name(args)?;
        let key = args.get("key").and_then(Value::as_str).ok_or_else(|| ShellError::MissingMandatoryParameter("key".into()))?.to_string();
        let value = args.get("value").cloned().ok_or_else(|| ShellError::MissingMandatoryParameter("value".into()))?;

        let mut store = shell.store.lock().await;
        let system = store.get_system_mut(&name).ok_or_else(|| ShellError::ServerNotFoundError(name.clone()))?;
        system.add_property(key, value);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Endpoint, System};

    async fn shell_with_system() -> Shell {
        let shell = Shell::new_in_memory();
        shell.store.lock().await.add_system(System::new("web1", Endpoint::new("web1.example.com", 22))).unwrap();
        shell
    }

    #[tokio::test]
    async fn tag_then_untag_round_trips() {
        let mut shell = shell_with_system().await;
        let mut args = IndexMap::new();
        args.insert("name".to_string(), Value::String("web1".to_string()));
        args.insert("tag".to_string(), Value::String("prod".to_string()));

        TagCommand.execute_command(&mut shell, &args).await.unwrap();
        assert!(shell.store.lock().await.get_system("web1").unwrap().has_tag("prod"));

        let removed = UntagCommand.execute_command(&mut shell, &args).await.unwrap();
        assert!(removed);
        assert!(!shell.store.lock().await.get_system("web1").unwrap().has_tag("prod"));
    }

    #[tokio::test]
    async fn set_property_stores_arbitrary_value() {
        let mut shell = shell_with_system().await;
        let mut args = IndexMap::new();
        args.insert("name".to_string(), Value::String("web1".to_string()));
        args.insert("key".to_string(), Value::String("disk_free".to_string()));
        args.insert("value".to_string(), Value::Int(42));

        SetPropertyCommand.execute_command(&mut shell, &args).await.unwrap();
        let store = shell.store.lock().await;
        let system = store.get_system("web1").unwrap();
        assert_eq!(system.properties.get("disk_free"), Some(&Value::Int(42)));
    }
}
