//! Builtin commands (spec C5): each file groups the commands for one area
//! of the shell; `register_builtins` wires every one of them, plus its
//! aliases, into a fresh `CommandRegistry`.

pub mod config_cmd;
pub mod connect_cmd;
pub mod discover_cmd;
pub mod echo_cmd;
pub mod exit_cmd;
pub mod help_cmd;
pub mod registry;
pub mod system_cmd;
pub mod tag_cmd;
pub mod types;
pub mod variable_cmd;

use std::sync::Arc;

pub use registry::CommandRegistry;
pub use types::Command;

pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(Arc::new(exit_cmd::ExitCommand), &["quit", "bye"]);

    registry.register(Arc::new(echo_cmd::EchoCommand), &[]);
    registry.register(Arc::new(echo_cmd::SleepMockCommand), &[]);

    registry.register(Arc::new(connect_cmd::ConnectCommand), &[]);
    registry.register(Arc::new(connect_cmd::DisconnectCommand), &[]);

    registry.register(Arc::new(system_cmd::AddSystemCommand), &[]);
    registry.register(Arc::new(system_cmd::RemoveSystemCommand), &[]);
    registry.register(Arc::new(system_cmd::ListSystemsCommand), &["ls_systems"]);
    registry.register(Arc::new(system_cmd::ShowSystemCommand), &[]);

    registry.register(Arc::new(tag_cmd::TagCommand), &[]);
    registry.register(Arc::new(tag_cmd::UntagCommand), &[]);
    registry.register(Arc::new(tag_cmd::AddRoleCommand), &[]);
    registry.register(Arc::new(tag_cmd::RemoveRoleCommand), &[]);
    registry.register(Arc::new(tag_cmd::SetPropertyCommand), &[]);

    registry.register(Arc::new(variable_cmd::SetCommand), &[]);
    registry.register(Arc::new(variable_cmd::GetCommand), &[]);
    registry.register(Arc::new(variable_cmd::UnsetCommand), &[]);
    registry.register(Arc::new(variable_cmd::VarsCommand), &[]);

    registry.register(Arc::new(discover_cmd::DiscoverCommand), &[]);
    registry.register(Arc::new(discover_cmd::DiskUsageCommand), &[]);

    registry.register(Arc::new(config_cmd::SaveConfigCommand), &[]);
    registry.register(Arc::new(config_cmd::LoadConfigCommand), &[]);

    registry.register(Arc::new(help_cmd::HelpCommand), &["?"]);
    registry.register(Arc::new(help_cmd::HistoryCommand), &[]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered_exactly_once() {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        assert_eq!(registry.get_all_commands().len(), 24);
    }
}
