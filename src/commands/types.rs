//! Command trait (spec C5): the "declarative command" interface. Concrete
//! commands supply `parameters()` (the reflection-derived parameter table,
//! spec §9 "Mixins/deep inheritance") and `execute_command`; the registry
//! does the tokenizing, binding, and dispatch.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::ShellError;
use crate::params::ParameterDefinition;
use crate::shell::Shell;
use crate::value::Value;

/// A structured completion suggestion (spec §6 "Completion protocol").
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub start_position: usize,
    pub display: String,
    pub display_meta: String,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// Lowercase command name, e.g. `connect`.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    fn parameters(&self) -> Vec<ParameterDefinition> {
        Vec::new()
    }

    /// Invoked with the fields already bound and coerced through C4/C1.
    /// Return value indicates success, matching the spec's boolean-success
    /// convention (every command but `exit`, which raises `ShellExit`
    /// instead of returning).
    async fn execute_command(&self, shell: &mut Shell, args: &IndexMap<String, Value>) -> Result<bool, ShellError>;

    fn get_completions(&self, _prefix: &str) -> Vec<Completion> {
        Vec::new()
    }
}
