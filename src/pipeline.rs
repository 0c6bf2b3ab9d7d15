//! Pipeline (spec C9): glue between one input line and the rest of the
//! engine — create a root Update-Info node, expand variables, parse the
//! line, then either dispatch a plain command or hand a control-flow
//! statement to the Executor.

use std::sync::Mutex as StdMutex;

use indexmap::IndexMap;

use crate::error::ShellError;
use crate::exec;
use crate::script::ast::Statement;
use crate::script::parser::parse_script;
use crate::shell::Shell;

type EventHandler = Box<dyn Fn(&[String]) + Send + Sync>;

/// `view <name>` is the only built-in "view command"; everything else
/// goes through the Command Registry or the Executor.
const VIEW_NAMES: &[&str] = &["simple", "editor"];

pub struct Pipeline {
    handlers: StdMutex<IndexMap<String, Vec<EventHandler>>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self { handlers: StdMutex::new(IndexMap::new()) }
    }

    pub fn register_event_handler(&self, name: impl Into<String>, handler: impl Fn(&[String]) + Send + Sync + 'static) {
        self.handlers.lock().unwrap().entry(name.into()).or_default().push(Box::new(handler));
    }

    pub fn trigger_event(&self, name: &str, args: &[String]) {
        if let Some(hs) = self.handlers.lock().unwrap().get(name) {
            for h in hs {
                h(args);
            }
        }
    }

    /// Runs one input line end to end, recording the result on a fresh
    /// root node. Returns the command's boolean success, or the error it
    /// raised (already attached to the root node before returning).
    pub async fn execute_line(&self, shell: &mut Shell, line: &str) -> Result<bool, ShellError> {
        let root = { shell.tree.lock().await.create_root(line) };
        let expanded = shell.vars.expand_variables(line);
        let trimmed = expanded.trim();

        if trimmed.is_empty() {
            shell.tree.lock().await.complete(root, true);
            return Ok(true);
        }

        if let Some(name) = trimmed.strip_prefix("view ").map(|s| s.trim().to_string()) {
            shell.context.insert("view".to_string(), name.clone());
            self.trigger_event("view_switched", &[name.clone()]);
            if !VIEW_NAMES.contains(&name.as_str()) {
                shell.print(format!("Warning: unknown view '{}'", name));
            }
            shell.tree.lock().await.complete(root, true);
            return Ok(true);
        }

        shell.tree.lock().await.start(root);
        let result = self.dispatch(shell, &expanded, root).await;
        match &result {
            Ok(success) => {
                shell.tree.lock().await.complete(root, *success);
            }
            Err(e) => {
                shell.tree.lock().await.set_error(root, e.error_type(), e.to_string(), None);
            }
        }
        result
    }

    async fn dispatch(&self, shell: &mut Shell, text: &str, root: crate::updatetree::NodeId) -> Result<bool, ShellError> {
        let statement = parse_script(text)?;
        let statement = if statement.statements.len() == 1 {
            statement.statements.into_iter().next().unwrap()
        } else {
            Statement::Block(statement)
        };

        match statement {
            Statement::Command { name, args_text } => {
                let registry = shell.registry.clone();
                registry.execute(&name, &args_text, shell).await
            }
            other => {
                let signal = exec::execute_statement(shell, &other, root).await?;
                if let exec::Signal::Exit(code) = signal {
                    shell.exit_shell(code);
                }
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Shell;

    #[tokio::test]
    async fn hyphenated_system_commands_resolve_through_the_pipeline() {
        let pipeline = Pipeline::new();
        let mut shell = Shell::new_in_memory();

        assert!(pipeline.execute_line(&mut shell, "add-system web1 web1.example.com").await.unwrap());
        assert_eq!(shell.store.lock().await.list_systems().len(), 1);

        assert!(pipeline.execute_line(&mut shell, "list-systems").await.unwrap());
        assert!(pipeline.execute_line(&mut shell, "tag web1 prod").await.unwrap());
        assert!(pipeline.execute_line(&mut shell, "add-role web1 web").await.unwrap());
        assert!(pipeline.execute_line(&mut shell, "disk-usage web1").await.is_err()); // no discovery run yet

        assert!(pipeline.execute_line(&mut shell, "remove-system web1").await.unwrap());
        assert!(shell.store.lock().await.list_systems().is_empty());
    }

    /// Seed scenario 3: `foreach $h in $hosts: echo $h` produces one sibling
    /// node per item, each carrying the expanded command text.
    #[tokio::test]
    async fn foreach_expands_the_loop_variable_per_iteration() {
        let pipeline = Pipeline::new();
        let mut shell = Shell::new_in_memory();
        shell.vars.set("hosts", "['a', 'b', 'c']", None).unwrap();

        let result = pipeline.execute_line(&mut shell, "foreach $h in $hosts:\n  echo $h\n").await;
        assert!(result.unwrap());

        let tree = shell.tree.lock().await;
        let foreach_node = tree.node(0); // sole root node created by execute_line
        assert_eq!(foreach_node.children.len(), 1, "the foreach statement is the sole top-level node");
        let foreach_node = tree.node(foreach_node.children[0]);
        let commands: Vec<&str> = foreach_node.children.iter().map(|&id| tree.node(id).command.as_str()).collect();
        assert_eq!(commands, vec!["echo a", "echo b", "echo c"]);
    }

    /// Seed scenario 4: a failed `try` branch binds `$error` before `catch`
    /// runs, and the catch branch's `echo` expands `${error.message}`
    /// against that binding.
    #[tokio::test]
    async fn try_catch_binds_error_for_the_catch_branch_to_expand() {
        let pipeline = Pipeline::new();
        let mut shell = Shell::new_in_memory();
        shell
            .store
            .lock()
            .await
            .add_system(crate::store::System::new("existing", crate::store::Endpoint::new("existing.example.com", 22)))
            .unwrap();

        let script = "try:\n  add-system existing existing.example.com\ncatch:\n  echo \"failed: ${error.message}\"\n";
        let result = pipeline.execute_line(&mut shell, script).await;
        assert!(result.unwrap());
        assert_eq!(shell.last_output(), Some("failed: System with name 'existing' already exists"));
    }

    #[tokio::test]
    async fn unknown_snake_case_spelling_is_no_longer_registered() {
        let pipeline = Pipeline::new();
        let mut shell = Shell::new_in_memory();
        let err = pipeline.execute_line(&mut shell, "add_system web1 web1.example.com").await.unwrap_err();
        assert!(matches!(err, ShellError::UnknownCommand(_)));
    }

    #[tokio::test]
    async fn echo_and_sleep_mock_are_registered() {
        let pipeline = Pipeline::new();
        let mut shell = Shell::new_in_memory();
        assert!(pipeline.execute_line(&mut shell, "echo hello").await.unwrap());
        assert_eq!(shell.last_output(), Some("hello"));
        assert!(pipeline.execute_line(&mut shell, "sleep-mock 0.1").await.unwrap());
    }
}
