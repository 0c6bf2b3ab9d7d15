//! Shell Host (spec C11): owns every other component and runs the REPL.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use crate::commands::{self, CommandRegistry};
use crate::discovery::DiscoveryCoordinator;
use crate::error::ShellError;
use crate::pipeline::Pipeline;
use crate::store::{ConfigPersistence, ConfigStore, JsonFilePersistence, NullPersistence};
use crate::updatetree::UpdateTree;
use crate::vars::VariableManager;

/// CLI startup flags (spec §6): `--config PATH`, `--verbose`.
#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
}

pub struct Shell {
    pub registry: CommandRegistry,
    pub vars: VariableManager,
    pub store: Arc<Mutex<ConfigStore>>,
    pub tree: Arc<Mutex<UpdateTree>>,
    pub persistence: Arc<dyn ConfigPersistence + Send + Sync>,
    pub discovery: DiscoveryCoordinator,
    pub context: IndexMap<String, String>,
    pub verbose: bool,
    pub pending_exit: Option<i32>,
    output: Vec<String>,
}

impl Shell {
    pub fn new(options: ShellOptions) -> Result<Self, ShellError> {
        let persistence: Arc<dyn ConfigPersistence + Send + Sync> = match options.config_path {
            Some(path) => Arc::new(JsonFilePersistence::new(path)),
            None => Arc::new(JsonFilePersistence::default()),
        };
        let store = persistence.load()?;

        let mut registry = CommandRegistry::new();
        commands::register_builtins(&mut registry);

        Ok(Self {
            registry,
            vars: VariableManager::new(),
            store: Arc::new(Mutex::new(store)),
            tree: Arc::new(Mutex::new(UpdateTree::new())),
            persistence,
            discovery: DiscoveryCoordinator::with_builtin_plugins(),
            context: IndexMap::new(),
            verbose: options.verbose,
            pending_exit: None,
            output: Vec::new(),
        })
    }

    /// A Shell with no persisted state and no disk I/O, for tests.
    pub fn new_in_memory() -> Self {
        let mut registry = CommandRegistry::new();
        commands::register_builtins(&mut registry);
        Self {
            registry,
            vars: VariableManager::new(),
            store: Arc::new(Mutex::new(ConfigStore::new())),
            tree: Arc::new(Mutex::new(UpdateTree::new())),
            persistence: Arc::new(NullPersistence),
            discovery: DiscoveryCoordinator::with_builtin_plugins(),
            context: IndexMap::new(),
            verbose: false,
            pending_exit: None,
            output: Vec::new(),
        }
    }

    /// A worker view for a `ParallelBlock` branch: shares the Config
    /// Store, Update Tree, Command Registry, and persistence handle with
    /// `self`, but takes its own copy of the Variable Manager and context
    /// (spec §5: parallel workers only ever read a dispatch-time snapshot).
    pub fn fork(&self) -> Shell {
        Shell {
            registry: self.registry.clone(),
            vars: self.vars.clone(),
            store: self.store.clone(),
            tree: self.tree.clone(),
            persistence: self.persistence.clone(),
            discovery: self.discovery.clone(),
            context: self.context.clone(),
            verbose: self.verbose,
            pending_exit: None,
            output: Vec::new(),
        }
    }

    /// Sets the pending exit code; checked by the Executor and the REPL
    /// loop after every statement (spec's `ShellExit` control-flow signal,
    /// modeled here as a checked field rather than a thrown error so async
    /// command bodies keep the plain `Result<bool, ShellError>` shape).
    pub fn exit_shell(&mut self, code: i32) {
        self.pending_exit = Some(code);
    }

    pub fn print(&mut self, message: impl Into<String>) {
        let message = message.into();
        println!("{}", message);
        self.output.push(message);
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn last_output(&self) -> Option<&str> {
        self.output.last().map(|s| s.as_str())
    }

    pub fn prompt(&self) -> String {
        match self.context.get("current_server") {
            Some(server) => format!("fleetsh [{}]> ", server),
            None => "fleetsh> ".to_string(),
        }
    }

    pub async fn save_config(&self) -> Result<(), ShellError> {
        let store = self.store.lock().await;
        self.persistence.save(&store)
    }

    /// The REPL: reads lines from stdin until EOF or `exit`, dispatching
    /// each through the Pipeline. Returns the process exit code.
    pub async fn run(&mut self) -> i32 {
        let pipeline = Pipeline::new();
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        print!("{}", self.prompt());
        let _ = std::io::Write::flush(&mut std::io::stdout());

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    break;
                }
            };

            if !line.trim().is_empty() {
                if let Err(e) = pipeline.execute_line(self, &line).await {
                    println!("{}", e.display_line());
                    if self.verbose {
                        eprintln!("{:?}", e);
                    }
                }
            }

            if let Some(code) = self.pending_exit {
                return code;
            }

            print!("{}", self.prompt());
            let _ = std::io::Write::flush(&mut std::io::stdout());
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_reflects_current_server() {
        let mut shell = Shell::new_in_memory();
        assert_eq!(shell.prompt(), "fleetsh> ");
        shell.context.insert("current_server".to_string(), "web1".to_string());
        assert_eq!(shell.prompt(), "fleetsh [web1]> ");
    }

    #[test]
    fn exit_shell_sets_pending_exit() {
        let mut shell = Shell::new_in_memory();
        assert!(shell.pending_exit.is_none());
        shell.exit_shell(2);
        assert_eq!(shell.pending_exit, Some(2));
    }
}
