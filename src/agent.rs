//! RemoteAgent — the external collaborator through which commands execute
//! against a connected system. The concrete SSH transport is out of scope
//! (spec §1); this module pins the contract and a `MockAgent` used by
//! discovery plugins and tests.

use std::fmt;

use thiserror::Error;

use crate::store::Endpoint;

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl AgentOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), stderr: String::new(), exit_code: 0 }
    }
}

/// The live handle through which commands execute against a remote system.
/// I/O here is treated as a synchronous call made by command code (spec
/// §5): the core's own concurrency is confined to `ParallelBlock` and
/// discovery level-dispatch, not this boundary.
pub trait RemoteAgent: fmt::Debug + Send + Sync {
    fn run_command(&self, cmd: &str) -> Result<AgentOutput, AgentError>;
}

/// Connects to `endpoint`, returning a handle usable by command code. The
/// core ships only the mock; a real implementation would dial SSH here.
pub fn connect(endpoint: &Endpoint) -> Result<std::sync::Arc<dyn RemoteAgent>, AgentError> {
    Ok(std::sync::Arc::new(MockAgent { hostname: endpoint.hostname.clone() }))
}

/// A stub agent used by discovery plugins and tests: deterministic
/// responses keyed off the target hostname, no network I/O.
#[derive(Debug, Clone)]
pub struct MockAgent {
    pub hostname: String,
}

impl RemoteAgent for MockAgent {
    fn run_command(&self, cmd: &str) -> Result<AgentOutput, AgentError> {
        Ok(AgentOutput::success(format!("[{}] {}", self.hostname, cmd)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_agent_echoes_hostname_and_command() {
        let agent = MockAgent { hostname: "db1".into() };
        let out = agent.run_command("disk-usage").unwrap();
        assert_eq!(out.stdout, "[db1] disk-usage");
        assert_eq!(out.exit_code, 0);
    }

    #[test]
    fn connect_returns_a_usable_handle() {
        let endpoint = Endpoint::new("web1.example.com", 22);
        let agent = connect(&endpoint).unwrap();
        assert!(agent.run_command("uptime").is_ok());
    }
}
