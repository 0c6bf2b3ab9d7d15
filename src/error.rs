//! Error taxonomy (spec §7).
//!
//! Follows the teacher's flattening pattern: per-kind structs implementing
//! `std::error::Error` via `thiserror`, gathered into one enum with `From`
//! impls so call sites can use `?` freely.

use thiserror::Error;

/// Errors surfaced by Type Coercion (C1).
#[derive(Debug, Clone, Error)]
#[error("Cannot convert {value} to {target_type}{cause_suffix}", cause_suffix = cause_display(.cause))]
pub struct TypeConversionError {
    pub value: String,
    pub target_type: String,
    pub cause: Option<String>,
}

fn cause_display(cause: &Option<String>) -> String {
    match cause {
        Some(c) => format!(": {}", c),
        None => String::new(),
    }
}

impl TypeConversionError {
    pub fn new(value: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self { value: value.into(), target_type: target_type.into(), cause: None }
    }

    pub fn with_cause(value: impl Into<String>, target_type: impl Into<String>, cause: impl Into<String>) -> Self {
        Self { value: value.into(), target_type: target_type.into(), cause: Some(cause.into()) }
    }
}

/// Errors from the sandboxed expression evaluator (C2).
#[derive(Debug, Clone, Error)]
pub enum VariableEvaluationError {
    #[error("SyntaxError: {0}")]
    Syntax(String),
    #[error("ValueError: {0}")]
    Value(String),
    #[error("NameError: name '{0}' is not defined")]
    UndefinedName(String),
    #[error("forbidden expression: {0}")]
    Forbidden(String),
}

/// Errors from script parsing (C6).
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("unexpected indentation at line {line}")]
    IndentationError { line: usize },
}

/// Errors from the Discovery Coordinator (C10).
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("Circular dependencies detected in discovery plugins")]
    CircularDependency,
    #[error("Discovery plugin not found: {0}")]
    PluginNotFound(String),
    #[error("Discovery plugin {plugin} failed: {message}")]
    PluginFailed { plugin: String, message: String },
    #[error("Unable to resolve plugin execution order")]
    UnresolvableOrder,
}

/// Control-flow signal: not an error in the usual sense, but propagated
/// the same way (spec calls this out explicitly: "ShellExit(code) — control
/// flow, not an error").
#[derive(Debug, Clone, Error)]
#[error("exit({0})")]
pub struct ShellExit(pub i32);

/// Unified error type for everything else in the engine.
#[derive(Debug, Clone, Error)]
pub enum ShellError {
    #[error(transparent)]
    TypeConversion(#[from] TypeConversionError),

    #[error(transparent)]
    VariableEvaluation(#[from] VariableEvaluationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Missing required parameter: {0}")]
    MissingMandatoryParameter(String),

    #[error("Could not connect to server '{0}': {1}")]
    ServerConnectionError(String, String),

    #[error("Server not found: {0}")]
    ServerNotFoundError(String),

    #[error("System with name '{0}' already exists")]
    ServerAlreadyExistsError(String),

    #[error("Server '{0}' is not connected")]
    ServerNotConnectedError(String),

    #[error("Disk operation failed: {0}")]
    DiskOperationError(String),

    #[error("{0}")]
    Other(String),
}

impl ShellError {
    pub fn other(msg: impl Into<String>) -> Self {
        ShellError::Other(msg.into())
    }

    /// The user-visible single-line diagnostic: `Error: <message>`.
    pub fn display_line(&self) -> String {
        format!("Error: {}", self)
    }

    /// The name bound into `$error.type` by `try/catch` (spec §4.7).
    pub fn error_type(&self) -> &'static str {
        match self {
            ShellError::TypeConversion(_) => "TypeConversionError",
            ShellError::VariableEvaluation(e) => match e {
                VariableEvaluationError::Syntax(_) => "SyntaxError",
                VariableEvaluationError::Value(_) => "ValueError",
                VariableEvaluationError::UndefinedName(_) => "NameError",
                VariableEvaluationError::Forbidden(_) => "ForbiddenExpressionError",
            },
            ShellError::Parse(_) => "ParseError",
            ShellError::Discovery(_) => "DiscoveryError",
            ShellError::UnknownCommand(_) => "UnknownCommandError",
            ShellError::UnknownParameter(_) => "UnknownParameterError",
            ShellError::MissingMandatoryParameter(_) => "MissingMandatoryParameterError",
            ShellError::ServerConnectionError(_, _) => "ServerConnectionError",
            ShellError::ServerNotFoundError(_) => "ServerNotFoundError",
            ShellError::ServerAlreadyExistsError(_) => "ServerAlreadyExistsError",
            ShellError::ServerNotConnectedError(_) => "ServerNotConnectedError",
            ShellError::DiskOperationError(_) => "DiskOperationError",
            ShellError::Other(_) => "Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_conversion_error_message_names_value_and_type() {
        let e = TypeConversionError::new("maybe", "bool");
        assert_eq!(e.to_string(), "Cannot convert maybe to bool");
    }

    #[test]
    fn type_conversion_error_with_cause_appends_colon_suffix() {
        let e = TypeConversionError::with_cause("xs", "int", "invalid digit");
        assert_eq!(e.to_string(), "Cannot convert xs to int: invalid digit");
    }

    #[test]
    fn display_line_prefixes_error() {
        let e = ShellError::ServerNotFoundError("db1".into());
        assert_eq!(e.display_line(), "Error: Server not found: db1");
    }
}
