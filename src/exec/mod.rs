//! Executor (spec C7): walks the statement AST, dispatching leaves back to
//! the Command Registry (C5) and creating an Update-Info Tree node (C8) for
//! every statement executed.

pub mod parallel;

use indexmap::IndexMap;

use crate::error::ShellError;
use crate::script::ast::{CodeBlock, IfBranch, Statement};
use crate::script::parser::parse_line;
use crate::shell::Shell;
use crate::updatetree::NodeId;
use crate::value::Value;

/// Outcome of executing one statement: either "keep going" or one of the
/// four things that unwind through enclosing blocks.
#[derive(Debug, Clone)]
pub enum Signal {
    Normal,
    Break,
    Continue,
    Return(Option<Value>),
    Exit(i32),
}

impl Signal {
    fn is_unwinding(&self) -> bool {
        !matches!(self, Signal::Normal)
    }
}

async fn child_node(shell: &mut Shell, parent: NodeId, command: impl Into<String>) -> NodeId {
    let mut tree = shell.tree.lock().await;
    tree.create_child_node(parent, command)
}

/// Executes every statement in `block` under `parent`, stopping early on
/// the first unwinding signal.
pub async fn execute_block(shell: &mut Shell, block: &CodeBlock, parent: NodeId) -> Result<Signal, ShellError> {
    for stmt in &block.statements {
        let signal = execute_statement(shell, stmt, parent).await?;
        if signal.is_unwinding() {
            return Ok(signal);
        }
        if shell.pending_exit.is_some() {
            return Ok(Signal::Exit(shell.pending_exit.unwrap()));
        }
    }
    Ok(Signal::Normal)
}

pub async fn execute_statement(shell: &mut Shell, stmt: &Statement, parent: NodeId) -> Result<Signal, ShellError> {
    match stmt {
        Statement::Command { name, args_text } => execute_command(shell, name, args_text, parent).await,
        Statement::SetVariable { name, expr } => execute_set_variable(shell, name, expr, parent).await,
        Statement::ForEach { item_var, collection_expr, body } => {
            execute_foreach(shell, item_var, collection_expr, body, parent).await
        }
        Statement::TryCatch { try_block, catch_block, finally_block } => {
            execute_try_catch(shell, try_block, catch_block, finally_block.as_ref(), parent).await
        }
        Statement::Parallel { body, collection, item, max_concurrent } => {
            let node = child_node(shell, parent, "parallel").await;
            parallel::execute_parallel(shell, body, collection.as_deref(), item.as_deref(), *max_concurrent, node).await
        }
        Statement::If { branches, else_block } => execute_if(shell, branches, else_block.as_ref(), parent).await,
        Statement::While { condition, body } => execute_while(shell, condition, body, parent).await,
        Statement::Return { value } => {
            let v = match value {
                Some(text) => Some(shell.vars.evaluate_expression(text)?),
                None => None,
            };
            Ok(Signal::Return(v))
        }
        Statement::Break => Ok(Signal::Break),
        Statement::Continue => Ok(Signal::Continue),
        Statement::Pipeline { stages } => execute_pipeline_statement(shell, stages, parent).await,
        Statement::Block(block) => {
            let node = child_node(shell, parent, block.block_type.as_deref().unwrap_or("block")).await;
            shell.tree.lock().await.start(node);
            let result = execute_block(shell, block, node).await;
            finish_node(shell, node, &result).await;
            result
        }
    }
}

async fn finish_node(shell: &mut Shell, node: NodeId, result: &Result<Signal, ShellError>) {
    let mut tree = shell.tree.lock().await;
    match result {
        Ok(Signal::Break) | Ok(Signal::Continue) => tree.complete(node, true),
        Ok(_) => tree.complete(node, true),
        Err(e) => tree.set_error(node, e.error_type(), e.to_string(), None),
    }
}

async fn execute_command(shell: &mut Shell, name: &str, args_text: &str, parent: NodeId) -> Result<Signal, ShellError> {
    // Statements nested in a control-flow body (foreach/try/parallel/...)
    // are parsed once, up front, before loop/error-binding variables like
    // `$i` or `$error` exist — their literal `$`/`${...}` text survives
    // parsing unexpanded (P9) and is only resolvable here, at the moment
    // this particular iteration/branch actually runs.
    let args_text = shell.vars.expand_variables(args_text);
    let args_text = args_text.as_str();

    let command_line = if args_text.is_empty() { name.to_string() } else { format!("{} {}", name, args_text) };
    let node = child_node(shell, parent, command_line).await;
    shell.tree.lock().await.start(node);

    let registry = shell.registry.clone();
    let result = registry.execute(name, args_text, shell).await;
    match &result {
        Ok(success) => shell.tree.lock().await.complete(node, *success),
        Err(e) => shell.tree.lock().await.set_error(node, e.error_type(), e.to_string(), None),
    }
    result.map(|_| Signal::Normal)
}

async fn execute_set_variable(shell: &mut Shell, name: &str, expr: &str, parent: NodeId) -> Result<Signal, ShellError> {
    let node = child_node(shell, parent, format!("${} = {}", name, expr)).await;
    shell.tree.lock().await.start(node);
    match shell.vars.set(name, expr, None) {
        Ok(_) => {
            shell.tree.lock().await.complete(node, true);
            Ok(Signal::Normal)
        }
        Err(e) => {
            let err = ShellError::from(e);
            shell.tree.lock().await.set_error(node, err.error_type(), err.to_string(), None);
            Err(err)
        }
    }
}

async fn execute_foreach(
    shell: &mut Shell,
    item_var: &str,
    collection_expr: &str,
    body: &CodeBlock,
    parent: NodeId,
) -> Result<Signal, ShellError> {
    let node = child_node(shell, parent, format!("foreach ${} in {}", item_var, collection_expr)).await;
    shell.tree.lock().await.start(node);

    let collection = shell.vars.evaluate_expression(collection_expr)?;
    let items: Vec<Value> = collection.as_list().map(|s| s.to_vec()).unwrap_or_else(|| vec![collection]);

    for element in items {
        shell.vars.set_value(item_var, element);
        match execute_block(shell, body, node).await? {
            Signal::Break => break,
            Signal::Continue | Signal::Normal => {}
            other @ (Signal::Return(_) | Signal::Exit(_)) => {
                shell.tree.lock().await.complete(node, true);
                return Ok(other);
            }
        }
    }
    shell.tree.lock().await.complete(node, true);
    Ok(Signal::Normal)
}

async fn execute_try_catch(
    shell: &mut Shell,
    try_block: &CodeBlock,
    catch_block: &CodeBlock,
    finally_block: Option<&CodeBlock>,
    parent: NodeId,
) -> Result<Signal, ShellError> {
    let node = child_node(shell, parent, "try").await;
    shell.tree.lock().await.start(node);

    let try_node = child_node(shell, node, "try").await;
    let try_result = execute_block(shell, try_block, try_node).await;

    let mut outcome = match try_result {
        Ok(signal) => {
            shell.tree.lock().await.complete(try_node, true);
            Ok(signal)
        }
        Err(e) => {
            shell.tree.lock().await.set_error(try_node, e.error_type(), e.to_string(), None);

            let mut error_fields = IndexMap::new();
            error_fields.insert("type".to_string(), Value::String(e.error_type().to_string()));
            error_fields.insert("message".to_string(), Value::String(e.to_string()));
            error_fields.insert("traceback".to_string(), Value::Null);
            shell.vars.set_value("error", Value::Dict(error_fields));

            let catch_node = child_node(shell, node, "catch").await;
            let catch_result = execute_block(shell, catch_block, catch_node).await;
            match &catch_result {
                Ok(_) => shell.tree.lock().await.complete(catch_node, true),
                Err(ce) => shell.tree.lock().await.set_error(catch_node, ce.error_type(), ce.to_string(), None),
            }
            catch_result
        }
    };

    if let Some(finally) = finally_block {
        let finally_node = child_node(shell, node, "finally").await;
        let finally_result = execute_block(shell, finally, finally_node).await;
        match &finally_result {
            Ok(_) => shell.tree.lock().await.complete(finally_node, true),
            Err(e) => shell.tree.lock().await.set_error(finally_node, e.error_type(), e.to_string(), None),
        }
        // A `finally` exception supersedes whatever try/catch produced.
        if finally_result.is_err() {
            outcome = finally_result;
        }
    }

    match &outcome {
        Ok(_) => shell.tree.lock().await.complete(node, true),
        Err(e) => shell.tree.lock().await.set_error(node, e.error_type(), e.to_string(), None),
    }
    outcome
}

async fn execute_if(
    shell: &mut Shell,
    branches: &[IfBranch],
    else_block: Option<&CodeBlock>,
    parent: NodeId,
) -> Result<Signal, ShellError> {
    let node = child_node(shell, parent, "if").await;
    shell.tree.lock().await.start(node);

    for branch in branches {
        if shell.vars.evaluate_expression(&branch.condition)?.is_truthy() {
            let result = execute_block(shell, &branch.body, node).await;
            finish_node(shell, node, &result).await;
            return result;
        }
    }
    if let Some(else_block) = else_block {
        let result = execute_block(shell, else_block, node).await;
        finish_node(shell, node, &result).await;
        return result;
    }
    shell.tree.lock().await.complete(node, true);
    Ok(Signal::Normal)
}

async fn execute_while(shell: &mut Shell, condition: &str, body: &CodeBlock, parent: NodeId) -> Result<Signal, ShellError> {
    let node = child_node(shell, parent, format!("while {}", condition)).await;
    shell.tree.lock().await.start(node);

    while shell.vars.evaluate_expression(condition)?.is_truthy() {
        match execute_block(shell, body, node).await? {
            Signal::Break => break,
            Signal::Continue | Signal::Normal => {}
            other @ (Signal::Return(_) | Signal::Exit(_)) => {
                shell.tree.lock().await.complete(node, true);
                return Ok(other);
            }
        }
    }
    shell.tree.lock().await.complete(node, true);
    Ok(Signal::Normal)
}

/// Pipe/redirection semantics across processes are a Non-goal; each stage
/// executes independently so the AST round-trips (spec P5) without wiring
/// stdout to stdin.
async fn execute_pipeline_statement(shell: &mut Shell, stages: &[String], parent: NodeId) -> Result<Signal, ShellError> {
    let node = child_node(shell, parent, stages.join(" | ")).await;
    shell.tree.lock().await.start(node);
    for stage in stages {
        let stmt = parse_line(stage)?;
        let signal = execute_statement(shell, &stmt, node).await?;
        if signal.is_unwinding() {
            shell.tree.lock().await.complete(node, true);
            return Ok(signal);
        }
    }
    shell.tree.lock().await.complete(node, true);
    Ok(Signal::Normal)
}
