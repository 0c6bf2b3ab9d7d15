//! `ParallelBlock` execution: the one place besides discovery dispatch
//! (C10) where the engine runs real concurrent work. Bounded by a
//! `tokio::sync::Semaphore` sized to `max_concurrent`, dispatched through a
//! `JoinSet` so a panicking branch doesn't take down the others.
//!
//! Per spec §7, a per-task exception does not abort sibling tasks: it is
//! recorded on that task's own Update-Info node and the block as a whole
//! still reports success, with partial failure visible only by walking the
//! children's statuses.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::ShellError;
use crate::exec::{execute_block, execute_statement, Signal};
use crate::script::ast::CodeBlock;
use crate::shell::Shell;
use crate::updatetree::NodeId;

/// Dispatch order follows source order; completion order is not
/// guaranteed (spec §4.7). Each branch runs against its own forked
/// `Shell` — a snapshot of the Variable Manager taken at dispatch time
/// (spec §5) — but shares the Config Store, Update Tree, and Command
/// Registry with the caller.
pub async fn execute_parallel(
    shell: &mut Shell,
    body: &CodeBlock,
    collection: Option<&str>,
    item: Option<&str>,
    max_concurrent: usize,
    parent: NodeId,
) -> Result<Signal, ShellError> {
    let bound = max_concurrent.max(1);
    let semaphore = Arc::new(Semaphore::new(bound));
    let mut set: JoinSet<Signal> = JoinSet::new();

    if let Some(collection_expr) = collection {
        let value = shell.vars.evaluate_expression(collection_expr)?;
        let items = value.as_list().map(|s| s.to_vec()).unwrap_or_else(|| vec![value]);
        let item_name = item.map(|s| s.to_string()).unwrap_or_else(|| "item".to_string());

        for element in items {
            let mut worker = shell.fork();
            worker.vars.set_value(&item_name, element.clone());
            let body = body.clone();
            let sem = semaphore.clone();
            let item_label = element.to_string();
            set.spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore never closed");
                let child = {
                    let mut tree = worker.tree.lock().await;
                    tree.create_child_node(parent, format!("parallel item {}", item_label))
                };
                worker.tree.lock().await.start(child);
                run_branch(&mut worker, &body, child).await
            });
        }
    } else {
        for stmt in &body.statements {
            let mut worker = shell.fork();
            let stmt = stmt.clone();
            let sem = semaphore.clone();
            set.spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore never closed");
                let child = {
                    let mut tree = worker.tree.lock().await;
                    tree.create_child_node(parent, "parallel statement")
                };
                worker.tree.lock().await.start(child);
                match execute_statement(&mut worker, &stmt, child).await {
                    Ok(s) => {
                        worker.tree.lock().await.complete(child, true);
                        s
                    }
                    Err(e) => {
                        worker.tree.lock().await.set_error(child, e.error_type(), e.to_string(), None);
                        Signal::Normal
                    }
                }
            });
        }
    }

    let mut signal = Signal::Normal;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(s) => {
                if matches!(s, Signal::Exit(_)) {
                    signal = s;
                }
            }
            Err(join_err) => return Err(ShellError::other(format!("parallel task panicked: {}", join_err))),
        }
    }
    Ok(signal)
}

/// Runs `body` under `child`, absorbing any error onto that node instead
/// of propagating it to the caller.
async fn run_branch(shell: &mut Shell, body: &CodeBlock, child: NodeId) -> Signal {
    match execute_block(shell, body, child).await {
        Ok(s) => {
            shell.tree.lock().await.complete(child, true);
            s
        }
        Err(e) => {
            shell.tree.lock().await.set_error(child, e.error_type(), e.to_string(), None);
            Signal::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ast::Statement;
    use crate::shell::Shell;

    #[tokio::test]
    async fn parallel_over_a_collection_runs_every_item() {
        let mut shell = Shell::new_in_memory();
        let root = { shell.tree.lock().await.create_root("parallel") };
        let body = CodeBlock::new(vec![Statement::SetVariable { name: "seen".into(), expr: "$i".into() }]);
        let result = execute_parallel(&mut shell, &body, Some("range(0, 5)"), Some("i"), 2, root).await.unwrap();
        assert!(matches!(result, Signal::Normal));
        let tree = shell.tree.lock().await;
        assert_eq!(tree.node(root).children.len(), 5);
    }

    #[tokio::test]
    async fn a_failing_branch_does_not_abort_its_siblings() {
        let mut shell = Shell::new_in_memory();
        let root = { shell.tree.lock().await.create_root("parallel") };
        let body = CodeBlock::new(vec![Statement::SetVariable { name: "x".into(), expr: "1 / 0".into() }]);
        let result = execute_parallel(&mut shell, &body, Some("range(0, 3)"), Some("i"), 2, root).await.unwrap();
        assert!(matches!(result, Signal::Normal));
        let tree = shell.tree.lock().await;
        assert_eq!(tree.node(root).children.len(), 3);
    }
}
