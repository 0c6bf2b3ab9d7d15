//! Update-Info Tree (spec C8): a hierarchical execution log capturing
//! status, timings, outputs, and errors for every (sub)command.
//!
//! The parent link is purely informational (spec §9 "Cyclic graphs") and
//! is modeled as an index into an arena rather than a strong/weak pointer
//! pair, so the tree has no reference-counting cycles to reason about.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::value::Value;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed | Status::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub error_type: String,
    pub message: String,
    pub traceback: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateInfoNode {
    pub id: NodeId,
    parent: Option<NodeId>,
    pub command: String,
    pub status: Status,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub logs: Vec<LogEntry>,
    pub outputs: IndexMap<String, String>,
    pub error: Option<ErrorInfo>,
    pub children: Vec<NodeId>,
}

impl UpdateInfoNode {
    fn new(id: NodeId, parent: Option<NodeId>, command: impl Into<String>) -> Self {
        Self {
            id,
            parent,
            command: command.into(),
            status: Status::Pending,
            start_time: Utc::now(),
            end_time: None,
            logs: Vec::new(),
            outputs: IndexMap::new(),
            error: None,
            children: Vec::new(),
        }
    }

    pub fn execution_time(&self) -> chrono::Duration {
        let end = self.end_time.unwrap_or_else(Utc::now);
        end - self.start_time
    }
}

/// Owning arena for the tree. Nodes never move once created, so `NodeId`s
/// stay valid for the arena's whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct UpdateTree {
    nodes: Vec<UpdateInfoNode>,
}

impl UpdateTree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn create_root(&mut self, command: impl Into<String>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(UpdateInfoNode::new(id, None, command));
        id
    }

    pub fn create_child_node(&mut self, parent: NodeId, command: impl Into<String>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(UpdateInfoNode::new(id, Some(parent), command));
        self.nodes[parent].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &UpdateInfoNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut UpdateInfoNode {
        &mut self.nodes[id]
    }

    /// Every node created via `create_root`, in creation order.
    pub fn roots(&self) -> Vec<&UpdateInfoNode> {
        self.nodes.iter().filter(|n| n.parent.is_none()).collect()
    }

    pub fn start(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.status = Status::Running;
        node.start_time = Utc::now();
    }

    pub fn complete(&mut self, id: NodeId, success: bool) {
        let node = self.node_mut(id);
        node.status = if success { Status::Completed } else { Status::Failed };
        node.end_time = Some(Utc::now());
    }

    pub fn cancel(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.status = Status::Cancelled;
        node.end_time = Some(Utc::now());
    }

    pub fn add_log(&mut self, id: NodeId, level: LogLevel, message: impl Into<String>) {
        self.node_mut(id).logs.push(LogEntry { level, message: message.into(), timestamp: Utc::now() });
    }

    pub fn add_output(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        self.node_mut(id).outputs.insert(key.into(), value.into());
    }

    pub fn set_error(&mut self, id: NodeId, error_type: impl Into<String>, message: impl Into<String>, traceback: Option<String>) {
        let node = self.node_mut(id);
        node.error = Some(ErrorInfo { error_type: error_type.into(), message: message.into(), traceback });
        node.status = Status::Failed;
        node.end_time = Some(Utc::now());
    }

    /// Depth-first search scoped to the subtree rooted at `root` —
    /// upward searches never happen.
    pub fn find_node_by_id(&self, root: NodeId, target: NodeId) -> Option<NodeId> {
        if root == target {
            return Some(root);
        }
        for &child in &self.nodes[root].children {
            if let Some(found) = self.find_node_by_id(child, target) {
                return Some(found);
            }
        }
        None
    }

    /// Serializes the subtree rooted at `id` to a `Value::Dict` (spec
    /// §4.8). Walks only `children`; the parent link is never read, so a
    /// node's own ancestry can never leak into its own serialization.
    /// When `include_children` is `false`, nested children are omitted
    /// entirely rather than recursed into.
    pub fn to_dict(&self, id: NodeId, include_children: bool) -> Value {
        let node = &self.nodes[id];

        let mut dict = IndexMap::new();
        dict.insert("id".to_string(), Value::Int(node.id as i64));
        dict.insert("command".to_string(), Value::String(node.command.clone()));
        dict.insert("status".to_string(), Value::String(format!("{:?}", node.status)));
        dict.insert("start_time".to_string(), Value::String(node.start_time.to_rfc3339()));
        dict.insert("end_time".to_string(), node.end_time.map(|t| Value::String(t.to_rfc3339())).unwrap_or(Value::Null));

        let logs = node
            .logs
            .iter()
            .map(|log| {
                let mut entry = IndexMap::new();
                entry.insert("level".to_string(), Value::String(format!("{:?}", log.level)));
                entry.insert("message".to_string(), Value::String(log.message.clone()));
                entry.insert("timestamp".to_string(), Value::String(log.timestamp.to_rfc3339()));
                Value::Dict(entry)
            })
            .collect();
        dict.insert("logs".to_string(), Value::List(logs));

        let outputs = node.outputs.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
        dict.insert("outputs".to_string(), Value::Dict(outputs));

        let error = node.error.as_ref().map(|e| {
            let mut fields = IndexMap::new();
            fields.insert("error_type".to_string(), Value::String(e.error_type.clone()));
            fields.insert("message".to_string(), Value::String(e.message.clone()));
            fields.insert("traceback".to_string(), e.traceback.clone().map(Value::String).unwrap_or(Value::Null));
            Value::Dict(fields)
        });
        dict.insert("error".to_string(), error.unwrap_or(Value::Null));

        let children = if include_children {
            node.children.iter().map(|&child| self.to_dict(child, true)).collect()
        } else {
            Vec::new()
        };
        dict.insert("children".to_string(), Value::List(children));

        Value::Dict(dict)
    }

    /// Pre-order walk of `root`'s subtree yielding `(node_id, entry)` pairs
    /// in insertion order.
    pub fn get_all_logs(&self, root: NodeId) -> Vec<(NodeId, LogEntry)> {
        let mut out = Vec::new();
        self.collect_logs(root, &mut out);
        out
    }

    fn collect_logs(&self, id: NodeId, out: &mut Vec<(NodeId, LogEntry)>) {
        let node = &self.nodes[id];
        for entry in &node.logs {
            out.push((id, entry.clone()));
        }
        for &child in &node.children {
            self.collect_logs(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_time_set_iff_terminal_status() {
        let mut tree = UpdateTree::new();
        let root = tree.create_root("echo hi");
        assert!(tree.node(root).end_time.is_none());
        tree.complete(root, true);
        assert!(tree.node(root).end_time.is_some());
    }

    #[test]
    fn find_node_by_id_is_subtree_scoped() {
        let mut tree = UpdateTree::new();
        let root = tree.create_root("foreach");
        let child = tree.create_child_node(root, "echo a");
        assert_eq!(tree.find_node_by_id(root, child), Some(child));
        assert_eq!(tree.find_node_by_id(child, root), None);
    }

    #[test]
    fn get_all_logs_is_pre_order() {
        let mut tree = UpdateTree::new();
        let root = tree.create_root("foreach");
        tree.add_log(root, LogLevel::Info, "root log");
        let child = tree.create_child_node(root, "echo a");
        tree.add_log(child, LogLevel::Info, "child log");
        let logs = tree.get_all_logs(root);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].1.message, "root log");
        assert_eq!(logs[1].1.message, "child log");
    }

    #[test]
    fn set_error_flips_status_to_failed() {
        let mut tree = UpdateTree::new();
        let root = tree.create_root("connect");
        tree.set_error(root, "ServerConnectionError", "timeout", None);
        assert_eq!(tree.node(root).status, Status::Failed);
    }

    #[test]
    fn to_dict_without_children_omits_nested_subtree() {
        let mut tree = UpdateTree::new();
        let root = tree.create_root("foreach");
        tree.create_child_node(root, "echo a");

        let dict = tree.to_dict(root, false);
        match dict {
            Value::Dict(fields) => {
                assert_eq!(fields.get("command"), Some(&Value::String("foreach".to_string())));
                assert_eq!(fields.get("children"), Some(&Value::List(vec![])));
            }
            other => panic!("expected Dict, got {:?}", other),
        }
    }

    #[test]
    fn to_dict_with_children_recurses_into_subtree() {
        let mut tree = UpdateTree::new();
        let root = tree.create_root("foreach");
        tree.create_child_node(root, "echo a");

        let dict = tree.to_dict(root, true);
        match dict {
            Value::Dict(fields) => match fields.get("children") {
                Some(Value::List(children)) => {
                    assert_eq!(children.len(), 1);
                    match &children[0] {
                        Value::Dict(child_fields) => {
                            assert_eq!(child_fields.get("command"), Some(&Value::String("echo a".to_string())));
                        }
                        other => panic!("expected child Dict, got {:?}", other),
                    }
                }
                other => panic!("expected children List, got {:?}", other),
            },
            other => panic!("expected Dict, got {:?}", other),
        }
    }
}
