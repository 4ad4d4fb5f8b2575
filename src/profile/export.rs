//! Profile exports: wire form, UI JSON tree, and flame-graph JSON.
//!
//! Tree depth is caller-controlled and can be pathologically deep, so no
//! export uses native recursion - every traversal runs on an explicit
//! stack.

use super::node::{ProfileNode, ThreadState};
use super::tree::ProfileTree;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Depth-encoded flattened profile tree: the wire form used to combine
/// partial aggregates from multiple sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileWire {
    /// The interned name table; node ids index into it
    pub names: Vec<String>,

    /// Nodes flattened depth-first, each carrying its depth
    pub nodes: Vec<ProfileNodeWire>,
}

/// One flattened profile node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileNodeWire {
    pub depth: u32,
    pub package_id: u32,
    pub class_id: u32,
    pub method_id: u32,
    pub file_id: u32,
    pub line_number: i32,

    #[serde(default = "default_thread_state")]
    pub leaf_thread_state: String,

    pub sample_count: u64,

    #[serde(default)]
    pub ellipsed_sample_count: u64,

    #[serde(default)]
    pub timer_names: Vec<String>,
}

fn default_thread_state() -> String {
    ThreadState::None.wire_name().to_string()
}

impl ProfileTree {
    /// Encode the forest into the depth-encoded flattened wire form.
    pub fn to_wire(&self) -> ProfileWire {
        let mut nodes = Vec::new();
        let mut stack: Vec<(&ProfileNode, u32)> =
            self.roots.iter().rev().map(|root| (root, 0)).collect();

        while let Some((node, depth)) = stack.pop() {
            nodes.push(ProfileNodeWire {
                depth,
                package_id: node.frame.package_id,
                class_id: node.frame.class_id,
                method_id: node.frame.method_id,
                file_id: node.frame.file_id,
                line_number: node.frame.line_number,
                leaf_thread_state: node.leaf_thread_state.wire_name().to_string(),
                sample_count: node.sample_count,
                ellipsed_sample_count: node.ellipsed_sample_count,
                timer_names: node.timer_names.clone(),
            });
            for child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        ProfileWire {
            names: self.names.names().to_vec(),
            nodes,
        }
    }

    /// Nested JSON tree for UI consumption.
    pub fn to_json_tree(&self) -> Value {
        let roots = map_post_order(&self.roots, |node, children| {
            let mut map = serde_json::Map::new();
            map.insert(
                "stack_trace_element".to_string(),
                json!(node.render_text(&self.names)),
            );
            map.insert("sample_count".to_string(), json!(node.sample_count));
            if node.leaf_thread_state != ThreadState::None {
                map.insert(
                    "leaf_thread_state".to_string(),
                    json!(node.leaf_thread_state.wire_name()),
                );
            }
            if !node.timer_names.is_empty() {
                map.insert("timer_names".to_string(), json!(node.timer_names));
            }
            if node.ellipsed_sample_count > 0 {
                map.insert(
                    "ellipsed_sample_count".to_string(),
                    json!(node.ellipsed_sample_count),
                );
            }
            if !children.is_empty() {
                map.insert("children".to_string(), Value::Array(children));
            }
            Value::Object(map)
        });

        let mut tree = serde_json::Map::new();
        tree.insert(
            "total_sample_count".to_string(),
            json!(self.total_sample_count()),
        );
        if let Some(pre_filter) = self.pre_filter_total {
            tree.insert("pre_filter_sample_count".to_string(), json!(pre_filter));
        }
        tree.insert("roots".to_string(), Value::Array(roots));
        Value::Object(tree)
    }

    /// Flame-graph-oriented JSON: each node carries its total sample
    /// count (`value`) and the samples not attributable to children or
    /// ellipsis (`self`), nested under a single synthetic root.
    pub fn to_flame_graph(&self) -> Value {
        let roots = map_post_order(&self.roots, |node, children| {
            let children_total: u64 = node.children.iter().map(|c| c.sample_count).sum();
            let self_count = node
                .sample_count
                .saturating_sub(children_total)
                .saturating_sub(node.ellipsed_sample_count);
            json!({
                "name": node.render_text(&self.names),
                "value": node.sample_count,
                "self": self_count,
                "children": children,
            })
        });

        json!({
            "name": "root",
            "value": self.total_sample_count(),
            "self": 0,
            "children": roots,
        })
    }
}

/// One in-progress node during the iterative post-order walk.
struct WalkFrame<'a, T> {
    node: &'a ProfileNode,
    pending: std::slice::Iter<'a, ProfileNode>,
    built: Vec<T>,
}

/// Post-order map over a forest: `build` sees each node together with its
/// already-built children, bottom-up, without native recursion.
fn map_post_order<T, F>(roots: &[ProfileNode], build: F) -> Vec<T>
where
    F: Fn(&ProfileNode, Vec<T>) -> T,
{
    let mut out = Vec::with_capacity(roots.len());
    for root in roots {
        let mut stack = vec![WalkFrame {
            node: root,
            pending: root.children.iter(),
            built: Vec::new(),
        }];
        loop {
            let next_child = match stack.last_mut() {
                None => break,
                Some(top) => top.pending.next(),
            };
            match next_child {
                Some(child) => stack.push(WalkFrame {
                    node: child,
                    pending: child.children.iter(),
                    built: Vec::new(),
                }),
                None => {
                    let Some(frame) = stack.pop() else { break };
                    let value = build(frame.node, frame.built);
                    match stack.last_mut() {
                        Some(parent) => parent.built.push(value),
                        None => out.push(value),
                    }
                }
            }
        }
    }
    out
}
