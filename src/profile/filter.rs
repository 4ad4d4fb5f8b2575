//! Post-hoc filtering of a profile forest.
//!
//! Include terms keep only subtrees containing matching text; exclude
//! terms remove matching subtrees. Terms apply sequentially, each
//! narrowing further. Filtering is lossy by design: the tree records its
//! pre-filter total sample count so reports can show how much was
//! dropped.
//!
//! All passes run on explicit work stacks - tree depth is unbounded.

use super::node::{FilterScratch, ProfileNode, ThreadState};
use super::tree::ProfileTree;
use crate::intern::NameTable;
use log::debug;

impl ProfileTree {
    /// Apply include terms, then exclude terms, each narrowing further.
    ///
    /// A node matches a term if its rendered frame text or its thread
    /// state name contains the term, case-insensitively. For an include
    /// term, a self-matching node keeps its whole subtree; a node kept
    /// only for its descendants has its sample count rewritten to the sum
    /// of kept children. For an exclude term, matching subtrees are
    /// removed, ancestor counts are reduced accordingly, and nodes whose
    /// count reaches zero disappear.
    pub fn filter(&mut self, include_texts: &[String], exclude_texts: &[String]) {
        if include_texts.is_empty() && exclude_texts.is_empty() {
            return;
        }
        if self.pre_filter_total.is_none() {
            self.pre_filter_total = Some(self.total_sample_count());
        }
        // Scratch must never leak in from an earlier, independent pass
        self.reset_filter_scratch();

        for term in include_texts {
            let needle = term.to_lowercase();
            let roots = std::mem::take(&mut self.roots);
            self.roots = roots
                .into_iter()
                .filter_map(|root| include_pass(root, &needle, &self.names))
                .collect();
            debug!(
                "include filter '{}' kept {} root(s)",
                term,
                self.roots.len()
            );
        }

        for term in exclude_texts {
            let needle = term.to_lowercase();
            let roots = std::mem::take(&mut self.roots);
            self.roots = roots
                .into_iter()
                .filter_map(|root| exclude_pass(root, &needle, &self.names))
                .collect();
            debug!(
                "exclude filter '{}' kept {} root(s)",
                term,
                self.roots.len()
            );
        }
    }

    fn reset_filter_scratch(&mut self) {
        let mut stack: Vec<&mut ProfileNode> = self.roots.iter_mut().collect();
        while let Some(node) = stack.pop() {
            node.scratch = FilterScratch::default();
            stack.extend(node.children.iter_mut());
        }
    }
}

/// Does this node's own text match the term?
///
/// The lowercased rendered text is cached in the node's scratch so later
/// terms within the same filter call do not re-render it.
fn node_matches(node: &mut ProfileNode, needle: &str, names: &NameTable) -> bool {
    if node.scratch.text.is_none() {
        node.scratch.text = Some(node.render_text(names).to_lowercase());
    }
    let text_matched = node
        .scratch
        .text
        .as_deref()
        .is_some_and(|text| text.contains(needle));
    let state_matched = node.leaf_thread_state != ThreadState::None
        && node
            .leaf_thread_state
            .wire_name()
            .to_lowercase()
            .contains(needle);
    node.scratch.matched = text_matched || state_matched;
    node.scratch.matched
}

/// One in-progress node on the rebuild stack: its children have been
/// drained into `pending` and survivors collect in `kept`.
struct RebuildFrame {
    node: ProfileNode,
    pending: std::vec::IntoIter<ProfileNode>,
    kept: Vec<ProfileNode>,
    original_children_total: u64,
}

impl RebuildFrame {
    fn new(mut node: ProfileNode) -> Self {
        let children = std::mem::take(&mut node.children);
        let original_children_total = children.iter().map(|c| c.sample_count).sum();
        Self {
            node,
            pending: children.into_iter(),
            kept: Vec::new(),
            original_children_total,
        }
    }
}

enum Step {
    Child(ProfileNode),
    FrameDone,
    StackEmpty,
}

fn next_step(stack: &mut [RebuildFrame]) -> Step {
    match stack.last_mut() {
        None => Step::StackEmpty,
        Some(top) => match top.pending.next() {
            Some(child) => Step::Child(child),
            None => Step::FrameDone,
        },
    }
}

/// Keep only subtrees containing a node whose text matches.
fn include_pass(mut root: ProfileNode, needle: &str, names: &NameTable) -> Option<ProfileNode> {
    if node_matches(&mut root, needle, names) {
        return Some(root);
    }
    if root.children.is_empty() {
        return None;
    }

    let mut stack = vec![RebuildFrame::new(root)];
    loop {
        match next_step(&mut stack) {
            Step::Child(mut child) => {
                if node_matches(&mut child, needle, names) {
                    // Self-matching keeps the whole subtree intact
                    if let Some(top) = stack.last_mut() {
                        top.kept.push(child);
                    }
                } else if !child.children.is_empty() {
                    stack.push(RebuildFrame::new(child));
                }
                // A non-matching leaf is simply dropped
            }
            Step::FrameDone => {
                let Some(frame) = stack.pop() else { break };
                let mut node = frame.node;
                // Kept only for its descendants: the count is rewritten
                // to the sum of kept children only
                node.sample_count = frame.kept.iter().map(|c| c.sample_count).sum();
                node.children = frame.kept;
                let survivor = if node.children.is_empty() {
                    None
                } else {
                    Some(node)
                };
                match stack.last_mut() {
                    Some(parent) => {
                        if let Some(node) = survivor {
                            parent.kept.push(node);
                        }
                    }
                    None => return survivor,
                }
            }
            Step::StackEmpty => break,
        }
    }
    None
}

/// Remove subtrees containing a node whose text matches, reducing
/// ancestor counts by what was removed.
fn exclude_pass(mut root: ProfileNode, needle: &str, names: &NameTable) -> Option<ProfileNode> {
    if node_matches(&mut root, needle, names) {
        return None;
    }
    if root.children.is_empty() {
        return Some(root);
    }

    let mut stack = vec![RebuildFrame::new(root)];
    loop {
        match next_step(&mut stack) {
            Step::Child(mut child) => {
                if node_matches(&mut child, needle, names) {
                    // Matched subtree removed entirely
                } else if child.children.is_empty() {
                    if let Some(top) = stack.last_mut() {
                        top.kept.push(child);
                    }
                } else {
                    stack.push(RebuildFrame::new(child));
                }
            }
            Step::FrameDone => {
                let Some(frame) = stack.pop() else { break };
                let mut node = frame.node;
                let self_weight = node
                    .sample_count
                    .saturating_sub(frame.original_children_total);
                let kept_total: u64 = frame.kept.iter().map(|c| c.sample_count).sum();
                node.sample_count = self_weight + kept_total;
                node.children = frame.kept;
                let survivor = if node.sample_count == 0 {
                    None
                } else {
                    Some(node)
                };
                match stack.last_mut() {
                    Some(parent) => {
                        if let Some(node) = survivor {
                            parent.kept.push(node);
                        }
                    }
                    None => return survivor,
                }
            }
            Step::StackEmpty => break,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::node::StackFrame;
    use super::*;

    fn frame(class: &str, method: &str, line: i32) -> StackFrame {
        StackFrame {
            package_name: "com.example".to_string(),
            class_name: class.to_string(),
            method_name: method.to_string(),
            file_name: format!("{class}.java"),
            line_number: line,
            timer_names: Vec::new(),
        }
    }

    fn sample_tree() -> ProfileTree {
        let mut tree = ProfileTree::new();
        // Main.run -> FooService.handle -> Db.query
        tree.merge_stack_sample(
            &[
                frame("Main", "run", 10),
                frame("FooService", "handle", 20),
                frame("Db", "query", 30),
            ],
            ThreadState::Waiting,
        );
        // Main.run -> BarService.handle
        tree.merge_stack_sample(
            &[frame("Main", "run", 10), frame("BarService", "handle", 21)],
            ThreadState::Runnable,
        );
        tree
    }

    #[test]
    fn test_include_keeps_matching_subtree_and_rewrites_counts() {
        let mut tree = sample_tree();
        tree.filter(&["fooservice".to_string()], &[]);

        assert_eq!(tree.roots().len(), 1);
        let root = &tree.roots()[0];
        // Root kept only for its descendant: count rewritten to kept sum
        assert_eq!(root.sample_count(), 1);
        assert_eq!(root.children().len(), 1);
        // The matching node keeps its whole subtree, Db.query included
        let foo = &root.children()[0];
        assert_eq!(foo.children().len(), 1);
        assert_eq!(tree.pre_filter_sample_count(), Some(2));
    }

    #[test]
    fn test_include_is_case_insensitive() {
        let mut tree = sample_tree();
        tree.filter(&["FOOSERVICE".to_string()], &[]);
        assert_eq!(tree.roots().len(), 1);
    }

    #[test]
    fn test_include_matches_thread_state_name() {
        let mut tree = sample_tree();
        tree.filter(&["waiting".to_string()], &[]);

        // Only the path ending in the WAITING leaf survives
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.roots()[0].sample_count(), 1);
    }

    #[test]
    fn test_exclude_removes_subtree_and_reduces_counts() {
        let mut tree = sample_tree();
        tree.filter(&[], &["fooservice".to_string()]);

        assert_eq!(tree.roots().len(), 1);
        let root = &tree.roots()[0];
        assert_eq!(root.sample_count(), 1);
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_include_then_exclude_same_term_empties_forest() {
        let mut tree = sample_tree();
        tree.filter(
            &["fooservice".to_string()],
            &["fooservice".to_string()],
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn test_terms_narrow_sequentially() {
        let mut tree = sample_tree();
        // First term keeps both service branches, second narrows to one
        tree.filter(&["handle".to_string(), "barservice".to_string()], &[]);

        assert_eq!(tree.roots().len(), 1);
        let root = &tree.roots()[0];
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.sample_count(), 1);
    }

    #[test]
    fn test_no_terms_is_a_no_op() {
        let mut tree = sample_tree();
        tree.filter(&[], &[]);
        assert_eq!(tree.total_sample_count(), 2);
        assert_eq!(tree.pre_filter_sample_count(), None);
    }

    #[test]
    fn test_independent_filter_calls_do_not_leak_scratch() {
        let mut tree = sample_tree();
        tree.filter(&["handle".to_string()], &[]);
        let total_after_first = tree.total_sample_count();

        // A second, independent pass with a term matching everything
        // must start from clean scratch and keep the remaining forest
        tree.filter(&["main".to_string()], &[]);
        assert_eq!(tree.total_sample_count(), total_after_first);
        // Pre-filter total still reports the original capture
        assert_eq!(tree.pre_filter_sample_count(), Some(2));
    }
}
