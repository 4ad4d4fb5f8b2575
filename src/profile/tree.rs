//! The profile forest and its merge operations.
//!
//! Two merge entry points fold into the same forest, with intentionally
//! different matching policies:
//!
//! - raw stack samples merge with greedy prefix matching: the instant a
//!   frame fails to match an existing child, matching stops for the rest
//!   of that sample. Call stacks of one transaction type share long
//!   common prefixes, so this avoids a full tree search per sample.
//! - pre-merged subtrees (wire form) merge with full tuple matching among
//!   all siblings at every position.
//!
//! The two policies must not be unified; they produce differently shaped
//! (though value-equivalent) trees.

use super::export::ProfileWire;
use super::node::{FrameKey, ProfileNode, StackFrame, ThreadState};
use crate::intern::NameTable;
use crate::utils::error::WireError;
use log::debug;

/// A forest of profile nodes plus the name table their frames intern into.
///
/// **Public** - one instance per aggregation bucket, single-owner mutable
/// state. The interner is scoped to the tree, never process-wide.
#[derive(Debug, Clone, Default)]
pub struct ProfileTree {
    pub(crate) names: NameTable,
    pub(crate) roots: Vec<ProfileNode>,

    /// Total sample count captured before the first filter pass,
    /// for reporting how much filtering dropped
    pub(crate) pre_filter_total: Option<u64>,
}

impl ProfileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one raw stack-trace sample into the forest.
    ///
    /// **Public** - main entry point for the live sampler
    ///
    /// # Arguments
    /// * `frames` - call stack ordered from the outermost call inward
    /// * `leaf_thread_state` - the sampled thread's state at the moment
    ///   the innermost frame was captured
    ///
    /// Every node along the path gains one sample.
    pub fn merge_stack_sample(&mut self, frames: &[StackFrame], leaf_thread_state: ThreadState) {
        if frames.is_empty() {
            debug!("ignoring empty stack sample");
            return;
        }

        let last = frames.len() - 1;
        let mut children = &mut self.roots;
        let mut still_matching = true;

        for (i, frame) in frames.iter().enumerate() {
            let key = FrameKey {
                line_number: frame.line_number,
                package_id: self.names.intern(&frame.package_name),
                class_id: self.names.intern(&frame.class_name),
                method_id: self.names.intern(&frame.method_name),
                file_id: self.names.intern(&frame.file_name),
            };
            let state = if i == last {
                leaf_thread_state
            } else {
                ThreadState::None
            };

            // Prefix-only matching: stop searching for the rest of the
            // sample after the first mismatch
            let found = if still_matching {
                children.iter().position(|c| c.is_same_node(&key, state))
            } else {
                None
            };
            let idx = match found {
                Some(idx) => idx,
                None => {
                    still_matching = false;
                    children.push(ProfileNode::new(key, state));
                    children.len() - 1
                }
            };

            let node = &mut children[idx];
            node.sample_count += 1;
            node.merge_timer_names(&frame.timer_names);
            children = &mut node.children;
        }
    }

    /// Merge an externally-encoded, already-aggregated tree.
    ///
    /// The wire form is depth-encoded and flattened depth-first. At each
    /// position the incoming node is matched by full tuple equality among
    /// all existing siblings; sample and ellipsed counts sum, and the
    /// longer timer-name set wins. Runs on an explicit work list - depth
    /// is caller-controlled and can be unbounded.
    pub fn merge_wire(&mut self, wire: &ProfileWire) -> Result<(), WireError> {
        let remap = self.names.remap_from(&wire.names);
        let map_id = |id: u32| -> Result<u32, WireError> {
            remap
                .get(id as usize)
                .copied()
                .ok_or(WireError::NameIndexOutOfRange(id))
        };

        debug!("merging wire tree with {} nodes", wire.nodes.len());

        // path[d] = sibling index of the matched/created node at depth d
        let mut path: Vec<usize> = Vec::new();
        for wire_node in &wire.nodes {
            let depth = wire_node.depth as usize;
            if depth > path.len() {
                return Err(WireError::InvalidFormat(format!(
                    "node depth {} skips a level (parent depth {})",
                    depth,
                    path.len(),
                )));
            }
            path.truncate(depth);

            let key = FrameKey {
                line_number: wire_node.line_number,
                package_id: map_id(wire_node.package_id)?,
                class_id: map_id(wire_node.class_id)?,
                method_id: map_id(wire_node.method_id)?,
                file_id: map_id(wire_node.file_id)?,
            };
            let state = ThreadState::from_wire_name(&wire_node.leaf_thread_state);

            let siblings = {
                let mut container = &mut self.roots;
                for &idx in &path {
                    container = &mut container[idx].children;
                }
                container
            };

            // Full-sibling matching, unlike the raw-sample path
            let idx = match siblings.iter().position(|c| c.is_same_node(&key, state)) {
                Some(idx) => idx,
                None => {
                    siblings.push(ProfileNode::new(key, state));
                    siblings.len() - 1
                }
            };

            let node = &mut siblings[idx];
            node.sample_count += wire_node.sample_count;
            node.ellipsed_sample_count += wire_node.ellipsed_sample_count;
            node.merge_timer_names(&wire_node.timer_names);

            path.push(idx);
        }
        Ok(())
    }

    /// Remove every child whose sample count is below `min_samples`,
    /// redirecting the removed count into the parent's ellipsed sample
    /// count rather than discarding it.
    ///
    /// Roots have no parent to hold an ellipsed count and are never
    /// removed.
    pub fn truncate(&mut self, min_samples: u64) {
        let mut stack: Vec<&mut ProfileNode> = self.roots.iter_mut().collect();
        while let Some(node) = stack.pop() {
            let mut removed = 0u64;
            node.children.retain(|child| {
                if child.sample_count < min_samples {
                    removed += child.sample_count;
                    false
                } else {
                    true
                }
            });
            node.ellipsed_sample_count += removed;
            stack.extend(node.children.iter_mut());
        }
    }

    /// Sum of root sample counts.
    pub fn total_sample_count(&self) -> u64 {
        self.roots.iter().map(|r| r.sample_count).sum()
    }

    /// Total sample count as it was before the first filter pass, if any
    /// filtering has happened.
    pub fn pre_filter_sample_count(&self) -> Option<u64> {
        self.pre_filter_total
    }

    pub fn roots(&self) -> &[ProfileNode] {
        &self.roots
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
