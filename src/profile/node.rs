//! Profile tree node types.
//!
//! A node is identified by its frame tuple plus the leaf thread state.
//! The same frame can appear twice among siblings - once as an interior
//! node and once as a sampled leaf with a thread state - and those are
//! distinct nodes.

use crate::intern::NameTable;
use log::warn;
use serde::{Deserialize, Serialize};

/// Thread state of the sampled thread at the moment its innermost frame
/// was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadState {
    Runnable,
    Blocked,
    Waiting,
    TimedWaiting,
    New,
    Terminated,
    /// Sentinel for interior nodes and unrecognized wire values
    None,
}

impl ThreadState {
    /// Map a wire name to a thread state.
    ///
    /// An unrecognized name is logged and mapped to `None` rather than
    /// failing the whole aggregation - a single malformed sample must not
    /// corrupt an entire rollup period.
    pub fn from_wire_name(name: &str) -> ThreadState {
        match name {
            "RUNNABLE" => ThreadState::Runnable,
            "BLOCKED" => ThreadState::Blocked,
            "WAITING" => ThreadState::Waiting,
            "TIMED_WAITING" => ThreadState::TimedWaiting,
            "NEW" => ThreadState::New,
            "TERMINATED" => ThreadState::Terminated,
            "NONE" => ThreadState::None,
            other => {
                warn!("unrecognized thread state '{}', mapping to NONE", other);
                ThreadState::None
            }
        }
    }

    /// Wire name of this thread state.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ThreadState::Runnable => "RUNNABLE",
            ThreadState::Blocked => "BLOCKED",
            ThreadState::Waiting => "WAITING",
            ThreadState::TimedWaiting => "TIMED_WAITING",
            ThreadState::New => "NEW",
            ThreadState::Terminated => "TERMINATED",
            ThreadState::None => "NONE",
        }
    }
}

/// Interned identity of one stack frame.
///
/// Two nodes are the same node iff this key and the leaf thread state are
/// both equal. Field order matters: derived equality compares fields in
/// declaration order, and the line number is the cheapest likely-differing
/// field, so it goes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameKey {
    pub line_number: i32,
    pub package_id: u32,
    pub class_id: u32,
    pub method_id: u32,
    pub file_id: u32,
}

/// One frame of a raw stack sample, as handed over by the sampler.
/// Frames arrive ordered from the outermost call to the innermost.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub package_name: String,
    pub class_name: String,
    pub method_name: String,
    pub file_name: String,
    pub line_number: i32,

    /// Synthesized timer-name annotations attached to this frame.
    /// Capture timing makes these only partially visible sometimes, so
    /// the longest observed set wins when nodes merge.
    pub timer_names: Vec<String>,
}

/// Filter-only scratch state, reset between independent filter passes.
///
/// Kept apart from the persistent fields so that no filter pass can leak
/// state into the next one.
#[derive(Debug, Clone, Default)]
pub(crate) struct FilterScratch {
    /// Whether this node's own text matched the most recent term
    pub matched: bool,

    /// Rendered frame text, cached across terms within one filter call
    pub text: Option<String>,
}

/// One node of the profile forest.
#[derive(Debug, Clone)]
pub struct ProfileNode {
    pub(crate) frame: FrameKey,
    pub(crate) leaf_thread_state: ThreadState,
    pub(crate) sample_count: u64,

    /// Samples removed beneath this node by truncation, surfaced
    /// separately from real sample counts in all exports
    pub(crate) ellipsed_sample_count: u64,

    pub(crate) timer_names: Vec<String>,

    /// Insertion order; not meaningful for merging but meaningful for
    /// stable output
    pub(crate) children: Vec<ProfileNode>,

    pub(crate) scratch: FilterScratch,
}

impl ProfileNode {
    pub(crate) fn new(frame: FrameKey, leaf_thread_state: ThreadState) -> Self {
        Self {
            frame,
            leaf_thread_state,
            sample_count: 0,
            ellipsed_sample_count: 0,
            timer_names: Vec::new(),
            children: Vec::new(),
            scratch: FilterScratch::default(),
        }
    }

    pub(crate) fn is_same_node(&self, frame: &FrameKey, state: ThreadState) -> bool {
        self.frame == *frame && self.leaf_thread_state == state
    }

    /// The longest observed timer-name set wins.
    pub(crate) fn merge_timer_names(&mut self, incoming: &[String]) {
        if incoming.len() > self.timer_names.len() {
            self.timer_names = incoming.to_vec();
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn ellipsed_sample_count(&self) -> u64 {
        self.ellipsed_sample_count
    }

    pub fn children(&self) -> &[ProfileNode] {
        &self.children
    }

    pub fn leaf_thread_state(&self) -> ThreadState {
        self.leaf_thread_state
    }

    pub fn timer_names(&self) -> &[String] {
        &self.timer_names
    }

    /// Render this node's frame the way the UI shows it:
    /// `package.Class.method(file:line)`.
    pub fn render_text(&self, names: &NameTable) -> String {
        let package = names.get(self.frame.package_id).unwrap_or("");
        let class = names.get(self.frame.class_id).unwrap_or("");
        let method = names.get(self.frame.method_id).unwrap_or("");
        let file = names.get(self.frame.file_id).unwrap_or("");

        let mut text = String::new();
        if !package.is_empty() {
            text.push_str(package);
            text.push('.');
        }
        text.push_str(class);
        text.push('.');
        text.push_str(method);
        if !file.is_empty() {
            if self.frame.line_number > 0 {
                text.push_str(&format!("({}:{})", file, self.frame.line_number));
            } else {
                text.push_str(&format!("({})", file));
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_state_round_trip() {
        for state in [
            ThreadState::Runnable,
            ThreadState::Blocked,
            ThreadState::Waiting,
            ThreadState::TimedWaiting,
            ThreadState::New,
            ThreadState::Terminated,
            ThreadState::None,
        ] {
            assert_eq!(ThreadState::from_wire_name(state.wire_name()), state);
        }
    }

    #[test]
    fn test_unrecognized_thread_state_maps_to_none() {
        assert_eq!(
            ThreadState::from_wire_name("SPINNING_FURIOUSLY"),
            ThreadState::None
        );
    }

    #[test]
    fn test_render_text() {
        let mut names = NameTable::new();
        let frame = FrameKey {
            line_number: 42,
            package_id: names.intern("com.example"),
            class_id: names.intern("Widget"),
            method_id: names.intern("render"),
            file_id: names.intern("Widget.java"),
        };
        let node = ProfileNode::new(frame, ThreadState::None);
        assert_eq!(
            node.render_text(&names),
            "com.example.Widget.render(Widget.java:42)"
        );
    }

    #[test]
    fn test_longer_timer_name_set_wins() {
        let mut names = NameTable::new();
        let frame = FrameKey {
            line_number: 1,
            package_id: names.intern("p"),
            class_id: names.intern("C"),
            method_id: names.intern("m"),
            file_id: names.intern("f"),
        };
        let mut node = ProfileNode::new(frame, ThreadState::None);
        node.merge_timer_names(&["outer".to_string(), "inner".to_string()]);
        node.merge_timer_names(&["outer".to_string()]);
        assert_eq!(node.timer_names(), ["outer", "inner"]);
    }
}
