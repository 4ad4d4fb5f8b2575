//! Call-tree merging: folds raw stack-trace samples and pre-merged
//! subtrees into one canonical profile forest, with post-hoc filtering,
//! lossy truncation, and UI/wire exports.

mod export;
mod filter;
mod node;
mod tree;

pub use export::{ProfileNodeWire, ProfileWire};
pub use node::{ProfileNode, StackFrame, ThreadState};
pub use tree::ProfileTree;
