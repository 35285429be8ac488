//! Editor-facing features built on the syntax tree
//!
//! - `node_finder`: offset lookup, placeholder insertion and position conversion
//! - `completion`: the completion pipeline

pub mod completion;
pub mod node_finder;

pub use completion::{CompletionEngine, completion_items};
