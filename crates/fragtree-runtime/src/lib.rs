//! Runtime values for fragtree templates.
//!
//! Compiled templates produce a [`FragmentTree`]: literal text leaves, shared
//! references to values rendered exactly once, and nested lists. Nothing is
//! concatenated until the tree is flattened or streamed to a writer.
//!
//! - [`FragmentTree::flatten`] - depth-first, left-to-right concatenation
//! - [`FragmentTree::write_to`] / [`FragmentTree::write_io`] - streaming output
//! - [`IntoFragment`] - how `@{expr}` values become trees
//! - [`interpolate`] / [`fragments!`] - direct interpolation with no compile step

mod convert;
mod interpolate;
mod tree;


pub use convert::IntoFragment;
pub use interpolate::{Segment, interpolate};
pub use tree::{FragmentTree, Leaves};
