//! Templates compiled into lazily flattened fragment trees.
//!
//! [`template!`] compiles a template string at macro-expansion time. Each
//! `@{expr}` is evaluated exactly once into a fresh, hygienic binding; the
//! result is a [`FragmentTree`] that keeps literal text and rendered values
//! apart until it is flattened or streamed.
//!
//! ```
//! use fragtree::template;
//!
//! struct Item {
//!     name: &'static str,
//! }
//!
//! let items = [Item { name: "Potion" }, Item { name: "Sword" }];
//! let list = template!("{#for item in &items}- @{item.name}{/for}");
//! assert_eq!(list.flatten(), "- Potion- Sword");
//! ```
//!
//! Syntax:
//! - `@{expr}` - Interpolate an expression (converted with [`IntoFragment`])
//! - `@@` - Escape for a literal `@`
//! - `{$do expr}` - Execute a side-effectful expression (discard result)
//! - `{$let pat = expr}` - Local binding
//! - `{> comment <}` - Template comment
//! - `{#if cond}...{:else if cond}...{:else}...{/if}` - Conditional blocks
//! - `{#for pat in iter}...{/for}` - Iteration
//!
//! For pieces that are already evaluated, [`interpolate`] and [`fragments!`]
//! build fragment lists directly with no compile step.

pub use fragtree_macros::template;
pub use fragtree_runtime::{FragmentTree, IntoFragment, Leaves, Segment, fragments, interpolate};
