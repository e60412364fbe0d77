//! The nested output structure built by compiled templates.
//!
//! A [`FragmentTree`] defers string assembly until it is flattened or written.
//! Values bound once by a compiled template are held behind an [`Arc`], so a
//! tree can reference the same rendered value from several places and be
//! flattened any number of times without re-running the expression that
//! produced it.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::sync::Arc;

/// A text leaf, a shared reference to an already rendered value, or an
/// ordered list of trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentTree {
    Text(Cow<'static, str>),
    Shared(Arc<FragmentTree>),
    List(Vec<FragmentTree>),
}

impl FragmentTree {
    /// The empty tree. Flattens to `""`.
    pub const fn empty() -> Self {
        FragmentTree::List(Vec::new())
    }

    pub fn text(text: impl Into<Cow<'static, str>>) -> Self {
        FragmentTree::Text(text.into())
    }

    pub fn list(items: Vec<FragmentTree>) -> Self {
        FragmentTree::List(items)
    }

    pub fn shared(value: Arc<FragmentTree>) -> Self {
        FragmentTree::Shared(value)
    }

    /// Total length in bytes of the flattened output.
    pub fn len(&self) -> usize {
        self.leaves().map(str::len).sum()
    }

    /// Returns true when flattening would produce an empty string.
    pub fn is_empty(&self) -> bool {
        self.leaves().all(str::is_empty)
    }

    /// Iterates the text leaves depth-first, left to right.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// Concatenates every leaf into one string.
    pub fn flatten(&self) -> String {
        let mut out = String::with_capacity(self.len());
        for leaf in self.leaves() {
            out.push_str(leaf);
        }
        out
    }

    /// Streams the leaves into a formatter-style writer without building an
    /// intermediate string.
    pub fn write_to<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        for leaf in self.leaves() {
            out.write_str(leaf)?;
        }
        Ok(())
    }

    /// Streams the leaves into a byte sink.
    pub fn write_io<W: io::Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        for leaf in self.leaves() {
            out.write_all(leaf.as_bytes())?;
        }
        Ok(())
    }
}

impl Default for FragmentTree {
    fn default() -> Self {
        FragmentTree::empty()
    }
}

impl fmt::Display for FragmentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

impl From<&'static str> for FragmentTree {
    fn from(text: &'static str) -> Self {
        FragmentTree::Text(Cow::Borrowed(text))
    }
}

impl From<String> for FragmentTree {
    fn from(text: String) -> Self {
        FragmentTree::Text(Cow::Owned(text))
    }
}

impl From<Cow<'static, str>> for FragmentTree {
    fn from(text: Cow<'static, str>) -> Self {
        FragmentTree::Text(text)
    }
}

impl From<Vec<FragmentTree>> for FragmentTree {
    fn from(items: Vec<FragmentTree>) -> Self {
        FragmentTree::List(items)
    }
}

impl From<Arc<FragmentTree>> for FragmentTree {
    fn from(value: Arc<FragmentTree>) -> Self {
        FragmentTree::Shared(value)
    }
}

impl FromIterator<FragmentTree> for FragmentTree {
    fn from_iter<I: IntoIterator<Item = FragmentTree>>(iter: I) -> Self {
        FragmentTree::List(iter.into_iter().collect())
    }
}

/// Depth-first iterator over the text leaves of a [`FragmentTree`].
pub struct Leaves<'a> {
    stack: Vec<&'a FragmentTree>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                FragmentTree::Text(text) => return Some(text.as_ref()),
                FragmentTree::Shared(value) => self.stack.push(value.as_ref()),
                // Reversed so the leftmost child is popped first.
                FragmentTree::List(items) => self.stack.extend(items.iter().rev()),
            }
        }
        None
    }
}
