//! Direct interpolation without a compile step.
//!
//! Use this when the pieces are already evaluated: values are converted in
//! place, in the caller's evaluation order, and nothing is bound or deferred.

use std::borrow::Cow;

use crate::{FragmentTree, IntoFragment};

/// One piece of an already segmented template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<V> {
    Literal(Cow<'static, str>),
    Value(V),
}

impl<V> Segment<V> {
    pub fn literal(text: impl Into<Cow<'static, str>>) -> Self {
        Segment::Literal(text.into())
    }
}

/// Replaces every value slot with its fragment, keeping segment order.
pub fn interpolate<V, I>(segments: I) -> Vec<FragmentTree>
where
    V: IntoFragment,
    I: IntoIterator<Item = Segment<V>>,
{
    segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(text) => FragmentTree::Text(text),
            Segment::Value(value) => value.into_fragment(),
        })
        .collect()
}

/// Builds a `Vec<FragmentTree>` from heterogeneous pieces, converting each
/// with [`IntoFragment`] in order.
///
/// ```
/// use fragtree_runtime::{fragments, FragmentTree};
///
/// let name = "Eric";
/// let tree = FragmentTree::list(fragments!["Hello, ", name, '!']);
/// assert_eq!(tree.flatten(), "Hello, Eric!");
/// ```
#[macro_export]
macro_rules! fragments {
    () => {
        ::std::vec::Vec::<$crate::FragmentTree>::new()
    };
    ($($piece:expr),+ $(,)?) => {
        ::std::vec![$($crate::IntoFragment::into_fragment($piece)),+]
    };
}
