use std::borrow::Cow;
use std::sync::Arc;

use crate::FragmentTree;

/// Conversion of an interpolated value into a fragment tree.
///
/// Compiled templates call this exactly once per `@{expr}`; the resulting tree
/// is what later flattening reads.
pub trait IntoFragment {
    fn into_fragment(self) -> FragmentTree;
}

impl IntoFragment for FragmentTree {
    fn into_fragment(self) -> FragmentTree {
        self
    }
}

impl IntoFragment for &FragmentTree {
    fn into_fragment(self) -> FragmentTree {
        self.clone()
    }
}

impl IntoFragment for Arc<FragmentTree> {
    fn into_fragment(self) -> FragmentTree {
        FragmentTree::Shared(self)
    }
}

impl IntoFragment for &Arc<FragmentTree> {
    fn into_fragment(self) -> FragmentTree {
        FragmentTree::Shared(Arc::clone(self))
    }
}

impl IntoFragment for String {
    fn into_fragment(self) -> FragmentTree {
        FragmentTree::Text(Cow::Owned(self))
    }
}

impl IntoFragment for &String {
    fn into_fragment(self) -> FragmentTree {
        FragmentTree::Text(Cow::Owned(self.clone()))
    }
}

impl IntoFragment for Cow<'static, str> {
    fn into_fragment(self) -> FragmentTree {
        FragmentTree::Text(self)
    }
}

// Borrowed text of any lifetime is copied; only `'static` literals are kept
// borrowed, and those come through the generated `Text` leaves instead.
impl IntoFragment for &str {
    fn into_fragment(self) -> FragmentTree {
        FragmentTree::Text(Cow::Owned(self.to_owned()))
    }
}

impl IntoFragment for &&str {
    fn into_fragment(self) -> FragmentTree {
        FragmentTree::Text(Cow::Owned((*self).to_owned()))
    }
}

impl<T: IntoFragment> IntoFragment for Vec<T> {
    fn into_fragment(self) -> FragmentTree {
        FragmentTree::List(self.into_iter().map(IntoFragment::into_fragment).collect())
    }
}

impl<T: IntoFragment> IntoFragment for Option<T> {
    fn into_fragment(self) -> FragmentTree {
        match self {
            Some(value) => value.into_fragment(),
            None => FragmentTree::empty(),
        }
    }
}

macro_rules! impl_via_to_string {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoFragment for $ty {
                fn into_fragment(self) -> FragmentTree {
                    FragmentTree::Text(Cow::Owned(self.to_string()))
                }
            }

            impl IntoFragment for &$ty {
                fn into_fragment(self) -> FragmentTree {
                    FragmentTree::Text(Cow::Owned(self.to_string()))
                }
            }
        )*
    };
}

impl_via_to_string!(
    char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);
