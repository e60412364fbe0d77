//! Expression markers and the extension point for markers the state machine
//! does not special-case.

use crate::program::Statement;
use crate::state::Scope;

/// Selects what an expression chunk contributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    /// The value becomes output.
    Output,
    /// Evaluated for ordering or side effects; no output of its own.
    Effect,
    /// Any other tag, handed to the installed [`FallbackHandler`].
    Other(String),
}

impl Marker {
    /// Reads a textual tag: `"="` is output, `""` is effect-only, anything
    /// else is passed through as [`Marker::Other`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "=" => Marker::Output,
            "" => Marker::Effect,
            other => Marker::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Marker::Output => "=",
            Marker::Effect => "",
            Marker::Other(tag) => tag,
        }
    }
}

/// Default-expression contract for [`Marker::Other`].
///
/// Implementations may append to the current scope in any way; they see the
/// same buffers `handle_expression` would have written to.
pub trait FallbackHandler<E> {
    fn handle_other(&self, scope: &mut Scope<E>, marker: &str, expr: E);
}

/// Drops comment markers (`#`, `comment`) and records every other marker as an
/// effect-only statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFallback;

impl<E> FallbackHandler<E> for StandardFallback {
    fn handle_other(&self, scope: &mut Scope<E>, marker: &str, expr: E) {
        match marker {
            "#" | "comment" => {
                tracing::trace!(marker, "dropping comment expression");
            }
            _ => scope.push_statement(Statement::Effect(expr)),
        }
    }
}
