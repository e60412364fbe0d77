//! Template compilation into fragment-building programs.
//!
//! The [`CompileState`] state machine receives a template as ordered chunks
//! (literal text and marked expressions) and produces an [`OutputProgram`]:
//! statements that evaluate each output expression exactly once into a fresh
//! binding, followed by the ordered fragments that reference those bindings.
//! The program can be rendered to Rust tokens ([`codegen`]) or run directly
//! ([`exec`]).
//!
//! ```
//! use fragtree_engine::{Chunk, CompileOptions, Fragment, compile};
//!
//! let program = compile(
//!     vec![Chunk::literal("Hello, "), Chunk::output("name")],
//!     CompileOptions::default(),
//! );
//! assert_eq!(program.statements().len(), 1);
//! assert!(matches!(&program.fragments()[1], Fragment::Ref(id) if id.as_str() == "arg0"));
//! ```

mod chunk;
pub mod codegen;
pub mod exec;
mod marker;
mod program;
mod state;

#[cfg(test)]
mod tests;

pub use chunk::{Chunk, compile, feed};
pub use codegen::{CodegenConfig, generate};
pub use exec::{Env, Evaluator, ExecError, execute};
pub use marker::{FallbackHandler, Marker, StandardFallback};
pub use program::{Fragment, FreshIdent, OutputProgram, Statement};
pub use state::{CompileOptions, CompileState, Scope};
