//! The compilation state machine.
//!
//! A [`CompileState`] is created by [`CompileState::init`], fed chunks in
//! source order, and consumed by [`CompileState::finalize`]. Literal text and
//! output expressions land in one ordered fragment buffer; the code needed to
//! compute those expressions lands in a parallel statement buffer, each output
//! expression bound once to a fresh identifier.

use std::fmt;
use std::mem;

use crate::marker::{FallbackHandler, Marker, StandardFallback};
use crate::program::{Fragment, FreshIdent, OutputProgram, Statement};

/// Settings passed to [`CompileState::init`].
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Line of the template's first character in its enclosing file, minus
    /// one. Only used when reporting positions; structure never depends on it.
    pub line_offset: usize,
    /// Prefix of generated identifiers (`arg0`, `arg1`, ...).
    pub ident_prefix: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            line_offset: 0,
            ident_prefix: "arg".to_string(),
        }
    }
}

/// The fragment and statement buffers of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope<E> {
    fragments: Vec<Fragment>,
    statements: Vec<Statement<E>>,
}

impl<E> Scope<E> {
    pub fn push_fragment(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    pub fn push_statement(&mut self, statement: Statement<E>) {
        self.statements.push(statement);
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn statements(&self) -> &[Statement<E>] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.statements.is_empty()
    }

    fn into_program(self) -> OutputProgram<E> {
        OutputProgram {
            statements: self.statements,
            fragments: self.fragments,
        }
    }
}

impl<E> Default for Scope<E> {
    fn default() -> Self {
        Self {
            fragments: Vec::new(),
            statements: Vec::new(),
        }
    }
}

/// State threaded through one compilation. Never shared between compilations.
pub struct CompileState<E> {
    scope: Scope<E>,
    counter: usize,
    options: CompileOptions,
    fallback: Box<dyn FallbackHandler<E> + Send + Sync>,
}

impl<E> CompileState<E> {
    /// Fresh state: empty buffers, counter at zero, [`StandardFallback`] for
    /// unrecognised markers.
    pub fn init(options: CompileOptions) -> Self {
        Self {
            scope: Scope::default(),
            counter: 0,
            options,
            fallback: Box::new(StandardFallback),
        }
    }

    /// Replaces the handler used for [`Marker::Other`].
    pub fn with_fallback(
        mut self,
        fallback: impl FallbackHandler<E> + Send + Sync + 'static,
    ) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    pub fn line_offset(&self) -> usize {
        self.options.line_offset
    }

    /// Number of identifiers handed out so far.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// The buffers of the block currently being compiled.
    pub fn scope(&self) -> &Scope<E> {
        &self.scope
    }

    /// Starts an isolated block. The buffers are cleared and the previous ones
    /// returned so [`end_block`](Self::end_block) can restore them; the counter
    /// keeps running so names stay unique across blocks.
    pub fn begin_block(&mut self) -> Scope<E> {
        tracing::trace!(counter = self.counter, "begin block");
        mem::take(&mut self.scope)
    }

    /// Finishes the current block and restores `parent`, returning the block's
    /// program.
    pub fn end_block(&mut self, parent: Scope<E>) -> OutputProgram<E> {
        let block = mem::replace(&mut self.scope, parent);
        tracing::trace!(
            statements = block.statements.len(),
            fragments = block.fragments.len(),
            "end block"
        );
        block.into_program()
    }

    pub fn handle_text(&mut self, text: impl Into<String>) {
        self.scope.push_fragment(Fragment::Text(text.into()));
    }

    pub fn handle_expression(&mut self, marker: Marker, expr: E) {
        match marker {
            Marker::Output => {
                let id = self.fresh_ident();
                self.scope.push_statement(Statement::Bind(id.clone(), expr));
                self.scope.push_fragment(Fragment::Ref(id));
            }
            Marker::Effect => self.scope.push_statement(Statement::Effect(expr)),
            Marker::Other(tag) => self.fallback.handle_other(&mut self.scope, &tag, expr),
        }
    }

    /// Embeds a finished block as one value of the current block. `wrap`
    /// turns the block's program into a single expression (for example a Rust
    /// block expression, or the arms of an `if`), which is then bound through
    /// the output path like any other `@{expr}`.
    pub fn handle_block(
        &mut self,
        block: OutputProgram<E>,
        wrap: impl FnOnce(OutputProgram<E>) -> E,
    ) -> FreshIdent {
        let id = self.fresh_ident();
        let expr = wrap(block);
        self.scope.push_statement(Statement::Bind(id.clone(), expr));
        self.scope.push_fragment(Fragment::Ref(id.clone()));
        id
    }

    /// Allocates the next identifier from the compilation-wide counter.
    pub fn fresh_ident(&mut self) -> FreshIdent {
        let id = FreshIdent::new(&self.options.ident_prefix, self.counter);
        self.counter += 1;
        id
    }

    /// Consumes the state, yielding both buffers in append order.
    pub fn finalize(self) -> OutputProgram<E> {
        tracing::debug!(
            statements = self.scope.statements.len(),
            fragments = self.scope.fragments.len(),
            identifiers = self.counter,
            "finalized template program"
        );
        self.scope.into_program()
    }
}

impl<E> Default for CompileState<E> {
    fn default() -> Self {
        Self::init(CompileOptions::default())
    }
}

impl<E: fmt::Debug> fmt::Debug for CompileState<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileState")
            .field("scope", &self.scope)
            .field("counter", &self.counter)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
