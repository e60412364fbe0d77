use crate::marker::Marker;
use crate::program::OutputProgram;
use crate::state::{CompileOptions, CompileState};

/// One piece of segmented template input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk<E> {
    Literal(String),
    Expression { marker: Marker, code: E },
}

impl<E> Chunk<E> {
    pub fn literal(text: impl Into<String>) -> Self {
        Chunk::Literal(text.into())
    }

    pub fn output(code: E) -> Self {
        Chunk::Expression {
            marker: Marker::Output,
            code,
        }
    }

    pub fn effect(code: E) -> Self {
        Chunk::Expression {
            marker: Marker::Effect,
            code,
        }
    }
}

/// Feeds `chunks` into `state` in order.
pub fn feed<E>(state: &mut CompileState<E>, chunks: impl IntoIterator<Item = Chunk<E>>) {
    for chunk in chunks {
        match chunk {
            Chunk::Literal(text) => state.handle_text(text),
            Chunk::Expression { marker, code } => state.handle_expression(marker, code),
        }
    }
}

/// Compiles a flat chunk sequence in one go.
pub fn compile<E>(
    chunks: impl IntoIterator<Item = Chunk<E>>,
    options: CompileOptions,
) -> OutputProgram<E> {
    let mut state = CompileState::init(options);
    let _ = state.begin_block();
    feed(&mut state, chunks);
    state.finalize()
}
