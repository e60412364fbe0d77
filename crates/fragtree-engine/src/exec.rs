//! Interpreting executor for [`OutputProgram`]s.
//!
//! Runs each statement once, in order, through an [`Evaluator`], then builds
//! the fragment tree. Bound values are stored behind an `Arc` so each value
//! reference in the tree points at the single evaluated result.

use std::sync::Arc;

use fragtree_runtime::FragmentTree;
use rustc_hash::FxHashMap;

use crate::program::{Fragment, FreshIdent, OutputProgram, Statement};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while executing a program.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("fragment references unbound identifier `{0}`")]
    Unbound(FreshIdent),
    #[error("statement {index} failed: {source}")]
    Eval {
        index: usize,
        #[source]
        source: BoxError,
    },
}

/// Values bound so far during execution.
#[derive(Debug, Default)]
pub struct Env {
    values: FxHashMap<FreshIdent, Arc<FragmentTree>>,
}

impl Env {
    pub fn get(&self, id: &FreshIdent) -> Option<&Arc<FragmentTree>> {
        self.values.get(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn bind(&mut self, id: FreshIdent, value: FragmentTree) {
        self.values.insert(id, Arc::new(value));
    }
}

/// Evaluates expressions of type `E`.
pub trait Evaluator<E> {
    /// Evaluates an output expression.
    fn eval(&mut self, expr: &E, env: &Env) -> Result<FragmentTree, BoxError>;

    /// Evaluates an effect-only expression.
    fn exec(&mut self, expr: &E, env: &Env) -> Result<(), BoxError>;
}

/// Runs `program` and returns its fragment tree.
pub fn execute<E, V>(
    program: &OutputProgram<E>,
    evaluator: &mut V,
) -> Result<FragmentTree, ExecError>
where
    V: Evaluator<E> + ?Sized,
{
    let mut env = Env::default();

    for (index, stmt) in program.statements().iter().enumerate() {
        match stmt {
            Statement::Bind(id, expr) => {
                let value = evaluator
                    .eval(expr, &env)
                    .map_err(|source| ExecError::Eval { index, source })?;
                env.bind(id.clone(), value);
            }
            Statement::Effect(expr) => evaluator
                .exec(expr, &env)
                .map_err(|source| ExecError::Eval { index, source })?,
        }
    }

    let items = program
        .fragments()
        .iter()
        .map(|fragment| match fragment {
            Fragment::Text(text) => Ok(FragmentTree::text(text.clone())),
            Fragment::Ref(id) => env
                .get(id)
                .map(|value| FragmentTree::Shared(Arc::clone(value)))
                .ok_or_else(|| ExecError::Unbound(id.clone())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(bindings = env.len(), fragments = items.len(), "executed template program");
    Ok(FragmentTree::List(items))
}
