use std::fmt;

/// A compiler-generated binding name, unique within one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FreshIdent(String);

impl FreshIdent {
    pub(crate) fn new(prefix: &str, index: usize) -> Self {
        FreshIdent(format!("{prefix}{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FreshIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One leaf of the output structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Literal template text, emitted as-is.
    Text(String),
    /// The value bound to a fresh identifier by an earlier [`Statement::Bind`].
    Ref(FreshIdent),
}

/// Code that runs before the fragments are assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<E> {
    /// Evaluate `E` once and bind the result.
    Bind(FreshIdent, E),
    /// Evaluate `E` for its effect only; contributes no fragment.
    Effect(E),
}

/// The result of [`finalize`](crate::CompileState::finalize): statements to run
/// in order, then the ordered fragments that make up the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputProgram<E> {
    pub(crate) statements: Vec<Statement<E>>,
    pub(crate) fragments: Vec<Fragment>,
}

impl<E> OutputProgram<E> {
    pub fn statements(&self) -> &[Statement<E>] {
        &self.statements
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// True when the program neither runs anything nor produces output.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.fragments.is_empty()
    }

    /// Identifiers bound by this program, in binding order.
    pub fn bindings(&self) -> impl Iterator<Item = &FreshIdent> {
        self.statements.iter().filter_map(|stmt| match stmt {
            Statement::Bind(id, _) => Some(id),
            Statement::Effect(_) => None,
        })
    }
}

impl<E> Default for OutputProgram<E> {
    fn default() -> Self {
        Self {
            statements: Vec::new(),
            fragments: Vec::new(),
        }
    }
}
