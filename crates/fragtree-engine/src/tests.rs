use super::*;
use crate::exec::BoxError;
use ::quote::{ToTokens, quote};
use fragtree_runtime::FragmentTree;
use proc_macro2::TokenStream as TokenStream2;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// =============================================================================
// Helpers
// =============================================================================

/// Expression language for driving the executor in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TestExpr {
    /// Look up a variable.
    Var(&'static str),
    /// Record a side effect.
    Log(&'static str),
    /// A nested block, rendered as one value.
    Block(OutputProgram<TestExpr>),
}

#[derive(Default)]
struct TestEvaluator {
    vars: HashMap<&'static str, String>,
    evaluations: HashMap<&'static str, usize>,
    log: Vec<&'static str>,
}

impl TestEvaluator {
    fn with(vars: &[(&'static str, &str)]) -> Self {
        Self {
            vars: vars.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            ..Self::default()
        }
    }
}

impl Evaluator<TestExpr> for TestEvaluator {
    fn eval(&mut self, expr: &TestExpr, _env: &Env) -> Result<FragmentTree, BoxError> {
        match expr {
            TestExpr::Var(name) => {
                *self.evaluations.entry(*name).or_default() += 1;
                let value = self
                    .vars
                    .get(name)
                    .ok_or_else(|| format!("undefined variable `{name}`"))?;
                Ok(FragmentTree::text(value.clone()))
            }
            TestExpr::Log(_) => Ok(FragmentTree::empty()),
            TestExpr::Block(program) => Ok(execute(program, self)?),
        }
    }

    fn exec(&mut self, expr: &TestExpr, _env: &Env) -> Result<(), BoxError> {
        if let TestExpr::Log(entry) = expr {
            self.log.push(*entry);
        }
        Ok(())
    }
}

fn compact(tokens: &TokenStream2) -> String {
    tokens.to_string().chars().filter(|c| !c.is_whitespace()).collect()
}

fn state() -> CompileState<TestExpr> {
    CompileState::init(CompileOptions::default())
}

// =============================================================================
// State machine
// =============================================================================

#[test]
fn test_empty_block_finalizes_to_empty_program() {
    let mut state = state();
    let _ = state.begin_block();
    let program = state.finalize();
    assert!(program.is_empty());
    assert!(program.statements().is_empty());
    assert!(program.fragments().is_empty());
}

#[test]
fn test_text_appends_in_order_without_statements() {
    let mut state = state();
    state.handle_text("a");
    state.handle_text("b");
    state.handle_text("c");
    let program = state.finalize();
    assert!(program.statements().is_empty());
    assert_eq!(
        program.fragments(),
        &[
            Fragment::Text("a".into()),
            Fragment::Text("b".into()),
            Fragment::Text("c".into()),
        ]
    );
}

#[test]
fn test_output_expression_binds_fresh_identifier() {
    let mut state = state();
    state.handle_expression(Marker::Output, TestExpr::Var("x"));
    state.handle_expression(Marker::Output, TestExpr::Var("y"));
    assert_eq!(state.counter(), 2);

    let program = state.finalize();
    let ids: Vec<&str> = program.bindings().map(FreshIdent::as_str).collect();
    assert_eq!(ids, ["arg0", "arg1"]);
    assert!(matches!(
        &program.statements()[0],
        Statement::Bind(id, TestExpr::Var("x")) if id.as_str() == "arg0"
    ));
    assert!(matches!(&program.fragments()[1], Fragment::Ref(id) if id.as_str() == "arg1"));
}

#[test]
fn test_effect_expression_produces_no_fragment() {
    let mut state = state();
    state.handle_text("before");
    state.handle_expression(Marker::Effect, TestExpr::Log("side"));
    state.handle_text("after");
    assert_eq!(state.counter(), 0);

    let program = state.finalize();
    assert_eq!(program.statements(), &[Statement::Effect(TestExpr::Log("side"))]);
    assert_eq!(program.fragments().len(), 2);
}

#[test]
fn test_custom_ident_prefix() {
    let mut state = CompileState::init(CompileOptions {
        ident_prefix: "__v".to_string(),
        ..CompileOptions::default()
    });
    state.handle_expression(Marker::Output, TestExpr::Var("x"));
    let program = state.finalize();
    assert_eq!(program.bindings().next().map(FreshIdent::as_str), Some("__v0"));
}

#[test]
fn test_line_offset_is_carried_but_structure_is_unchanged() {
    let mut with_offset = CompileState::init(CompileOptions {
        line_offset: 41,
        ..CompileOptions::default()
    });
    assert_eq!(with_offset.line_offset(), 41);
    with_offset.handle_text("x");

    let mut without = state();
    without.handle_text("x");
    assert_eq!(with_offset.finalize(), without.finalize());
}

// =============================================================================
// Markers
// =============================================================================

#[test]
fn test_marker_from_tag() {
    assert_eq!(Marker::from_tag("="), Marker::Output);
    assert_eq!(Marker::from_tag(""), Marker::Effect);
    assert_eq!(Marker::from_tag("#"), Marker::Other("#".into()));
    assert_eq!(Marker::from_tag("raw").tag(), "raw");
}

#[test]
fn test_standard_fallback_drops_comments() {
    let mut state = state();
    state.handle_expression(Marker::Other("comment".into()), TestExpr::Log("ignored"));
    state.handle_expression(Marker::Other("#".into()), TestExpr::Log("ignored"));
    assert!(state.finalize().is_empty());
}

#[test]
fn test_standard_fallback_records_other_markers_as_effects() {
    let mut state = state();
    state.handle_expression(Marker::Other("raw".into()), TestExpr::Log("raw"));
    let program = state.finalize();
    assert_eq!(program.statements(), &[Statement::Effect(TestExpr::Log("raw"))]);
    assert!(program.fragments().is_empty());
}

#[test]
fn test_custom_fallback_receives_marker_and_expression() {
    struct Recording(Arc<Mutex<Vec<String>>>);

    impl FallbackHandler<TestExpr> for Recording {
        fn handle_other(&self, scope: &mut Scope<TestExpr>, marker: &str, _expr: TestExpr) {
            self.0.lock().unwrap().push(marker.to_string());
            scope.push_fragment(Fragment::Text(format!("<{marker}>")));
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut state = state().with_fallback(Recording(Arc::clone(&seen)));
    state.handle_text("a");
    state.handle_expression(Marker::Other("%".into()), TestExpr::Var("x"));
    state.handle_text("b");
    let program = state.finalize();

    assert_eq!(*seen.lock().unwrap(), ["%"]);
    assert_eq!(program.fragments()[1], Fragment::Text("<%>".into()));
}

// =============================================================================
// Blocks
// =============================================================================

#[test]
fn test_independent_compilations_share_no_state() {
    let chunks = || {
        vec![
            Chunk::literal("Hello, "),
            Chunk::output(TestExpr::Var("first")),
            Chunk::effect(TestExpr::Log("mid")),
            Chunk::output(TestExpr::Var("last")),
        ]
    };

    let remote = std::thread::spawn(move || compile(chunks(), CompileOptions::default()));
    let local = compile(chunks(), CompileOptions::default());
    let remote = remote.join().unwrap();

    assert_eq!(local, remote);
    let ids: Vec<&str> = local.bindings().map(FreshIdent::as_str).collect();
    assert_eq!(ids, ["arg0", "arg1"]);
}

#[test]
fn test_begin_block_clears_buffers_but_keeps_counter() {
    let mut state = state();
    state.handle_text("outer");
    state.handle_expression(Marker::Output, TestExpr::Var("x"));

    let parent = state.begin_block();
    assert!(state.scope().is_empty());
    assert_eq!(state.counter(), 1);
    assert_eq!(parent.fragments().len(), 2);

    state.handle_expression(Marker::Output, TestExpr::Var("y"));
    let block = state.end_block(parent);
    assert_eq!(block.bindings().next().map(FreshIdent::as_str), Some("arg1"));

    // Parent restored untouched.
    assert_eq!(state.scope().fragments().len(), 2);
    assert_eq!(state.counter(), 2);
}

#[test]
fn test_nested_block_reenters_as_single_value_ref() {
    let mut state = state();
    state.handle_text("[");
    let parent = state.begin_block();
    state.handle_text("inner");
    let block = state.end_block(parent);
    let id = state.handle_block(block, TestExpr::Block);
    state.handle_text("]");

    let program = state.finalize();
    assert_eq!(id.as_str(), "arg0");
    assert_eq!(program.fragments().len(), 3);
    assert_eq!(program.fragments()[1], Fragment::Ref(id));
}

#[test]
fn test_identifiers_unique_across_nested_blocks() {
    let mut state = state();
    state.handle_expression(Marker::Output, TestExpr::Var("a"));
    let outer = state.begin_block();
    state.handle_expression(Marker::Output, TestExpr::Var("b"));
    let inner = state.begin_block();
    state.handle_expression(Marker::Output, TestExpr::Var("c"));
    let innermost = state.end_block(inner);
    state.handle_block(innermost, TestExpr::Block);
    let middle = state.end_block(outer);
    state.handle_block(middle.clone(), TestExpr::Block);
    let helper = state.fresh_ident();
    let program = state.finalize();

    let mut names: Vec<String> = program.bindings().map(ToString::to_string).collect();
    names.extend(middle.bindings().map(ToString::to_string));
    names.push(helper.to_string());
    let unique: std::collections::HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len(), "duplicate identifiers: {names:?}");
}

// =============================================================================
// Execution
// =============================================================================

#[test]
fn test_scenario_hello_name() {
    let program = compile(
        vec![Chunk::literal("Hello, "), Chunk::output(TestExpr::Var("name"))],
        CompileOptions::default(),
    );
    let mut eval = TestEvaluator::with(&[("name", "Eric")]);
    let tree = execute(&program, &mut eval).unwrap();
    assert_eq!(tree.flatten(), "Hello, Eric");
}

#[test]
fn test_scenario_items_rendered_through_sub_template() {
    let mut state = state();
    for item in ["potion", "sword"] {
        let parent = state.begin_block();
        state.handle_text("- ");
        state.handle_expression(Marker::Output, TestExpr::Var(item));
        let block = state.end_block(parent);
        state.handle_block(block, TestExpr::Block);
    }
    let program = state.finalize();

    let mut eval = TestEvaluator::with(&[("potion", "Potion"), ("sword", "Sword")]);
    let tree = execute(&program, &mut eval).unwrap();
    assert_eq!(tree.flatten(), "- Potion- Sword");
}

#[test]
fn test_output_expression_evaluated_once_across_reflattening() {
    let program = compile(
        vec![
            Chunk::output(TestExpr::Var("x")),
            Chunk::literal("|"),
            Chunk::output(TestExpr::Var("y")),
        ],
        CompileOptions::default(),
    );
    let mut eval = TestEvaluator::with(&[("x", "1"), ("y", "2")]);
    let tree = execute(&program, &mut eval).unwrap();

    assert_eq!(tree.flatten(), "1|2");
    assert_eq!(tree.flatten(), "1|2");
    let mut out = String::new();
    tree.write_to(&mut out).unwrap();
    assert_eq!(eval.evaluations["x"], 1);
    assert_eq!(eval.evaluations["y"], 1);
}

#[test]
fn test_matches_naive_concatenation() {
    let vars = [("a", "alpha"), ("b", ""), ("c", "γ")];
    let inputs: Vec<Vec<Chunk<TestExpr>>> = vec![
        vec![],
        vec![Chunk::literal("only text")],
        vec![Chunk::output(TestExpr::Var("a"))],
        vec![
            Chunk::output(TestExpr::Var("a")),
            Chunk::literal(" and "),
            Chunk::output(TestExpr::Var("b")),
            Chunk::effect(TestExpr::Log("noise")),
            Chunk::literal("/"),
            Chunk::output(TestExpr::Var("c")),
            Chunk::output(TestExpr::Var("a")),
        ],
    ];

    for chunks in inputs {
        let naive: String = chunks
            .iter()
            .map(|chunk| match chunk {
                Chunk::Literal(text) => text.clone(),
                Chunk::Expression {
                    marker: Marker::Output,
                    code: TestExpr::Var(name),
                } => vars.iter().find(|(k, _)| k == name).unwrap().1.to_string(),
                Chunk::Expression { .. } => String::new(),
            })
            .collect();

        let program = compile(chunks, CompileOptions::default());
        let tree = execute(&program, &mut TestEvaluator::with(&vars)).unwrap();
        assert_eq!(tree.flatten(), naive);
    }
}

#[test]
fn test_effects_run_in_source_order() {
    let program = compile(
        vec![
            Chunk::effect(TestExpr::Log("first")),
            Chunk::output(TestExpr::Var("x")),
            Chunk::effect(TestExpr::Log("second")),
        ],
        CompileOptions::default(),
    );
    let mut eval = TestEvaluator::with(&[("x", "x")]);
    execute(&program, &mut eval).unwrap();
    assert_eq!(eval.log, ["first", "second"]);
}

#[test]
fn test_evaluator_error_carries_statement_index() {
    let program = compile(
        vec![
            Chunk::effect(TestExpr::Log("ok")),
            Chunk::output(TestExpr::Var("missing")),
        ],
        CompileOptions::default(),
    );
    let err = execute(&program, &mut TestEvaluator::default()).unwrap_err();
    assert!(matches!(err, ExecError::Eval { index: 1, .. }));
    assert!(err.to_string().contains("undefined variable `missing`"));
}

#[test]
fn test_unbound_reference_is_reported() {
    let program = OutputProgram::<TestExpr> {
        statements: Vec::new(),
        fragments: vec![Fragment::Ref(FreshIdent::new("arg", 7))],
    };
    let err = execute(&program, &mut TestEvaluator::default()).unwrap_err();
    assert!(matches!(&err, ExecError::Unbound(id) if id.as_str() == "arg7"));
}

// =============================================================================
// Codegen
// =============================================================================

#[test]
fn test_codegen_binds_each_output_once() {
    let program = compile(
        vec![Chunk::literal("Hello, "), Chunk::output(quote! { user.name() })],
        CompileOptions::default(),
    );
    let s = compact(&generate(&program, &CodegenConfig::default()));

    assert!(
        s.contains("letarg0=::fragtree::IntoFragment::into_fragment(user.name());"),
        "Expected a single binding for the output expression. Got: {}",
        s
    );
    assert_eq!(s.matches("user.name()").count(), 1);
    assert!(
        s.contains("::fragtree::FragmentTree::Text(::std::borrow::Cow::Borrowed(\"Hello,\"))"),
        "Expected a borrowed text leaf. Got: {}",
        s
    );
    assert!(s.ends_with(",arg0])}"), "Expected the binding last in the list. Got: {}", s);
}

#[test]
fn test_codegen_emits_effects_as_statements() {
    let program = compile(
        vec![Chunk::effect(quote! { let total = a + b }), Chunk::output(quote! { total })],
        CompileOptions::default(),
    );
    let s = compact(&program.to_token_stream());
    let effect = s.find("lettotal=a+b;").expect("effect statement");
    let bind = s.find("letarg0=").expect("binding");
    assert!(effect < bind, "Effect must precede the binding. Got: {}", s);
}

#[test]
fn test_codegen_respects_runtime_path() {
    let program = compile(vec![Chunk::<TokenStream2>::literal("x")], CompileOptions::default());
    let config = CodegenConfig {
        runtime_path: syn::parse_quote!(crate::rt),
    };
    let s = compact(&generate(&program, &config));
    assert!(s.contains("crate::rt::FragmentTree::List"), "Got: {}", s);
    assert!(!s.contains("::fragtree"), "Got: {}", s);
}

#[test]
fn test_codegen_output_parses_as_block_expression() {
    let program = compile(
        vec![
            Chunk::literal("a"),
            Chunk::output(quote! { x }),
            Chunk::effect(quote! { log(x) }),
        ],
        CompileOptions::default(),
    );
    let tokens = generate(&program, &CodegenConfig::default());
    let parsed: syn::ExprBlock = syn::parse2(tokens).expect("generated code should parse");
    assert_eq!(parsed.block.stmts.len(), 3);
}

#[test]
fn test_fresh_ident_uses_mixed_site_span() {
    let id = FreshIdent::new("arg", 3);
    assert_eq!(id.to_ident().to_string(), "arg3");
}
