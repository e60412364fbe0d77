//! Structural compilation: drives the engine over segmented nodes.
//!
//! Chunks go straight to the state machine. Each control node compiles its
//! bodies as isolated blocks, wraps them in the Rust control construct, and
//! re-enters the enclosing block as a single bound value.

use fragtree_engine::{
    Chunk, CodegenConfig, CompileOptions, CompileState, Marker, OutputProgram, generate,
};
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

use crate::segment::{ControlNode, Node};

/// Compiles a parsed template into a block expression yielding a `FragmentTree`.
pub fn compile_nodes(
    nodes: Vec<Node>,
    options: CompileOptions,
    config: &CodegenConfig,
) -> TokenStream2 {
    let mut state = CompileState::init(options);
    let _ = state.begin_block();
    feed_nodes(&mut state, nodes, config);
    let program = state.finalize();
    generate(&program, config)
}

fn feed_nodes(state: &mut CompileState<TokenStream2>, nodes: Vec<Node>, config: &CodegenConfig) {
    for node in nodes {
        match node {
            Node::Chunk(Chunk::Literal(text)) => state.handle_text(text),
            Node::Chunk(Chunk::Expression { marker, code }) => {
                state.handle_expression(marker, code)
            }
            Node::Control(control) => compile_control(state, control, config),
        }
    }
}

/// Compiles `nodes` in a block of their own and returns the block's program.
fn compile_block(
    state: &mut CompileState<TokenStream2>,
    nodes: Vec<Node>,
    config: &CodegenConfig,
) -> OutputProgram<TokenStream2> {
    let parent = state.begin_block();
    feed_nodes(state, nodes, config);
    state.end_block(parent)
}

fn compile_control(
    state: &mut CompileState<TokenStream2>,
    node: ControlNode,
    config: &CodegenConfig,
) {
    let rt = &config.runtime_path;

    match node {
        ControlNode::If {
            branches,
            else_branch,
        } => {
            let arms: Vec<(TokenStream2, TokenStream2)> = branches
                .into_iter()
                .map(|(cond, body)| (cond, generate(&compile_block(state, body, config), config)))
                .collect();

            let mut expr = match else_branch {
                Some(body) => generate(&compile_block(state, body, config), config),
                None => quote! { { #rt::FragmentTree::empty() } },
            };
            for (cond, body) in arms.into_iter().rev() {
                expr = quote! { if #cond #body else #expr };
            }

            state.handle_expression(Marker::Output, expr);
        }
        ControlNode::For { pat, iter, body } => {
            let acc = state.fresh_ident().to_ident();
            let block = compile_block(state, body, config);
            state.handle_block(block, |program| {
                let body = generate(&program, config);
                quote! {
                    {
                        let mut #acc = ::std::vec::Vec::new();
                        for #pat in #iter {
                            #acc.push(#body);
                        }
                        #rt::FragmentTree::List(#acc)
                    }
                }
            });
        }
    }
}
