//! The `template!` macro for fragtree.
//!
//! A template is a string literal with embedded Rust:
//! - `@{expr}` - Interpolate an expression (converted with `IntoFragment`, evaluated once)
//! - `@@` - Escape for a literal `@`
//! - `{$do expr}` - Execute a side-effectful expression (discard result)
//! - `{$let pat = expr}` - Local binding for later chunks
//! - `{> comment <}` - Template comment, produces nothing
//! - `{#if cond}...{:else if cond}...{:else}...{/if}` - Conditional blocks
//! - `{#for pat in iter}...{/for}` - Iteration
//!
//! The macro expands to an expression of type `fragtree::FragmentTree`.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};

use fragtree_engine::{CodegenConfig, CompileOptions};

use self::{
    compile::compile_nodes,
    input::TemplateInput,
    segment::{SegmentError, parse_template},
};

mod compile;
mod input;
mod segment;

/// Compile a template string into a `FragmentTree` expression.
///
/// # Example
///
/// ```ignore
/// use fragtree::template;
///
/// let name = "Eric";
/// let greeting = template!("Hello, @{name}");
/// assert_eq!(greeting.flatten(), "Hello, Eric");
/// ```
#[proc_macro]
pub fn template(input: TokenStream) -> TokenStream {
    match template_impl(input.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn template_impl(input: TokenStream2) -> syn::Result<TokenStream2> {
    let TemplateInput { src, line_offset } = syn::parse2(input)?;
    let options = CompileOptions {
        line_offset: line_offset.unwrap_or_default(),
        ..CompileOptions::default()
    };

    let nodes = parse_template(&src.value(), options.line_offset).map_err(|err| {
        syn::Error::new(error_span(&src, &err), format!("template error at {err}"))
    })?;
    let tokens = compile_nodes(nodes, options, &CodegenConfig::default());

    #[cfg(debug_assertions)]
    if std::env::var("FRAGTREE_DEBUG_CODEGEN").is_ok() {
        eprintln!("[FRAGTREE_DEBUG_CODEGEN] {:?} =>\n{}", src.value(), tokens);
    }

    Ok(tokens)
}

/// Narrows the error to the failing character when the literal is written
/// without escapes, so its source text maps one-to-one onto the template.
fn error_span(src: &syn::LitStr, err: &SegmentError) -> Span {
    let value = src.value();
    let token = src.token();
    let repr = token.to_string();

    if repr.starts_with('"') && repr.len() == value.len() + 2 {
        let width = value
            .get(err.offset..)
            .and_then(|rest| rest.chars().next())
            .map_or(0, char::len_utf8);
        let start = err.offset + 1;
        if let Some(span) = token.subspan(start..start + width) {
            return span;
        }
    }
    src.span()
}
