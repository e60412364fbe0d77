//! Code generation from an [`OutputProgram`] to Rust tokens.
//!
//! A program becomes one block expression evaluating to a `FragmentTree`:
//! every [`Statement`] in order, then a list of the fragments.

use proc_macro2::{Ident, Span, TokenStream};
use quote::{ToTokens, quote};

use crate::program::{Fragment, FreshIdent, OutputProgram, Statement};

/// Configuration for code generation.
#[derive(Debug, Clone)]
pub struct CodegenConfig {
    /// Path of the crate exposing `FragmentTree` and `IntoFragment`.
    pub runtime_path: syn::Path,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            runtime_path: syn::parse_quote!(::fragtree),
        }
    }
}

impl FreshIdent {
    /// The identifier as a Rust ident. Mixed-site hygiene keeps it invisible to
    /// expressions written by the template author.
    pub fn to_ident(&self) -> Ident {
        Ident::new(self.as_str(), Span::mixed_site())
    }
}

/// Renders `program` as a block expression.
pub fn generate<E: ToTokens>(program: &OutputProgram<E>, config: &CodegenConfig) -> TokenStream {
    let rt = &config.runtime_path;

    let statements = program.statements().iter().map(|stmt| match stmt {
        Statement::Bind(id, expr) => {
            let id = id.to_ident();
            quote! { let #id = #rt::IntoFragment::into_fragment(#expr); }
        }
        Statement::Effect(expr) => quote! { #expr; },
    });

    let fragments = program.fragments().iter().map(|fragment| match fragment {
        Fragment::Text(text) => {
            quote! { #rt::FragmentTree::Text(::std::borrow::Cow::Borrowed(#text)) }
        }
        Fragment::Ref(id) => id.to_ident().into_token_stream(),
    });

    let tokens = quote! {
        {
            #(#statements)*
            #rt::FragmentTree::List(::std::vec![#(#fragments),*])
        }
    };

    tracing::trace!(code = %tokens, "generated program");
    tokens
}

impl<E: ToTokens> ToTokens for OutputProgram<E> {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(generate(self, &CodegenConfig::default()));
    }
}
