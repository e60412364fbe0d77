use syn::{
    Token,
    parse::{Parse, ParseStream},
};

/// `template!("...")` or `template!("...", line_offset = 12)`.
pub(crate) struct TemplateInput {
    pub src: syn::LitStr,
    pub line_offset: Option<usize>,
}

impl Parse for TemplateInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let src = input.parse()?;
        let mut line_offset = None;

        if !input.is_empty() {
            let _: Token![,] = input.parse()?;
            if !input.is_empty() {
                let key: syn::Ident = input.parse()?;
                if key != "line_offset" {
                    return Err(syn::Error::new_spanned(
                        &key,
                        format!("unknown template option `{key}`, expected `line_offset`"),
                    ));
                }
                let _: Token![=] = input.parse()?;
                let value: syn::LitInt = input.parse()?;
                line_offset = Some(value.base10_parse()?);
                if !input.is_empty() {
                    let _: Token![,] = input.parse()?;
                }
            }
        }

        Ok(Self { src, line_offset })
    }
}
