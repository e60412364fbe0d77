//! Segmenter for template strings.
//!
//! Splits template text into literal and expression chunks and groups control
//! tags into [`ControlNode`]s:
//! - `@{expr}` - Output expression
//! - `@@` - A literal `@` (a lone `@` not followed by `{` is also literal)
//! - `{$do expr}` - Evaluate for side effects only
//! - `{$let pat = expr}` - Local binding visible to later chunks
//! - `{> text <}` - Template comment
//! - `{#if cond}...{:else if cond}...{:else}...{/if}` - Conditional
//! - `{#for pat in iter}...{/for}` - Iteration
//!
//! Any other `{` is literal text.

use std::str::FromStr;

use fragtree_engine::{Chunk, Marker};
use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use quote::quote;

/// A template error with its position in the template text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {message}")]
pub struct SegmentError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// Byte offset of the failing position in the template text.
    pub offset: usize,
}

pub type SegmentResult<T> = Result<T, SegmentError>;

#[derive(Debug, Clone)]
pub enum Node {
    Chunk(Chunk<TokenStream2>),
    Control(ControlNode),
}

#[derive(Debug, Clone)]
pub enum ControlNode {
    If {
        branches: Vec<(TokenStream2, Vec<Node>)>,
        else_branch: Option<Vec<Node>>,
    },
    For {
        pat: TokenStream2,
        iter: TokenStream2,
        body: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
enum Terminator {
    Else,
    ElseIf(TokenStream2),
    EndIf,
    EndFor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pos {
    index: usize,
    line: usize,
    column: usize,
}

struct Cursor {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    line_offset: usize,
}

impl Cursor {
    fn new(src: &str, line_offset: usize) -> Self {
        Self {
            chars: src.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            line_offset,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.get(self.index + n).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_nth(i) == Some(c))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn pos(&self) -> Pos {
        Pos {
            index: self.index,
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, at: Pos, message: impl Into<String>) -> SegmentError {
        SegmentError {
            message: message.into(),
            line: at.line + self.line_offset,
            column: at.column,
            offset: self.chars[..at.index].iter().map(|c| c.len_utf8()).sum(),
        }
    }

    /// Reads up to the `}` closing a group whose `{` was already consumed.
    /// Braces inside string, raw string and char literals do not count.
    fn read_braced(&mut self, open: Pos, what: &str) -> SegmentResult<String> {
        let mut out = String::new();
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '"' => {
                    self.read_quoted(&mut out, '"', open, what)?;
                    continue;
                }
                '\'' if self.at_char_literal() => {
                    self.read_quoted(&mut out, '\'', open, what)?;
                    continue;
                }
                'r' => {
                    if let Some(hashes) = self.raw_string_hashes(&out) {
                        self.read_raw_string(&mut out, hashes, open, what)?;
                        continue;
                    }
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return Ok(out);
                    }
                }
                _ => {}
            }
            self.bump();
            out.push(c);
        }
        Err(self.error(open, format!("Unclosed {what}: missing `}}`")))
    }

    /// A `'` opens a char literal when it is followed by an escape or by one
    /// char and a closing `'`. Anything else is a lifetime or a label.
    fn at_char_literal(&self) -> bool {
        self.peek_nth(1) == Some('\\')
            || (self.peek_nth(1).is_some() && self.peek_nth(2) == Some('\''))
    }

    /// Number of `#`s when the cursor sits on the `r` of `r"`, `r#"`, `br"`...
    fn raw_string_hashes(&self, before: &str) -> Option<usize> {
        let is_ident = |c: char| c.is_alphanumeric() || c == '_';
        let mut prev = before.chars().rev();
        let starts_token = match (prev.next(), prev.next()) {
            (Some('b'), before_b) => !before_b.is_some_and(is_ident),
            (Some(c), _) => !is_ident(c),
            (None, _) => true,
        };
        if !starts_token {
            return None;
        }
        let hashes = (1..).take_while(|&n| self.peek_nth(n) == Some('#')).count();
        (self.peek_nth(hashes + 1) == Some('"')).then_some(hashes)
    }

    fn read_quoted(
        &mut self,
        out: &mut String,
        quote: char,
        open: Pos,
        what: &str,
    ) -> SegmentResult<()> {
        if let Some(c) = self.bump() {
            out.push(c);
        }
        while let Some(c) = self.bump() {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
            } else if c == quote {
                return Ok(());
            }
        }
        Err(self.error(open, format!("Unterminated literal in {what}")))
    }

    fn read_raw_string(
        &mut self,
        out: &mut String,
        hashes: usize,
        open: Pos,
        what: &str,
    ) -> SegmentResult<()> {
        // `r`, the hashes and the opening quote
        for _ in 0..hashes + 2 {
            if let Some(c) = self.bump() {
                out.push(c);
            }
        }
        while let Some(c) = self.bump() {
            out.push(c);
            if c == '"' && (0..hashes).all(|n| self.peek_nth(n) == Some('#')) {
                for _ in 0..hashes {
                    if let Some(hash) = self.bump() {
                        out.push(hash);
                    }
                }
                return Ok(());
            }
        }
        Err(self.error(open, format!("Unterminated raw string in {what}")))
    }
}

/// Parses a whole template.
pub fn parse_template(src: &str, line_offset: usize) -> SegmentResult<Vec<Node>> {
    let mut cursor = Cursor::new(src, line_offset);
    let (nodes, terminator) = parse_nodes(&mut cursor, &[])?;
    debug_assert!(terminator.is_none());
    Ok(nodes)
}

/// Flushes buffered literal text into a chunk.
fn flush_text(nodes: &mut Vec<Node>, text: &mut String) {
    if !text.is_empty() {
        nodes.push(Node::Chunk(Chunk::Literal(std::mem::take(text))));
    }
}

fn parse_nodes(
    cursor: &mut Cursor,
    stop_at: &[Terminator],
) -> SegmentResult<(Vec<Node>, Option<(Terminator, Pos)>)> {
    let mut nodes = Vec::new();
    let mut text = String::new();

    while let Some(c) = cursor.peek() {
        let start = cursor.pos();
        match c {
            '@' if cursor.peek_nth(1) == Some('@') => {
                cursor.bump_n(2);
                text.push('@');
            }
            '@' if cursor.peek_nth(1) == Some('{') => {
                cursor.bump_n(2);
                let src = cursor.read_braced(start, "`@{` interpolation")?;
                let code = parse_expr(cursor, start, &src)?;
                flush_text(&mut nodes, &mut text);
                nodes.push(Node::Chunk(Chunk::output(code)));
            }
            '{' if cursor.starts_with("{>") => {
                cursor.bump_n(2);
                let comment = read_comment(cursor, start)?;
                flush_text(&mut nodes, &mut text);
                nodes.push(Node::Chunk(Chunk::Expression {
                    marker: Marker::Other("comment".to_string()),
                    code: quote!(#comment),
                }));
            }
            '{' if matches!(cursor.peek_nth(1), Some('#' | ':' | '/' | '$')) => {
                cursor.bump();
                let tag = cursor.read_braced(start, "template tag")?;
                flush_text(&mut nodes, &mut text);
                match parse_tag(cursor, start, &tag)? {
                    Tag::Chunk(chunk) => nodes.push(Node::Chunk(chunk)),
                    Tag::If(cond) => {
                        let node = parse_if_chain(cursor, start, cond)?;
                        nodes.push(Node::Control(node));
                    }
                    Tag::For { pat, iter } => {
                        let (body, terminator) = parse_nodes(cursor, &[Terminator::EndFor])?;
                        if !matches!(terminator, Some((Terminator::EndFor, _))) {
                            let message = "Unclosed {#for} block: missing {/for}";
                            return Err(cursor.error(start, message));
                        }
                        nodes.push(Node::Control(ControlNode::For { pat, iter, body }));
                    }
                    Tag::Terminator(terminator) => {
                        let expected = stop_at.iter().any(|stop| {
                            std::mem::discriminant(stop) == std::mem::discriminant(&terminator)
                        });
                        if expected {
                            return Ok((nodes, Some((terminator, start))));
                        }
                        return Err(cursor.error(start, unexpected_message(&terminator)));
                    }
                }
            }
            _ => {
                cursor.bump();
                text.push(c);
            }
        }
    }

    flush_text(&mut nodes, &mut text);
    Ok((nodes, None))
}

fn unexpected_message(terminator: &Terminator) -> &'static str {
    match terminator {
        Terminator::Else => "Unexpected {:else} - not inside an {#if} block",
        Terminator::ElseIf(_) => "Unexpected {:else if} - not inside an {#if} block",
        Terminator::EndIf => "Unexpected {/if}",
        Terminator::EndFor => "Unexpected {/for}",
    }
}

fn parse_if_chain(
    cursor: &mut Cursor,
    open: Pos,
    cond: TokenStream2,
) -> SegmentResult<ControlNode> {
    let stops = [
        Terminator::Else,
        Terminator::ElseIf(TokenStream2::new()),
        Terminator::EndIf,
    ];
    let mut branches = Vec::new();
    let mut cond = cond;

    loop {
        let (body, terminator) = parse_nodes(cursor, &stops)?;
        branches.push((cond, body));
        match terminator {
            Some((Terminator::ElseIf(next), _)) => cond = next,
            Some((Terminator::Else, else_at)) => {
                let (else_body, terminator) = parse_nodes(cursor, &[Terminator::EndIf])?;
                if !matches!(terminator, Some((Terminator::EndIf, _))) {
                    return Err(cursor.error(else_at, "Unclosed {:else} branch: missing {/if}"));
                }
                return Ok(ControlNode::If {
                    branches,
                    else_branch: Some(else_body),
                });
            }
            Some((Terminator::EndIf, _)) => {
                return Ok(ControlNode::If {
                    branches,
                    else_branch: None,
                });
            }
            _ => return Err(cursor.error(open, "Unclosed {#if} block: missing {/if}")),
        }
    }
}

fn read_comment(cursor: &mut Cursor, open: Pos) -> SegmentResult<String> {
    let mut text = String::new();
    while cursor.peek().is_some() {
        if cursor.starts_with("<}") {
            cursor.bump_n(2);
            return Ok(text.trim().to_string());
        }
        if let Some(c) = cursor.bump() {
            text.push(c);
        }
    }
    Err(cursor.error(open, "Unclosed comment: missing `<}`"))
}

enum Tag {
    Chunk(Chunk<TokenStream2>),
    If(TokenStream2),
    For { pat: TokenStream2, iter: TokenStream2 },
    Terminator(Terminator),
}

fn parse_tag(cursor: &Cursor, at: Pos, tag: &str) -> SegmentResult<Tag> {
    let tag = tag.trim();

    if let Some(rest) = keyword(tag, "#if") {
        return Ok(Tag::If(parse_condition(cursor, at, rest, "{#if}")?));
    }
    if let Some(rest) = keyword(tag, "#for") {
        return parse_for_head(cursor, at, rest);
    }
    if let Some(rest) = keyword(tag, ":else") {
        if rest.is_empty() {
            return Ok(Tag::Terminator(Terminator::Else));
        }
        if let Some(cond) = keyword(rest, "if") {
            let cond = parse_condition(cursor, at, cond, "{:else if}")?;
            return Ok(Tag::Terminator(Terminator::ElseIf(cond)));
        }
    }
    match tag {
        "/if" => return Ok(Tag::Terminator(Terminator::EndIf)),
        "/for" => return Ok(Tag::Terminator(Terminator::EndFor)),
        _ => {}
    }
    if let Some(rest) = keyword(tag, "$do") {
        let code = parse_expr(cursor, at, rest)?;
        return Ok(Tag::Chunk(Chunk::effect(code)));
    }
    if let Some(rest) = keyword(tag, "$let") {
        let stmt = format!("let {rest};");
        if let Err(err) = syn::parse_str::<syn::Stmt>(&stmt) {
            return Err(cursor.error(at, format!("Invalid binding in {{$let}}: {err}")));
        }
        let code = lex(cursor, at, &format!("let {rest}"))?;
        return Ok(Tag::Chunk(Chunk::effect(code)));
    }

    Err(cursor.error(at, format!("Unknown template tag `{{{tag}}}`")))
}

/// Strips `word` from the front of `tag` when followed by whitespace or the end.
fn keyword<'a>(tag: &'a str, word: &str) -> Option<&'a str> {
    let rest = tag.strip_prefix(word)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn lex(cursor: &Cursor, at: Pos, src: &str) -> SegmentResult<TokenStream2> {
    TokenStream2::from_str(src)
        .map_err(|err| cursor.error(at, format!("Invalid Rust tokens: {err}")))
}

fn parse_expr(cursor: &Cursor, at: Pos, src: &str) -> SegmentResult<TokenStream2> {
    if src.trim().is_empty() {
        return Err(cursor.error(at, "Empty expression"));
    }
    match syn::parse_str::<syn::Expr>(src) {
        Ok(_) => lex(cursor, at, src),
        Err(err) => {
            let message = format!("Invalid Rust expression `{}`: {err}", src.trim());
            Err(cursor.error(at, message))
        }
    }
}

/// Conditions are kept as raw tokens so `let` patterns (`{#if let Some(x) = y}`)
/// pass through to the generated `if`.
fn parse_condition(
    cursor: &Cursor,
    at: Pos,
    src: &str,
    what: &str,
) -> SegmentResult<TokenStream2> {
    if src.is_empty() {
        return Err(cursor.error(at, format!("Missing condition in {what}")));
    }
    lex(cursor, at, src)
}

fn parse_for_head(cursor: &Cursor, at: Pos, src: &str) -> SegmentResult<Tag> {
    let tokens = lex(cursor, at, src)?;
    let mut pat = TokenStream2::new();
    let mut iter = TokenStream2::new();
    let mut seen_in = false;

    for tt in tokens {
        if !seen_in && matches!(&tt, TokenTree::Ident(ident) if ident == "in") {
            seen_in = true;
        } else if seen_in {
            iter.extend(std::iter::once(tt));
        } else {
            pat.extend(std::iter::once(tt));
        }
    }

    if !seen_in || pat.is_empty() || iter.is_empty() {
        return Err(cursor.error(at, "Expected {#for pattern in expression}"));
    }
    if let Err(err) = syn::parse::Parser::parse2(syn::Pat::parse_single, pat.clone()) {
        return Err(cursor.error(at, format!("Invalid pattern in {{#for}}: {err}")));
    }
    if let Err(err) = syn::parse2::<syn::Expr>(iter.clone()) {
        return Err(cursor.error(at, format!("Invalid iterator in {{#for}}: {err}")));
    }
    Ok(Tag::For { pat, iter })
}
