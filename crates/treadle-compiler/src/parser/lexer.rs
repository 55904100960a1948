//! Token definitions and the lexing entry point.

use logos::Logos;
use treadle_core::{SourceId, Span};

use crate::diagnostics::{DiagnosticKind, DiagnosticMessage, Diagnostics};

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*(?:[^*]|\*[^/])*\*/")]
pub enum Token<'src> {
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("<")]
    Left,

    #[token(">")]
    Right,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token(":")]
    Colon,

    #[token("declare")]
    KwDeclare,

    #[token("undeclare")]
    KwUndeclare,

    #[token("to")]
    KwTo,

    #[token("def")]
    KwDef,

    #[token("run")]
    KwRun,

    #[token("unstable")]
    KwUnstable,

    #[token("assume")]
    KwAssume,

    #[token("stable")]
    KwStable,

    #[token("struct")]
    KwStruct,

    #[token("at")]
    KwAt,

    #[token("with")]
    KwWith,

    #[token("debug")]
    KwDebug,

    /// A whole `#include some/path` directive; the path is recovered with
    /// [`include_path`].
    #[regex(r"#[ \t]*include[ \t]+[^ \t\r\n]+")]
    Include(&'src str),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
    Int(u32),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'src str),
}

/// The path part of an `#include` directive token.
pub fn include_path(directive: &str) -> &str {
    let after = &directive[directive.find("include").map(|i| i + "include".len()).unwrap_or(0)..];
    after.trim_start_matches([' ', '\t'])
}

/// Tokenize `text`, reporting unlexable fragments as syntax errors.
///
/// Runs of adjacent bad bytes merge into a single diagnostic so line
/// noise doesn't produce one error per character.
pub fn lex<'src>(
    source: SourceId,
    text: &'src str,
    diagnostics: &mut Diagnostics,
) -> Vec<(Token<'src>, Span)> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(text);
    let mut error_span: Option<std::ops::Range<usize>> = None;

    let flush_error = |range: std::ops::Range<usize>, diagnostics: &mut Diagnostics| {
        let fragment = &text[range.clone()];
        diagnostics.push(DiagnosticMessage::new(
            DiagnosticKind::SyntaxError,
            Span::new(source, range.start as u32, range.end as u32),
            format!("unexpected characters `{}`", fragment.trim()),
        ));
    };

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(token) => {
                if let Some(pending) = error_span.take() {
                    flush_error(pending, diagnostics);
                }
                tokens.push((
                    token,
                    Span::new(source, range.start as u32, range.end as u32),
                ));
            }
            Err(()) => match &mut error_span {
                None => error_span = Some(range),
                Some(pending) => pending.end = range.end,
            },
        }
    }

    if let Some(pending) = error_span.take() {
        flush_error(pending, diagnostics);
    }

    tokens
}
