//! Unit tests for the lexer.

use treadle_core::{SourceId, Span};

use crate::diagnostics::Diagnostics;

use super::lexer::{Token, include_path, lex};

fn tokens(text: &str) -> (Vec<Token<'_>>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let lexed = lex(SourceId(0), text, &mut diagnostics);
    (lexed.into_iter().map(|(token, _)| token).collect(), diagnostics)
}

#[test]
fn primitives_and_brackets() {
    let (lexed, diag) = tokens("+-<>.,[]");
    assert_eq!(
        lexed,
        vec![
            Token::Plus,
            Token::Minus,
            Token::Left,
            Token::Right,
            Token::Dot,
            Token::Comma,
            Token::BracketOpen,
            Token::BracketClose,
        ]
    );
    assert!(diag.is_empty());
}

#[test]
fn keywords_beat_identifiers_only_on_exact_matches() {
    let (lexed, _) = tokens("declare declared to tot");
    assert_eq!(
        lexed,
        vec![
            Token::KwDeclare,
            Token::Ident("declared"),
            Token::KwTo,
            Token::Ident("tot"),
        ]
    );
}

#[test]
fn comments_are_skipped() {
    let (lexed, diag) = tokens("// line\n+ /* block\nspanning */ -");
    assert_eq!(lexed, vec![Token::Plus, Token::Minus]);
    assert!(diag.is_empty());
}

#[test]
fn integers_lex_as_counts() {
    let (lexed, _) = tokens("+ 42");
    assert_eq!(lexed, vec![Token::Plus, Token::Int(42)]);
}

#[test]
fn include_directives_are_one_token() {
    let (lexed, diag) = tokens("#include lib/strings.tr");
    assert_eq!(lexed.len(), 1);
    let Token::Include(directive) = lexed[0] else {
        panic!("expected an include token, got {:?}", lexed[0]);
    };
    assert_eq!(include_path(directive), "lib/strings.tr");
    assert!(diag.is_empty());
}

#[test]
fn include_allows_space_after_the_hash() {
    let (lexed, _) = tokens("# include lib.tr");
    let Token::Include(directive) = lexed[0] else {
        panic!("expected an include token, got {:?}", lexed[0]);
    };
    assert_eq!(include_path(directive), "lib.tr");
}

#[test]
fn unlexable_runs_merge_into_one_error() {
    let (lexed, diag) = tokens("+ %$ -");
    assert_eq!(lexed, vec![Token::Plus, Token::Minus]);
    assert_eq!(diag.len(), 1);
    let message = diag.iter().next().unwrap();
    assert!(message.message.contains("%$"), "got: {}", message.message);
}

#[test]
fn spans_point_into_the_source() {
    let mut diagnostics = Diagnostics::new();
    let lexed = lex(SourceId(3), "+ -", &mut diagnostics);
    assert_eq!(lexed[0].1, Span::new(SourceId(3), 0, 1));
    assert_eq!(lexed[1].1, Span::new(SourceId(3), 2, 3));
}
