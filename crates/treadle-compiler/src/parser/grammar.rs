//! Recursive-descent parser from tokens to the construct tree.
//!
//! The parser never fails outright: errors are reported into the
//! session's diagnostics, the offending tokens are skipped, and whatever
//! parsed cleanly is kept. Includes are resolved and spliced in here, one
//! parse per canonical file name.

use std::collections::HashSet;
use std::rc::Rc;

use treadle_core::{SourceId, SourceMap, Span};

use crate::diagnostics::{DiagnosticKind, DiagnosticMessage, Diagnostics};

use super::ast::{Construct, FrameDecl, MacroDef, PathExpr, Prim};
use super::include::IncludeResolver;
use super::lexer::{self, Token, include_path};

/// Nesting limit; deeper input is rejected rather than risking the stack.
const MAX_DEPTH: u32 = 200;

/// Everything one parse shares across files: the source map the files
/// land in, the include resolver, and the collected diagnostics.
pub struct ParseSession<'r> {
    pub map: &'r mut SourceMap,
    pub resolver: &'r mut dyn IncludeResolver,
    pub diagnostics: Diagnostics,
    included: HashSet<String>,
}

impl<'r> ParseSession<'r> {
    pub fn new(map: &'r mut SourceMap, resolver: &'r mut dyn IncludeResolver) -> Self {
        Self {
            map,
            resolver,
            diagnostics: Diagnostics::new(),
            included: HashSet::new(),
        }
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

/// Parse the file registered as `root`, splicing in includes as they are
/// encountered.
pub fn parse(session: &mut ParseSession, root: SourceId) -> Construct {
    if let Some(file) = session.map.get(root) {
        let name = file.name.clone();
        session.included.insert(name);
    }
    parse_source(session, root)
}

fn parse_source(session: &mut ParseSession, id: SourceId) -> Construct {
    let (name, text) = match session.map.get(id) {
        Some(file) => (file.name.clone(), file.text.clone()),
        None => return Construct::empty(Span::new(id, 0, 0)),
    };

    let tokens = lexer::lex(id, &text, &mut session.diagnostics);
    let mut parser = Parser {
        session,
        tokens,
        pos: 0,
        source: id,
        file_name: name,
        eof: text.len() as u32,
        depth: 0,
    };
    parser.parse_program()
}

struct Parser<'s, 'r, 't> {
    session: &'s mut ParseSession<'r>,
    tokens: Vec<(Token<'t>, Span)>,
    pos: usize,
    source: SourceId,
    file_name: String,
    eof: u32,
    depth: u32,
}

impl<'s, 'r, 't> Parser<'s, 'r, 't> {
    fn peek(&self) -> Option<Token<'t>> {
        self.tokens.get(self.pos).map(|&(token, _)| token)
    }

    fn peek2(&self) -> Option<Token<'t>> {
        self.tokens.get(self.pos + 1).map(|&(token, _)| token)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|&(_, span)| span)
            .unwrap_or_else(|| Span::new(self.source, self.eof, self.eof))
    }

    /// Span of the most recently consumed token.
    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            Span::new(self.source, 0, 0)
        } else {
            self.tokens[self.pos - 1].1
        }
    }

    fn advance(&mut self) -> Option<(Token<'t>, Span)> {
        let item = self.tokens.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.session
            .diagnostics
            .push(DiagnosticMessage::new(DiagnosticKind::SyntaxError, span, message));
    }

    fn eat(&mut self, expected: Token<'t>) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token<'t>, what: &str) -> bool {
        if self.eat(expected) {
            true
        } else {
            let span = self.current_span();
            self.error(span, format!("expected {}", what));
            false
        }
    }

    fn expect_ident(&mut self, what: &str) -> Option<(String, Span)> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let span = self.current_span();
                self.advance();
                Some((name.to_string(), span))
            }
            _ => {
                let span = self.current_span();
                self.error(span, format!("expected {}", what));
                None
            }
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_program(&mut self) -> Construct {
        let start = self.current_span();
        let (items, end) = self.parse_blocks_until(None);
        Construct::Sequence {
            span: start.join(end),
            items,
        }
    }

    /// Parse blocks until the given closer (or end of file). Returns the
    /// items and the span where parsing stopped.
    fn parse_blocks_until(&mut self, closing: Option<Token<'t>>) -> (Vec<Construct>, Span) {
        let mut items = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                let span = Span::new(self.source, self.eof, self.eof);
                if let Some(close) = closing {
                    self.error(
                        span,
                        format!("expected `{}` before end of file", close_glyph(close)),
                    );
                }
                return (items, span);
            };

            if Some(token) == closing {
                let (_, span) = self.advance().expect("peeked token exists");
                return (items, span);
            }

            if matches!(
                token,
                Token::ParenClose | Token::BracketClose | Token::BraceClose
            ) {
                let span = self.current_span();
                self.error(span, format!("unexpected `{}`", close_glyph(token)));
                self.advance();
                continue;
            }

            if let Some(block) = self.parse_block() {
                let block = self.attach_repetition(block);
                items.push(block);
            }
        }
    }

    /// `block INT` repeats the block; counts stack (`+ 3 2` is `(+ 3) 2`).
    fn attach_repetition(&mut self, mut block: Construct) -> Construct {
        while let Some(Token::Int(count)) = self.peek() {
            let span = self.current_span();
            self.advance();
            block = Construct::Repeat {
                span: block.span().join(span),
                body: Box::new(block),
                count,
            };
        }
        block
    }

    fn parse_block(&mut self) -> Option<Construct> {
        let token = self.peek()?;
        let span = self.current_span();

        if self.depth >= MAX_DEPTH {
            self.error(span, "constructs nested too deeply");
            self.advance();
            return None;
        }

        match token {
            Token::Plus => self.prim(Prim::Inc),
            Token::Minus => self.prim(Prim::Dec),
            Token::Right => self.prim(Prim::Right),
            Token::Left => self.prim(Prim::Left),
            Token::Dot => self.prim(Prim::Write),
            Token::Comma => self.prim(Prim::Read),

            Token::BracketOpen => {
                self.advance();
                self.parse_loop_body(span, true)
            }
            Token::KwUnstable => {
                self.advance();
                if !self.expect(Token::BracketOpen, "`[` after `unstable`") {
                    return None;
                }
                self.parse_loop_body(span, false)
            }
            Token::ParenOpen => {
                self.advance();
                let (items, end) = self.nested(|p| p.parse_blocks_until(Some(Token::ParenClose)));
                Some(Construct::Sequence {
                    span: span.join(end),
                    items,
                })
            }

            Token::KwDeclare => {
                self.advance();
                let frame = self.parse_frame()?;
                Some(Construct::DeclareLocations {
                    span: span.join(frame.span),
                    frame,
                })
            }
            Token::KwUndeclare => self.parse_undeclare(span),
            Token::KwTo => {
                self.advance();
                let path = self.parse_path()?;
                Some(Construct::Goto {
                    span: span.join(path.span),
                    path,
                })
            }
            Token::KwDef => self.parse_macro_decl(span),
            Token::KwRun => self.parse_invoke(span),
            Token::KwAssume => {
                self.advance();
                self.expect(Token::KwStable, "`stable` after `assume`");
                if !self.expect(Token::BraceOpen, "`{` after `assume stable`") {
                    return None;
                }
                let (items, end) = self.nested(|p| p.parse_blocks_until(Some(Token::BraceClose)));
                let full = span.join(end);
                Some(Construct::AssumeStable {
                    span: full,
                    body: Box::new(Construct::Sequence { span: full, items }),
                })
            }
            Token::KwStruct => self.parse_type_decl(span),
            Token::KwDebug => {
                self.advance();
                Some(Construct::Debug { span })
            }
            Token::Include(directive) => self.parse_include(span, directive),

            Token::Int(_) => {
                self.error(span, "a repetition count must follow a construct");
                self.advance();
                None
            }
            _ => {
                self.error(span, "expected a construct");
                self.advance();
                None
            }
        }
    }

    fn prim(&mut self, prim: Prim) -> Option<Construct> {
        let span = self.current_span();
        self.advance();
        Some(Construct::Prim { span, prim })
    }

    fn parse_loop_body(&mut self, open: Span, stable: bool) -> Option<Construct> {
        let (items, end) = self.nested(|p| p.parse_blocks_until(Some(Token::BracketClose)));
        let span = open.join(end);
        Some(Construct::Loop {
            span,
            stable,
            body: Box::new(Construct::Sequence { span, items }),
        })
    }

    /// `( name[: Type], … ) at path` or `( … ) with path at path`.
    fn parse_frame(&mut self) -> Option<FrameDecl> {
        let open = self.current_span();
        if !self.expect(Token::ParenOpen, "`(` to start the declaration list") {
            return None;
        }

        let mut decls = Vec::new();
        if self.peek() != Some(Token::ParenClose) {
            loop {
                if let Some(decl) = self.parse_vardec() {
                    decls.push(decl);
                }
                if !self.eat(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::ParenClose, "`)` to close the declaration list");

        let (from, active) = match self.peek() {
            Some(Token::KwAt) => {
                self.advance();
                let active = self.parse_path()?;
                (None, active)
            }
            Some(Token::KwWith) => {
                self.advance();
                let active = self.parse_path()?;
                self.expect(Token::KwAt, "`at` after the active path");
                let from = self.parse_path()?;
                (Some(from), active)
            }
            _ => {
                let span = self.current_span();
                self.error(span, "expected `at` or `with` after the declaration list");
                let fallback = decls
                    .first()
                    .map(|(name, _)| name.clone())
                    .unwrap_or_else(|| "_".to_string());
                (None, PathExpr::new(span, vec![fallback]))
            }
        };

        Some(FrameDecl {
            span: open.join(self.prev_span()),
            decls,
            from,
            active,
        })
    }

    /// `name` or `name: Type`; the type defaults to `Byte`.
    fn parse_vardec(&mut self) -> Option<(String, String)> {
        let (name, _) = self.expect_ident("a location name")?;
        let type_name = if self.eat(Token::Colon) {
            match self.expect_ident("a type name") {
                Some((type_name, _)) => type_name,
                None => "Byte".to_string(),
            }
        } else {
            "Byte".to_string()
        };
        Some((name, type_name))
    }

    fn parse_path(&mut self) -> Option<PathExpr> {
        let (first, mut span) = self.expect_ident("a location name")?;
        let mut parts = vec![first];

        // `a.b.c`: a dot only extends the path when an identifier
        // follows, otherwise it is the write instruction.
        while self.peek() == Some(Token::Dot) && matches!(self.peek2(), Some(Token::Ident(_))) {
            self.advance();
            let (part, part_span) = self.expect_ident("a field name")?;
            parts.push(part);
            span = span.join(part_span);
        }

        Some(PathExpr::new(span, parts))
    }

    fn parse_undeclare(&mut self, span: Span) -> Option<Construct> {
        self.advance();
        if !self.expect(Token::ParenOpen, "`(` after `undeclare`") {
            return None;
        }

        let mut names = Vec::new();
        if self.peek() != Some(Token::ParenClose) {
            loop {
                if let Some((name, _)) = self.expect_ident("a location name") {
                    names.push(name);
                }
                if !self.eat(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::ParenClose, "`)` to close the name list");

        Some(Construct::Undeclare {
            span: span.join(self.prev_span()),
            names,
        })
    }

    fn parse_macro_decl(&mut self, span: Span) -> Option<Construct> {
        self.advance();
        let (name, _) = self.expect_ident("a macro name")?;
        let params = self.parse_frame()?;

        if !self.expect(Token::BraceOpen, "`{` to open the macro body") {
            return None;
        }
        let (items, end) = self.nested(|p| p.parse_blocks_until(Some(Token::BraceClose)));

        let full = span.join(end);
        Some(Construct::MacroDecl {
            def: Rc::new(MacroDef {
                span: full,
                name,
                params,
                body: Construct::Sequence { span: full, items },
            }),
        })
    }

    fn parse_invoke(&mut self, span: Span) -> Option<Construct> {
        self.advance();
        let (name, _) = self.expect_ident("a macro name")?;

        if !self.expect(Token::ParenOpen, "`(` after the macro name") {
            return None;
        }
        let mut args = Vec::new();
        if self.peek() != Some(Token::ParenClose) {
            loop {
                if let Some(path) = self.parse_path() {
                    args.push(path);
                }
                if !self.eat(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::ParenClose, "`)` to close the argument list");

        Some(Construct::Invoke {
            span: span.join(self.prev_span()),
            name,
            args,
        })
    }

    fn parse_type_decl(&mut self, span: Span) -> Option<Construct> {
        self.advance();
        let (name, _) = self.expect_ident("a type name")?;

        if !self.expect(Token::BraceOpen, "`{` to open the field list") {
            return None;
        }

        let mut fields = Vec::new();
        loop {
            if self.peek() == Some(Token::BraceClose) || self.peek().is_none() {
                break;
            }
            let Some((field, _)) = self.expect_ident("a field name") else {
                break;
            };
            self.expect(Token::Colon, "`:` after the field name");
            let type_name = match self.expect_ident("a type name") {
                Some((type_name, _)) => type_name,
                None => "Byte".to_string(),
            };
            fields.push((field, type_name));
            if !self.eat(Token::Comma) {
                break;
            }
        }
        self.expect(Token::BraceClose, "`}` to close the field list");

        Some(Construct::TypeDecl {
            span: span.join(self.prev_span()),
            name,
            fields,
        })
    }

    fn parse_include(&mut self, span: Span, directive: &str) -> Option<Construct> {
        self.advance();
        let request = include_path(directive).to_string();

        match self.session.resolver.resolve(&self.file_name, &request) {
            Err(err) => {
                self.error(span, format!("cannot include `{}`: {}", request, err));
                Some(Construct::empty(span))
            }
            Ok((name, text)) => {
                // Each file is spliced at most once; repeats collapse to a
                // no-op so mutual includes terminate.
                if !self.session.included.insert(name.clone()) {
                    return Some(Construct::empty(span));
                }
                let id = self.session.map.insert(name, text);
                Some(parse_source(self.session, id))
            }
        }
    }
}

fn close_glyph(token: Token) -> char {
    match token {
        Token::ParenClose => ')',
        Token::BracketClose => ']',
        Token::BraceClose => '}',
        _ => '?',
    }
}
