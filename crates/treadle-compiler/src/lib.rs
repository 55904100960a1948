#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Treadle compiler: a structured superset of the eight-instruction tape
//! language, compiled down to the bare tape machine.
//!
//! The pipeline:
//! - `parser` — lexer, recursive-descent grammar, include splicing
//! - `eval` — the abstract interpreter and lowering rules
//! - `pregen` — the pre-built `add N` / `dec N` / `set N` macro table
//! - `postproc` — peephole cleanup of the emitted target code
//! - `diagnostics` — error collection and rendering
//!
//! [`compile`] runs the whole pipeline; [`compile_str`] is the one-file
//! convenience wrapper.

pub mod diagnostics;
pub mod eval;
pub mod parser;
pub mod postproc;
pub mod pregen;

#[cfg(test)]
pub mod test_utils;

pub use diagnostics::{DiagnosticKind, DiagnosticMessage, Diagnostics, DiagnosticsPrinter, Severity};
pub use eval::{CellAction, State, StateDelta};
pub use parser::{FsResolver, IncludeError, IncludeResolver, NoIncludes, ParseSession, StaticResolver};
pub use treadle_core::{SourceId, SourceMap, Span};

/// The result of compiling a program: target code plus everything the
/// compiler had to say about it. The caller decides whether a non-zero
/// error count means failure.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Target code over `+ - < > [ ] . ,`.
    pub code: String,
    pub diagnostics: Diagnostics,
}

impl Compilation {
    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    pub fn is_success(&self) -> bool {
        self.error_count() == 0
    }
}

/// Compile the file registered as `root` in `map`, splicing includes via
/// `resolver`. Runs the peephole pass on the result.
pub fn compile(
    map: &mut SourceMap,
    root: SourceId,
    resolver: &mut dyn IncludeResolver,
) -> Compilation {
    compile_with_options(map, root, resolver, true)
}

/// [`compile`] with the peephole pass made optional.
pub fn compile_with_options(
    map: &mut SourceMap,
    root: SourceId,
    resolver: &mut dyn IncludeResolver,
    peephole: bool,
) -> Compilation {
    let mut session = ParseSession::new(map, resolver);
    let program = parser::parse(&mut session, root);
    let mut diagnostics = session.into_diagnostics();

    let mut state = State::new();
    pregen::install(&mut state);

    let code = program.emit(&mut state);
    diagnostics.extend(state.diagnostics);

    let code = if peephole {
        postproc::peephole(&code)
    } else {
        code
    };

    Compilation { code, diagnostics }
}

/// Compile a single source text with includes disabled.
pub fn compile_str(name: &str, text: &str) -> Compilation {
    let mut map = SourceMap::new();
    let root = map.insert(name, text);
    let mut resolver = NoIncludes;
    compile(&mut map, root, &mut resolver)
}
