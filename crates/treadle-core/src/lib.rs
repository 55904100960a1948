#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared by the Treadle compiler and CLI.
//!
//! Two concerns:
//! - **Source bookkeeping**: `SourceMap` owns every file that participates in
//!   a compilation (the root file plus anything spliced in by includes) and
//!   hands out stable `SourceId`s. `Span` points into one of those files.
//! - **Terminal colors**: a small ANSI palette for CLI output.

mod colors;


pub use colors::Colors;

/// Identifies one file inside a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SourceId(pub u32);

impl SourceId {
    /// Reserved id for compiler-generated code (the pre-built macro table).
    /// Never resolves to a file in any map.
    pub const BUILTIN: SourceId = SourceId(u32::MAX);
}

/// A half-open byte range inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Span {
    pub source: SourceId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(source: SourceId, start: u32, end: u32) -> Self {
        Self { source, start, end }
    }

    /// Span for generated constructs that have no surface syntax.
    pub fn builtin() -> Self {
        Self::new(SourceId::BUILTIN, 0, 0)
    }

    pub fn is_builtin(&self) -> bool {
        self.source == SourceId::BUILTIN
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// Spans from different files don't merge; `self` wins.
    pub fn join(self, other: Span) -> Span {
        if self.source != other.source {
            return self;
        }
        Span::new(
            self.source,
            self.start.min(other.start),
            self.end.max(other.end),
        )
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One source file: name, contents, and a line index for position lookups.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
    /// Byte offset of the start of each line. `line_starts[0] == 0`.
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(name: String, text: String) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            name,
            text,
            line_starts,
        }
    }

    /// 1-based line and 0-based column for a byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(after) => after - 1,
        };
        (line as u32 + 1, offset - self.line_starts[line])
    }
}

/// Owns every file participating in a compilation.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) -> SourceId {
        let id = SourceId(self.files.len() as u32);
        self.files.push(SourceFile::new(name.into(), text.into()));
        id
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
