//! The abstract interpreter's working state.
//!
//! `State` is everything the compiler knows at one point of the program:
//! where the pointer is, which generation that position belongs to, which
//! cells hold known constants, and the three name registries (macros,
//! types, locations). Code generation mutates one `State` linearly;
//! speculative traversals (loop closures, macro dry-runs) work on clones.

use std::collections::BTreeMap;
use std::rc::Rc;

use indexmap::IndexMap;
use treadle_core::Span;

use crate::diagnostics::{DiagnosticKind, DiagnosticMessage, Diagnostics, Note};
use crate::parser::ast::MacroDef;

use super::delta::StateDelta;
use super::types::{self, Type, TypeTable};

/// Compiler knowledge at one point of the traversal.
#[derive(Debug, Clone)]
pub struct State {
    /// Known cell values by absolute index. Misses fall back to
    /// `default_cell`.
    cells: BTreeMap<i64, Option<u8>>,
    /// `Some(0)` while the tape's initial zero fill is still trustworthy,
    /// `None` once positional knowledge has been invalidated.
    default_cell: Option<u8>,
    /// Absolute pointer position. The origin is arbitrary; only
    /// differences matter.
    pub ptr: i64,
    /// Bumped whenever the pointer's position becomes unknowable. Cell
    /// knowledge and location bindings are only valid within a single
    /// generation.
    pub ptr_gen: u32,
    pub macros: IndexMap<String, Rc<MacroDef>>,
    pub types: TypeTable,
    pub named_locations: IndexMap<String, i64>,
    pub location_types: IndexMap<String, String>,
    pub diagnostics: Diagnostics,
    /// Suppresses diagnostics (and their error count) during speculative
    /// traversals.
    pub quiet: bool,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// A fresh state at the start of a program: pointer at the origin,
    /// every cell known to be zero, no names registered.
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
            default_cell: Some(0),
            ptr: 0,
            ptr_gen: 0,
            macros: IndexMap::new(),
            types: types::builtin_types(),
            named_locations: IndexMap::new(),
            location_types: IndexMap::new(),
            diagnostics: Diagnostics::new(),
            quiet: false,
        }
    }

    /// Known value of the cell at absolute index `idx`, or `None`.
    pub fn cell(&self, idx: i64) -> Option<u8> {
        self.cells.get(&idx).copied().unwrap_or(self.default_cell)
    }

    pub fn set_cell(&mut self, idx: i64, value: Option<u8>) {
        self.cells.insert(idx, value);
    }

    /// Drop all cell knowledge, including the initial zero fill.
    pub fn forget_cells(&mut self) {
        self.cells.clear();
        self.default_cell = None;
    }

    /// A clone that records no diagnostics. Used for the speculative half
    /// of dual traversals so messages aren't reported twice.
    pub fn silenced(&self) -> State {
        let mut probe = self.clone();
        probe.quiet = true;
        probe
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    /// Advance this state by a delta.
    ///
    /// A generation bump wipes cell knowledge and unbinds every named
    /// location: bindings are scoped to the generation they were made in.
    pub fn apply(&mut self, delta: &StateDelta) {
        if delta.gen_delta > 0 {
            self.ptr_gen += delta.gen_delta;
            self.forget_cells();
            self.named_locations.clear();
            self.location_types.clear();
        }

        for (&offset, &action) in &delta.cells {
            let idx = self.ptr + offset;
            let value = action.apply(self.cell(idx));
            self.cells.insert(idx, value);
        }

        self.ptr += delta.ptr_delta;
    }

    /// Start a diagnostic. The returned builder is a no-op when the state
    /// is quiet.
    pub fn report(&mut self, kind: DiagnosticKind, span: Span) -> Report<'_> {
        Report {
            sink: if self.quiet {
                None
            } else {
                Some(&mut self.diagnostics)
            },
            message: DiagnosticMessage::new(kind, span, String::new()),
        }
    }

    pub fn bind_location(&mut self, name: impl Into<String>, at: i64, type_name: impl Into<String>) {
        let name = name.into();
        self.named_locations.insert(name.clone(), at);
        self.location_types.insert(name, type_name.into());
    }

    pub fn unbind_location(&mut self, name: &str) {
        self.named_locations.shift_remove(name);
        self.location_types.shift_remove(name);
    }

    /// First location bound exactly at absolute index `at`, if any.
    pub fn location_at(&self, at: i64) -> Option<&str> {
        self.named_locations
            .iter()
            .find(|&(_, &pos)| pos == at)
            .map(|(name, _)| name.as_str())
    }

    pub fn type_size(&self, name: &str) -> i64 {
        types::size_of(&self.types, name)
    }

    pub fn field_path(&self, type_name: &str, path: &[String]) -> Option<(i64, String)> {
        types::field_path(&self.types, type_name, path)
    }

    pub fn register_type(&mut self, name: impl Into<String>, ty: Type) {
        self.types.insert(name.into(), ty);
    }

    /// Insert a macro without the declaration-time dry-run. Used for the
    /// pre-built macro table.
    pub fn install_macro(&mut self, def: Rc<MacroDef>) {
        self.macros.insert(def.name.clone(), def);
    }

    /// Child state for entering a macro body.
    ///
    /// The child shares the caller's registries, pointer, and cell
    /// knowledge, but sees only its own parameter bindings as locations.
    /// It reports nothing: the body's diagnostics were already surfaced by
    /// the declaration-time dry-run.
    pub fn macro_child(&self) -> State {
        State {
            cells: self.cells.clone(),
            default_cell: self.default_cell,
            ptr: self.ptr,
            ptr_gen: self.ptr_gen,
            macros: self.macros.clone(),
            types: self.types.clone(),
            named_locations: IndexMap::new(),
            location_types: IndexMap::new(),
            diagnostics: Diagnostics::new(),
            quiet: true,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ptr = {} (generation {})", self.ptr, self.ptr_gen)?;

        write!(f, "cells:")?;
        let mut any = false;
        for (&idx, &value) in &self.cells {
            let rendered = match value {
                Some(v) => v.to_string(),
                None => "?".to_string(),
            };
            write!(f, " [{}]={}", idx, rendered)?;
            any = true;
        }
        if !any {
            write!(f, " (none tracked)")?;
        }
        writeln!(
            f,
            " (others {})",
            match self.default_cell {
                Some(v) => v.to_string(),
                None => "?".to_string(),
            }
        )?;

        write!(f, "locations:")?;
        if self.named_locations.is_empty() {
            write!(f, " (none)")?;
        }
        for (name, &at) in &self.named_locations {
            let type_name = self
                .location_types
                .get(name)
                .map(String::as_str)
                .unwrap_or("Byte");
            write!(f, " {}@{}: {}", name, at, type_name)?;
        }
        writeln!(f)?;

        write!(
            f,
            "{} macro(s), {} type(s) defined",
            self.macros.len(),
            self.types.len()
        )
    }
}

/// In-progress diagnostic tied to a state. Dropping it without calling
/// [`Report::emit`] reports nothing.
pub struct Report<'a> {
    sink: Option<&'a mut Diagnostics>,
    message: DiagnosticMessage,
}

impl Report<'_> {
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.message.message = text.into();
        self
    }

    pub fn note(mut self, text: impl Into<String>) -> Self {
        self.message.notes.push(Note::Text(text.into()));
        self
    }

    pub fn span_note(mut self, span: Span) -> Self {
        self.message.notes.push(Note::Span(span));
        self
    }

    pub fn emit(self) {
        if let Some(sink) = self.sink {
            sink.push(self.message);
        }
    }
}
