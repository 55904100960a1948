//! The closed set of diagnostics the compiler can produce.

use super::message::Severity;

/// What went wrong. One variant per failure class; the human-readable
/// message is filled in at the report site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DiagnosticKind {
    /// Source text did not parse.
    SyntaxError,
    /// Body of a loop marked stable has a non-zero pointer or generation
    /// delta.
    LoopNotStable,
    /// Loop entered with the current cell provably zero; the loop is
    /// dropped from the output.
    IneffectiveLoop,
    /// Path root is not a declared memory location.
    MemNotFound,
    /// `run` references an unknown macro.
    MacroNotFound,
    /// `run` argument count does not match the macro's parameter list.
    WrongArgumentCount,
    /// `run` argument type does not match the parameter's declared type.
    WrongArgumentType,
    /// The active path of a declaration names none of the declared
    /// locations.
    DeclareLocnameNotFound,
    /// Declaration references a type that is not registered.
    TypeNotFound,
    /// Path steps through a field the type does not have.
    FieldNotFound,
    /// The pointer cannot be placed on a value wider than one cell.
    GotoWide,
    /// `def` reuses an existing macro name.
    MacroRedefined,
    /// `struct` reuses an existing type name.
    TypeRedefined,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::IneffectiveLoop => Severity::Warning,
            _ => Severity::Error,
        }
    }
}
