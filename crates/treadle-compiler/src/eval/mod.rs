//! The compilation engine.
//!
//! An abstract interpreter walks the construct tree once, tracking what
//! is knowable about the tape (pointer position, per-cell constants,
//! pointer generation) while generating target code. The module splits
//! into:
//!
//! - `cell_action` — per-cell transfer functions
//! - `delta` — composable whole-fragment effects
//! - `state` — the interpreter's working state and diagnostics entry point
//! - `types` — memory type registry and layout
//! - `emit` — the lowering rules, one `emit`/`delta` pair per construct
//! - `suggest` — edit-distance name suggestions for diagnostics

mod cell_action;
mod delta;
mod emit;
mod state;
mod suggest;
mod types;

#[cfg(test)]
mod emit_tests;
#[cfg(test)]
mod types_tests;

pub use cell_action::CellAction;
pub use delta::StateDelta;
pub use state::State;
pub use types::{Type, TypeTable, builtin_types, field_path, size_of};
