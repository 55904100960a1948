//! Per-cell transfer functions.
//!
//! A `CellAction` describes how one tape cell is transformed by a stretch
//! of code, independent of every other cell. The three variants form a
//! tiny lattice: `Delta` composes additively, `SetTo` absorbs whatever
//! came before it, and `Unknown` is the top that everything collapses to
//! once the compiler loses track.

/// Effect of a code fragment on a single 8-bit wrapping cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAction {
    /// Add `n` modulo 256.
    Delta(u8),
    /// Overwrite with a known constant.
    SetTo(u8),
    /// Anything could have happened.
    Unknown,
}

impl CellAction {
    /// Apply to a known value, or `None` when the value is unknown.
    pub fn apply(self, value: Option<u8>) -> Option<u8> {
        match self {
            CellAction::Delta(0) => value,
            CellAction::Delta(n) => value.map(|v| v.wrapping_add(n)),
            CellAction::SetTo(v) => Some(v),
            CellAction::Unknown => None,
        }
    }

    /// Sequential composition: the single action equivalent to `before`
    /// followed by `self`.
    pub fn after(self, before: CellAction) -> CellAction {
        match (self, before) {
            (CellAction::Delta(n), CellAction::Delta(m)) => CellAction::Delta(n.wrapping_add(m)),
            (CellAction::Delta(n), CellAction::SetTo(v)) => CellAction::SetTo(v.wrapping_add(n)),
            (CellAction::Delta(_), CellAction::Unknown) => CellAction::Unknown,
            (CellAction::SetTo(v), _) => CellAction::SetTo(v),
            (CellAction::Unknown, _) => CellAction::Unknown,
        }
    }

    /// Closure under an unknown number of repetitions (zero included).
    ///
    /// `SetTo` does not survive: with zero iterations the cell keeps its
    /// old value, so the result can only be unknown.
    pub fn repeated(self) -> CellAction {
        match self {
            CellAction::Delta(0) => CellAction::Delta(0),
            _ => CellAction::Unknown,
        }
    }

    pub fn is_identity(self) -> bool {
        self == CellAction::Delta(0)
    }
}

impl std::fmt::Display for CellAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellAction::Delta(n) => write!(f, "Δ{}", n),
            CellAction::SetTo(v) => write!(f, "={}", v),
            CellAction::Unknown => write!(f, "?"),
        }
    }
}
