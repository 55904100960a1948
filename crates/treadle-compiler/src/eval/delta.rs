//! Composable summaries of what a code fragment does to the tape.
//!
//! A `StateDelta` is the pure effect of a fragment: which cells it
//! touches (at offsets relative to the pointer position before the
//! fragment), how far it moves the pointer, and whether it invalidates
//! the pointer generation. Deltas compose sequentially with [`then`] and
//! close under loop repetition with [`repeated`], which is what lets the
//! compiler reason about a loop body once instead of per iteration.
//!
//! [`then`]: StateDelta::then
//! [`repeated`]: StateDelta::repeated

use std::collections::BTreeMap;

use super::cell_action::CellAction;

/// The pure effect of a code fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateDelta {
    /// Cell transfer functions, keyed by offset from the pre-fragment
    /// pointer position. Offsets are only meaningful while the fragment's
    /// entry generation is live.
    pub cells: BTreeMap<i64, CellAction>,
    /// Net pointer movement.
    pub ptr_delta: i64,
    /// How many times the fragment invalidates positional knowledge.
    pub gen_delta: u32,
}

impl StateDelta {
    /// The do-nothing delta.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Pure pointer movement.
    pub fn shift(ptr_delta: i64) -> Self {
        Self {
            ptr_delta,
            ..Self::default()
        }
    }

    /// A single action on the current cell.
    pub fn action(action: CellAction) -> Self {
        let mut cells = BTreeMap::new();
        cells.insert(0, action);
        Self {
            cells,
            ..Self::default()
        }
    }

    /// Net pointer movement zero and generation untouched.
    pub fn is_stable(&self) -> bool {
        self.ptr_delta == 0 && self.gen_delta == 0
    }

    /// Sequential composition: `self`, then `next`.
    ///
    /// If `next` invalidates the generation, everything known about
    /// `self` is useless and `next` wins outright. Otherwise `next`'s
    /// offsets are rebased into `self`'s frame and folded in with
    /// [`CellAction::after`].
    pub fn then(&self, next: &StateDelta) -> StateDelta {
        if next.gen_delta > 0 {
            return next.clone();
        }

        let mut result = StateDelta {
            cells: self.cells.clone(),
            ptr_delta: self.ptr_delta + next.ptr_delta,
            gen_delta: self.gen_delta,
        };

        for (&offset, &action) in &next.cells {
            let rebased = offset + self.ptr_delta;
            result
                .cells
                .entry(rebased)
                .and_modify(|existing| *existing = action.after(*existing))
                .or_insert(action);
        }

        result
    }

    /// Closure under an unknown number of repetitions.
    ///
    /// A stable delta keeps its footprint with each action repeated; an
    /// unstable one tells us nothing except that the pointer ended up
    /// somewhere unknowable.
    pub fn repeated(&self) -> StateDelta {
        if self.is_stable() {
            StateDelta {
                cells: self
                    .cells
                    .iter()
                    .map(|(&offset, &action)| (offset, action.repeated()))
                    .collect(),
                ptr_delta: 0,
                gen_delta: 0,
            }
        } else {
            StateDelta {
                cells: BTreeMap::new(),
                ptr_delta: 0,
                gen_delta: self.gen_delta + 1,
            }
        }
    }
}

impl std::fmt::Display for StateDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StateDelta(Δptr={}, Δgen={}, cells={{", self.ptr_delta, self.gen_delta)?;
        for (i, (offset, action)) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", offset, action)?;
        }
        write!(f, "}})")
    }
}
