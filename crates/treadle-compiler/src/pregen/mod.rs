//! The pre-built macro families: `add N`, `dec N`, and `set N` for every
//! byte value, plus the stock struct types.
//!
//! Each macro takes `(res: Byte, tmp: Byte)` with `tmp` as its entry
//! point. Bodies come from a decomposition `n = x·y·(z⁻¹ mod 256) + k`
//! with `z` odd: load `x` into `tmp`, then a transfer loop adds `y` to
//! `res` and subtracts `z` from `tmp` until `tmp` wraps to zero, running
//! exactly `x·z⁻¹` times. Small `n` skip the loop and add directly.
//! Registration is plain table insertion; the bodies are trusted and get
//! no declaration-time dry-run.

use std::rc::Rc;

use treadle_core::Span;

use crate::eval::{State, Type};
use crate::parser::ast::{Construct, FrameDecl, MacroDef, PathExpr, Prim};


/// Install the stock types and the three macro families into `state`.
pub fn install(state: &mut State) {
    install_types(state);
    install_macros(state);
}

fn install_types(state: &mut State) {
    state.register_type(
        "ChPair",
        Type::Struct(vec![
            ("ch1".to_string(), "Byte".to_string()),
            ("ch2".to_string(), "Byte".to_string()),
        ]),
    );
    state.register_type(
        "LChPair",
        Type::Struct(vec![
            ("ch_pair".to_string(), "ChPair".to_string()),
            ("marker".to_string(), "Byte".to_string()),
        ]),
    );
}

fn install_macros(state: &mut State) {
    for n in 0..=255u16 {
        let n = n as u8;
        let (x, y, z, k) = decompose(n);

        state.install_macro(Rc::new(macro_def(
            format!("add{}", n),
            transfer_body(x, y, z, k, false),
        )));

        // Subtracting n is adding its complement.
        let dec_n = n.wrapping_neg();
        state.install_macro(Rc::new(macro_def(
            format!("dec{}", dec_n),
            transfer_body(x, y, z, k, false),
        )));

        state.install_macro(Rc::new(macro_def(
            format!("set{}", n),
            transfer_body(x, y, z, k, true),
        )));
    }
}

fn macro_def(name: String, body: Construct) -> MacroDef {
    MacroDef {
        span: Span::builtin(),
        name,
        params: FrameDecl {
            span: Span::builtin(),
            decls: vec![
                ("res".to_string(), "Byte".to_string()),
                ("tmp".to_string(), "Byte".to_string()),
            ],
            from: None,
            active: path("tmp"),
        },
        body,
    }
}

/// Pick `(x, y, z, k)` with `x·y·(z⁻¹ mod 256) + k ≡ n (mod 256)` and a
/// small generated body. Deterministic: ties keep the first candidate.
pub fn decompose(n: u8) -> (u8, u8, u8, i16) {
    // Baseline: no transfer loop, add n directly.
    let mut best = (0u8, 0u8, 1u8, smallest(n as i16));
    let mut best_cost = magnitude(n) as u32;

    for x in 1..=15u8 {
        for y in 1..=15u8 {
            for z in (1..=15u8).step_by(2) {
                let Some(inv) = inverse_mod_256(z) else {
                    continue;
                };
                let iterations = (x as u32 * inv as u32) % 256;
                let total = (y as u32 * iterations) % 256;
                let k = smallest(n as i16 - total as i16);
                // One `+`/`-` per unit, plus the loop plumbing.
                let cost = x as u32 + y as u32 + z as u32 + k.unsigned_abs() as u32 + 8;
                if cost < best_cost {
                    best_cost = cost;
                    best = (x, y, z, k);
                }
            }
        }
    }

    best
}

/// z⁻¹ mod 256 for odd z, found by counting how often z subtracts from 1
/// before wrapping to zero.
pub fn inverse_mod_256(z: u8) -> Option<u8> {
    if z % 2 == 0 {
        return None;
    }
    let mut n: u8 = 1;
    let mut count: u16 = 0;
    loop {
        n = n.wrapping_sub(z);
        count += 1;
        if n == 0 {
            return Some(count as u8);
        }
        if n == 1 {
            return None;
        }
    }
}

/// Representative of `v` mod 256 with the smallest magnitude.
fn smallest(v: i16) -> i16 {
    let m = v.rem_euclid(256);
    if m < 128 { m } else { m - 256 }
}

/// How many `+` or `-` it takes to add n.
fn magnitude(n: u8) -> u16 {
    (n as u16).min(256 - n as u16)
}

/// Body of one table macro. With `clear_res`, the result cell is zeroed
/// first (the `set` family); otherwise the amount is added on top.
fn transfer_body(x: u8, y: u8, z: u8, k: i16, clear_res: bool) -> Construct {
    let mut items = vec![goto("tmp"), clear_loop()];
    if clear_res {
        items.push(goto("res"));
        items.push(clear_loop());
    }

    if y == z {
        // x·y·y⁻¹ collapses to x.
        items.push(goto("res"));
        items.push(inc_by(smallest(k + x as i16)));
    } else if y == 0 {
        items.push(goto("res"));
        items.push(inc_by(k));
    } else {
        items.push(goto("tmp"));
        items.push(inc_by(x as i16));
        items.push(stable_loop(vec![
            goto("res"),
            inc_by(y as i16),
            goto("tmp"),
            inc_by(-(z as i16)),
        ]));
        items.push(goto("res"));
        items.push(inc_by(k));
    }

    seq(items)
}

fn path(name: &str) -> PathExpr {
    PathExpr::new(Span::builtin(), vec![name.to_string()])
}

fn goto(name: &str) -> Construct {
    Construct::Goto {
        span: Span::builtin(),
        path: path(name),
    }
}

fn prim(prim: Prim) -> Construct {
    Construct::Prim {
        span: Span::builtin(),
        prim,
    }
}

fn seq(items: Vec<Construct>) -> Construct {
    Construct::Sequence {
        span: Span::builtin(),
        items,
    }
}

fn stable_loop(items: Vec<Construct>) -> Construct {
    Construct::Loop {
        span: Span::builtin(),
        stable: true,
        body: Box::new(seq(items)),
    }
}

/// `[-]` — drain the current cell to zero.
fn clear_loop() -> Construct {
    stable_loop(vec![prim(Prim::Dec)])
}

/// Add `amount` (mod 256) to the current cell, taking the shorter
/// direction around the wrap.
fn inc_by(amount: i16) -> Construct {
    let wrapped = amount.rem_euclid(256) as u16;
    if wrapped == 0 {
        return seq(Vec::new());
    }
    let (glyph, count) = if wrapped < 128 {
        (Prim::Inc, wrapped as u32)
    } else {
        (Prim::Dec, (256 - wrapped) as u32)
    };
    Construct::Repeat {
        span: Span::builtin(),
        body: Box::new(prim(glyph)),
        count,
    }
}
