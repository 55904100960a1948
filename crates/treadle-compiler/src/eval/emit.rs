//! Lowering rules: one `emit`/`delta` pair per construct.
//!
//! Every construct can do two things: produce target code while advancing
//! the interpreter state (`emit`), and describe its pure effect as a
//! [`StateDelta`] without producing code (`delta`). The two must agree:
//! after `emit(state)` the state equals the entry state with `delta`
//! applied. `emit` is the loud path; `delta` runs loud only where a loop
//! needs its body's effect before the body is generated, and silently
//! everywhere else.
//!
//! `delta` may register names (declarations bind on both paths) but moves
//! cell and pointer knowledge only through its return value.

use std::rc::Rc;

use treadle_core::Span;

use crate::diagnostics::DiagnosticKind;
use crate::parser::ast::{Construct, FrameDecl, MacroDef, PathExpr, Prim};

use super::cell_action::CellAction;
use super::delta::StateDelta;
use super::state::State;
use super::suggest;
use super::types::Type;

impl Construct {
    /// Generate target code, advancing `state` past this construct.
    pub fn emit(&self, state: &mut State) -> String {
        match self {
            Construct::Prim { prim, .. } => {
                let delta = prim_delta(*prim);
                state.apply(&delta);
                prim.glyph().to_string()
            }
            Construct::Sequence { items, .. } => {
                items.iter().map(|item| item.emit(state)).collect()
            }
            Construct::Loop { span, stable, body } => emit_loop(state, *span, *stable, body),
            Construct::Repeat { body, count, .. } => {
                (0..*count).map(|_| body.emit(state)).collect()
            }
            Construct::DeclareLocations { .. } | Construct::Undeclare { .. } => {
                let _ = self.delta(state);
                String::new()
            }
            Construct::Goto { span, path } => {
                let delta = goto_delta(state, *span, path);
                let code = if delta.ptr_delta > 0 {
                    ">".repeat(delta.ptr_delta as usize)
                } else {
                    "<".repeat(-delta.ptr_delta as usize)
                };
                state.apply(&delta);
                code
            }
            Construct::AssumeStable { body, .. } => emit_assume_stable(state, body),
            Construct::MacroDecl { def } => emit_macro_decl(state, def),
            Construct::Invoke { span, name, args } => emit_invoke(state, *span, name, args),
            Construct::TypeDecl { span, name, fields } => {
                emit_type_decl(state, *span, name, fields)
            }
            Construct::Debug { span } => {
                eprintln!("debug at {}:", span);
                eprintln!("{}", state);
                String::new()
            }
        }
    }

    /// The pure effect of this construct on the state it would be emitted
    /// against.
    pub fn delta(&self, state: &mut State) -> StateDelta {
        match self {
            Construct::Prim { prim, .. } => prim_delta(*prim),
            Construct::Sequence { items, .. } => delta_all(items.iter(), state),
            Construct::Loop { span, stable, body } => {
                let closure = loop_closure(state, *span, *stable, body);
                // A loop only exits when the current cell hits zero.
                closure.then(&StateDelta::action(CellAction::SetTo(0)))
            }
            Construct::Repeat { body, count, .. } => {
                let mut cur = state.clone();
                let mut total = StateDelta::identity();
                for _ in 0..*count {
                    let delta = body.delta(&mut cur);
                    cur.apply(&delta);
                    total = total.then(&delta);
                }
                state.diagnostics = std::mem::take(&mut cur.diagnostics);
                total
            }
            Construct::DeclareLocations { frame, .. } => {
                for (name, at, type_name) in resolve_frame(state, frame) {
                    state.bind_location(name, at, type_name);
                }
                StateDelta::identity()
            }
            Construct::Goto { span, path } => goto_delta(state, *span, path),
            Construct::Undeclare { span, names } => {
                for name in names {
                    if state.named_locations.contains_key(name)
                        && state.location_types.contains_key(name)
                    {
                        state.unbind_location(name);
                    } else {
                        let note = suggest::suggestion_note(
                            name,
                            state.named_locations.keys().map(String::as_str),
                        );
                        let mut report = state
                            .report(DiagnosticKind::MemNotFound, *span)
                            .message(format!("could not find memory location `{}`", name));
                        if let Some(note) = note {
                            report = report.note(note);
                        }
                        report.emit();
                    }
                }
                StateDelta::identity()
            }
            Construct::AssumeStable { body, .. } => {
                let mut delta = body.delta(state);
                delta.ptr_delta = 0;
                delta.gen_delta = 0;
                delta
            }
            Construct::MacroDecl { .. }
            | Construct::TypeDecl { .. }
            | Construct::Debug { .. } => StateDelta::identity(),
            Construct::Invoke { span, name, args } => invoke_delta(state, *span, name, args),
        }
    }
}

fn prim_delta(prim: Prim) -> StateDelta {
    match prim {
        Prim::Right => StateDelta::shift(1),
        Prim::Left => StateDelta::shift(-1),
        Prim::Inc => StateDelta::action(CellAction::Delta(1)),
        Prim::Dec => StateDelta::action(CellAction::Delta(255)),
        Prim::Read => StateDelta::action(CellAction::Unknown),
        Prim::Write => StateDelta::identity(),
    }
}

/// Fold the deltas of `items` in sequence, threading a copy of the state
/// forward so each child resolves against the correct prefix state.
fn delta_all<'a>(
    items: impl IntoIterator<Item = &'a Construct>,
    state: &mut State,
) -> StateDelta {
    let mut cur = state.clone();
    let mut total = StateDelta::identity();
    for item in items {
        let delta = item.delta(&mut cur);
        cur.apply(&delta);
        total = total.then(&delta);
    }
    state.diagnostics = std::mem::take(&mut cur.diagnostics);
    total
}

/// The effect of running a loop body an unknown number of times.
///
/// A stable loop with an unstable body is an error; compilation continues
/// as if the stability claim held. An unstable loop discards positional
/// knowledge regardless of what the body does.
fn loop_closure(state: &mut State, span: Span, stable: bool, body: &Construct) -> StateDelta {
    let mut inner = body.delta(state);

    if stable && !inner.is_stable() {
        let notes = if inner.gen_delta != 0 {
            vec!["the loop body may invalidate the pointer position".to_string()]
        } else {
            let mut notes = vec![format!(
                "the loop body ends up {:+} cells from where it started",
                inner.ptr_delta
            )];
            if let (Some(start), Some(end)) = (
                state.location_at(state.ptr),
                state.location_at(state.ptr + inner.ptr_delta),
            ) {
                notes.push(format!("that is at `{}` instead of `{}`", end, start));
            }
            notes
        };

        let mut report = state
            .report(DiagnosticKind::LoopNotStable, span)
            .message("loop marked stable is not stable");
        for note in notes {
            report = report.note(note);
        }
        report.emit();

        inner.ptr_delta = 0;
        inner.gen_delta = 0;
    }

    if !stable {
        inner.ptr_delta = 0;
        inner.gen_delta += 1;
    }

    inner.repeated()
}

fn emit_loop(state: &mut State, span: Span, stable: bool, body: &Construct) -> String {
    // The loop is dead if the current cell provably holds zero.
    let effective = state.cell(state.ptr) != Some(0);
    if !effective {
        state
            .report(DiagnosticKind::IneffectiveLoop, span)
            .message("loop never runs (the current cell is known to be zero)")
            .emit();
    }

    let closure = loop_closure(state, span, stable, body);
    let exit = closure.then(&StateDelta::action(CellAction::SetTo(0)));

    if !effective {
        // Dead loops are dropped without generating the body.
        state.apply(&exit);
        return String::new();
    }

    // Generate the body as if the loop has already run an indeterminate
    // number of times: a cell the body writes before it reads must not be
    // treated as still holding its pre-loop constant.
    state.apply(&closure);
    let code = body.emit(state);
    state.apply(&exit);

    format!("[{}]", code)
}

/// Resolve a path to an absolute cell index and leaf type name.
///
/// Failures report and fall back to index 0 and `Byte` so evaluation can
/// continue.
fn resolve_path(state: &mut State, path: &PathExpr) -> (i64, String) {
    let root = path.root();

    let Some(&at) = state.named_locations.get(root) else {
        let note =
            suggest::suggestion_note(root, state.named_locations.keys().map(String::as_str));
        let mut report = state
            .report(DiagnosticKind::MemNotFound, path.span)
            .message(format!("could not find memory location `{}`", path));
        if let Some(note) = note {
            report = report.note(note);
        }
        report.emit();
        return (0, "Byte".to_string());
    };

    let type_name = state
        .location_types
        .get(root)
        .cloned()
        .unwrap_or_else(|| "Byte".to_string());

    match state.field_path(&type_name, &path.parts[1..]) {
        Some((offset, leaf)) => (at + offset, leaf),
        None => {
            state
                .report(DiagnosticKind::FieldNotFound, path.span)
                .message(format!(
                    "type `{}` has no field path `{}`",
                    type_name,
                    path.parts[1..].join(".")
                ))
                .emit();
            (0, "Byte".to_string())
        }
    }
}

fn report_goto_wide(state: &mut State, span: Span, type_name: &str) {
    let size = state.type_size(type_name);
    state
        .report(DiagnosticKind::GotoWide, span)
        .message(format!(
            "cannot place the pointer on `{}`, which is {} cells wide",
            type_name, size
        ))
        .emit();
}

fn goto_delta(state: &mut State, span: Span, path: &PathExpr) -> StateDelta {
    let (at, type_name) = resolve_path(state, path);
    if state.type_size(&type_name) != 1 {
        report_goto_wide(state, span, &type_name);
    }
    StateDelta::shift(at - state.ptr)
}

/// Lay out a declaration frame and return `(name, absolute index, type
/// name)` for every declaration that could be placed.
///
/// Declarations are contiguous from the frame base; the whole frame is
/// then shifted so that the active path's leaf lands on the base (the
/// current pointer, or the `from` location when given).
fn resolve_frame(state: &mut State, frame: &FrameDecl) -> Vec<(String, i64, String)> {
    let base = match &frame.from {
        None => state.ptr,
        Some(path) => {
            let (at, type_name) = resolve_path(state, path);
            if state.type_size(&type_name) != 1 {
                report_goto_wide(state, frame.span, &type_name);
            }
            at
        }
    };

    let mut active_offset: Option<i64> = None;
    let mut at = 0i64;
    let mut placed: Vec<(String, i64, String)> = Vec::new();

    for (name, type_name) in &frame.decls {
        if !state.types.contains_key(type_name) {
            state
                .report(DiagnosticKind::TypeNotFound, frame.span)
                .message(format!("type `{}` is not defined", type_name))
                .emit();
            // The declaration is skipped, but when it anchors the active
            // path keep its slot so we don't also complain about a missing
            // anchor.
            if name == frame.active.root() && active_offset.is_none() {
                active_offset = Some(at);
            }
            continue;
        }

        placed.push((name.clone(), at, type_name.clone()));

        if name == frame.active.root()
            && let Some((field_offset, leaf)) =
                state.field_path(type_name, &frame.active.parts[1..])
        {
            if state.type_size(&leaf) != 1 {
                report_goto_wide(state, frame.active.span, &leaf);
                active_offset = Some(0);
            } else {
                active_offset = Some(at + field_offset);
            }
        }

        at += state.type_size(type_name);
    }

    let active = match active_offset {
        Some(offset) => offset,
        None => {
            state
                .report(DiagnosticKind::DeclareLocnameNotFound, frame.active.span)
                .message(format!(
                    "`{}` is not one of the locations being declared",
                    frame.active
                ))
                .emit();
            0
        }
    };

    placed
        .into_iter()
        .map(|(name, offset, type_name)| (name, base + offset - active, type_name))
        .collect()
}

fn emit_assume_stable(state: &mut State, body: &Construct) -> String {
    let delta = {
        let mut probe = state.silenced();
        let mut delta = body.delta(&mut probe);
        delta.ptr_delta = 0;
        delta.gen_delta = 0;
        delta
    };

    let entry_ptr = state.ptr;
    let entry_gen = state.ptr_gen;
    let entry_locations = state.named_locations.clone();
    let entry_location_types = state.location_types.clone();

    let code = body.emit(state);

    // The programmer vouched for this region: the pointer is back where it
    // started and the generation is intact, whatever the analysis thought.
    if state.ptr_gen != entry_gen {
        state.named_locations = entry_locations;
        state.location_types = entry_location_types;
    }
    state.ptr = entry_ptr;
    state.ptr_gen = entry_gen;

    // No constant survives an opaque region.
    state.forget_cells();
    state.apply(&delta);

    code
}

fn emit_macro_decl(state: &mut State, def: &Rc<MacroDef>) -> String {
    if let Some(existing) = state.macros.get(&def.name) {
        let first_span = existing.span;
        state
            .report(DiagnosticKind::MacroRedefined, def.span)
            .message(format!("macro `{}` is already defined", def.name))
            .span_note(first_span)
            .emit();
        return String::new();
    }

    // Dry-run the body against a scratch state so parameter-type and
    // location errors surface at the definition, not at call sites. The
    // macro itself is registered after the dry-run; a recursive body
    // therefore reports itself as undefined here.
    let mut dry = State::new();
    dry.macros = state.macros.clone();
    dry.types = state.types.clone();
    dry.forget_cells();
    dry.quiet = state.quiet;

    for (name, at, type_name) in resolve_frame(&mut dry, &def.params) {
        dry.bind_location(name, at, type_name);
    }

    let _ = def.body.emit(&mut dry);
    {
        let mut probe = dry.silenced();
        let _ = def.body.delta(&mut probe);
    }

    state.diagnostics.extend(std::mem::take(&mut dry.diagnostics));
    state.macros.insert(def.name.clone(), Rc::clone(def));
    String::new()
}

/// Resolve a call site: look up the macro, check the arguments against
/// the parameter list, and build the child state the body runs under.
///
/// The child sees the caller's registries, pointer, and cell knowledge,
/// but only its own parameters as locations; its diagnostics are
/// suppressed because the body was already checked at declaration time.
fn build_call(
    state: &mut State,
    span: Span,
    name: &str,
    args: &[PathExpr],
) -> Option<(Rc<MacroDef>, State)> {
    let Some(def) = state.macros.get(name).map(Rc::clone) else {
        let note = suggest::suggestion_note(name, state.macros.keys().map(String::as_str));
        let mut report = state
            .report(DiagnosticKind::MacroNotFound, span)
            .message(format!("macro `{}` is not defined", name));
        if let Some(note) = note {
            report = report.note(note);
        }
        report.emit();
        return None;
    };

    if args.len() != def.params.decls.len() {
        state
            .report(DiagnosticKind::WrongArgumentCount, span)
            .message(format!(
                "macro `{}` takes {} argument(s), but {} were given",
                name,
                def.params.decls.len(),
                args.len()
            ))
            .span_note(def.span)
            .emit();
    }

    let mut sub = state.macro_child();
    for (arg, (param_name, param_type)) in args.iter().zip(&def.params.decls) {
        let (at, actual_type) = resolve_path(state, arg);
        if actual_type != *param_type {
            state
                .report(DiagnosticKind::WrongArgumentType, arg.span)
                .message(format!(
                    "argument `{}` for parameter `{}` of `{}` has type `{}`, expected `{}`",
                    arg, param_name, name, actual_type, param_type
                ))
                .emit();
        }
        sub.bind_location(param_name.clone(), at, param_type.clone());
    }

    Some((def, sub))
}

fn emit_invoke(state: &mut State, span: Span, name: &str, args: &[PathExpr]) -> String {
    let delta = {
        let mut probe = state.silenced();
        invoke_delta(&mut probe, span, name, args)
    };

    let code = match build_call(state, span, name, args) {
        None => String::new(),
        Some((def, mut sub)) => {
            // Position the pointer on the macro's active parameter, then
            // run the body in the child state.
            let entry = Construct::Goto {
                span,
                path: def.params.active.clone(),
            };
            let mut out = entry.emit(&mut sub);
            out.push_str(&def.body.emit(&mut sub));
            out
        }
    };

    state.apply(&delta);
    code
}

fn invoke_delta(state: &mut State, span: Span, name: &str, args: &[PathExpr]) -> StateDelta {
    match build_call(state, span, name, args) {
        None => StateDelta::identity(),
        Some((def, mut sub)) => {
            let entry = Construct::Goto {
                span,
                path: def.params.active.clone(),
            };
            let entry_delta = entry.delta(&mut sub);
            sub.apply(&entry_delta);
            let body_delta = def.body.delta(&mut sub);
            entry_delta.then(&body_delta)
        }
    }
}

fn emit_type_decl(
    state: &mut State,
    span: Span,
    name: &str,
    fields: &[(String, String)],
) -> String {
    if state.types.contains_key(name) {
        state
            .report(DiagnosticKind::TypeRedefined, span)
            .message(format!("type `{}` is already defined", name))
            .emit();
        return String::new();
    }

    state.register_type(name.to_string(), Type::Struct(fields.to_vec()));
    String::new()
}
