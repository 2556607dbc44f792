//! Duration annotation — assigns every node of a built tree an exact
//! relative duration.
//!
//! Five passes run depth-first over each node in a fixed order: base
//! duration (with lazy pitch extraction), group summation, tempo
//! scaling, simultaneity unification, sequential flattening. A final
//! repetition-coalescing pass then folds `_` placeholders into their
//! preceding siblings.

use std::mem;

use super::duration::Dur;
use super::error::CompileError;
use super::expr::{Expr, Group, Repetition};
use super::token::Position;

/// Annotate a built tree, consuming and returning it.
pub fn annotate(mut root: Expr) -> Result<Expr, CompileError> {
    assign_durations(&mut root);
    coalesce_repetitions(&mut root)?;
    // A placeholder that collapsed all the way to the root never went
    // through a composite's coalescing walk, so it has no sibling to
    // attach to.
    if let Expr::Repetition(rep) = &root {
        if rep.content.is_none() {
            let position = rep.position.unwrap_or(Position::new(0, 0));
            return Err(CompileError::repetition("_ mismatch", position));
        }
    }
    Ok(root)
}

/// The recursive passes, in order. Children are fully annotated before
/// a composite computes its own duration.
fn assign_durations(expr: &mut Expr) {
    base_duration(expr);
    group_duration(expr);
    scale_tempo(expr);
    unify_simultaneous(expr);
    flatten_sequential(expr);
}

/// Pass 1: every leaf occupies one unit slot. A symbol shaped like
/// `name(number)` is split into identifier and pitch offset here, not
/// in the lexer — pitch parsing is deferred until duration assignment.
fn base_duration(expr: &mut Expr) {
    match expr {
        Expr::Symbol(symbol) => {
            if let Some((name, pitch)) = split_pitch(&symbol.name) {
                symbol.name = name;
                symbol.pitch = Some(pitch);
            }
            symbol.duration = Dur::ONE;
        }
        Expr::Repetition(rep) if rep.content.is_none() => rep.duration = Dur::ONE,
        _ => {}
    }
}

/// Pass 2: a group's duration is the sum of its children — sequential
/// concatenation in time.
fn group_duration(expr: &mut Expr) {
    let Expr::Group(group) = expr else { return };
    for child in &mut group.children {
        assign_durations(child);
    }
    group.duration = group.children.iter().map(Expr::duration).sum();
}

/// Pass 3: a leaf with tempo `t` contracts to `duration / t`. Tempo
/// never lands on composites; markers pushed it down to leaves at build
/// time. A zero tempo leaves the duration unchanged.
fn scale_tempo(expr: &mut Expr) {
    let tempo = match expr {
        Expr::Symbol(s) => s.tempo,
        Expr::Repetition(r) => r.tempo,
        _ => return,
    };
    if tempo != Dur::ONE && !tempo.is_zero() {
        let target = expr.duration() / tempo;
        expr.fit(target);
    }
}

/// Pass 4: simultaneous children are forced to the first child's
/// duration, which becomes the node's own.
fn unify_simultaneous(expr: &mut Expr) {
    let Expr::Simul(simul) = expr else { return };
    for child in &mut simul.children {
        assign_durations(child);
    }
    unify(&mut simul.children);
    simul.duration = match simul.children.first() {
        Some(first) => first.duration(),
        None => Dur::ZERO,
    };
}

/// Pass 5: sequential segments are unified like simultaneous ones, the
/// node's duration is their sum, implicit child groups are inlined one
/// level, and the node becomes an implicit [`Group`]. `Sequence` never
/// survives past this pass.
fn flatten_sequential(expr: &mut Expr) {
    let Expr::Sequence(seq) = expr else { return };
    for child in &mut seq.children {
        assign_durations(child);
    }
    unify(&mut seq.children);
    let duration = seq.children.iter().map(Expr::duration).sum();

    let mut flattened = Vec::with_capacity(seq.children.len());
    for child in mem::take(&mut seq.children) {
        match child {
            Expr::Group(inner) if !inner.explicit => flattened.extend(inner.children),
            other => flattened.push(other),
        }
    }

    *expr = Expr::Group(Group {
        children: flattened,
        explicit: false,
        duration,
    });
}

/// Force every sibling to the first sibling's duration.
fn unify(children: &mut [Expr]) {
    let Some(first) = children.first() else { return };
    let duration = first.duration();
    for child in children[1..].iter_mut() {
        child.fit(duration);
    }
}

/// Final pass: inside every group and simul, fold runs of placeholders
/// into the node they follow. The captured `repeat` starts with the
/// base node's duration and gains one entry per consumed placeholder;
/// the node is wrapped when at least one placeholder was consumed.
fn coalesce_repetitions(expr: &mut Expr) -> Result<(), CompileError> {
    let children = match expr {
        Expr::Group(g) => &mut g.children,
        Expr::Simul(s) => &mut s.children,
        _ => return Ok(()),
    };
    for child in children.iter_mut() {
        coalesce_repetitions(child)?;
    }

    let mut output = Vec::with_capacity(children.len());
    let mut current: Option<(Expr, Vec<Dur>)> = None;

    for child in mem::take(children) {
        match child {
            Expr::Repetition(rep) if rep.content.is_none() => match &mut current {
                Some((_, repeat)) => repeat.push(rep.duration),
                None => {
                    let position = rep.position.unwrap_or(Position::new(0, 0));
                    return Err(CompileError::repetition("_ mismatch", position));
                }
            },
            concrete => {
                if let Some((node, repeat)) = current.take() {
                    output.push(wrap_repeats(node, repeat));
                }
                let duration = concrete.duration();
                current = Some((concrete, vec![duration]));
            }
        }
    }
    if let Some((node, repeat)) = current.take() {
        output.push(wrap_repeats(node, repeat));
    }

    *children = output;
    Ok(())
}

fn wrap_repeats(node: Expr, repeat: Vec<Dur>) -> Expr {
    if repeat.len() <= 1 {
        return node;
    }
    let duration = repeat.iter().copied().sum();
    Expr::Repetition(Repetition {
        content: Some(Box::new(node)),
        repeat,
        position: None,
        tempo: Dur::ONE,
        duration,
    })
}

/// Split a `name(number)` literal. The identifier part must be
/// paren-free and the number is `-?digits(.digits*)?`, a trailing dot
/// allowed.
fn split_pitch(name: &str) -> Option<(String, f64)> {
    let rest = name.strip_suffix(')')?;
    let open = rest.find('(')?;
    let (id, number) = (&rest[..open], &rest[open + 1..]);
    if id.is_empty() || id.contains(')') {
        return None;
    }
    if !is_pitch_number(number) {
        return None;
    }
    let pitch: f64 = number.parse().ok()?;
    Some((id.to_string(), pitch))
}

fn is_pitch_number(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (integral, fractional) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    !integral.is_empty()
        && integral.chars().all(|c| c.is_ascii_digit())
        && fractional.chars().all(|c| c.is_ascii_digit())
}
