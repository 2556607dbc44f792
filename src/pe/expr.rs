//! Expression tree for compiled PE notation.
//!
//! Built by [`builder`](super::builder), annotated in place by
//! [`annotate`](super::annotate), then handed to the realization layer.
//! Serializes with a `type` tag on every node.

use serde::Serialize;

use super::duration::Dur;
use super::token::{Position, Token};

/// A node in the PE expression tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expr {
    Symbol(Symbol),
    Group(Group),
    Simul(Simul),
    Sequence(Sequence),
    Repetition(Repetition),
}

/// A leaf naming a sound identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub position: Position,
    pub tempo: Dur,
    /// Pitch offset in semitones, split out of a `name(number)` literal
    /// during annotation.
    pub pitch: Option<f64>,
    pub duration: Dur,
}

/// Sequential concatenation. `explicit` is set for brace-delimited
/// groups, which the sequential-flattening pass leaves intact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub children: Vec<Expr>,
    pub explicit: bool,
    pub duration: Dur,
}

/// Comma-separated parts that sound together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simul {
    pub children: Vec<Expr>,
    pub duration: Dur,
}

/// Period-separated parts. Transient: annotation rewrites every
/// `Sequence` into an implicit [`Group`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sequence {
    pub children: Vec<Expr>,
    pub duration: Dur,
}

/// A `_` placeholder while `content` is `None`; after coalescing, a
/// wrapper around the preceding sibling with one captured duration per
/// occupied slot (the base occurrence first).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Repetition {
    pub content: Option<Box<Expr>>,
    pub repeat: Vec<Dur>,
    pub position: Option<Position>,
    pub tempo: Dur,
    pub duration: Dur,
}

impl Expr {
    /// Lift a token to a leaf node. Durations start at zero and are
    /// assigned by annotation.
    pub fn symbol(token: &Token) -> Expr {
        Expr::Symbol(Symbol {
            name: token.text.clone(),
            position: token.position,
            tempo: Dur::ONE,
            pitch: None,
            duration: Dur::ZERO,
        })
    }

    pub fn duration(&self) -> Dur {
        match self {
            Expr::Symbol(s) => s.duration,
            Expr::Group(g) => g.duration,
            Expr::Simul(s) => s.duration,
            Expr::Sequence(s) => s.duration,
            Expr::Repetition(r) => r.duration,
        }
    }

    /// Rescale this node to `duration`, preserving each descendant's
    /// relative share. A repetition wrapper forwards to its content.
    pub fn fit(&mut self, duration: Dur) {
        match self {
            Expr::Symbol(s) => s.duration = duration,
            Expr::Group(g) => fit_children(&mut g.children, &mut g.duration, duration),
            Expr::Simul(s) => fit_children(&mut s.children, &mut s.duration, duration),
            Expr::Sequence(s) => fit_children(&mut s.children, &mut s.duration, duration),
            Expr::Repetition(r) => match &mut r.content {
                Some(content) => content.fit(duration),
                None => r.duration = duration,
            },
        }
    }

    /// Multiply the tempo of every leaf under this node by `factor`.
    pub fn adjust_tempo(&mut self, factor: Dur) {
        match self {
            Expr::Symbol(s) => s.tempo = s.tempo * factor,
            Expr::Group(g) => {
                for child in &mut g.children {
                    child.adjust_tempo(factor);
                }
            }
            Expr::Simul(s) => {
                for child in &mut s.children {
                    child.adjust_tempo(factor);
                }
            }
            Expr::Sequence(s) => {
                for child in &mut s.children {
                    child.adjust_tempo(factor);
                }
            }
            Expr::Repetition(r) => {
                r.tempo = r.tempo * factor;
                if let Some(content) = &mut r.content {
                    content.adjust_tempo(factor);
                }
            }
        }
    }
}

/// Scale every child by `duration / *current`, then record the new
/// duration. A zero current duration means the children are all zero as
/// well; they are left untouched and only the node's total changes.
fn fit_children(children: &mut [Expr], current: &mut Dur, duration: Dur) {
    if !current.is_zero() {
        let scale = duration / *current;
        for child in children.iter_mut() {
            let scaled = child.duration() * scale;
            child.fit(scaled);
        }
    }
    *current = duration;
}
