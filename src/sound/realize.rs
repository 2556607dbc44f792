//! Conversion from an annotated expression tree to playable objects.
//!
//! The compiler owns only the walk. Symbol lookup is delegated to a
//! caller-supplied resolver, and the playable target is anything
//! implementing [`Sound`].

use crate::pe::{CompileError, Dur, Expr};

/// A realization target the annotated tree can be lowered onto.
///
/// Mirrors the combinators of the tree itself: sequential and
/// simultaneous composition plus proportional rescaling. Unlike the
/// tree's in-place `fit`, a sound's `fit` returns a rescaled copy, so
/// one prototype can be stamped out at many durations.
pub trait Sound: Sized {
    fn duration(&self) -> Dur;

    /// Return a copy of this sound rescaled to `duration`.
    fn fit(&self, duration: Dur) -> Self;

    /// Play `parts` one after another.
    fn seq(parts: Vec<Self>) -> Self;

    /// Play `parts` together, sharing a start.
    fn simul(parts: Vec<Self>) -> Self;

    /// Play this sound once per entry of `durations`, back to back.
    /// Continuous sounds may override this to span the total instead.
    fn repeat(&self, durations: &[Dur]) -> Self {
        Self::seq(durations.iter().map(|d| self.fit(*d)).collect())
    }
}

/// Lower an annotated tree onto a [`Sound`] target.
///
/// The resolver receives each symbol's identifier, duration, and pitch
/// offset, and should fail with a lookup error for identifiers it does
/// not recognize; the failing symbol's position is attached before the
/// error propagates. Encountering a node the annotator should have
/// eliminated is an internal error.
pub fn realize<S, F>(expr: &Expr, resolve: &mut F) -> Result<S, CompileError>
where
    S: Sound,
    F: FnMut(&str, Dur, Option<f64>) -> Result<S, CompileError>,
{
    match expr {
        Expr::Symbol(symbol) => resolve(&symbol.name, symbol.duration, symbol.pitch)
            .map_err(|err| err.at(symbol.position)),
        Expr::Group(group) => Ok(S::seq(realize_children(&group.children, resolve)?)),
        Expr::Simul(simul) => Ok(S::simul(realize_children(&simul.children, resolve)?)),
        Expr::Repetition(rep) => match &rep.content {
            Some(content) => Ok(realize(content, resolve)?.repeat(&rep.repeat)),
            None => Err(CompileError::internal(
                "unresolved repetition placeholder in annotated tree",
            )),
        },
        Expr::Sequence(_) => Err(CompileError::internal(
            "sequence node survived annotation",
        )),
    }
}

fn realize_children<S, F>(children: &[Expr], resolve: &mut F) -> Result<Vec<S>, CompileError>
where
    S: Sound,
    F: FnMut(&str, Dur, Option<f64>) -> Result<S, CompileError>,
{
    children
        .iter()
        .map(|child| realize(child, &mut *resolve))
        .collect()
}
