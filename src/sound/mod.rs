//! Realization boundary — lowers an annotated tree onto playable
//! objects supplied by the caller.

pub mod clip;
pub mod realize;

pub use clip::{schedule, Clip, NoteEvent};
pub use realize::{realize, Sound};
