//! A sample-free realization target: a clip of timed note events.
//!
//! Sequential parts are laid back to back by accumulating onsets;
//! simultaneous parts overlay at a shared start. The pause symbol `-`
//! contributes silence. What a downstream player does with the events
//! is its own business.

use serde::Serialize;

use crate::pe::{CompileError, Dur, Expr};

use super::realize::{realize, Sound};

/// A single scheduled note: identifier, optional pitch offset in
/// semitones, and when/how long it sounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEvent {
    pub name: String,
    pub pitch: Option<f64>,
    pub onset: Dur,
    pub duration: Dur,
}

/// A timed collection of note events occupying `duration`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clip {
    pub events: Vec<NoteEvent>,
    pub duration: Dur,
}

impl Clip {
    /// A silent clip of the given length.
    pub fn rest(duration: Dur) -> Self {
        Clip {
            events: Vec::new(),
            duration,
        }
    }

    /// A clip holding one note for its whole length.
    pub fn note(name: &str, duration: Dur, pitch: Option<f64>) -> Self {
        Clip {
            events: vec![NoteEvent {
                name: name.to_string(),
                pitch,
                onset: Dur::ZERO,
                duration,
            }],
            duration,
        }
    }

    fn shifted(mut self, offset: Dur) -> Self {
        for event in &mut self.events {
            event.onset = event.onset + offset;
        }
        self
    }
}

impl Sound for Clip {
    fn duration(&self) -> Dur {
        self.duration
    }

    fn fit(&self, duration: Dur) -> Self {
        let mut clip = self.clone();
        if !clip.duration.is_zero() {
            let scale = duration / clip.duration;
            for event in &mut clip.events {
                event.onset = event.onset * scale;
                event.duration = event.duration * scale;
            }
        }
        clip.duration = duration;
        clip
    }

    fn seq(parts: Vec<Self>) -> Self {
        let mut events = Vec::new();
        let mut offset = Dur::ZERO;
        for part in parts {
            let length = part.duration;
            events.extend(part.shifted(offset).events);
            offset = offset + length;
        }
        Clip {
            events,
            duration: offset,
        }
    }

    fn simul(parts: Vec<Self>) -> Self {
        let duration = parts.first().map(|p| p.duration).unwrap_or(Dur::ZERO);
        let events = parts.into_iter().flat_map(|p| p.events).collect();
        Clip { events, duration }
    }
}

/// Schedule a compiled tree as a flat, onset-ordered event list. Every
/// identifier is playable here; `-` is the built-in pause.
pub fn schedule(expr: &Expr) -> Result<Clip, CompileError> {
    let mut clip: Clip = realize(expr, &mut |name, duration, pitch| {
        if name == "-" {
            Ok(Clip::rest(duration))
        } else {
            Ok(Clip::note(name, duration, pitch))
        }
    })?;
    clip.events.sort_by(|a, b| a.onset.cmp(&b.onset));
    Ok(clip)
}
