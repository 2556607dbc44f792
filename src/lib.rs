//! polyexpr — a compiler for PE (Polyrhythmic Expression) notation.
//!
//! PE is a compact textual rhythm/pitch notation. Identifiers name
//! sounds, `{ }` groups run in sequence, `,` layers parts to sound
//! together, `.` chains segments of forced equal length, `/N` markers
//! scale tempo, and trailing `_` marks extend a note across extra
//! slots:
//!
//! ```
//! use polyexpr::{schedule, Compiler, Dur};
//!
//! let tree = Compiler::compile("{kick kick kick} , {clap clap}").unwrap();
//! assert_eq!(tree.duration(), Dur::whole(3));
//!
//! let clip = schedule(&tree).unwrap();
//! assert_eq!(clip.events.len(), 5);
//! ```
//!
//! Compiling annotates every node with an exact rational duration; the
//! [`sound`] module then lowers the tree onto any [`Sound`] target via
//! a caller-supplied symbol resolver.

pub mod pe;
pub mod sound;

pub use pe::{CompileError, Compiler, Dur, ErrorKind, Expr, Position, Token};
pub use sound::{realize, schedule, Clip, NoteEvent, Sound};
