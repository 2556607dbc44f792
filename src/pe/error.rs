//! Error types for the PE compiler.

use std::fmt;

use super::token::Position;

/// An error raised during tokenizing, tree building, annotation, or
/// realization. Carries a source position where one is known.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
    pub position: Option<Position>,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid character outside any recognized class.
    LexError,
    /// Unbalanced `{` / `}`.
    GroupError,
    /// A `_` with no preceding element in the same composite.
    RepetitionError,
    /// The symbol resolver did not recognize an identifier.
    LookupError,
    /// A malformed tree reached realization — a compiler defect, not a
    /// user-input problem.
    InternalError,
}

impl CompileError {
    pub fn lex(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
            kind: ErrorKind::LexError,
        }
    }

    pub fn group(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
            kind: ErrorKind::GroupError,
        }
    }

    pub fn repetition(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
            kind: ErrorKind::RepetitionError,
        }
    }

    /// A lookup failure. Starts without a position; `realize` attaches
    /// the originating symbol's position via [`CompileError::at`].
    pub fn lookup(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            kind: ErrorKind::LookupError,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            kind: ErrorKind::InternalError,
        }
    }

    /// Return this error stamped with `position`.
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(p) => write!(
                f,
                "[{}:{}] {:?}: {}",
                p.line, p.column, self.kind, self.message
            ),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for CompileError {}
