//! PE notation compiler — tokenize → build → annotate.
//!
//! The pipeline is pure and synchronous: each compile owns its token
//! and node graph, and the annotated tree is handed onward in a single
//! linear ownership chain.

pub mod annotate;
pub mod builder;
pub mod duration;
pub mod error;
pub mod expr;
pub mod lexer;
pub mod token;

pub use duration::Dur;
pub use error::{CompileError, ErrorKind};
pub use expr::{Expr, Group, Repetition, Sequence, Simul, Symbol};
pub use token::{Position, Token};

use lexer::Lexer;

/// The PE compiler.
///
/// Runs notation source through lexer → tree builder → duration
/// annotator.
pub struct Compiler;

impl Compiler {
    /// Tokenize PE source into positioned tokens.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
        let mut lexer = Lexer::new(source);
        lexer.tokenize()
    }

    /// Parse PE source into an unannotated expression tree.
    pub fn parse(source: &str) -> Result<Expr, CompileError> {
        let tokens = Self::tokenize(source)?;
        builder::build(&tokens)
    }

    /// Parse and annotate: every node of the returned tree carries its
    /// relative duration.
    pub fn compile(source: &str) -> Result<Expr, CompileError> {
        annotate::annotate(Self::parse(source)?)
    }
}
