//! Tree builder — lifts tokens into [`Expr`] leaves and resolves
//! structure through five rewrite passes, applied in a fixed order:
//! grouping, tempo-marker extraction, repetition tagging, comma
//! separation, period separation. Later passes rely on the shape left
//! by earlier ones. Brace-group contents recurse through the whole
//! pipeline, one nesting level per invocation.

use std::mem;

use super::duration::Dur;
use super::error::CompileError;
use super::expr::{Expr, Group, Repetition, Sequence, Simul};
use super::token::{Position, Token};

/// Build an expression tree from a token stream.
pub fn build(tokens: &[Token]) -> Result<Expr, CompileError> {
    let exprs = tokens.iter().map(Expr::symbol).collect();
    group(exprs, false)
}

/// Run a node sequence through the pass pipeline and wrap the result.
/// A single surviving node is returned directly instead of being
/// wrapped, keeping trivial inputs shallow.
fn group(exprs: Vec<Expr>, explicit: bool) -> Result<Expr, CompileError> {
    let mut children = run_passes(exprs)?;
    if children.len() == 1 {
        return Ok(children.remove(0));
    }
    Ok(Expr::Group(Group {
        children,
        explicit,
        duration: Dur::ZERO,
    }))
}

fn run_passes(exprs: Vec<Expr>) -> Result<Vec<Expr>, CompileError> {
    let exprs = resolve_groups(exprs)?;
    let exprs = extract_tempo_markers(exprs);
    let exprs = tag_repetitions(exprs);
    let exprs = split_simultaneous(exprs)?;
    split_sequential(exprs)
}

/// Pass 1: fold `{ ... }` regions into explicit groups. Only one brace
/// level is resolved here; inner braces are buffered as plain symbols
/// and handled when the captured region recurses through the pipeline.
fn resolve_groups(exprs: Vec<Expr>) -> Result<Vec<Expr>, CompileError> {
    let mut output = Vec::new();
    let mut buffer: Option<Vec<Expr>> = None;
    let mut depth = 0u32;
    let mut open_position = Position::new(0, 0);

    for expr in exprs {
        let brace = match &expr {
            Expr::Symbol(s) if s.name == "{" => Some((true, s.position)),
            Expr::Symbol(s) if s.name == "}" => Some((false, s.position)),
            _ => None,
        };

        match brace {
            Some((true, position)) => {
                depth += 1;
                match &mut buffer {
                    None => {
                        buffer = Some(Vec::new());
                        open_position = position;
                    }
                    Some(captured) => captured.push(expr),
                }
            }
            Some((false, position)) => match buffer.take() {
                Some(mut captured) => {
                    depth -= 1;
                    if depth == 0 {
                        output.push(group(captured, true)?);
                    } else {
                        captured.push(expr);
                        buffer = Some(captured);
                    }
                }
                None => return Err(CompileError::group("} mismatch", position)),
            },
            None => match &mut buffer {
                Some(captured) => captured.push(expr),
                None => output.push(expr),
            },
        }
    }

    if depth > 0 {
        return Err(CompileError::group("{ mismatch", open_position));
    }
    Ok(output)
}

/// Pass 2: consume tempo-marker tokens, compounding a running
/// multiplier that is applied to every node seen after them. The
/// multiplier does not cross group boundaries; each group's content ran
/// its own pipeline in pass 1.
fn extract_tempo_markers(exprs: Vec<Expr>) -> Vec<Expr> {
    let mut output = Vec::new();
    let mut tempo = Dur::ONE;

    for mut expr in exprs {
        let marker = match &expr {
            Expr::Symbol(s) => tempo_marker(&s.name),
            _ => None,
        };
        match marker {
            Some(factor) => tempo = tempo * factor,
            None => {
                expr.adjust_tempo(tempo);
                output.push(expr);
            }
        }
    }
    output
}

/// Match `/N` or `/N*M` anywhere in `text`, word-boundary terminated,
/// yielding the factor `N / M` (`M` defaults to 1, and a zero `M` falls
/// back to 1). A match anywhere marks the whole token as a marker.
fn tempo_marker(text: &str) -> Option<Dur> {
    let chars: Vec<char> = text.chars().collect();

    for start in 0..chars.len() {
        if chars[start] != '/' {
            continue;
        }
        let digits_end = scan_digits(&chars, start + 1);
        if digits_end == start + 1 {
            continue;
        }

        // Longest alternative first: with a `*M` suffix.
        if digits_end < chars.len() && chars[digits_end] == '*' {
            let divisor_end = scan_digits(&chars, digits_end + 1);
            if divisor_end > digits_end + 1 && word_boundary(&chars, divisor_end) {
                let n = parse_digits(&chars[start + 1..digits_end]);
                let m = parse_digits(&chars[digits_end + 1..divisor_end]);
                return Some(Dur::new(n, m.max(1)));
            }
        }
        if word_boundary(&chars, digits_end) {
            let n = parse_digits(&chars[start + 1..digits_end]);
            return Some(Dur::whole(n));
        }
    }
    None
}

fn scan_digits(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    i
}

fn parse_digits(digits: &[char]) -> u64 {
    digits.iter().fold(0u64, |acc, ch| {
        acc.saturating_mul(10).saturating_add(*ch as u64 - '0' as u64)
    })
}

fn word_boundary(chars: &[char], i: usize) -> bool {
    i >= chars.len() || !(chars[i].is_ascii_alphanumeric() || chars[i] == '_')
}

/// Pass 3: turn each bare `_` symbol into a repetition placeholder,
/// keeping its position and accumulated tempo.
fn tag_repetitions(exprs: Vec<Expr>) -> Vec<Expr> {
    exprs
        .into_iter()
        .map(|expr| match expr {
            Expr::Symbol(s) if s.name == "_" => Expr::Repetition(Repetition {
                content: None,
                repeat: Vec::new(),
                position: Some(s.position),
                tempo: s.tempo,
                duration: Dur::ZERO,
            }),
            other => other,
        })
        .collect()
}

/// Pass 4: split on top-level `,` into a [`Simul`] of chunks.
fn split_simultaneous(exprs: Vec<Expr>) -> Result<Vec<Expr>, CompileError> {
    match split_on(exprs, ",")? {
        Split::Unchanged(exprs) => Ok(exprs),
        Split::Chunks(children) => Ok(vec![Expr::Simul(Simul {
            children,
            duration: Dur::ZERO,
        })]),
    }
}

/// Pass 5: split on top-level `.` into a transient [`Sequence`].
fn split_sequential(exprs: Vec<Expr>) -> Result<Vec<Expr>, CompileError> {
    match split_on(exprs, ".")? {
        Split::Unchanged(exprs) => Ok(exprs),
        Split::Chunks(children) => Ok(vec![Expr::Sequence(Sequence {
            children,
            duration: Dur::ZERO,
        })]),
    }
}

enum Split {
    /// No usable separator: the input passes through untouched,
    /// separator tokens included.
    Unchanged(Vec<Expr>),
    /// Each chunk ran the full pass pipeline.
    Chunks(Vec<Expr>),
}

fn split_on(exprs: Vec<Expr>, separator: &str) -> Result<Split, CompileError> {
    // The input passes through unchanged only when it has elements and
    // every separator precedes them all. An all-separator (or empty)
    // stream still splits, into zero chunks.
    let mut seen_element = false;
    let mut separator_after_element = false;
    for expr in &exprs {
        if is_separator(expr, separator) {
            if seen_element {
                separator_after_element = true;
                break;
            }
        } else {
            seen_element = true;
        }
    }
    if seen_element && !separator_after_element {
        return Ok(Split::Unchanged(exprs));
    }

    let mut chunks = Vec::new();
    let mut current = Vec::new();
    for expr in exprs {
        if is_separator(&expr, separator) {
            if !current.is_empty() {
                chunks.push(group(mem::take(&mut current), false)?);
            }
        } else {
            current.push(expr);
        }
    }
    if !current.is_empty() {
        chunks.push(group(current, false)?);
    }
    Ok(Split::Chunks(chunks))
}

fn is_separator(expr: &Expr, separator: &str) -> bool {
    matches!(expr, Expr::Symbol(s) if s.name == separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe::lexer::Lexer;

    fn build_source(source: &str) -> Result<Expr, CompileError> {
        let tokens = Lexer::new(source).tokenize()?;
        build(&tokens)
    }

    fn symbol_name(expr: &Expr) -> &str {
        match expr {
            Expr::Symbol(s) => &s.name,
            other => panic!("expected symbol, got {other:?}"),
        }
    }

    #[test]
    fn single_token_collapses_to_symbol() {
        let expr = build_source("a").unwrap();
        assert_eq!(symbol_name(&expr), "a");
    }

    #[test]
    fn plain_sequence_becomes_implicit_group() {
        let expr = build_source("a b c").unwrap();
        let Expr::Group(g) = expr else {
            panic!("expected group")
        };
        assert!(!g.explicit);
        assert_eq!(g.children.len(), 3);
    }

    #[test]
    fn braces_build_an_explicit_group() {
        let expr = build_source("{a b} c").unwrap();
        let Expr::Group(outer) = expr else {
            panic!("expected group")
        };
        assert!(!outer.explicit);
        let Expr::Group(inner) = &outer.children[0] else {
            panic!("expected inner group")
        };
        assert!(inner.explicit);
        assert_eq!(inner.children.len(), 2);
        assert_eq!(symbol_name(&outer.children[1]), "c");
    }

    #[test]
    fn nested_braces_resolve_recursively() {
        let expr = build_source("{{a b} c}").unwrap();
        let Expr::Group(outer) = expr else {
            panic!("expected group")
        };
        assert!(outer.explicit);
        let Expr::Group(inner) = &outer.children[0] else {
            panic!("expected inner group")
        };
        assert!(inner.explicit);
        assert_eq!(symbol_name(&outer.children[1]), "c");
    }

    #[test]
    fn braced_single_node_collapses() {
        let expr = build_source("{a}").unwrap();
        assert_eq!(symbol_name(&expr), "a");
    }

    #[test]
    fn unclosed_brace_is_a_group_error() {
        let err = build_source("{").unwrap_err();
        assert_eq!(err.kind, crate::pe::error::ErrorKind::GroupError);
        assert_eq!(err.message, "{ mismatch");
        assert_eq!(err.position, Some(Position::new(0, 0)));
    }

    #[test]
    fn unclosed_brace_reports_opening_position() {
        let err = build_source("a {b {c}").unwrap_err();
        assert_eq!(err.message, "{ mismatch");
        assert_eq!(err.position, Some(Position::new(0, 2)));
    }

    #[test]
    fn stray_close_brace_is_a_group_error() {
        let err = build_source("a }").unwrap_err();
        assert_eq!(err.kind, crate::pe::error::ErrorKind::GroupError);
        assert_eq!(err.message, "} mismatch");
        assert_eq!(err.position, Some(Position::new(0, 2)));
    }

    #[test]
    fn tempo_marker_is_removed_and_applied_forward() {
        let expr = build_source("a /2 b c").unwrap();
        let Expr::Group(g) = expr else {
            panic!("expected group")
        };
        assert_eq!(g.children.len(), 3);
        let tempos: Vec<Dur> = g
            .children
            .iter()
            .map(|c| match c {
                Expr::Symbol(s) => s.tempo,
                other => panic!("expected symbol, got {other:?}"),
            })
            .collect();
        assert_eq!(tempos, [Dur::ONE, Dur::whole(2), Dur::whole(2)]);
    }

    #[test]
    fn tempo_markers_compound() {
        let expr = build_source("/2 /3 a").unwrap();
        let Expr::Symbol(s) = expr else {
            panic!("expected symbol")
        };
        assert_eq!(s.tempo, Dur::whole(6));
    }

    #[test]
    fn tempo_marker_does_not_cross_group_boundary() {
        let expr = build_source("{/2 a} b").unwrap();
        let Expr::Group(g) = expr else {
            panic!("expected group")
        };
        let Expr::Symbol(a) = &g.children[0] else {
            panic!("expected symbol")
        };
        let Expr::Symbol(b) = &g.children[1] else {
            panic!("expected symbol")
        };
        assert_eq!(a.tempo, Dur::whole(2));
        assert_eq!(b.tempo, Dur::ONE);
    }

    #[test]
    fn tempo_marker_applies_to_group_leaves() {
        let expr = build_source("/2 {a b}").unwrap();
        let Expr::Group(g) = expr else {
            panic!("expected group")
        };
        for child in &g.children {
            let Expr::Symbol(s) = child else {
                panic!("expected symbol")
            };
            assert_eq!(s.tempo, Dur::whole(2));
        }
    }

    #[test]
    fn tempo_marker_shapes() {
        assert_eq!(tempo_marker("/2"), Some(Dur::whole(2)));
        assert_eq!(tempo_marker("/100*60"), Some(Dur::new(5, 3)));
        // The match is unanchored: any embedded marker counts.
        assert_eq!(tempo_marker("a/2"), Some(Dur::whole(2)));
        // `*` without digits still matches the `/N` prefix.
        assert_eq!(tempo_marker("/4*"), Some(Dur::whole(4)));
        // Zero divisor falls back to 1.
        assert_eq!(tempo_marker("/2*0"), Some(Dur::whole(2)));
        // No word boundary after the digits.
        assert_eq!(tempo_marker("/2x"), None);
        assert_eq!(tempo_marker("/2*3x"), Some(Dur::whole(2)));
        assert_eq!(tempo_marker("kick"), None);
        assert_eq!(tempo_marker("/"), None);
    }

    #[test]
    fn underscore_becomes_placeholder() {
        let expr = build_source("a _").unwrap();
        let Expr::Group(g) = expr else {
            panic!("expected group")
        };
        let Expr::Repetition(r) = &g.children[1] else {
            panic!("expected repetition placeholder")
        };
        assert!(r.content.is_none());
        assert_eq!(r.position, Some(Position::new(0, 2)));
    }

    #[test]
    fn placeholder_keeps_running_tempo() {
        let expr = build_source("/2 a _").unwrap();
        let Expr::Group(g) = expr else {
            panic!("expected group")
        };
        let Expr::Repetition(r) = &g.children[1] else {
            panic!("expected repetition placeholder")
        };
        assert_eq!(r.tempo, Dur::whole(2));
    }

    #[test]
    fn comma_splits_into_simul() {
        let expr = build_source("a , b c").unwrap();
        let Expr::Simul(s) = expr else {
            panic!("expected simul")
        };
        assert_eq!(s.children.len(), 2);
        assert_eq!(symbol_name(&s.children[0]), "a");
        let Expr::Group(second) = &s.children[1] else {
            panic!("expected group chunk")
        };
        assert_eq!(second.children.len(), 2);
    }

    #[test]
    fn period_splits_into_sequence() {
        let expr = build_source("a . b").unwrap();
        let Expr::Sequence(s) = expr else {
            panic!("expected sequence")
        };
        assert_eq!(s.children.len(), 2);
    }

    #[test]
    fn comma_binds_looser_than_period() {
        let expr = build_source("a . b , c").unwrap();
        let Expr::Simul(s) = expr else {
            panic!("expected simul")
        };
        assert_eq!(s.children.len(), 2);
        assert!(matches!(&s.children[0], Expr::Sequence(_)));
        assert_eq!(symbol_name(&s.children[1]), "c");
    }

    #[test]
    fn empty_chunks_between_separators_are_dropped() {
        let expr = build_source("a , , b").unwrap();
        let Expr::Simul(s) = expr else {
            panic!("expected simul")
        };
        assert_eq!(s.children.len(), 2);
    }

    #[test]
    fn leading_separator_with_no_chunk_passes_through() {
        // No chunk ever precedes a separator, so the sequence is left
        // unchanged and the comma survives as an ordinary symbol.
        let expr = build_source(", a").unwrap();
        let Expr::Group(g) = expr else {
            panic!("expected group")
        };
        assert_eq!(symbol_name(&g.children[0]), ",");
        assert_eq!(symbol_name(&g.children[1]), "a");
    }

    #[test]
    fn trailing_separator_keeps_single_chunk() {
        let expr = build_source("a b ,").unwrap();
        let Expr::Simul(s) = expr else {
            panic!("expected simul")
        };
        assert_eq!(s.children.len(), 1);
    }

    #[test]
    fn empty_input_builds_empty_simul() {
        // An empty stream reaches the comma pass with no elements at
        // all, which splits into zero chunks.
        let expr = build_source("").unwrap();
        let Expr::Simul(s) = expr else {
            panic!("expected simul, got {expr:?}")
        };
        assert!(s.children.is_empty());
    }

    #[test]
    fn lone_separator_builds_empty_simul() {
        let expr = build_source(",").unwrap();
        let Expr::Simul(s) = expr else {
            panic!("expected simul, got {expr:?}")
        };
        assert!(s.children.is_empty());
    }

    #[test]
    fn empty_braces_collapse_to_empty_simul() {
        // The captured empty region splits into zero chunks in the
        // comma pass, and the single-node collapse then drops the
        // enclosing explicit group.
        let expr = build_source("{} a").unwrap();
        let Expr::Group(outer) = expr else {
            panic!("expected group")
        };
        let Expr::Simul(inner) = &outer.children[0] else {
            panic!("expected empty simul, got {:?}", outer.children[0])
        };
        assert!(inner.children.is_empty());
        assert_eq!(symbol_name(&outer.children[1]), "a");
    }
}
