//! Embedded variable references inside raw values.
//!
//! A raw value may embed calls of the form
//!
//! ```text
//! CssVars.get('name')
//! CssVars.get('name', 'fallback')
//! ```
//!
//! anywhere in its text. [`Expr::parse`] splits the value once into literal
//! and reference segments; the registry then resolves each reference against
//! its current state. Quotes may be single or double but must match, and
//! there are no escape sequences.

use std::fmt;

use thiserror::Error;

use crate::registry::var_reference;

/// Text that opens an embedded reference.
pub const CALL_MARKER: &str = "CssVars.get(";

/// An embedded call that starts with [`CALL_MARKER`] but is not well formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed variable reference at byte {offset}: {reason}")]
pub struct ReferenceError {
    /// Byte offset of the marker in the parsed input.
    pub offset: usize,
    pub reason: String,
}

/// One piece of a parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied into the resolved value as-is.
    Literal(String),
    /// A lookup of another variable, with an optional literal fallback.
    Reference {
        name: String,
        fallback: Option<String>,
    },
}

/// Writes the segment back in call syntax.
///
/// A fallback is quoted with `'` unless it contains one, in which case `"`
/// is used. Parsed fallbacks never contain both, since quoted strings have no
/// escapes; a hand-built fallback that does will not parse again.
impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Reference { name, fallback } => {
                write!(f, "{}'{}'", CALL_MARKER, name)?;
                if let Some(fallback) = fallback {
                    let quote = if fallback.contains('\'') { '"' } else { '\'' };
                    write!(f, ", {quote}{fallback}{quote}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A raw value split into literal text and variable references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expr {
    segments: Vec<Segment>,
}

impl Expr {
    /// Parse `input`, failing on the first malformed embedded call.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let (expr, mut errors) = Self::parse_inner(input, true);
        match errors.pop() {
            Some(err) => Err(err),
            None => Ok(expr),
        }
    }

    /// Parse `input`, keeping malformed calls as literal text.
    ///
    /// The problems that were skipped are returned alongside the expression
    /// so the caller can report them.
    pub fn parse_lenient(input: &str) -> (Self, Vec<ReferenceError>) {
        Self::parse_inner(input, false)
    }

    fn parse_inner(input: &str, strict: bool) -> (Self, Vec<ReferenceError>) {
        let mut expr = Expr::default();
        let mut errors = Vec::new();
        let mut pos = 0;

        while let Some(found) = input[pos..].find(CALL_MARKER) {
            let offset = pos + found;
            expr.push_literal(&input[pos..offset]);

            let args_start = offset + CALL_MARKER.len();
            match parse_call(input, args_start) {
                Ok((name, fallback, end)) => {
                    expr.segments.push(Segment::Reference { name, fallback });
                    pos = end;
                }
                Err(reason) => {
                    errors.push(ReferenceError { offset, reason });
                    if strict {
                        return (expr, errors);
                    }
                    // Keep the marker verbatim and rescan after it.
                    expr.push_literal(&input[offset..args_start]);
                    pos = args_start;
                }
            }
        }

        expr.push_literal(&input[pos..]);
        (expr, errors)
    }

    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the value embeds no references.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Names of every referenced variable, in order of appearance.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Reference { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every reference using `lookup`.
    ///
    /// A reference resolves to the looked-up value, else its fallback, else a
    /// native `var(--name)` reference left for the style system.
    pub fn resolve<'a, F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Reference { name, fallback } => match (lookup(name), fallback) {
                    (Some(value), _) => out.push_str(value),
                    (None, Some(fallback)) => out.push_str(fallback),
                    (None, None) => out.push_str(&var_reference(name)),
                },
            }
        }
        out
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Parse the argument list of a call starting right after the marker.
///
/// Returns the name, the fallback and the byte offset just past `)`.
fn parse_call(src: &str, start: usize) -> Result<(String, Option<String>, usize), String> {
    let mut pos = skip_ws(src, start);

    let (name, next) = quoted(src, pos)?;
    if name.is_empty() {
        return Err("empty variable name".to_string());
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c == '\'' || c == '"')
    {
        return Err(format!("invalid variable name '{}'", name));
    }
    pos = skip_ws(src, next);

    let mut fallback = None;
    if src[pos..].starts_with(',') {
        pos = skip_ws(src, pos + 1);
        let (value, next) = quoted(src, pos)?;
        fallback = Some(value.to_string());
        pos = skip_ws(src, next);
    }

    if !src[pos..].starts_with(')') {
        return Err("expected ')'".to_string());
    }

    Ok((name.to_string(), fallback, pos + 1))
}

/// Read a quoted string at `pos`, returning its contents and the offset after
/// the closing quote.
fn quoted(src: &str, pos: usize) -> Result<(&str, usize), String> {
    let quote = match src[pos..].chars().next() {
        Some(q @ ('\'' | '"')) => q,
        Some(other) => return Err(format!("expected quoted string, found '{}'", other)),
        None => return Err("unexpected end of value".to_string()),
    };

    let body_start = pos + 1;
    match src[body_start..].find(quote) {
        Some(len) => Ok((&src[body_start..body_start + len], body_start + len + 1)),
        None => Err(format!("unterminated string, missing closing {}", quote)),
    }
}

fn skip_ws(src: &str, pos: usize) -> usize {
    let rest = &src[pos..];
    pos + (rest.len() - rest.trim_start().len())
}
