//! Path pattern segments and the variable binder
//!
//! A segment pattern such as `package.{ext}` is literal text interleaved with
//! `{name}` placeholders. Binding it against one directory entry name yields
//! the placeholder values, or `None` when the entry does not match.

use crate::handle::Variables;
use crate::{ResourceError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Placeholder(String),
}

/// One compiled path segment pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPattern {
    source: String,
    pieces: Vec<Piece>,
}

impl SegmentPattern {
    /// Compile a segment pattern
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: &str| ResourceError::InvalidPattern {
            pattern: source.to_string(),
            reason: reason.to_string(),
        };

        if source.contains('/') {
            return Err(invalid("a segment pattern cannot contain '/'"));
        }

        let mut pieces = Vec::new();
        let mut rest = source;
        while !rest.is_empty() {
            match rest.find(['{', '}']) {
                Some(pos) if rest[pos..].starts_with('}') => {
                    return Err(invalid("unbalanced '}'"));
                }
                Some(pos) => {
                    if pos > 0 {
                        pieces.push(Piece::Literal(rest[..pos].to_string()));
                    }
                    let after = &rest[pos + 1..];
                    let end = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
                    let name = &after[..end];
                    if !is_identifier(name) {
                        return Err(invalid(&format!("'{}' is not a variable name", name)));
                    }
                    if matches!(pieces.last(), Some(Piece::Placeholder(_))) {
                        return Err(invalid("placeholders must be separated by literal text"));
                    }
                    pieces.push(Piece::Placeholder(name.to_string()));
                    rest = &after[end + 1..];
                }
                None => {
                    pieces.push(Piece::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        Ok(Self {
            source: source.to_string(),
            pieces,
        })
    }

    /// The pattern text as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern is empty (the search root itself)
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Placeholder names, in order of appearance
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Placeholder(name) => Some(name.as_str()),
            Piece::Literal(_) => None,
        })
    }

    /// Total literal length; more literal text means a more specific pattern
    pub fn specificity(&self) -> usize {
        self.pieces
            .iter()
            .map(|p| match p {
                Piece::Literal(text) => text.len(),
                Piece::Placeholder(_) => 0,
            })
            .sum()
    }

    /// Match one path segment.
    ///
    /// Placeholders already present in `bound` only match their bound value.
    /// Returns the newly bound variables on success.
    pub fn bind(&self, segment: &str, bound: &Variables) -> Option<Variables> {
        let mut captured = Vec::new();
        if match_pieces(&self.pieces, segment, bound, &mut captured) {
            Some(captured.into_iter().collect())
        } else {
            None
        }
    }
}

impl fmt::Display for SegmentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn lookup<'a>(name: &str, bound: &'a Variables, captured: &'a [(String, String)]) -> Option<&'a str> {
    captured
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
        .or_else(|| bound.get(name).map(String::as_str))
}

fn match_pieces(
    pieces: &[Piece],
    text: &str,
    bound: &Variables,
    captured: &mut Vec<(String, String)>,
) -> bool {
    let Some((first, rest)) = pieces.split_first() else {
        return text.is_empty();
    };

    match first {
        Piece::Literal(lit) => text
            .strip_prefix(lit.as_str())
            .is_some_and(|tail| match_pieces(rest, tail, bound, captured)),
        Piece::Placeholder(name) => {
            if let Some(value) = lookup(name, bound, captured) {
                let value = value.to_string();
                return text
                    .strip_prefix(value.as_str())
                    .is_some_and(|tail| !value.is_empty() && match_pieces(rest, tail, bound, captured));
            }

            // Greedy: try the longest capture first, backtrack to shorter ones.
            let ends: Vec<usize> = text
                .char_indices()
                .map(|(i, c)| i + c.len_utf8())
                .collect();
            for &end in ends.iter().rev() {
                let tail = &text[end..];
                if let Some(Piece::Literal(next)) = rest.first() {
                    if !tail.starts_with(next.as_str()) {
                        continue;
                    }
                }
                captured.push((name.clone(), text[..end].to_string()));
                if match_pieces(rest, tail, bound, captured) {
                    return true;
                }
                captured.pop();
            }
            false
        }
    }
}
