//! Comparable package versions
//!
//! Folder versions in a package repository are rarely semver (`1.0`,
//! `2.1-beta`, `custom`), so versions here are sequences of alphanumeric
//! tokens separated by `.` or `-`. Each token is split into runs of digits
//! and non-digits; digit runs compare numerically, other runs compare
//! lexically and sort before digit runs. A version that is a prefix of
//! another sorts first (`1` < `1.0`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("invalid character '{ch}' in version '{input}'")]
    InvalidCharacter { input: String, ch: char },

    #[error("empty token in version '{0}'")]
    EmptyToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Part {
    Alpha(String),
    Digits(String),
}

impl Part {
    fn as_str(&self) -> &str {
        match self {
            Part::Alpha(s) | Part::Digits(s) => s,
        }
    }
}

impl Ord for Part {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Part::Alpha(a), Part::Alpha(b)) => a.cmp(b),
            (Part::Alpha(_), Part::Digits(_)) => Ordering::Less,
            (Part::Digits(_), Part::Alpha(_)) => Ordering::Greater,
            (Part::Digits(a), Part::Digits(b)) => {
                let ta = a.trim_start_matches('0');
                let tb = b.trim_start_matches('0');
                ta.len()
                    .cmp(&tb.len())
                    .then_with(|| ta.cmp(tb))
                    .then_with(|| a.len().cmp(&b.len()))
            }
        }
    }
}

impl PartialOrd for Part {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Token(Vec<Part>);

impl Token {
    fn parse(text: &str) -> Self {
        let mut parts: Vec<Part> = Vec::new();
        for ch in text.chars() {
            let digit = ch.is_ascii_digit();
            match parts.last_mut() {
                Some(Part::Digits(run)) if digit => run.push(ch),
                Some(Part::Alpha(run)) if !digit => run.push(ch),
                _ if digit => parts.push(Part::Digits(ch.to_string())),
                _ => parts.push(Part::Alpha(ch.to_string())),
            }
        }
        Token(parts)
    }
}

/// A comparable package version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    tokens: Vec<Token>,
    separators: Vec<char>,
}

impl Version {
    /// Parse a version string; the empty string is the empty version
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let mut version = Version::default();
        if input.is_empty() {
            return Ok(version);
        }

        let mut current = String::new();
        for ch in input.chars() {
            match ch {
                '.' | '-' => {
                    if current.is_empty() {
                        return Err(VersionError::EmptyToken(input.to_string()));
                    }
                    version.tokens.push(Token::parse(&current));
                    version.separators.push(ch);
                    current.clear();
                }
                c if c.is_ascii_alphanumeric() || c == '_' => current.push(c),
                c => {
                    return Err(VersionError::InvalidCharacter {
                        input: input.to_string(),
                        ch: c,
                    })
                }
            }
        }
        if current.is_empty() {
            return Err(VersionError::EmptyToken(input.to_string()));
        }
        version.tokens.push(Token::parse(&current));
        Ok(version)
    }

    /// Whether this is the empty version
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens (`1.2.3` has three)
    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tokens
            .cmp(&other.tokens)
            .then_with(|| self.separators.cmp(&other.separators))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.separators[i - 1])?;
            }
            for part in &token.0 {
                f.write_str(part.as_str())?;
            }
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Version::parse(&text).map_err(serde::de::Error::custom)
    }
}
