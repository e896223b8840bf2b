//! Literal-assignment package scripts (`package.py`)
//!
//! A script is a sequence of `name = <literal>` statements. Literals are
//! strings (single, double or triple quoted; adjacent strings concatenate),
//! integers, floats, `True`/`False`/`None`, lists, tuples and dicts with
//! string keys. Anything else (function definitions, imports, expressions)
//! is rejected rather than evaluated.

use crate::value::{FieldValue, PackageData};
use std::collections::BTreeMap;

/// Parse a package script into a field mapping
pub fn parse(content: &str) -> Result<PackageData, String> {
    let mut parser = Parser { src: content, pos: 0 };
    let mut data = PackageData::new();

    loop {
        parser.skip_ws(true);
        if parser.at_end() {
            return Ok(data);
        }

        let name = parser.identifier()?;
        parser.skip_ws(false);
        if !parser.eat('=') {
            return Err(parser.error(&format!("expected '=' after '{}'", name)));
        }
        parser.skip_ws(false);
        let value = parser.value(false)?;

        parser.skip_ws(false);
        if !(parser.at_end() || parser.eat('\n') || parser.eat(';')) {
            return Err(parser.error("expected end of statement"));
        }
        data.insert(name, value);
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> String {
        let line = self.src[..self.pos].matches('\n').count() + 1;
        format!("line {}: {}", line, message)
    }

    /// Skip spaces and comments; newlines too when `multiline`
    fn skip_ws(&mut self, multiline: bool) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' if multiline => {
                    self.bump();
                }
                '\\' if self.rest()[1..].starts_with('\n') => {
                    self.pos += 2;
                }
                '#' => {
                    let len = self.rest().find('\n').unwrap_or(self.rest().len());
                    self.pos += len;
                }
                _ => break,
            }
        }
    }

    fn identifier(&mut self) -> Result<String, String> {
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        let ident = &self.rest()[..len];
        if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("expected an assignment"));
        }
        let ident = ident.to_string();
        self.pos += len;
        Ok(ident)
    }

    /// Parse one literal; `nested` when inside brackets (newlines allowed)
    fn value(&mut self, nested: bool) -> Result<FieldValue, String> {
        match self.peek() {
            Some('\'' | '"') => self.strings(nested),
            Some('[') => {
                self.bump();
                Ok(FieldValue::List(self.sequence(']')?))
            }
            Some('(') => {
                self.bump();
                self.skip_ws(true);
                if self.eat(')') {
                    return Ok(FieldValue::List(Vec::new()));
                }
                let first = self.value(true)?;
                self.skip_ws(true);
                if self.eat(')') {
                    return Ok(first);
                }
                if !self.eat(',') {
                    return Err(self.error("expected ',' or ')'"));
                }
                let mut items = vec![first];
                items.extend(self.sequence(')')?);
                Ok(FieldValue::List(items))
            }
            Some('{') => {
                self.bump();
                self.dict()
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let word = self.identifier()?;
                match word.as_str() {
                    "True" => Ok(FieldValue::Bool(true)),
                    "False" => Ok(FieldValue::Bool(false)),
                    "None" => Ok(FieldValue::Null),
                    other => Err(self.error(&format!("unsupported expression '{}'", other))),
                }
            }
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Comma separated values up to `close`, trailing comma allowed
    fn sequence(&mut self, close: char) -> Result<Vec<FieldValue>, String> {
        let mut items = Vec::new();
        loop {
            self.skip_ws(true);
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value(true)?);
            self.skip_ws(true);
            if self.eat(close) {
                return Ok(items);
            }
            if !self.eat(',') {
                return Err(self.error(&format!("expected ',' or '{}'", close)));
            }
        }
    }

    fn dict(&mut self) -> Result<FieldValue, String> {
        let mut map = BTreeMap::new();
        loop {
            self.skip_ws(true);
            if self.eat('}') {
                return Ok(FieldValue::Map(map));
            }
            let key = match self.value(true)? {
                FieldValue::String(key) => key,
                other => {
                    return Err(self.error(&format!(
                        "dict keys must be strings, found {}",
                        other.type_name()
                    )))
                }
            };
            self.skip_ws(true);
            if !self.eat(':') {
                return Err(self.error("expected ':'"));
            }
            self.skip_ws(true);
            map.insert(key, self.value(true)?);
            self.skip_ws(true);
            if self.eat('}') {
                return Ok(FieldValue::Map(map));
            }
            if !self.eat(',') {
                return Err(self.error("expected ',' or '}'"));
            }
        }
    }

    /// One or more adjacent string literals, concatenated
    fn strings(&mut self, nested: bool) -> Result<FieldValue, String> {
        let mut text = self.string()?;
        loop {
            let save = self.pos;
            self.skip_ws(nested);
            if matches!(self.peek(), Some('\'' | '"')) {
                text.push_str(&self.string()?);
            } else {
                self.pos = save;
                return Ok(FieldValue::String(text));
            }
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let quote = self.bump().ok_or_else(|| self.error("expected a string"))?;
        let triple: String = std::iter::repeat(quote).take(3).collect();
        let is_triple = self.src[self.pos - 1..].starts_with(&triple);
        if is_triple {
            self.pos += 2;
        }

        let mut text = String::new();
        loop {
            if is_triple && self.rest().starts_with(&triple) {
                self.pos += 3;
                return Ok(text);
            }
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote && !is_triple => return Ok(text),
                Some('\n') if !is_triple => return Err(self.error("unterminated string")),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('0') => text.push('\0'),
                    Some('\n') => {}
                    Some(c @ ('\\' | '\'' | '"')) => text.push(c),
                    Some(c) => {
                        text.push('\\');
                        text.push(c);
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => text.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<FieldValue, String> {
        let len = self
            .rest()
            .char_indices()
            .find(|&(i, c)| {
                !(c.is_ascii_alphanumeric()
                    || c == '.'
                    || c == '_'
                    || ((c == '-' || c == '+') && (i == 0 || self.rest()[..i].ends_with(['e', 'E']))))
            })
            .map_or(self.rest().len(), |(i, _)| i);
        let raw = &self.rest()[..len];
        let cleaned = raw.replace('_', "");

        let value = if let Ok(i) = cleaned.parse::<i64>() {
            FieldValue::Integer(i)
        } else if let Ok(f) = cleaned.parse::<f64>() {
            if cleaned.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                return Err(self.error(&format!("invalid number '{}'", raw)));
            }
            FieldValue::Float(f)
        } else {
            return Err(self.error(&format!("invalid number '{}'", raw)));
        };
        self.pos += len;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_full_package_script() {
        let script = r#"
# -*- coding: utf-8 -*-
name = 'versioned'
version = "1.0"
description = ("this description spans "
               "multiple lines.")
requires = [
    'amaze',
    'wow',  # trailing comma
]
tools = ('amazeballs',)
timestamp = 0
private = False
help = None
variants = [['python-2.7'], ['python-3.9']]
"#;

        let data = parse(script).unwrap();
        assert_eq!(data["name"], FieldValue::from("versioned"));
        assert_eq!(data["version"], FieldValue::from("1.0"));
        assert_eq!(
            data["description"],
            FieldValue::from("this description spans multiple lines.")
        );
        assert_eq!(data["requires"], FieldValue::from(vec!["amaze", "wow"]));
        assert_eq!(data["tools"], FieldValue::from(vec!["amazeballs"]));
        assert_eq!(data["timestamp"], FieldValue::Integer(0));
        assert_eq!(data["private"], FieldValue::Bool(false));
        assert_eq!(data["help"], FieldValue::Null);
        assert_eq!(data["variants"].as_list().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_triple_quoted_and_escapes() {
        let data = parse("commands = '''\nenv.PATH.append('{root}/bin')\n'''\nx = 'a\\'b\\n'\n").unwrap();
        assert_eq!(
            data["commands"],
            FieldValue::from("\nenv.PATH.append('{root}/bin')\n")
        );
        assert_eq!(data["x"], FieldValue::from("a'b\n"));
    }

    #[test]
    fn test_dicts_and_numbers() {
        let data = parse("overrides = {'1.0': {'requires': []}}\nratio = -1.5e2\nbig = 1_000\n").unwrap();
        assert!(matches!(data["overrides"], FieldValue::Map(_)));
        assert_eq!(data["ratio"], FieldValue::Float(-150.0));
        assert_eq!(data["big"], FieldValue::Integer(1000));
    }

    #[rstest]
    #[case("def commands():\n    pass\n")]
    #[case("import os\n")]
    #[case("name = os.getenv('USER')\n")]
    #[case("name = 'unterminated\n")]
    #[case("requires = ['a' 'b'\n")]
    #[case("x = 1 y = 2\n")]
    #[case("x = 12abc\n")]
    fn test_rejects_non_literal_scripts(#[case] script: &str) {
        assert!(parse(script).is_err(), "{:?}", script);
    }

    #[test]
    fn test_error_reports_line() {
        let err = parse("name = 'ok'\n\nversion = nope\n").unwrap_err();
        assert!(err.starts_with("line 3:"), "{}", err);
    }
}
