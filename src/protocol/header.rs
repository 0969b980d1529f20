//! `Sec-WebSocket-Extensions` header grammar.
//!
//! ```text
//! header     = [ spec *( OWS "," OWS spec ) ]
//! spec       = token *( OWS ";" OWS param )
//! param      = token [ "=" ( token / quoted-string ) ]
//! ```
//!
//! Parsing is all-or-nothing: any character outside the grammar rejects the
//! whole value. Repeated parameter keys within one spec collapse into a
//! [`ParamValue::List`], and repeated extension names are kept as separate
//! entries of the [`HeaderRecord`] in header order.

use std::fmt;

use crate::error::{Error, Result};

/// Value of a single extension parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Parameter present with no value (`; key`).
    Flag,
    /// Value matching `-?(0|[1-9][0-9]*)(\.[0-9]+)?`.
    Number(f64),
    /// Any other value.
    String(String),
    /// The same key given more than once, in header order.
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Build a value from raw text, converting numeric literals.
    fn from_text(text: String) -> Self {
        if is_number(&text) {
            if let Ok(number) = text.parse::<f64>() {
                return ParamValue::Number(number);
            }
        }
        ParamValue::String(text)
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_flag(&self) -> bool {
        matches!(self, ParamValue::Flag)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(f64::from(value))
    }
}

/// Parameters of one extension spec, in the order their keys first appeared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Offer {
    params: Vec<(String, ParamValue)>,
}

impl Offer {
    /// Create an offer with no parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Offer::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder form of inserting a [`ParamValue::Flag`].
    #[must_use]
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.insert(key, ParamValue::Flag);
        self
    }

    /// Insert a parameter, appending to a list if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, ParamValue::List(values))) => values.push(value),
            Some((_, existing)) => {
                let first = std::mem::replace(existing, ParamValue::Flag);
                *existing = ParamValue::List(vec![first, value]);
            }
            None => self.params.push((key, value)),
        }
    }

    /// Get a parameter value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Check whether a key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// A parsed header value: extension names and their offers in header order.
///
/// A name that appears more than once keeps every offer; [`HeaderRecord::by_name`]
/// returns them as a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderRecord {
    entries: Vec<(String, Offer)>,
}

impl HeaderRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an offer under `name`.
    pub fn push(&mut self, name: impl Into<String>, offer: Offer) {
        self.entries.push((name.into(), offer));
    }

    /// All offers made under `name`, in header order.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Vec<&Offer> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, offer)| offer)
            .collect()
    }

    /// Iterate over `(name, offer)` entries in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Offer)> {
        self.entries.iter().map(|(n, o)| (n.as_str(), o))
    }

    /// Number of extension specs (duplicates counted separately).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns `true` if `s` is a non-empty HTTP token (RFC 7230 `tchar`s).
#[must_use]
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_tchar)
}

#[inline]
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[inline]
fn is_ows(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Matches `-?(0|[1-9][0-9]*)(\.[0-9]+)?`.
fn is_number(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };

    let int_ok = match int.as_bytes() {
        [b'0'] => true,
        [first, rest @ ..] => (b'1'..=b'9').contains(first) && rest.iter().all(u8::is_ascii_digit),
        [] => false,
    };
    let frac_ok = frac.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()));

    int_ok && frac_ok
}

/// Byte cursor over a header value.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ows(&mut self) {
        while self.peek().is_some_and(is_ows) {
            self.pos += 1;
        }
    }

    fn token(&mut self) -> Option<&'a str> {
        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(is_tchar) {
            self.pos += 1;
        }
        (self.pos > start).then(|| &input[start..self.pos])
    }

    /// Parse a quoted string; the opening quote is the current byte.
    fn quoted(&mut self) -> Option<String> {
        if !self.eat(b'"') {
            return None;
        }
        let input = self.input;
        let mut out = String::new();
        let mut chars = input[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += offset + 1;
                    return Some(out);
                }
                '\\' => match chars.next() {
                    Some((_, escaped)) if escaped.is_ascii() => out.push(escaped),
                    _ => return None,
                },
                '\t' => out.push(c),
                c if c.is_ascii_control() => return None,
                c => out.push(c),
            }
        }
        // unterminated
        None
    }

    fn at_end(&self) -> bool {
        self.pos == self.input.len()
    }
}

/// Parse an extension header value.
///
/// A missing or empty (whitespace-only) header yields an empty record.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] if the value does not match the grammar
/// as a whole, including an unterminated quoted string.
pub fn parse_header<'a>(header: impl Into<Option<&'a str>>) -> Result<HeaderRecord> {
    let Some(raw) = header.into() else {
        return Ok(HeaderRecord::new());
    };
    let value = raw.trim_matches(|c| c == ' ' || c == '\t');
    if value.is_empty() {
        return Ok(HeaderRecord::new());
    }

    parse_specs(value).ok_or_else(|| Error::InvalidHeader(raw.to_string()))
}

fn parse_specs(value: &str) -> Option<HeaderRecord> {
    let mut cursor = Cursor::new(value);
    let mut record = HeaderRecord::new();

    loop {
        let name = cursor.token()?;
        let mut offer = Offer::new();

        loop {
            cursor.skip_ows();
            if !cursor.eat(b';') {
                break;
            }
            cursor.skip_ows();
            let key = cursor.token()?;
            let value = if cursor.eat(b'=') {
                let text = if cursor.peek() == Some(b'"') {
                    cursor.quoted()?
                } else {
                    cursor.token()?.to_string()
                };
                ParamValue::from_text(text)
            } else {
                ParamValue::Flag
            };
            offer.insert(key, value);
        }

        record.push(name, offer);

        if cursor.at_end() {
            return Some(record);
        }
        if !cursor.eat(b',') {
            return None;
        }
        cursor.skip_ows();
    }
}

/// Serialize one extension spec: `name` followed by its parameters.
///
/// Strings that are valid tokens are written bare, anything else is quoted
/// with `"`, `\` and control characters other than tab backslash-escaped. A list repeats its key once per
/// element.
#[must_use]
pub fn serialize_params(name: &str, offer: &Offer) -> String {
    let mut out = String::from(name);
    for (key, value) in offer.iter() {
        write_param(&mut out, key, value);
    }
    out
}

fn write_param(out: &mut String, key: &str, value: &ParamValue) {
    match value {
        ParamValue::List(values) => {
            for v in values {
                write_param(out, key, v);
            }
        }
        ParamValue::Flag => {
            out.push_str("; ");
            out.push_str(key);
        }
        ParamValue::Number(n) => {
            out.push_str(&format!("; {key}={n}"));
        }
        ParamValue::String(s) if is_token(s) => {
            out.push_str(&format!("; {key}={s}"));
        }
        ParamValue::String(s) => {
            out.push_str(&format!("; {key}=\""));
            for c in s.chars() {
                if needs_escape(c) {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
    }
}

/// Characters that are not qdtext and only survive as a quoted-pair.
fn needs_escape(c: char) -> bool {
    c == '"' || c == '\\' || (c.is_ascii_control() && c != '\t')
}

impl fmt::Display for HeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let specs: Vec<String> = self
            .entries
            .iter()
            .map(|(name, offer)| serialize_params(name, offer))
            .collect();
        f.write_str(&specs.join(", "))
    }
}
