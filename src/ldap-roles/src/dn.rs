//! Distinguished name parsing
//!
//! Parses RFC 4514 string representations (`cn=Admins,ou=Groups,dc=example,dc=com`)
//! into an ordered list of relative distinguished names. The legacy RFC 2253
//! forms accepted by most directory servers (`;` as RDN separator, quoted
//! values) are also accepted.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use thiserror::Error;

/// Result type for DN parsing
pub type DnResult<T> = Result<T, DnError>;

/// Errors that can occur while parsing a distinguished name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// An RDN between two separators (or after a trailing one) is empty
    #[error("empty RDN component")]
    EmptyComponent,

    /// A component has no `=` between type and value
    #[error("missing '=' in component '{0}'")]
    MissingEquals(String),

    /// Attribute type is empty
    #[error("empty attribute type")]
    EmptyAttributeType,

    /// Attribute type holds a character other than a letter, digit, `.`, `-` or space
    #[error("invalid attribute type '{0}'")]
    InvalidAttributeType(String),

    /// Input ends with a lone backslash
    #[error("dangling escape at end of input")]
    DanglingEscape,

    /// Hex escapes decode to bytes that are not UTF-8
    #[error("escaped value is not valid UTF-8")]
    InvalidUtf8,

    /// Quoted value is missing its closing quote
    #[error("unterminated quoted value")]
    UnterminatedQuote,

    /// Character not allowed at this position
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

/// A single `type=value` pair inside an RDN
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeTypeAndValue {
    attr_type: String,
    value: String,
}

impl AttributeTypeAndValue {
    /// Attribute type as written (case preserved)
    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    /// Unescaped attribute value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Case-insensitive attribute type comparison
    pub fn is_type(&self, attr_type: &str) -> bool {
        self.attr_type.eq_ignore_ascii_case(attr_type)
    }

    /// Canonical ordering of pairs inside an RDN: type ignoring case, then
    /// value ignoring case
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.attr_type
            .to_lowercase()
            .cmp(&other.attr_type.to_lowercase())
            .then_with(|| self.value.to_uppercase().cmp(&other.value.to_uppercase()))
    }
}

/// A relative distinguished name: one or more `type=value` pairs joined by `+`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rdn {
    avas: Vec<AttributeTypeAndValue>,
}

impl Rdn {
    /// All attribute-type-and-value pairs, in written order
    pub fn avas(&self) -> &[AttributeTypeAndValue] {
        &self.avas
    }

    /// The pair that sorts first in canonical order
    ///
    /// For a single-valued RDN this is its only pair. For `uid=jdoe+cn=John`
    /// it is `cn=John`, whatever the written order.
    pub fn primary(&self) -> &AttributeTypeAndValue {
        self.avas
            .iter()
            .min_by(|a, b| a.canonical_cmp(b))
            .unwrap_or(&self.avas[0])
    }

    /// Type of the primary pair
    pub fn attr_type(&self) -> &str {
        self.primary().attr_type()
    }

    /// Value of the primary pair
    pub fn value(&self) -> &str {
        self.primary().value()
    }

    /// Whether this RDN holds more than one pair
    pub fn is_multi_valued(&self) -> bool {
        self.avas.len() > 1
    }
}

/// A parsed distinguished name
///
/// RDNs are kept in textual order: for `cn=Admins,ou=Groups,dc=example,dc=com`
/// `rdns()[0]` is `cn=Admins`. Name lookups such as [`first_value_of`] walk
/// the components from the most significant one (`dc=com`) down.
///
/// [`first_value_of`]: DistinguishedName::first_value_of
///
/// # Examples
///
/// ```
/// use ldap_roles::dn::DistinguishedName;
///
/// let dn = DistinguishedName::parse("cn=Admins,ou=Groups,dc=example,dc=com").unwrap();
/// assert_eq!(dn.len(), 4);
/// assert_eq!(dn.common_name(), Some("Admins"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parses a string representation of a DN
    ///
    /// The empty string is the root DN and parses to zero RDNs. A string of
    /// only whitespace is not a DN.
    pub fn parse(s: &str) -> DnResult<Self> {
        let rdns = if s.is_empty() {
            Vec::new()
        } else {
            Parser::new(s).parse_rdns()?
        };

        Ok(Self {
            raw: s.to_string(),
            rdns,
        })
    }

    /// RDNs in textual order
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Number of RDNs
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// Whether this is the root (empty) DN
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Original string representation
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Value of the first component whose type matches `attr_type`
    /// case-insensitively
    ///
    /// Components are indexed from the right, so `dc=com` comes first in
    /// `cn=Inner,cn=Outer,dc=com` and a `cn` lookup yields `Outer`. Only the
    /// [primary](Rdn::primary) pair of a multi-valued RDN is considered.
    pub fn first_value_of(&self, attr_type: &str) -> Option<&str> {
        self.rdns
            .iter()
            .rev()
            .map(Rdn::primary)
            .find(|ava| ava.is_type(attr_type))
            .map(AttributeTypeAndValue::value)
    }

    /// First `cn` value, if any
    pub fn common_name(&self) -> Option<&str> {
        self.first_value_of("cn")
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn is_rdn_separator(c: char) -> bool {
    c == ',' || c == ';'
}

fn is_value_terminator(c: char) -> bool {
    is_rdn_separator(c) || c == '+'
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn validate_attr_type(attr_type: &str) -> DnResult<()> {
    if attr_type.is_empty() {
        return Err(DnError::EmptyAttributeType);
    }

    let valid = attr_type
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | ' '));

    if valid {
        Ok(())
    } else {
        Err(DnError::InvalidAttributeType(attr_type.to_string()))
    }
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn parse_rdns(&mut self) -> DnResult<Vec<Rdn>> {
        let mut rdns = Vec::new();

        loop {
            rdns.push(self.parse_rdn()?);

            match self.chars.next() {
                None => break,
                Some(c) if is_rdn_separator(c) => continue,
                Some(c) => return Err(DnError::UnexpectedCharacter(c)),
            }
        }

        Ok(rdns)
    }

    fn parse_rdn(&mut self) -> DnResult<Rdn> {
        let mut avas = vec![self.parse_ava()?];

        while self.chars.peek() == Some(&'+') {
            self.chars.next();
            avas.push(self.parse_ava()?);
        }

        Ok(Rdn { avas })
    }

    fn parse_ava(&mut self) -> DnResult<AttributeTypeAndValue> {
        let attr_type = self.parse_attr_type()?;
        self.skip_spaces();

        let value = match self.chars.peek() {
            Some('"') => self.parse_quoted_value()?,
            Some('#') => self.parse_hex_string(),
            _ => self.parse_string_value()?,
        };

        Ok(AttributeTypeAndValue { attr_type, value })
    }

    fn parse_attr_type(&mut self) -> DnResult<String> {
        let mut text = String::new();

        loop {
            match self.chars.peek().copied() {
                Some('=') => {
                    self.chars.next();
                    break;
                }
                Some(c) if is_value_terminator(c) => {
                    return Err(Self::incomplete_component(text));
                }
                Some(c) => {
                    text.push(c);
                    self.chars.next();
                }
                None => return Err(Self::incomplete_component(text)),
            }
        }

        let attr_type = text.trim();
        validate_attr_type(attr_type)?;
        Ok(attr_type.to_string())
    }

    fn incomplete_component(text: String) -> DnError {
        if text.trim().is_empty() {
            DnError::EmptyComponent
        } else {
            DnError::MissingEquals(text.trim().to_string())
        }
    }

    fn parse_string_value(&mut self) -> DnResult<String> {
        let mut bytes = Vec::new();
        // Length of `bytes` up to the last character that must be kept;
        // unescaped trailing spaces are dropped.
        let mut significant = 0;

        while let Some(&c) = self.chars.peek() {
            if is_value_terminator(c) {
                break;
            }
            self.chars.next();

            if c == '\\' {
                self.parse_escape(&mut bytes)?;
                significant = bytes.len();
            } else {
                push_char(&mut bytes, c);
                if c != ' ' {
                    significant = bytes.len();
                }
            }
        }

        bytes.truncate(significant);
        String::from_utf8(bytes).map_err(|_| DnError::InvalidUtf8)
    }

    fn parse_quoted_value(&mut self) -> DnResult<String> {
        self.chars.next();
        let mut bytes = Vec::new();

        loop {
            match self.chars.next() {
                None => return Err(DnError::UnterminatedQuote),
                Some('"') => break,
                Some('\\') => self.parse_escape(&mut bytes)?,
                Some(c) => push_char(&mut bytes, c),
            }
        }

        self.skip_spaces();
        match self.chars.peek().copied() {
            None => {}
            Some(c) if is_value_terminator(c) => {}
            Some(c) => return Err(DnError::UnexpectedCharacter(c)),
        }

        String::from_utf8(bytes).map_err(|_| DnError::InvalidUtf8)
    }

    /// `#`-prefixed BER values are kept verbatim.
    fn parse_hex_string(&mut self) -> String {
        let mut value = String::new();

        while let Some(&c) = self.chars.peek() {
            if is_value_terminator(c) {
                break;
            }
            value.push(c);
            self.chars.next();
        }

        value.trim_end().to_string()
    }

    /// Consumes the sequence following a backslash.
    ///
    /// Two hex digits decode to one byte; any other character is taken
    /// literally.
    fn parse_escape(&mut self, bytes: &mut Vec<u8>) -> DnResult<()> {
        let first = self.chars.next().ok_or(DnError::DanglingEscape)?;

        let hex_pair = first.to_digit(16).and_then(|high| {
            let low = self.chars.peek()?.to_digit(16)?;
            Some(high * 16 + low)
        });

        match hex_pair {
            Some(byte) => {
                self.chars.next();
                bytes.push(byte as u8);
            }
            None => push_char(bytes, first),
        }
        Ok(())
    }

    fn skip_spaces(&mut self) {
        while self.chars.peek() == Some(&' ') {
            self.chars.next();
        }
    }
}
