// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! X.500 distinguished names.
//!
//! A [`DistinguishedName`] can be parsed from the string forms described in
//! [RFC 4514] (and its predecessors RFC 2253 and RFC 1779) or decoded from the
//! DER encoding found in X.509 certificates. Two names compare equal when they
//! are structurally equal: attribute types are compared by OID and string
//! values are compared case-insensitively after whitespace normalization, so
//! `CN=Foo,O=Example` equals `cn = foo, o = example`.
//!
//! [RFC 4514]: https://datatracker.ietf.org/doc/html/rfc4514

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use thiserror::Error;
use x509_parser::{prelude::FromDer, x509::X509Name};

const TAG_UTF8_STRING: u32 = 12;
const TAG_PRINTABLE_STRING: u32 = 19;
const TAG_T61_STRING: u32 = 20;
const TAG_IA5_STRING: u32 = 22;
const TAG_UNIVERSAL_STRING: u32 = 28;
const TAG_BMP_STRING: u32 = 30;

/// Attribute type keywords accepted when parsing, with their OIDs.
///
/// The first nine are the keywords RFC 2253 output uses; the remainder are
/// only recognized on input.
const KEYWORDS: &[(&str, &str)] = &[
    ("CN", "2.5.4.3"),
    ("C", "2.5.4.6"),
    ("L", "2.5.4.7"),
    ("ST", "2.5.4.8"),
    ("O", "2.5.4.10"),
    ("OU", "2.5.4.11"),
    ("STREET", "2.5.4.9"),
    ("DC", "0.9.2342.19200300.100.1.25"),
    ("UID", "0.9.2342.19200300.100.1.1"),
    ("SERIALNUMBER", "2.5.4.5"),
    ("SURNAME", "2.5.4.4"),
    ("T", "2.5.4.12"),
    ("TITLE", "2.5.4.12"),
    ("POSTALCODE", "2.5.4.17"),
    ("GIVENNAME", "2.5.4.42"),
    ("INITIALS", "2.5.4.43"),
    ("GENERATION", "2.5.4.44"),
    ("DNQ", "2.5.4.46"),
    ("DNQUALIFIER", "2.5.4.46"),
    ("EMAIL", "1.2.840.113549.1.9.1"),
    ("EMAILADDRESS", "1.2.840.113549.1.9.1"),
];

const RFC2253_KEYWORD_COUNT: usize = 9;
const RFC1779_KEYWORD_COUNT: usize = 7;

/// Describes why a string could not be parsed as a distinguished name.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid distinguished name: {0}")]
pub struct DnParseError(pub(crate) String);

/// The string form used when formatting a [`DistinguishedName`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum X500NameFormat {
    /// RFC 2253: `CN=foo,O=Example,C=US`.
    #[default]
    Rfc2253,

    /// RFC 1779: `CN=foo, O=Example, C=US`, with `OID.` prefixed numeric types.
    Rfc1779,

    /// The normalized RFC 2253 form used for comparisons: lowercase keywords
    /// and values with whitespace collapsed.
    Canonical,
}

/// The value of a single attribute in a distinguished name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttributeValue {
    /// A value encoded with one of the ASN.1 character string types.
    Text(String),

    /// Any other value, holding the DER content octets.
    Binary(Vec<u8>),
}

/// A single `type=value` assertion within a relative distinguished name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeTypeAndValue {
    oid: String,
    value: AttributeValue,
}

impl AttributeTypeAndValue {
    /// Create a new attribute assertion from a dotted-decimal OID and a value.
    pub fn new(oid: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            oid: oid.into(),
            value,
        }
    }

    /// Return the attribute type as a dotted-decimal OID.
    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// Return the attribute value.
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// Return the value if it is a character string.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Binary(_) => None,
        }
    }

    fn canonical(&self) -> String {
        let value = match &self.value {
            AttributeValue::Text(s) => escape_value(&normalize_text(s)),
            AttributeValue::Binary(b) => format!("#{}", hex::encode(b)),
        };
        format!("{}={}", keyword_for(&self.oid, RFC2253_KEYWORD_COUNT, false).to_lowercase(), value)
    }

    fn format(&self, keywords: usize, oid_prefix: bool) -> String {
        let value = match &self.value {
            AttributeValue::Text(s) => escape_value(s),
            AttributeValue::Binary(b) => format!("#{}", hex::encode(b)),
        };
        format!("{}={}", keyword_for(&self.oid, keywords, oid_prefix), value)
    }
}

/// A relative distinguished name: one or more attribute assertions joined by
/// `+` in string form.
#[derive(Clone, Debug, Default)]
pub struct RelativeDistinguishedName {
    avas: Vec<AttributeTypeAndValue>,
}

impl RelativeDistinguishedName {
    /// Return the attribute assertions in this RDN.
    pub fn attributes(&self) -> &[AttributeTypeAndValue] {
        &self.avas
    }

    fn canonical(&self) -> String {
        let mut avas: Vec<String> = self.avas.iter().map(|ava| ava.canonical()).collect();
        avas.sort();
        avas.join("+")
    }
}

/// A parsed X.500 distinguished name.
///
/// RDNs are held in encoding order: the most general RDN (usually `C` or
/// `DC`) first and the most specific one (usually `CN`) last. The string forms
/// list them in the opposite order.
#[derive(Clone, Debug, Default)]
pub struct DistinguishedName {
    rdns: Vec<RelativeDistinguishedName>,
}

impl DistinguishedName {
    /// Parse a distinguished name from its RFC 4514, RFC 2253 or RFC 1779
    /// string form.
    pub fn parse(name: &str) -> Result<Self, DnParseError> {
        Parser::new(name).parse()
    }

    /// Decode a DER-encoded `Name`.
    pub fn from_der(der: &[u8]) -> Result<Self, DnParseError> {
        let (_, name) = X509Name::from_der(der).map_err(|e| DnParseError(e.to_string()))?;
        Ok(Self::from_x509_name(&name))
    }

    /// Convert a name decoded by `x509-parser`.
    pub fn from_x509_name(name: &X509Name) -> Self {
        let rdns = name
            .iter_rdn()
            .map(|rdn| RelativeDistinguishedName {
                avas: rdn
                    .iter()
                    .map(|attr| {
                        let any = attr.attr_value();
                        AttributeTypeAndValue {
                            oid: attr.attr_type().to_id_string(),
                            value: decode_value(any.header.tag().0, any.data),
                        }
                    })
                    .collect(),
            })
            .collect();

        Self { rdns }
    }

    /// Return the RDNs in encoding order (most specific last).
    pub fn rdns(&self) -> &[RelativeDistinguishedName] {
        &self.rdns
    }

    /// Return `true` if the name has no RDNs.
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Return the string values of every attribute with the given OID,
    /// most specific first.
    pub fn values_of(&self, oid: &str) -> Vec<String> {
        self.rdns
            .iter()
            .rev()
            .flat_map(|rdn| rdn.avas.iter())
            .filter(|ava| ava.oid == oid)
            .filter_map(|ava| ava.as_str().map(str::to_owned))
            .collect()
    }

    /// Format the name in the requested string form.
    pub fn format(&self, format: X500NameFormat) -> String {
        let (separator, keywords, oid_prefix) = match format {
            X500NameFormat::Rfc2253 => (",", RFC2253_KEYWORD_COUNT, false),
            X500NameFormat::Rfc1779 => (", ", RFC1779_KEYWORD_COUNT, true),
            X500NameFormat::Canonical => return self.canonical(),
        };

        self.rdns
            .iter()
            .rev()
            .map(|rdn| {
                rdn.avas
                    .iter()
                    .map(|ava| ava.format(keywords, oid_prefix))
                    .collect::<Vec<_>>()
                    .join(" + ")
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Return `true` if `self` lies within the subtree rooted at `base`, which
    /// is the case when the RDNs of `base` are a prefix of those of `self`.
    pub fn is_within_subtree(&self, base: &DistinguishedName) -> bool {
        base.rdns.len() <= self.rdns.len()
            && base
                .rdns
                .iter()
                .zip(self.rdns.iter())
                .all(|(b, s)| b.canonical() == s.canonical())
    }

    fn canonical(&self) -> String {
        self.rdns
            .iter()
            .rev()
            .map(RelativeDistinguishedName::canonical)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.rdns.len() == other.rdns.len() && self.canonical() == other.canonical()
    }
}

impl Eq for DistinguishedName {}

impl Hash for DistinguishedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(X500NameFormat::Rfc2253))
    }
}

impl FromStr for DistinguishedName {
    type Err = DnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parses and formats distinguished names on behalf of the name evaluator and
/// log messages.
pub trait X500DnHandler: fmt::Debug + Send + Sync {
    /// Parse a distinguished name from a string.
    fn parse(&self, name: &str) -> Result<DistinguishedName, DnParseError>;

    /// Decode a DER-encoded distinguished name.
    fn parse_der(&self, der: &[u8]) -> Result<DistinguishedName, DnParseError>;

    /// Format a distinguished name in the handler's default string form.
    fn name(&self, dn: &DistinguishedName) -> String {
        self.name_with_format(dn, X500NameFormat::default())
    }

    /// Format a distinguished name in a specific string form.
    fn name_with_format(&self, dn: &DistinguishedName, format: X500NameFormat) -> String;
}

/// The built-in [`X500DnHandler`].
#[derive(Clone, Copy, Debug, Default)]
pub struct InternalX500DnHandler;

impl X500DnHandler for InternalX500DnHandler {
    fn parse(&self, name: &str) -> Result<DistinguishedName, DnParseError> {
        DistinguishedName::parse(name)
    }

    fn parse_der(&self, der: &[u8]) -> Result<DistinguishedName, DnParseError> {
        DistinguishedName::from_der(der)
    }

    fn name_with_format(&self, dn: &DistinguishedName, format: X500NameFormat) -> String {
        dn.format(format)
    }
}

fn keyword_for(oid: &str, keywords: usize, oid_prefix: bool) -> String {
    match KEYWORDS.iter().take(keywords).find(|(_, o)| *o == oid) {
        Some((kw, _)) => (*kw).to_string(),
        None if oid_prefix => format!("OID.{oid}"),
        None => oid.to_string(),
    }
}

fn oid_for(attr_type: &str) -> Option<String> {
    let attr_type = attr_type
        .strip_prefix("OID.")
        .or_else(|| attr_type.strip_prefix("oid."))
        .unwrap_or(attr_type);

    if attr_type.starts_with(|c: char| c.is_ascii_digit()) {
        let arcs: Vec<&str> = attr_type.split('.').collect();
        let valid = arcs.len() >= 2
            && arcs
                .iter()
                .all(|arc| !arc.is_empty() && arc.chars().all(|c| c.is_ascii_digit()));
        return valid.then(|| attr_type.to_string());
    }

    let upper = attr_type.to_ascii_uppercase();
    KEYWORDS
        .iter()
        .find(|(kw, _)| *kw == upper)
        .map(|(_, oid)| (*oid).to_string())
}

fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if needs_escape {
            out.push('\\');
        }
        out.push(c);
    }

    out
}

/// Interpret the content octets of an attribute value with the given
/// universal tag number.
fn decode_value(tag: u32, content: &[u8]) -> AttributeValue {
    let text = match tag {
        TAG_UTF8_STRING | TAG_PRINTABLE_STRING | TAG_IA5_STRING | TAG_T61_STRING => {
            std::str::from_utf8(content).ok().map(str::to_owned)
        }
        TAG_BMP_STRING => {
            let units: Vec<u16> = content
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        TAG_UNIVERSAL_STRING => content
            .chunks_exact(4)
            .map(|quad| char::from_u32(u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]])))
            .collect::<Option<String>>(),
        _ => None,
    };

    match text {
        Some(text) => AttributeValue::Text(text),
        None => AttributeValue::Binary(content.to_vec()),
    }
}

/// Decode the `#hex` form of an attribute value, which carries a complete
/// DER TLV.
fn decode_hex_value(hex_str: &str) -> Result<AttributeValue, DnParseError> {
    let der = hex::decode(hex_str)
        .map_err(|e| DnParseError(format!("bad hex attribute value: {e}")))?;

    let (tag, rest) = der
        .split_first()
        .ok_or_else(|| DnParseError("empty hex attribute value".into()))?;
    let (len_byte, rest) = rest
        .split_first()
        .ok_or_else(|| DnParseError("truncated hex attribute value".into()))?;

    let (len, content) = if len_byte & 0x80 == 0 {
        (*len_byte as usize, rest)
    } else {
        let count = (len_byte & 0x7f) as usize;
        if count == 0 || count > 4 || rest.len() < count {
            return Err(DnParseError("bad length in hex attribute value".into()));
        }
        let (len_bytes, content) = rest.split_at(count);
        let len = len_bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (len, content)
    };

    if content.len() != len {
        return Err(DnParseError("length mismatch in hex attribute value".into()));
    }

    Ok(decode_value((tag & 0x1f) as u32, content))
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            input,
        }
    }

    fn parse(mut self) -> Result<DistinguishedName, DnParseError> {
        let mut rdns = Vec::new();

        self.skip_spaces();
        if self.peek().is_none() {
            return Ok(DistinguishedName::default());
        }

        let mut current = RelativeDistinguishedName::default();
        loop {
            self.skip_spaces();
            let oid = self.read_type()?;
            self.skip_spaces();
            let value = self.read_value()?;
            current.avas.push(AttributeTypeAndValue { oid, value });

            self.skip_spaces();
            match self.next() {
                None => {
                    rdns.push(current);
                    break;
                }
                Some('+') => {}
                Some(',') | Some(';') => {
                    rdns.push(std::mem::take(&mut current));
                    self.skip_spaces();
                    if self.peek().is_none() {
                        return Err(self.error("trailing RDN separator"));
                    }
                }
                Some(c) => return Err(self.error(&format!("unexpected character '{c}'"))),
            }
        }

        rdns.reverse();
        Ok(DistinguishedName { rdns })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(' ') {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> DnParseError {
        DnParseError(format!("{reason} in \"{}\"", self.input))
    }

    fn read_type(&mut self) -> Result<String, DnParseError> {
        let mut attr_type = String::new();
        loop {
            match self.next() {
                Some('=') => break,
                Some(c @ (',' | ';' | '+' | '"' | '\\')) => {
                    return Err(self.error(&format!("unexpected character '{c}' in attribute type")))
                }
                Some(c) => attr_type.push(c),
                None => return Err(self.error("missing '='")),
            }
        }

        let attr_type = attr_type.trim();
        if attr_type.is_empty() {
            return Err(self.error("empty attribute type"));
        }

        oid_for(attr_type)
            .ok_or_else(|| self.error(&format!("unknown attribute type \"{attr_type}\"")))
    }

    fn read_value(&mut self) -> Result<AttributeValue, DnParseError> {
        match self.peek() {
            Some('#') => {
                self.pos += 1;
                let mut hex_str = String::new();
                while let Some(c) = self.peek() {
                    if !c.is_ascii_hexdigit() {
                        break;
                    }
                    hex_str.push(c);
                    self.pos += 1;
                }
                decode_hex_value(&hex_str).map_err(|e| self.error(&e.0))
            }
            Some('"') => {
                self.pos += 1;
                let mut bytes = Vec::new();
                loop {
                    match self.next() {
                        Some('"') => break,
                        Some('\\') => self.read_escape(&mut bytes)?,
                        Some(c) => push_char(&mut bytes, c),
                        None => return Err(self.error("unterminated quoted value")),
                    }
                }
                self.utf8(bytes).map(AttributeValue::Text)
            }
            _ => {
                let mut bytes = Vec::new();
                let mut significant = 0;
                while let Some(c) = self.peek() {
                    match c {
                        ',' | ';' | '+' => break,
                        '\\' => {
                            self.pos += 1;
                            self.read_escape(&mut bytes)?;
                            significant = bytes.len();
                        }
                        c => {
                            self.pos += 1;
                            push_char(&mut bytes, c);
                            if c != ' ' {
                                significant = bytes.len();
                            }
                        }
                    }
                }
                bytes.truncate(significant);
                self.utf8(bytes).map(AttributeValue::Text)
            }
        }
    }

    fn read_escape(&mut self, bytes: &mut Vec<u8>) -> Result<(), DnParseError> {
        let first = self
            .next()
            .ok_or_else(|| self.error("dangling escape character"))?;

        if first.is_ascii_hexdigit() {
            if let Some(second) = self.peek().filter(char::is_ascii_hexdigit) {
                self.pos += 1;
                let pair: String = [first, second].iter().collect();
                let byte = u8::from_str_radix(&pair, 16)
                    .map_err(|_| self.error("bad hex escape"))?;
                bytes.push(byte);
                return Ok(());
            }
        }

        push_char(bytes, first);
        Ok(())
    }

    fn utf8(&self, bytes: Vec<u8>) -> Result<String, DnParseError> {
        String::from_utf8(bytes).map_err(|_| self.error("escaped value is not valid UTF-8"))
    }
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
