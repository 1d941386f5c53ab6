//! PDF name objects and the name escaping codec
//!
//! A [`Name`] is a cheap, shared handle. It caches both its decoded string
//! and its encoded (escaped) bytes: whichever form the name was built from is
//! authoritative and the other one is derived the first time it is asked for,
//! so dictionary key comparisons never re-run the escape loop.
//!
//! Frequently used keys are interned in a process-wide table (see
//! [`super::well_known`]); two interned names compare by pointer identity.

use once_cell::sync::OnceCell;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Escape a logical name value into its serialized byte form (without the
/// leading solidus).
///
/// Only the low byte of each character is significant.
pub fn encode_name(value: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.len() + 20);
    for ch in value.chars() {
        let c = (ch as u32 & 0xff) as u8;
        match c {
            b' ' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'#' => {
                push_escape(&mut buf, c)
            }
            32..=126 => buf.push(c),
            _ => push_escape(&mut buf, c),
        }
    }
    buf
}

fn push_escape(buf: &mut Vec<u8>, c: u8) {
    buf.push(b'#');
    buf.push(HEX_DIGITS[(c >> 4) as usize]);
    buf.push(HEX_DIGITS[(c & 0x0f) as usize]);
}

/// Decode serialized name bytes into the logical value.
///
/// A trailing `#` escape cut short by the end of input is dropped. A `#`
/// not followed by two hex digits is kept literally.
pub fn decode_name(content: &[u8]) -> String {
    DecodedBytes::new(content).map(char::from).collect()
}

/// Returns true when every `#` in `content` starts a complete two digit escape.
pub fn is_well_formed(content: &[u8]) -> bool {
    let mut k = 0;
    while k < content.len() {
        if content[k] == b'#' {
            match (content.get(k + 1), content.get(k + 2)) {
                (Some(h1), Some(h2)) if h1.is_ascii_hexdigit() && h2.is_ascii_hexdigit() => {
                    k += 3;
                    continue;
                }
                _ => return false,
            }
        }
        k += 1;
    }
    true
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Iterator over the decoded bytes of an encoded name.
struct DecodedBytes<'a> {
    content: &'a [u8],
    pos: usize,
}

impl<'a> DecodedBytes<'a> {
    fn new(content: &'a [u8]) -> Self {
        Self { content, pos: 0 }
    }
}

impl Iterator for DecodedBytes<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let c = *self.content.get(self.pos)?;
        if c != b'#' {
            self.pos += 1;
            return Some(c);
        }
        let (Some(&h1), Some(&h2)) = (self.content.get(self.pos + 1), self.content.get(self.pos + 2))
        else {
            // truncated escape at end of input
            self.pos = self.content.len();
            return None;
        };
        match (hex_value(h1), hex_value(h2)) {
            (Some(hi), Some(lo)) => {
                self.pos += 3;
                Some((hi << 4) | lo)
            }
            _ => {
                self.pos += 1;
                Some(b'#')
            }
        }
    }
}

/// Compare two encoded names by their decoded content without allocating.
///
/// Agrees in sign with comparing the decoded strings.
pub fn compare_content(a: &[u8], b: &[u8]) -> Ordering {
    DecodedBytes::new(a).cmp(DecodedBytes::new(b))
}

struct NameRepr {
    value: OnceCell<String>,
    content: OnceCell<Box<[u8]>>,
    interned: bool,
}

/// PDF name object
#[derive(Clone)]
pub struct Name(Arc<NameRepr>);

impl Name {
    /// Create a name from its logical value. Well-known names return the
    /// shared interned instance.
    ///
    /// Characters above U+00FF are stored as their low byte, the same byte
    /// they serialize to, so two names are equal exactly when their encoded
    /// forms are.
    pub fn new(value: impl AsRef<str> + Into<String>) -> Self {
        if value.as_ref().chars().any(|ch| u32::from(ch) > 0xff) {
            let normalized: String = value
                .as_ref()
                .chars()
                .map(|ch| char::from((u32::from(ch) & 0xff) as u8))
                .collect();
            return Self::new(normalized);
        }
        if let Some(interned) = super::well_known::lookup(value.as_ref()) {
            return interned.clone();
        }
        Self::from_value(value.into())
    }

    /// Create a name from its serialized bytes (without the leading solidus).
    /// The bytes are kept verbatim for re-serialization.
    pub fn from_encoded(content: &[u8]) -> Self {
        if !content.contains(&b'#') {
            if let Some(interned) = std::str::from_utf8(content)
                .ok()
                .and_then(super::well_known::lookup)
            {
                return interned.clone();
            }
        }
        let content_cell = OnceCell::new();
        let _ = content_cell.set(content.to_vec().into_boxed_slice());
        Name(Arc::new(NameRepr {
            value: OnceCell::new(),
            content: content_cell,
            interned: false,
        }))
    }

    fn from_value(value: String) -> Self {
        let value_cell = OnceCell::new();
        let _ = value_cell.set(value);
        Name(Arc::new(NameRepr {
            value: value_cell,
            content: OnceCell::new(),
            interned: false,
        }))
    }

    /// Build a table entry with both forms materialized up front.
    pub(crate) fn interned(value: &str) -> Self {
        let value_cell = OnceCell::new();
        let _ = value_cell.set(value.to_string());
        let content_cell = OnceCell::new();
        let _ = content_cell.set(encode_name(value).into_boxed_slice());
        Name(Arc::new(NameRepr {
            value: value_cell,
            content: content_cell,
            interned: true,
        }))
    }

    /// The decoded value, decoding and caching it on first use.
    pub fn as_str(&self) -> &str {
        self.0.value.get_or_init(|| {
            let content = self.0.content.get().map(|c| &c[..]).unwrap_or_default();
            decode_name(content)
        })
    }

    /// The encoded bytes, escaping and caching them on first use.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.content.get_or_init(|| {
            let value = self.0.value.get().map(String::as_str).unwrap_or_default();
            encode_name(value).into_boxed_slice()
        })
    }

    pub fn is_interned(&self) -> bool {
        self.0.interned
    }

    /// Whether the decoded value has been materialized.
    pub fn has_value(&self) -> bool {
        self.0.value.get().is_some()
    }

    /// Whether the encoded bytes have been materialized.
    pub fn has_content(&self) -> bool {
        self.0.content.get().is_some()
    }

    /// Identity comparison: both handles share one cached representation.
    pub fn same_instance(&self, other: &Name) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.same_instance(other) {
            return Ordering::Equal;
        }
        if let (Some(a), Some(b)) = (self.0.value.get(), other.0.value.get()) {
            return a.cmp(b);
        }
        if let (Some(a), Some(b)) = (self.0.content.get(), other.0.content.get()) {
            return compare_content(a, b);
        }
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must match `str`'s hash for `Borrow<str>` lookups.
        self.as_str().hash(state)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl From<&String> for Name {
    fn from(value: &String) -> Self {
        Name::new(value.as_str())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Encoded names are plain ASCII.
        f.write_str("/")?;
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}
