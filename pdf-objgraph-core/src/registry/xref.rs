//! Cross-reference table reading
//!
//! Locates `startxref`, parses classic `xref` sections and their trailers and
//! follows `/Prev` chains. Entries from newer sections win over older ones.
//! Cross-reference streams are detected and rejected.

use super::source::{read_window, ByteSource};
use crate::codec::{ObjectParser, ParseError, Token};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use std::collections::{BTreeMap, HashSet};

/// Cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    /// Byte offset in the file (for in-use entries); next free object
    /// number for free entries
    pub offset: u64,
    /// Generation number
    pub generation: u16,
    /// Whether this entry is in use
    pub in_use: bool,
}

impl XRefEntry {
    pub fn in_use(offset: u64, generation: u16) -> Self {
        Self {
            offset,
            generation,
            in_use: true,
        }
    }

    pub fn free(next_free: u64, generation: u16) -> Self {
        Self {
            offset: next_free,
            generation,
            in_use: false,
        }
    }
}

/// Merged cross-reference information of a document
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dictionary,
    section_offsets: Vec<u64>,
}

/// Where an in-use object lives in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLocation {
    pub number: u32,
    pub generation: u16,
    pub offset: u64,
    /// Upper bound for the end of the object: the next known offset or the
    /// end of the source
    pub end: u64,
}

impl XRefTable {
    pub fn get_entry(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    /// Trailer of the newest section, completed with keys only older
    /// trailers carry
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &XRefEntry)> {
        self.entries.iter()
    }

    /// Value of `/Size`, or one past the highest entry when it is missing
    pub fn size(&self) -> u32 {
        let from_entries = self.entries.keys().next_back().map_or(1, |n| n + 1);
        self.trailer
            .get_integer("Size")
            .and_then(|s| u32::try_from(s).ok())
            .map_or(from_entries, |s| s.max(from_entries))
    }

    /// Byte bounds of every in-use object.
    pub fn locations(&self, source_len: u64) -> Vec<ObjectLocation> {
        let mut boundaries: Vec<u64> = self
            .entries
            .values()
            .filter(|e| e.in_use)
            .map(|e| e.offset)
            .chain(self.section_offsets.iter().copied())
            .chain(std::iter::once(source_len))
            .collect();
        boundaries.sort_unstable();
        boundaries.dedup();

        self.entries
            .iter()
            .filter(|(n, e)| e.in_use && **n != 0)
            .map(|(&number, entry)| {
                let end = match boundaries.binary_search(&entry.offset) {
                    Ok(i) => boundaries.get(i + 1).copied().unwrap_or(source_len),
                    Err(i) => boundaries.get(i).copied().unwrap_or(source_len),
                };
                ObjectLocation {
                    number,
                    generation: entry.generation,
                    offset: entry.offset,
                    end: end.max(entry.offset),
                }
            })
            .collect()
    }
}

const TAIL_WINDOW: usize = 1024;

/// Read the full cross-reference chain of a source.
pub fn read_xref(source: &mut dyn ByteSource, window: usize) -> Result<XRefTable> {
    let mut table = XRefTable::default();
    let mut next = Some(find_startxref(source)?);
    let mut visited = HashSet::new();

    while let Some(offset) = next.take() {
        if !visited.insert(offset) {
            tracing::warn!("Cross-reference /Prev loop at offset {}", offset);
            break;
        }
        if offset >= source.len() {
            return Err(PdfError::InvalidStructure(format!(
                "Cross-reference offset {offset} is past the end of the file"
            )));
        }

        let (entries, trailer) = read_section(source, offset, window)?;
        tracing::debug!(
            "Read xref section at {} with {} entries",
            offset,
            entries.len()
        );

        // newer sections were read first
        for (number, entry) in entries {
            table.entries.entry(number).or_insert(entry);
        }
        if trailer.contains_key("XRefStm") {
            tracing::warn!("Ignoring /XRefStm of a hybrid-reference file");
        }
        next = trailer
            .get_integer("Prev")
            .and_then(|p| u64::try_from(p).ok());
        table.trailer.merge_different(&trailer);
        table.section_offsets.push(offset);
    }

    table.trailer.remove("Prev");
    Ok(table)
}

/// Offset named by the last `startxref` in the tail of the source.
pub fn find_startxref(source: &mut dyn ByteSource) -> Result<u64> {
    let len = source.len();
    let tail_start = len.saturating_sub(TAIL_WINDOW as u64);
    let tail = source.read_range(tail_start, TAIL_WINDOW)?;

    let keyword = b"startxref";
    let position = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| PdfError::InvalidStructure("startxref not found".to_string()))?;

    let mut parser = ObjectParser::new(&tail[position + keyword.len()..]);
    match parser.lexer().next_significant_token()? {
        Token::Number(n) if n.is_integer() && n.as_i64() >= 0 => Ok(n.as_i64() as u64),
        other => Err(PdfError::InvalidStructure(format!(
            "Invalid startxref offset: {other:?}"
        ))),
    }
}

type Section = (Vec<(u32, XRefEntry)>, Dictionary);

/// Parse one `xref ... trailer << >>` section, growing the read window
/// until the trailer dictionary is complete.
fn read_section(source: &mut dyn ByteSource, offset: u64, window: usize) -> Result<Section> {
    let mut window = window.max(TAIL_WINDOW);
    loop {
        let (bytes, at_end) = read_window(source, offset, window)?;
        match parse_section(&bytes) {
            Err(PdfError::MalformedPrimitive(ParseError::UnexpectedEof)) if !at_end => {
                window = window.saturating_mul(2);
            }
            other => return other,
        }
    }
}

fn parse_section(bytes: &[u8]) -> Result<Section> {
    let mut parser = ObjectParser::new(bytes);

    match parser.lexer().next_significant_token()? {
        Token::Keyword(word) if word == "xref" => {}
        Token::Number(_) => {
            return Err(PdfError::InvalidStructure(
                "Cross-reference streams are not supported".to_string(),
            ))
        }
        Token::Eof => return Err(ParseError::UnexpectedEof.into()),
        other => {
            return Err(PdfError::InvalidStructure(format!(
                "Expected 'xref', found {other:?}"
            )))
        }
    }

    let mut entries = Vec::new();
    loop {
        let token = parser.lexer().next_significant_token()?;
        let first = match token {
            Token::Keyword(word) if word == "trailer" => break,
            Token::Eof => return Err(ParseError::UnexpectedEof.into()),
            other => other.as_integer().ok_or_else(|| {
                PdfError::InvalidStructure(format!("Invalid xref subsection header: {other:?}"))
            })?,
        };
        let count = expect_integer(&mut parser)?;
        let first = u32::try_from(first)
            .map_err(|_| PdfError::InvalidStructure("Invalid xref subsection".to_string()))?;

        for i in 0..count.max(0) as u32 {
            let offset = expect_integer(&mut parser)?;
            let generation = expect_integer(&mut parser)?;
            let kind = parser.lexer().next_significant_token()?;
            let number = first.saturating_add(i);

            let in_use = match kind {
                Token::Keyword(ref k) if k == "n" => true,
                Token::Keyword(ref k) if k == "f" => false,
                Token::Eof => return Err(ParseError::UnexpectedEof.into()),
                other => {
                    tracing::warn!("Malformed xref entry for object {}: {:?}", number, other);
                    continue;
                }
            };
            let Ok(generation) = u16::try_from(generation) else {
                tracing::warn!("Xref entry for object {} has generation {}", number, generation);
                continue;
            };
            if offset < 0 {
                tracing::warn!("Xref entry for object {} has negative offset", number);
                continue;
            }
            entries.push((
                number,
                XRefEntry {
                    offset: offset as u64,
                    generation,
                    in_use,
                },
            ));
        }
    }

    let trailer = match parser.parse_object()? {
        Object::Dictionary(dict) => dict,
        other => {
            return Err(PdfError::InvalidStructure(format!(
                "Trailer must be a dictionary, found {}",
                other.type_name()
            )))
        }
    };

    Ok((entries, trailer))
}

fn expect_integer(parser: &mut ObjectParser<'_>) -> Result<i64> {
    match parser.lexer().next_significant_token()? {
        Token::Eof => Err(ParseError::UnexpectedEof.into()),
        token => token.as_integer().ok_or_else(|| {
            PdfError::InvalidStructure(format!("Expected integer in xref, found {token:?}"))
        }),
    }
}
