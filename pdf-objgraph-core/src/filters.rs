//! Stream filter plugins
//!
//! The object graph treats filter names as opaque keys: a [`FilterRegistry`]
//! maps each name to a [`StreamFilter`] implementation. Two filters ship with
//! the crate, `FlateDecode` (behind the `compression` feature) and
//! `ASCIIHexDecode`. Anything else has to be registered by the caller.

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use std::collections::HashMap;
use std::fmt;

/// A codec for one `/Filter` name.
pub trait StreamFilter: Send + Sync {
    /// The `/Filter` name this codec answers to.
    fn name(&self) -> &str;

    fn decode(&self, data: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>>;

    fn encode(&self, data: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>>;
}

/// Zlib/deflate codec.
#[cfg(feature = "compression")]
#[derive(Debug, Clone, Copy)]
pub struct FlateFilter {
    level: u32,
}

#[cfg(feature = "compression")]
impl FlateFilter {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

#[cfg(feature = "compression")]
impl Default for FlateFilter {
    fn default() -> Self {
        Self::new(6)
    }
}

#[cfg(feature = "compression")]
impl StreamFilter for FlateFilter {
    fn name(&self) -> &str {
        "FlateDecode"
    }

    fn decode(&self, data: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        if let Some(predictor) = params.and_then(|p| p.get_integer("Predictor")) {
            if predictor > 1 {
                return Err(PdfError::UnsupportedFilter(format!(
                    "FlateDecode with predictor {predictor}"
                )));
            }
        }

        let mut decoder = ZlibDecoder::new(data);
        let mut result = Vec::new();
        decoder
            .read_to_end(&mut result)
            .map_err(|e| PdfError::CompressionError(format!("Failed to decode: {e}")))?;
        Ok(result)
    }

    fn encode(&self, data: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| PdfError::CompressionError(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| PdfError::CompressionError(e.to_string()))
    }
}

/// Hex digit pairs terminated by `>`; whitespace is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiHexFilter;

impl StreamFilter for AsciiHexFilter {
    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }

    fn decode(&self, data: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut result = Vec::with_capacity(data.len() / 2);
        let mut high: Option<u8> = None;

        for &byte in data {
            if byte == b'>' {
                break;
            }
            if byte.is_ascii_whitespace() || byte == 0 {
                continue;
            }
            let nibble = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => {
                    return Err(PdfError::CompressionError(format!(
                        "Invalid hex digit in ASCIIHexDecode data: 0x{byte:02x}"
                    )))
                }
            };
            match high.take() {
                Some(h) => result.push((h << 4) | nibble),
                None => high = Some(nibble),
            }
        }

        // odd digit count: the last digit is followed by an implicit 0
        if let Some(h) = high {
            result.push(h << 4);
        }
        Ok(result)
    }

    fn encode(&self, data: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 2 + 1);
        for byte in data {
            out.extend_from_slice(format!("{byte:02X}").as_bytes());
        }
        out.push(b'>');
        Ok(out)
    }
}

/// Filter name to codec dispatch table.
pub struct FilterRegistry {
    filters: HashMap<String, Box<dyn StreamFilter>>,
}

impl FilterRegistry {
    /// Registry with no filters at all.
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Registry with the built-in filters.
    pub fn new() -> Self {
        Self::with_flate_level(6)
    }

    /// Built-in filters with an explicit Flate compression level.
    pub fn with_flate_level(level: u32) -> Self {
        let mut registry = Self::empty();
        #[cfg(feature = "compression")]
        registry.register(Box::new(FlateFilter::new(level)));
        #[cfg(not(feature = "compression"))]
        let _ = level;
        registry.register(Box::new(AsciiHexFilter));
        registry
    }

    /// Add or replace the codec for `filter.name()`.
    pub fn register(&mut self, filter: Box<dyn StreamFilter>) {
        self.filters.insert(filter.name().to_string(), filter);
    }

    pub fn get(&self, name: &str) -> Option<&dyn StreamFilter> {
        self.filters.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    fn lookup(&self, name: &str) -> Result<&dyn StreamFilter> {
        self.get(name)
            .ok_or_else(|| PdfError::UnsupportedFilter(name.to_string()))
    }

    /// Decode `data` through the filter chain named in a stream dictionary.
    ///
    /// Returns the input unchanged when the dictionary has no `/Filter`.
    pub fn decode(&self, dict: &Dictionary, data: &[u8]) -> Result<Vec<u8>> {
        let chain = filter_chain(dict)?;
        let mut current = data.to_vec();
        for (name, params) in chain {
            let filter = self.lookup(&name)?;
            current = filter.decode(&current, params)?;
        }
        Ok(current)
    }

    /// Encode `data` with a single named filter.
    pub fn encode(&self, name: &str, data: &[u8]) -> Result<Vec<u8>> {
        self.lookup(name)?.encode(data, None)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

fn params_at(dict: &Dictionary, index: usize) -> Option<&Dictionary> {
    match dict.get("DecodeParms") {
        Some(Object::Dictionary(d)) if index == 0 => Some(d),
        Some(Object::Array(arr)) => match arr.get(index) {
            Some(Object::Dictionary(d)) => Some(d),
            _ => None,
        },
        _ => None,
    }
}

/// Pair each `/Filter` entry with its `/DecodeParms` entry.
fn filter_chain(dict: &Dictionary) -> Result<Vec<(String, Option<&Dictionary>)>> {
    match dict.get("Filter") {
        None | Some(Object::Null) => Ok(Vec::new()),
        Some(Object::Name(name)) => Ok(vec![(name.as_str().to_string(), params_at(dict, 0))]),
        Some(Object::Array(names)) => names
            .iter()
            .enumerate()
            .map(|(i, obj)| match obj {
                Object::Name(name) => Ok((name.as_str().to_string(), params_at(dict, i))),
                other => Err(PdfError::InvalidStructure(format!(
                    "Filter array entry must be a name, found {}",
                    other.type_name()
                ))),
            })
            .collect(),
        Some(other) => Err(PdfError::InvalidStructure(format!(
            "Filter must be a name or an array, found {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Name;

    #[test]
    fn test_ascii_hex_decode() {
        let filter = AsciiHexFilter;
        assert_eq!(filter.decode(b"48 65 6c6C6f>", None).unwrap(), b"Hello");
        assert_eq!(filter.decode(b"7>", None).unwrap(), vec![0x70]);
        assert!(filter.decode(b"zz>", None).is_err());
    }

    #[test]
    fn test_ascii_hex_encode() {
        let filter = AsciiHexFilter;
        assert_eq!(filter.encode(&[0xde, 0xad], None).unwrap(), b"DEAD>");
    }

    #[test]
    #[cfg(feature = "compression")]
    fn test_flate_round_trip() {
        let registry = FilterRegistry::new();
        let data = b"stream content ".repeat(20);
        let encoded = registry.encode("FlateDecode", &data).unwrap();
        assert!(encoded.len() < data.len());

        let mut dict = Dictionary::new();
        dict.set("Filter", Name::new("FlateDecode"));
        assert_eq!(registry.decode(&dict, &encoded).unwrap(), data);
    }

    #[test]
    #[cfg(feature = "compression")]
    fn test_filter_chain_in_order() {
        let registry = FilterRegistry::new();
        let data = b"chained".to_vec();
        let flated = registry.encode("FlateDecode", &data).unwrap();
        let hexed = registry.encode("ASCIIHexDecode", &flated).unwrap();

        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            vec![
                Object::name("ASCIIHexDecode"),
                Object::name("FlateDecode"),
            ],
        );
        assert_eq!(registry.decode(&dict, &hexed).unwrap(), data);
    }

    #[test]
    fn test_unknown_filter() {
        let registry = FilterRegistry::new();
        let mut dict = Dictionary::new();
        dict.set("Filter", Name::new("JBIG2Decode"));
        match registry.decode(&dict, b"x") {
            Err(PdfError::UnsupportedFilter(name)) => assert_eq!(name, "JBIG2Decode"),
            other => panic!("expected UnsupportedFilter, got {other:?}"),
        }
    }

    #[test]
    fn test_no_filter_passes_through() {
        let registry = FilterRegistry::empty();
        assert_eq!(registry.decode(&Dictionary::new(), b"raw").unwrap(), b"raw");
    }

    #[test]
    fn test_custom_filter_registration() {
        struct Reverse;
        impl StreamFilter for Reverse {
            fn name(&self) -> &str {
                "Reverse"
            }
            fn decode(&self, data: &[u8], _: Option<&Dictionary>) -> Result<Vec<u8>> {
                Ok(data.iter().rev().copied().collect())
            }
            fn encode(&self, data: &[u8], p: Option<&Dictionary>) -> Result<Vec<u8>> {
                self.decode(data, p)
            }
        }

        let mut registry = FilterRegistry::empty();
        registry.register(Box::new(Reverse));
        let mut dict = Dictionary::new();
        dict.set("Filter", Name::new("Reverse"));
        assert_eq!(registry.decode(&dict, b"abc").unwrap(), b"cba");
        assert!(format!("{registry:?}").contains("Reverse"));
    }

    #[test]
    fn test_decode_params_pairing() {
        let mut parms = Dictionary::new();
        parms.set("Columns", 4);
        let mut dict = Dictionary::new();
        dict.set("Filter", vec![Object::name("A"), Object::name("B")]);
        dict.set("DecodeParms", vec![Object::Null, Object::from(parms)]);

        let chain = filter_chain(&dict).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(chain[0].1.is_none());
        assert_eq!(chain[1].1.and_then(|p| p.get_integer("Columns")), Some(4));
    }
}
