use crate::error::{PdfError, Result};
use crate::filters::FilterRegistry;
use crate::objects::{Dictionary, Name, Object};

/// Stream object: a dictionary plus a stored (possibly encoded) payload.
///
/// The decoded payload is cached after the first [`Stream::decoded`] call.
/// Once the object has been written out the payload can be released to keep
/// memory bounded; the dictionary stays resident.
#[derive(Debug, Clone)]
pub struct Stream {
    pub(crate) dictionary: Dictionary,
    data: Vec<u8>,
    decoded: Option<Vec<u8>>,
    released: bool,
}

impl Stream {
    pub fn new(data: Vec<u8>) -> Self {
        let mut dictionary = Dictionary::new();
        dictionary.set("Length", data.len() as i64);

        Self {
            dictionary,
            data,
            decoded: None,
            released: false,
        }
    }

    pub fn with_dictionary(dictionary: Dictionary, data: Vec<u8>) -> Self {
        let mut dict = dictionary;
        dict.set("Length", data.len() as i64);

        Self {
            dictionary: dict,
            data,
            decoded: None,
            released: false,
        }
    }

    /// Build a stream from parsed parts without touching `/Length`.
    pub(crate) fn from_parts(dictionary: Dictionary, data: Vec<u8>) -> Self {
        Self {
            dictionary,
            data,
            decoded: None,
            released: false,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    /// The stored payload, exactly as it is written between `stream` and
    /// `endstream`. Empty once released.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the stored payload. Updates `/Length` and drops the decoded cache.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.dictionary.set("Length", data.len() as i64);
        self.data = data;
        self.decoded = None;
        self.released = false;
    }

    /// Decoded payload, decoding through `filters` on first use.
    pub fn decoded(&mut self, filters: &FilterRegistry) -> Result<&[u8]> {
        if self.released {
            return Err(PdfError::InvalidOperation(
                "stream payload has been released".to_string(),
            ));
        }
        if self.decoded.is_none() {
            let decoded = filters.decode(&self.dictionary, &self.data)?;
            self.decoded = Some(decoded);
        }
        Ok(self.decoded.as_deref().unwrap_or_default())
    }

    pub fn has_decoded_cache(&self) -> bool {
        self.decoded.is_some()
    }

    /// Drop the decoded cache, keeping the stored payload. Returns the number
    /// of bytes dropped.
    pub fn clear_decoded(&mut self) -> usize {
        self.decoded.take().map_or(0, |d| d.len())
    }

    /// Drop the stored payload and decoded cache. Returns the number of bytes
    /// released.
    pub fn release_payload(&mut self) -> usize {
        let released = self.heavy_bytes();
        self.data = Vec::new();
        self.decoded = None;
        self.released = true;
        released
    }

    /// Put back a payload previously released. `/Length` is left as is.
    pub fn restore_payload(&mut self, data: Vec<u8>) {
        self.data = data;
        self.decoded = None;
        self.released = false;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Bytes held by the stored payload and decoded cache.
    pub fn heavy_bytes(&self) -> usize {
        self.data.len() + self.decoded.as_ref().map_or(0, Vec::len)
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.dictionary.set("Filter", Object::Name(Name::new(filter)));
    }

    pub fn set_decode_params(&mut self, params: Dictionary) {
        self.dictionary.set("DecodeParms", params);
    }

    pub fn has_filter(&self) -> bool {
        self.dictionary.contains_key("Filter")
    }

    #[cfg(feature = "compression")]
    pub fn compress_flate(&mut self) -> Result<()> {
        self.compress_flate_with_level(6)
    }

    /// Flate-encode an unfiltered payload in place.
    #[cfg(feature = "compression")]
    pub fn compress_flate_with_level(&mut self, level: u32) -> Result<()> {
        use crate::filters::{FlateFilter, StreamFilter};

        if self.has_filter() {
            return Err(PdfError::InvalidOperation(
                "stream is already filtered".to_string(),
            ));
        }
        let compressed = FlateFilter::new(level).encode(&self.data, None)?;
        let original = std::mem::replace(&mut self.data, compressed);
        self.dictionary.set("Length", self.data.len() as i64);
        self.set_filter("FlateDecode");
        // the plain payload is exactly the decoded form
        self.decoded = Some(original);

        Ok(())
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.dictionary == other.dictionary
            && self.data == other.data
            && self.released == other.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_new() {
        let data = vec![1, 2, 3, 4, 5];
        let stream = Stream::new(data.clone());

        assert_eq!(stream.data(), &data);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(5));
    }

    #[test]
    fn test_stream_with_existing_length() {
        let mut dict = Dictionary::new();
        dict.set("Length", 999);
        dict.set("Type", Name::new("XObject"));

        let stream = Stream::with_dictionary(dict, vec![1, 2, 3, 4, 5]);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(5));
        assert_eq!(stream.dictionary().get_type(), Some("XObject"));
    }

    #[test]
    fn test_set_data_resets_cache() {
        let filters = FilterRegistry::new();
        let mut stream = Stream::new(b"abc".to_vec());
        assert_eq!(stream.decoded(&filters).unwrap(), b"abc");
        assert!(stream.has_decoded_cache());

        stream.set_data(b"longer".to_vec());
        assert!(!stream.has_decoded_cache());
        assert_eq!(stream.dictionary().get_integer("Length"), Some(6));
    }

    #[test]
    fn test_decoded_through_filter() {
        let filters = FilterRegistry::new();
        let mut dict = Dictionary::new();
        dict.set("Filter", Name::new("ASCIIHexDecode"));
        let mut stream = Stream::with_dictionary(dict, b"414243>".to_vec());

        assert_eq!(stream.decoded(&filters).unwrap(), b"ABC");
        assert_eq!(stream.data(), b"414243>");
    }

    #[test]
    fn test_release_and_restore() {
        let filters = FilterRegistry::new();
        let mut stream = Stream::new(vec![7; 100]);
        stream.decoded(&filters).unwrap();
        assert_eq!(stream.heavy_bytes(), 200);

        assert_eq!(stream.release_payload(), 200);
        assert!(stream.is_released());
        assert_eq!(stream.heavy_bytes(), 0);
        assert!(stream.decoded(&filters).is_err());
        // dictionary survives
        assert_eq!(stream.dictionary().get_integer("Length"), Some(100));

        stream.restore_payload(vec![7; 100]);
        assert!(!stream.is_released());
        assert_eq!(stream.decoded(&filters).unwrap().len(), 100);
    }

    #[test]
    fn test_set_filter() {
        let mut stream = Stream::new(vec![1, 2, 3]);
        stream.set_filter("FlateDecode");
        assert_eq!(
            stream.dictionary().get("Filter"),
            Some(&Object::name("FlateDecode"))
        );
    }

    #[test]
    fn test_set_decode_params() {
        let mut stream = Stream::new(vec![1, 2, 3]);
        let mut params = Dictionary::new();
        params.set("Predictor", 12);
        params.set("Columns", 100);
        stream.set_decode_params(params);

        let parms = stream.dictionary().get_dict("DecodeParms").unwrap();
        assert_eq!(parms.get_integer("Predictor"), Some(12));
        assert_eq!(parms.get_integer("Columns"), Some(100));
    }

    #[test]
    #[cfg(feature = "compression")]
    fn test_compress_flate() {
        let original = "Hello, this is a test string that should be compressed! "
            .repeat(10)
            .into_bytes();
        let mut stream = Stream::new(original.clone());
        stream.compress_flate().unwrap();

        assert_ne!(stream.data(), &original[..]);
        assert_eq!(stream.dictionary().get_name("Filter").map(Name::as_str), Some("FlateDecode"));
        assert_eq!(
            stream.dictionary().get_integer("Length"),
            Some(stream.data().len() as i64)
        );

        let mut reread = Stream::from_parts(stream.dictionary().clone(), stream.data().to_vec());
        assert_eq!(reread.decoded(&FilterRegistry::new()).unwrap(), &original[..]);
    }

    #[test]
    #[cfg(feature = "compression")]
    fn test_compress_twice_is_rejected() {
        let mut stream = Stream::new(b"data".to_vec());
        stream.compress_flate().unwrap();
        assert!(matches!(
            stream.compress_flate(),
            Err(PdfError::InvalidOperation(_))
        ));
    }
}
