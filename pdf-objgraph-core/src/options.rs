//! Document configuration
//!
//! # Example
//!
//! ```rust
//! use pdf_objgraph::DocumentOptions;
//!
//! let options = DocumentOptions::default()
//!     .with_compress_streams(true)
//!     .with_compression_level(9)
//!     .with_release_payloads(true);
//!
//! assert_eq!(options.version, "1.7");
//! assert!(options.compress_streams);
//! ```

/// Configuration for creating, opening and writing documents
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOptions {
    /// Version written in the `%PDF-x.y` header
    pub version: String,
    /// Flate-compress unfiltered streams when they are flushed
    pub compress_streams: bool,
    /// Flate compression level, 0 to 9
    pub compression_level: u32,
    /// Reject malformed `#` escapes in names while parsing
    pub strict_names: bool,
    /// Drop stream payloads from memory once they are written
    pub release_payloads: bool,
    /// Initial read window for sections of unknown length (bytes)
    pub source_window: usize,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            compress_streams: false,
            compression_level: 6,
            strict_names: false,
            release_payloads: true,
            source_window: 64 * 1024, // 64KB
        }
    }
}

impl DocumentOptions {
    /// Smallest output: compressed streams at the highest level
    pub fn compact() -> Self {
        Self {
            compress_streams: true,
            compression_level: 9,
            ..Self::default()
        }
    }

    /// Strict parsing of names
    pub fn strict() -> Self {
        Self {
            strict_names: true,
            ..Self::default()
        }
    }

    /// Set the header version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Enable stream compression on flush
    pub fn with_compress_streams(mut self, enabled: bool) -> Self {
        self.compress_streams = enabled;
        self
    }

    /// Set compression level (clamped to 9)
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Enable strict name parsing
    pub fn with_strict_names(mut self, enabled: bool) -> Self {
        self.strict_names = enabled;
        self
    }

    /// Release stream payloads after flushing
    pub fn with_release_payloads(mut self, enabled: bool) -> Self {
        self.release_payloads = enabled;
        self
    }

    /// Set the initial source read window (at least 1KB)
    pub fn with_source_window(mut self, bytes: usize) -> Self {
        self.source_window = bytes.max(1024);
        self
    }
}
