use std::fmt;

/// PDF string object: raw bytes plus the form it is written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdfString {
    value: Vec<u8>,
    hex: bool,
}

impl PdfString {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            hex: false,
        }
    }

    pub fn hex(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            hex: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.value
    }

    pub fn is_hex(&self) -> bool {
        self.hex
    }

    pub fn set_hex(&mut self, hex: bool) {
        self.hex = hex;
    }

    /// Lossy text view of the bytes.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    /// Serialized form including delimiters.
    pub fn to_pdf_bytes(&self) -> Vec<u8> {
        if self.hex {
            let mut out = Vec::with_capacity(self.value.len() * 2 + 2);
            out.push(b'<');
            for byte in &self.value {
                out.extend_from_slice(format!("{byte:02X}").as_bytes());
            }
            out.push(b'>');
            return out;
        }

        let mut out = Vec::with_capacity(self.value.len() + 2);
        out.push(b'(');
        for &byte in &self.value {
            match byte {
                b'(' | b')' | b'\\' => {
                    out.push(b'\\');
                    out.push(byte);
                }
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                0x08 => out.extend_from_slice(b"\\b"),
                0x0c => out.extend_from_slice(b"\\f"),
                _ => out.push(byte),
            }
        }
        out.push(b')');
        out
    }
}

impl From<&str> for PdfString {
    fn from(s: &str) -> Self {
        PdfString::new(s.as_bytes())
    }
}

impl From<String> for PdfString {
    fn from(s: String) -> Self {
        PdfString::new(s.into_bytes())
    }
}

impl From<Vec<u8>> for PdfString {
    fn from(bytes: Vec<u8>) -> Self {
        PdfString::new(bytes)
    }
}

impl fmt::Display for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_pdf_bytes()))
    }
}
