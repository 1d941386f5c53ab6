//! Object serialization
//!
//! Output layout follows the writer's long-standing format: dictionaries put
//! one entry per line, arrays are space separated, and every indirect object
//! is a self-contained `N G obj ... endobj` unit.

use crate::objects::{Dictionary, Object, ObjectId};
use std::io::{self, Write};
use std::ops::Range;

/// Write the serialized form of a direct object.
pub fn write_object<W: Write + ?Sized>(out: &mut W, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => out.write_all(b"null"),
        Object::Boolean(b) => out.write_all(if *b { b"true" } else { b"false" }),
        Object::Number(n) => out.write_all(n.to_pdf_string().as_bytes()),
        Object::String(s) => out.write_all(&s.to_pdf_bytes()),
        Object::Name(n) => {
            out.write_all(b"/")?;
            out.write_all(n.as_bytes())
        }
        Object::Array(arr) => {
            out.write_all(b"[")?;
            for (i, obj) in arr.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                write_object(out, obj)?;
            }
            out.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => {
            write_dictionary(out, stream.dictionary())?;
            out.write_all(b"\nstream\n")?;
            out.write_all(stream.data())?;
            out.write_all(b"\nendstream")
        }
        Object::Reference(id) => write!(out, "{} {} R", id.number(), id.generation()),
    }
}

fn write_dictionary<W: Write + ?Sized>(out: &mut W, dict: &Dictionary) -> io::Result<()> {
    out.write_all(b"<<")?;
    for (key, value) in dict.entries() {
        out.write_all(b"\n/")?;
        out.write_all(key.as_bytes())?;
        out.write_all(b" ")?;
        write_object(out, value)?;
    }
    out.write_all(b"\n>>")
}

/// Serialize a direct object into a fresh buffer.
pub fn to_bytes(object: &Object) -> Vec<u8> {
    let mut buffer = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_object(&mut buffer, object);
    buffer
}

/// One serialized indirect object.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectUnit {
    pub id: ObjectId,
    pub bytes: Vec<u8>,
    /// Location of the stream payload inside `bytes`, for streams.
    pub payload: Option<Range<usize>>,
}

impl IndirectUnit {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The stream payload bytes, if any.
    pub fn payload_bytes(&self) -> Option<&[u8]> {
        self.payload.clone().map(|range| &self.bytes[range])
    }
}

/// Serialize `object` as the indirect object `id`.
pub fn serialize_indirect(id: ObjectId, object: &Object) -> IndirectUnit {
    let mut bytes = format!("{} {} obj\n", id.number(), id.generation()).into_bytes();
    let payload = match object {
        Object::Stream(stream) => {
            let _ = write_dictionary(&mut bytes, stream.dictionary());
            bytes.extend_from_slice(b"\nstream\n");
            let start = bytes.len();
            bytes.extend_from_slice(stream.data());
            let end = bytes.len();
            bytes.extend_from_slice(b"\nendstream");
            Some(start..end)
        }
        other => {
            let _ = write_object(&mut bytes, other);
            None
        }
    };
    bytes.extend_from_slice(b"\nendobj\n");
    IndirectUnit { id, bytes, payload }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parser::{parse_object, ObjectParser};
    use crate::objects::{Name, Number, PdfString, Stream};
    use pretty_assertions::assert_eq;

    fn text(obj: &Object) -> String {
        String::from_utf8(to_bytes(obj)).unwrap()
    }

    #[test]
    fn test_write_primitives() {
        assert_eq!(text(&Object::Null), "null");
        assert_eq!(text(&Object::Boolean(false)), "false");
        assert_eq!(text(&Object::integer(-17)), "-17");
        assert_eq!(text(&Object::real(2.5)), "2.5");
        assert_eq!(text(&Object::name("A B")), "/A#20B");
        assert_eq!(text(&Object::Reference(ObjectId::new(4, 2))), "4 2 R");
        assert_eq!(text(&Object::String(PdfString::hex(vec![1, 2]))), "<0102>");
    }

    #[test]
    fn test_write_array_and_dictionary() {
        let mut dict = Dictionary::new();
        dict.set("Type", Name::new("Page"));
        dict.set("Kids", vec![Object::integer(1), Object::Null]);
        assert_eq!(text(&Object::from(dict)), "<<\n/Type /Page\n/Kids [1 null]\n>>");
        assert_eq!(text(&Object::from(Dictionary::new())), "<<\n>>");
    }

    #[test]
    fn test_as_written_bytes_survive() {
        let source = b"<< /My#20Key [0.50 +3 /A#42] /N -.5 >>";
        let obj = parse_object(source).unwrap();
        assert_eq!(
            text(&obj),
            "<<\n/My#20Key [0.50 +3 /A#42]\n/N -.5\n>>"
        );

        let rebuilt = Object::Number(Number::real(0.5));
        assert_eq!(text(&rebuilt), "0.5");
    }

    #[test]
    fn test_serialize_indirect_dictionary() {
        let mut dict = Dictionary::new();
        dict.set("Type", Name::new("Catalog"));
        let unit = serialize_indirect(ObjectId::new(1, 0), &Object::from(dict));
        assert_eq!(
            String::from_utf8(unit.bytes.clone()).unwrap(),
            "1 0 obj\n<<\n/Type /Catalog\n>>\nendobj\n"
        );
        assert!(unit.payload.is_none());
    }

    #[test]
    fn test_serialize_indirect_stream_payload_range() {
        let stream = Stream::new(b"BT ET".to_vec());
        let unit = serialize_indirect(ObjectId::new(9, 0), &Object::from(stream));
        assert_eq!(unit.payload_bytes(), Some(&b"BT ET"[..]));

        let (id, parsed) = ObjectParser::new(&unit.bytes).parse_indirect().unwrap();
        assert_eq!(id, ObjectId::new(9, 0));
        assert_eq!(parsed.as_stream().unwrap().data(), b"BT ET");
    }

    #[test]
    fn test_string_round_trip_through_parser() {
        let original = Object::String(PdfString::new(b"(nested) \\ \r\n".to_vec()));
        let parsed = parse_object(&to_bytes(&original)).unwrap();
        assert_eq!(parsed, original);
    }
}
