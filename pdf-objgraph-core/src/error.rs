use crate::codec::ParseError;
use crate::objects::ObjectId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The reference points at nothing: no live object and no backing source entry.
    #[error("Broken reference: {0}")]
    BrokenReference(ObjectId),

    /// The reference was held past a `free` of its slot.
    #[error("Stale reference: {reference} (slot is now at generation {current})")]
    StaleReference { reference: ObjectId, current: u16 },

    #[error("Object {0} has been flushed and must be revived before mutation")]
    FlushedObjectMutation(ObjectId),

    #[error("Malformed primitive: {0}")]
    MalformedPrimitive(#[from] ParseError),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Compression error: {0}")]
    CompressionError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_pdf_error_display() {
        let error = PdfError::InvalidStructure("test message".to_string());
        assert_eq!(error.to_string(), "Invalid PDF structure: test message");
    }

    #[test]
    fn test_reference_errors_display() {
        let broken = PdfError::BrokenReference(ObjectId::new(12, 0));
        assert_eq!(broken.to_string(), "Broken reference: 12 0 R");

        let stale = PdfError::StaleReference {
            reference: ObjectId::new(4, 0),
            current: 1,
        };
        assert_eq!(
            stale.to_string(),
            "Stale reference: 4 0 R (slot is now at generation 1)"
        );

        let flushed = PdfError::FlushedObjectMutation(ObjectId::new(7, 2));
        assert!(flushed.to_string().contains("7 2 R"));
        assert!(flushed.to_string().contains("revived"));
    }

    #[test]
    fn test_pdf_error_from_io_error() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let pdf_error = PdfError::from(io_error);

        match pdf_error {
            PdfError::Io(ref err) => {
                assert_eq!(err.kind(), ErrorKind::NotFound);
            }
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_pdf_error_from_parse_error() {
        let parse_error = ParseError::SyntaxError {
            position: 17,
            message: "Unexpected character: ~".to_string(),
        };
        let pdf_error = PdfError::from(parse_error);

        assert!(matches!(pdf_error, PdfError::MalformedPrimitive(_)));
        assert_eq!(
            pdf_error.to_string(),
            "Malformed primitive: Syntax error at position 17: Unexpected character: ~"
        );
    }

    #[test]
    fn test_all_pdf_error_variants() {
        let errors = vec![
            PdfError::BrokenReference(ObjectId::new(1, 0)),
            PdfError::StaleReference {
                reference: ObjectId::new(1, 0),
                current: 1,
            },
            PdfError::FlushedObjectMutation(ObjectId::new(1, 0)),
            PdfError::MalformedPrimitive(ParseError::UnexpectedEof),
            PdfError::InvalidStructure("structure error".to_string()),
            PdfError::UnsupportedFilter("JBIG2Decode".to_string()),
            PdfError::CompressionError("compression error".to_string()),
            PdfError::InvalidOperation("no output".to_string()),
        ];

        for error in errors {
            let error_string = error.to_string();
            assert!(!error_string.is_empty());
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfError>();
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(PdfError::InvalidStructure("test".to_string()));
        assert!(result.is_err());

        match result.unwrap_err() {
            PdfError::InvalidStructure(msg) => assert_eq!(msg, "test"),
            _ => panic!("Expected InvalidStructure variant"),
        }
    }
}
