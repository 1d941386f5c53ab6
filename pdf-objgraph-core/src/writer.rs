use crate::codec::{write_object, IndirectUnit};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use crate::registry::XRefEntry;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::Range;

/// Destination of a written document.
///
/// Sinks that can be read back let flushed stream payloads be recovered
/// without keeping them in memory.
pub trait OutputSink: Write {
    /// Read `len` bytes previously written at `offset`. `None` when the sink
    /// cannot be read.
    fn read_back(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>> {
        let _ = (offset, len);
        Ok(None)
    }
}

impl OutputSink for Vec<u8> {
    fn read_back(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(start
            .checked_add(len)
            .and_then(|end| self.get(start..end))
            .map(<[u8]>::to_vec))
    }
}

impl OutputSink for File {
    fn read_back(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>> {
        let current = self.stream_position()?;
        let mut buffer = vec![0u8; len];
        self.seek(SeekFrom::Start(offset))?;
        let result = self.read_exact(&mut buffer);
        self.seek(SeekFrom::Start(current))?;
        match result {
            Ok(()) => Ok(Some(buffer)),
            Err(err) => {
                // typically a file opened write-only
                tracing::debug!("Cannot read back output file: {}", err);
                Ok(None)
            }
        }
    }
}

impl OutputSink for BufWriter<File> {
    fn read_back(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>> {
        self.flush()?;
        self.get_mut().read_back(offset, len)
    }
}

impl OutputSink for io::Sink {}

impl<W: OutputSink + ?Sized> OutputSink for &mut W {
    fn read_back(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>> {
        (**self).read_back(offset, len)
    }
}

/// Where an indirect object landed in the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushRecord {
    /// Offset of the `N G obj` header
    pub offset: u64,
    /// Length of the whole unit
    pub length: u64,
    /// Absolute byte range of the stream payload, for streams
    pub payload: Option<Range<u64>>,
}

/// Sequential writer of a PDF file: header, indirect objects, cross-reference
/// table and trailer.
pub struct PdfWriter<W: Write> {
    writer: W,
    current_position: u64,
    poisoned: bool,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W) -> Self {
        Self {
            writer,
            current_position: 0,
            poisoned: false,
        }
    }

    pub fn write_header(&mut self, version: &str) -> Result<()> {
        self.write_bytes(format!("%PDF-{version}\n").as_bytes())?;
        // Binary comment to ensure file is treated as binary
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;
        Ok(())
    }

    /// Append one serialized indirect object and report where it landed.
    pub fn write_unit(&mut self, unit: &IndirectUnit) -> Result<FlushRecord> {
        let offset = self.current_position;
        self.write_bytes(&unit.bytes)?;

        Ok(FlushRecord {
            offset,
            length: unit.bytes.len() as u64,
            payload: unit
                .payload
                .as_ref()
                .map(|range| offset + range.start as u64..offset + range.end as u64),
        })
    }

    /// Write a classic cross-reference table. Rows must be sorted by number.
    /// Returns the offset of the `xref` keyword.
    pub fn write_xref(&mut self, rows: &[(u32, XRefEntry)]) -> Result<u64> {
        let xref_position = self.current_position;
        self.write_bytes(b"xref\n")?;

        // one subsection per run of consecutive numbers
        let mut start = 0;
        while start < rows.len() {
            let mut end = start + 1;
            while end < rows.len() && rows[end].0 == rows[end - 1].0 + 1 {
                end += 1;
            }
            self.write_bytes(format!("{} {}\n", rows[start].0, end - start).as_bytes())?;
            for (_, entry) in &rows[start..end] {
                let kind = if entry.in_use { 'n' } else { 'f' };
                let line = format!("{:010} {:05} {} \n", entry.offset, entry.generation, kind);
                self.write_bytes(line.as_bytes())?;
            }
            start = end;
        }

        Ok(xref_position)
    }

    pub fn write_trailer(&mut self, trailer: &Dictionary, xref_position: u64) -> Result<()> {
        self.write_bytes(b"trailer\n")?;
        let mut buffer = Vec::new();
        write_object(&mut buffer, &Object::Dictionary(trailer.clone()))?;
        self.write_bytes(&buffer)?;
        self.write_bytes(b"\nstartxref\n")?;
        self.write_bytes(xref_position.to_string().as_bytes())?;
        self.write_bytes(b"\n%%EOF\n")?;

        Ok(())
    }

    /// Write raw bytes. A failed write poisons the writer: every later write
    /// fails, since recorded offsets would no longer match the output.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.poisoned {
            return Err(PdfError::InvalidOperation(
                "writer is unusable after a failed write".to_string(),
            ));
        }
        if let Err(err) = self.writer.write_all(data) {
            self.poisoned = true;
            return Err(err.into());
        }
        self.current_position += data.len() as u64;
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.current_position
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: OutputSink> PdfWriter<W> {
    /// Read back bytes already written.
    pub fn read_back(&mut self, range: &Range<u64>) -> Result<Option<Vec<u8>>> {
        if range.end > self.current_position {
            return Ok(None);
        }
        let len = usize::try_from(range.end - range.start)
            .map_err(|_| PdfError::InvalidOperation("range too large".to_string()))?;
        Ok(self.writer.read_back(range.start, len)?)
    }
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSSOHH'mm)
pub fn format_pdf_date(date: DateTime<Utc>) -> String {
    let formatted = date.format("D:%Y%m%d%H%M%S");

    // For UTC, the offset is always +00'00
    format!("{formatted}+00'00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::serialize_indirect;
    use crate::objects::{ObjectId, Stream};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    struct FailingWriter {
        fail_after: usize,
        written: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written + buf.len() > self.fail_after {
                return Err(io::Error::new(io::ErrorKind::Other, "Simulated write error"));
            }
            self.written += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_header() {
        let mut writer = PdfWriter::new_with_writer(Vec::new());
        writer.write_header("1.7").unwrap();
        let buffer = writer.into_inner();
        assert!(buffer.starts_with(b"%PDF-1.7\n"));
        assert_eq!(buffer.len(), 15);
    }

    #[test]
    fn test_write_unit_records_offsets() {
        let mut writer = PdfWriter::new_with_writer(Vec::new());
        writer.write_header("1.7").unwrap();
        let start = writer.position();

        let unit = serialize_indirect(ObjectId::new(3, 0), &Object::integer(42));
        let record = writer.write_unit(&unit).unwrap();
        assert_eq!(record.offset, start);
        assert_eq!(record.length, unit.len() as u64);
        assert_eq!(record.payload, None);
        assert_eq!(writer.position(), start + unit.len() as u64);

        let stream = Stream::new(b"payload".to_vec());
        let unit = serialize_indirect(ObjectId::new(4, 0), &Object::from(stream));
        let record = writer.write_unit(&unit).unwrap();
        let range = record.payload.unwrap();
        assert_eq!(writer.read_back(&range).unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn test_write_xref_subsections() {
        let mut writer = PdfWriter::new_with_writer(Vec::new());
        let rows = vec![
            (0, XRefEntry::free(0, 65535)),
            (1, XRefEntry::in_use(15, 0)),
            (5, XRefEntry::in_use(120, 2)),
        ];
        let position = writer.write_xref(&rows).unwrap();
        assert_eq!(position, 0);
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            text,
            "xref\n0 2\n0000000000 65535 f \n0000000015 00000 n \n5 1\n0000000120 00002 n \n"
        );
    }

    #[test]
    fn test_write_trailer() {
        let mut writer = PdfWriter::new_with_writer(Vec::new());
        let mut trailer = Dictionary::new();
        trailer.set("Size", 3);
        trailer.set("Root", ObjectId::new(1, 0));
        writer.write_trailer(&trailer, 1234).unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            text,
            "trailer\n<<\n/Size 3\n/Root 1 0 R\n>>\nstartxref\n1234\n%%EOF\n"
        );
    }

    #[test]
    fn test_failed_write_poisons_writer() {
        let mut writer = PdfWriter::new_with_writer(FailingWriter {
            fail_after: 20,
            written: 0,
        });
        writer.write_header("1.7").unwrap();

        let unit = serialize_indirect(ObjectId::new(1, 0), &Object::integer(1));
        assert!(matches!(writer.write_unit(&unit), Err(PdfError::Io(_))));
        assert!(writer.is_poisoned());
        assert_eq!(writer.position(), 15);

        // even a write that would fit is refused
        assert!(matches!(
            writer.write_bytes(b"x"),
            Err(PdfError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_read_back_from_file() {
        let file = tempfile::tempfile().unwrap();
        let mut writer = PdfWriter::new_with_writer(BufWriter::new(file));
        writer.write_bytes(b"0123456789").unwrap();
        assert_eq!(writer.read_back(&(2..5)).unwrap(), Some(b"234".to_vec()));
        // beyond what was written
        assert_eq!(writer.read_back(&(8..20)).unwrap(), None);
        writer.write_bytes(b"abc").unwrap();
        assert_eq!(writer.read_back(&(9..12)).unwrap(), Some(b"9ab".to_vec()));
    }

    #[test]
    fn test_sink_cannot_read_back() {
        let mut writer = PdfWriter::new_with_writer(io::sink());
        writer.write_bytes(b"data").unwrap();
        assert_eq!(writer.read_back(&(0..2)).unwrap(), None);
    }

    #[test]
    fn test_format_pdf_date() {
        let date = Utc.with_ymd_and_hms(2023, 12, 25, 15, 30, 45).unwrap();
        assert_eq!(format_pdf_date(date), "D:20231225153045+00'00");
    }
}
