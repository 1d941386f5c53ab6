//! Process-wide table of frequently used names
//!
//! Built on first use. [`Name::new`](super::Name::new) returns the shared
//! entry for these strings, so comparing two well-known keys is a pointer
//! comparison.

use super::Name;
use lazy_static::lazy_static;
use std::collections::HashMap;

const WELL_KNOWN: &[&str] = &[
    // Document structure
    "Type", "Subtype", "Catalog", "Pages", "Page", "Parent", "Kids", "Count",
    "Root", "Info", "Size", "Prev", "ID", "XRef", "XRefStm", "Encrypt",
    "Version", "Extensions", "Names", "Dests", "Outlines", "Threads",
    "OpenAction", "AA", "URI", "Metadata", "PageLabels", "PageLayout",
    "PageMode", "ViewerPreferences", "StructTreeRoot", "MarkInfo", "Lang",
    "OCProperties", "Collection", "Perms", "Legal", "Requirements",
    // Info dictionary
    "Title", "Author", "Subject", "Keywords", "Creator", "Producer",
    "CreationDate", "ModDate", "Trapped",
    // Pages
    "MediaBox", "CropBox", "BleedBox", "TrimBox", "ArtBox", "Rotate",
    "Resources", "Contents", "Annots", "Group", "Thumb", "B", "Dur", "Trans",
    "UserUnit", "Tabs", "PieceInfo", "LastModified", "StructParents",
    // Resources
    "Font", "XObject", "ExtGState", "ColorSpace", "Pattern", "Shading",
    "ProcSet", "Properties", "PDF", "Text", "ImageB", "ImageC", "ImageI",
    // Streams and filters
    "Length", "Filter", "DecodeParms", "F", "FFilter", "FDecodeParms", "DL",
    "FlateDecode", "ASCIIHexDecode", "ASCII85Decode", "LZWDecode",
    "RunLengthDecode", "CCITTFaxDecode", "JBIG2Decode", "DCTDecode",
    "JPXDecode", "Crypt", "Predictor", "Colors", "BitsPerComponent", "Columns",
    "EarlyChange", "Decode", "DecodeParams",
    // Fonts
    "BaseFont", "Encoding", "FirstChar", "LastChar", "Widths",
    "FontDescriptor", "ToUnicode", "DescendantFonts", "Type0", "Type1",
    "Type3", "TrueType", "CIDFontType0", "CIDFontType2", "WinAnsiEncoding",
    "MacRomanEncoding", "StandardEncoding", "Differences", "Flags", "FontBBox",
    "FontName", "FontFile", "FontFile2", "FontFile3", "ItalicAngle", "Ascent",
    "Descent", "CapHeight", "StemV",
    // Images and form XObjects
    "Image", "Form", "Width", "Height", "BBox", "Matrix", "ImageMask", "Mask",
    "SMask", "Interpolate", "DeviceRGB", "DeviceGray", "DeviceCMYK",
    "Indexed", "ICCBased", "N", "Alternate",
    // Annotations
    "Annot", "Rect", "P", "NM", "M", "Border", "C", "AP", "AS", "D", "R",
    "Popup", "Open", "Link", "Widget", "IRT", "RC", "CA", "BS", "MK", "Q",
    "Dest", "A", "S", "Action", "Next", "JavaScript", "GoTo",
    // Interactive forms
    "AcroForm", "Fields", "NeedAppearances", "SigFlags", "CO", "DR", "DA",
    "XFA", "FT", "T", "TU", "TM", "Ff", "V", "DV", "Opt", "TI", "I", "MaxLen",
    "Btn", "Tx", "Ch", "Sig", "Off", "Yes",
    // Graphics state
    "LW", "LC", "LJ", "ML", "ca", "BM", "Normal",
    // Misc
    "Fit", "XYZ", "FitH", "FitV", "FitR", "First", "Last", "Nums",
];

lazy_static! {
    static ref TABLE: HashMap<&'static str, Name> = WELL_KNOWN
        .iter()
        .map(|&value| (value, Name::interned(value)))
        .collect();
}

/// Canonical shared instance for `value`, if it is a well-known name.
pub fn lookup(value: &str) -> Option<&'static Name> {
    TABLE.get(value)
}

/// Number of entries in the table.
pub fn len() -> usize {
    TABLE.len()
}
