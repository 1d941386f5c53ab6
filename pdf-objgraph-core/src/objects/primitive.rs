use crate::objects::{Array, Dictionary, Name, PdfString, Stream};
use std::fmt;

/// Indirect reference: object number plus generation, printed as `N G R`.
///
/// An `ObjectId` is only meaningful inside the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    number: u32,
    generation: u16,
}

impl ObjectId {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Integer(i64),
    Real(f64),
}

/// Numeric object.
///
/// Numbers parsed from a file remember the exact text they were written
/// with, which is emitted again on output.
#[derive(Debug, Clone)]
pub struct Number {
    value: NumberValue,
    written: Option<Box<str>>,
}

impl Number {
    pub fn integer(value: i64) -> Self {
        Self {
            value: NumberValue::Integer(value),
            written: None,
        }
    }

    pub fn real(value: f64) -> Self {
        Self {
            value: NumberValue::Real(value),
            written: None,
        }
    }

    /// Attach the as-written text. Used by the parser.
    pub fn with_text(mut self, text: impl Into<Box<str>>) -> Self {
        self.written = Some(text.into());
        self
    }

    pub fn value(&self) -> NumberValue {
        self.value
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.value, NumberValue::Integer(_))
    }

    pub fn as_i64(&self) -> i64 {
        match self.value {
            NumberValue::Integer(i) => i,
            NumberValue::Real(f) => f as i64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self.value {
            NumberValue::Integer(i) => i as f64,
            NumberValue::Real(f) => f,
        }
    }

    pub fn written_text(&self) -> Option<&str> {
        self.written.as_deref()
    }

    /// Serialized form: the as-written text when known, else the canonical one.
    pub fn to_pdf_string(&self) -> String {
        if let Some(text) = &self.written {
            return text.to_string();
        }
        match self.value {
            NumberValue::Integer(i) => i.to_string(),
            NumberValue::Real(f) => format_real(f),
        }
    }
}

fn format_real(value: f64) -> String {
    if !value.is_finite() {
        tracing::warn!("Non-finite real {} written as 0", value);
        return "0".to_string();
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pdf_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Number(Number),
    String(PdfString),
    Name(Name),
    Array(Array),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

/// Explicit free marker returned when resolving a freed slot.
pub(crate) static NULL: Object = Object::Null;

impl Object {
    pub fn name(value: impl AsRef<str> + Into<String>) -> Self {
        Object::Name(Name::new(value))
    }

    pub fn integer(value: i64) -> Self {
        Object::Number(Number::integer(value))
    }

    pub fn real(value: f64) -> Self {
        Object::Number(Number::real(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Number(_) => "number",
            Object::String(_) => "string",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Object::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Number(n) if n.is_integer() => Some(n.as_i64()),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Dictionary view; a stream answers with its stream dictionary.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dictionary),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&mut stream.dictionary),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_stream_mut(&mut self) -> Option<&mut Stream> {
        match self {
            Object::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Visit every indirect reference held directly or inside nested direct
    /// containers. Referenced objects are not followed.
    pub fn for_each_reference(&self, mut f: impl FnMut(ObjectId)) {
        let mut stack = vec![self];
        while let Some(obj) = stack.pop() {
            match obj {
                Object::Reference(id) => f(*id),
                Object::Array(arr) => stack.extend(arr.iter().rev()),
                Object::Dictionary(dict) => stack.extend(dict.values()),
                Object::Stream(stream) => stack.extend(stream.dictionary.values()),
                _ => {}
            }
        }
    }

    /// Rewrite every reference in place, including nested direct containers.
    pub fn map_references(&mut self, mut f: impl FnMut(ObjectId) -> ObjectId) {
        let mut stack = vec![self];
        while let Some(obj) = stack.pop() {
            match obj {
                Object::Reference(id) => *id = f(*id),
                Object::Array(arr) => stack.extend(arr.iter_mut()),
                Object::Dictionary(dict) => stack.extend(dict.values_mut()),
                Object::Stream(stream) => stack.extend(stream.dictionary.values_mut()),
                _ => {}
            }
        }
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i32> for Object {
    fn from(i: i32) -> Self {
        Object::integer(i as i64)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::integer(i)
    }
}

impl From<u32> for Object {
    fn from(i: u32) -> Self {
        Object::integer(i as i64)
    }
}

impl From<f32> for Object {
    fn from(f: f32) -> Self {
        Object::real(f as f64)
    }
}

impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Object::real(f)
    }
}

impl From<Number> for Object {
    fn from(n: Number) -> Self {
        Object::Number(n)
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::String(PdfString::from(s))
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::String(PdfString::from(s))
    }
}

impl From<PdfString> for Object {
    fn from(s: PdfString) -> Self {
        Object::String(s)
    }
}

impl From<Name> for Object {
    fn from(n: Name) -> Self {
        Object::Name(n)
    }
}

impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(Array::from(v))
    }
}

impl From<Array> for Object {
    fn from(a: Array) -> Self {
        Object::Array(a)
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Object::Stream(s)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}
