//! PDF Object Parser
//!
//! Parses PDF objects from tokens according to ISO 32000-1 Section 7.3.

use super::lexer::{find_subsequence, is_whitespace, Lexer, Token};
use super::{ParseError, ParseResult};
use crate::objects::{Array, Dictionary, Name, Object, ObjectId, PdfString, Stream};

/// Maximum nesting of direct arrays and dictionaries
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a single direct object from `bytes`.
pub fn parse_object(bytes: &[u8]) -> ParseResult<Object> {
    ObjectParser::new(bytes).parse_object()
}

/// Builds objects from the token stream of a [`Lexer`].
pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    depth: usize,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::from_lexer(Lexer::new(data))
    }

    pub fn from_lexer(lexer: Lexer<'a>) -> Self {
        Self { lexer, depth: 0 }
    }

    pub fn with_strict_names(data: &'a [u8], strict: bool) -> Self {
        Self::from_lexer(Lexer::new(data).with_strict_names(strict))
    }

    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    /// Parse the next object
    pub fn parse_object(&mut self) -> ParseResult<Object> {
        let token = self.lexer.next_significant_token()?;
        self.parse_from_token(token)
    }

    /// Parse an indirect object: `N G obj <object> endobj`.
    pub fn parse_indirect(&mut self) -> ParseResult<(ObjectId, Object)> {
        let number = self.expect_unsigned("object number")?;
        let generation = self.expect_unsigned("generation number")?;
        self.lexer.expect_keyword("obj")?;

        let id = ObjectId::new(
            u32::try_from(number).map_err(|_| self.syntax_error("Object number out of range"))?,
            u16::try_from(generation)
                .map_err(|_| self.syntax_error("Generation number out of range"))?,
        );

        let object = self.parse_object()?;

        match self.lexer.next_significant_token()? {
            Token::EndObj => {}
            Token::Eof => {
                tracing::warn!("Object {} is missing endobj", id);
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "keyword 'endobj'".to_string(),
                    found: format!("{other:?}"),
                })
            }
        }

        Ok((id, object))
    }

    fn expect_unsigned(&mut self, what: &str) -> ParseResult<i64> {
        match self.lexer.next_significant_token()? {
            Token::Number(n) if n.is_integer() && n.as_i64() >= 0 => Ok(n.as_i64()),
            Token::Eof => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    fn syntax_error(&self, message: &str) -> ParseError {
        ParseError::SyntaxError {
            position: self.lexer.position(),
            message: message.to_string(),
        }
    }

    /// Parse a PDF object starting from a specific token
    fn parse_from_token(&mut self, token: Token) -> ParseResult<Object> {
        match token {
            Token::Null => Ok(Object::Null),
            Token::Boolean(b) => Ok(Object::Boolean(b)),
            Token::Number(n) => {
                if n.is_integer() && n.as_i64() >= 0 {
                    if let Some(id) = self.try_reference(n.as_i64())? {
                        return Ok(Object::Reference(id));
                    }
                }
                Ok(Object::Number(n))
            }
            Token::String(s) => Ok(Object::String(PdfString::new(s))),
            Token::HexString(s) => Ok(Object::String(PdfString::hex(s))),
            Token::Name(n) => Ok(Object::Name(Name::from_encoded(&n))),
            Token::ArrayStart => self.nested(Self::parse_array),
            Token::DictStart => self.nested(Self::parse_dictionary_or_stream),
            Token::Eof => Err(ParseError::UnexpectedEof),
            _ => Err(ParseError::UnexpectedToken {
                expected: "PDF object".to_string(),
                found: format!("{token:?}"),
            }),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> ParseResult<Object>,
    ) -> ParseResult<Object> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.syntax_error("Maximum nesting depth exceeded"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// `N G R` lookahead after an unsigned integer `N`. Tokens that turn out
    /// not to form a reference are pushed back in order.
    fn try_reference(&mut self, number: i64) -> ParseResult<Option<ObjectId>> {
        let second = self.lexer.next_significant_token()?;
        let generation = match second.as_integer() {
            Some(g) if (0..=u16::MAX as i64).contains(&g) && number <= u32::MAX as i64 => g,
            _ => {
                self.lexer.push_token(second);
                return Ok(None);
            }
        };

        let third = self.lexer.next_significant_token()?;
        if third == Token::R {
            return Ok(Some(ObjectId::new(number as u32, generation as u16)));
        }

        // the token buffer is a stack: push in reverse
        self.lexer.push_token(third);
        self.lexer.push_token(second);
        Ok(None)
    }

    /// Parse a PDF array
    fn parse_array(&mut self) -> ParseResult<Object> {
        let mut elements = Array::new();

        loop {
            let token = self.lexer.next_significant_token()?;
            match token {
                Token::ArrayEnd => break,
                Token::Eof => return Err(ParseError::UnexpectedEof),
                _ => {
                    let obj = self.parse_from_token(token)?;
                    elements.push(obj);
                }
            }
        }

        Ok(Object::Array(elements))
    }

    /// Parse a PDF dictionary and check if it's followed by a stream
    fn parse_dictionary_or_stream(&mut self) -> ParseResult<Object> {
        let dict = self.parse_dictionary_inner()?;

        let token = self.lexer.next_significant_token()?;
        if token == Token::Stream {
            let data = self.parse_stream_data(&dict)?;
            return Ok(Object::Stream(Stream::from_parts(dict, data)));
        }

        // Not a stream, just a dictionary
        self.lexer.push_token(token);
        Ok(Object::Dictionary(dict))
    }

    /// Parse the inner dictionary
    fn parse_dictionary_inner(&mut self) -> ParseResult<Dictionary> {
        let mut dict = Dictionary::new();

        loop {
            let token = self.lexer.next_significant_token()?;
            match token {
                Token::DictEnd => break,
                Token::Name(key) => {
                    let value = self.parse_object()?;
                    dict.set(Name::from_encoded(&key), value);
                }
                Token::Eof => return Err(ParseError::UnexpectedEof),
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "dictionary key (name) or >>".to_string(),
                        found: format!("{token:?}"),
                    });
                }
            }
        }

        Ok(dict)
    }

    /// Parse stream data
    ///
    /// A direct `/Length` is trusted when `endstream` follows it; otherwise
    /// (indirect or wrong length) the payload runs up to the `endstream`
    /// keyword, minus the end-of-line marker before it.
    fn parse_stream_data(&mut self, dict: &Dictionary) -> ParseResult<Vec<u8>> {
        // Skip the newline after 'stream' keyword; a lone CR is tolerated
        if self.lexer.read_newline().is_err() {
            tracing::warn!(
                "Missing end-of-line after 'stream' at position {}",
                self.lexer.position()
            );
        }
        let start = self.lexer.position();
        let data = self.lexer.data();

        if let Some(length) = dict.get_integer("Length").filter(|&l| l >= 0) {
            let end = start.saturating_add(length as usize);
            if end <= data.len() && endstream_follows(&data[end..]) {
                self.lexer.seek(end);
                self.lexer.expect_keyword("endstream")?;
                return Ok(data[start..end].to_vec());
            }
            if !matches!(dict.get("Length"), Some(Object::Reference(_))) {
                tracing::warn!(
                    "Stream /Length {} does not match its data, scanning for endstream",
                    length
                );
            }
        }

        // the input may be a window cut short of the end of the stream
        let offset =
            find_subsequence(&data[start..], b"endstream").ok_or(ParseError::UnexpectedEof)?;
        let mut end = start + offset;
        // the EOL before endstream is not part of the payload
        if end > start && data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && data[end - 1] == b'\r' {
            end -= 1;
        }

        self.lexer.seek(start + offset);
        self.lexer.expect_keyword("endstream")?;
        Ok(data[start..end].to_vec())
    }
}

fn endstream_follows(rest: &[u8]) -> bool {
    let skip = rest.iter().take_while(|&&b| is_whitespace(b)).count();
    rest[skip..].starts_with(b"endstream")
}
