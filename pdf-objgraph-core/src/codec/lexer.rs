//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer runs
//! over an in-memory byte slice; numbers and names keep the exact bytes they
//! were written with so the parser can reproduce them on output.

use super::{ParseError, ParseResult};
use crate::objects::{name, Number};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer or real number, with its as-written text
    Number(Number),

    /// Literal string, escapes resolved
    String(Vec<u8>),

    /// Hexadecimal string, decoded
    HexString(Vec<u8>),

    /// Name object as written, without the leading solidus (e.g. `A#20B`)
    Name(Vec<u8>),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Stream keyword
    Stream,

    /// Endstream keyword
    EndStream,

    /// Obj keyword
    Obj,

    /// Endobj keyword
    EndObj,

    /// Reference marker R
    R,

    /// Null object
    Null,

    /// Any other keyword (xref, trailer, startxref, n, f, ...)
    Keyword(String),

    /// Comment (usually ignored)
    Comment(Vec<u8>),

    /// End of file
    Eof,
}

impl Token {
    /// Integer value of a number token that has no fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Token::Number(n) if n.is_integer() => Some(n.as_i64()),
            _ => None,
        }
    }
}

/// PDF whitespace: NUL, HT, LF, FF, CR and space.
pub fn is_whitespace(ch: u8) -> bool {
    matches!(ch, 0 | b'\t' | b'\n' | 0x0c | b'\r' | b' ')
}

pub fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'/' | b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'%' | b'{' | b'}'
    )
}

/// PDF Lexer for tokenizing PDF content
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
    token_buffer: Vec<Token>,
    strict_names: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            token_buffer: Vec::new(),
            strict_names: false,
        }
    }

    /// Reject malformed `#` escapes in names instead of tolerating them
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        // Check if we have a pushed-back token
        if let Some(token) = self.token_buffer.pop() {
            return Ok(token);
        }

        self.skip_whitespace();

        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'%' => Ok(self.read_comment()),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.consume_char();
                if self.peek_char() == Some(b'>') {
                    self.consume_char();
                    Ok(Token::DictEnd)
                } else {
                    Err(self.syntax_error("Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.consume_char();
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.consume_char();
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ if ch.is_ascii_alphabetic() => self.read_keyword(),
            _ => Err(self.syntax_error(&format!("Unexpected character: {}", ch as char))),
        }
    }

    /// Get the next token that is not a comment
    pub fn next_significant_token(&mut self) -> ParseResult<Token> {
        loop {
            match self.next_token()? {
                Token::Comment(_) => continue,
                token => return Ok(token),
            }
        }
    }

    fn syntax_error(&self, message: &str) -> ParseError {
        ParseError::SyntaxError {
            position: self.position,
            message: message.to_string(),
        }
    }

    /// Peek at the next character without consuming it
    fn peek_char(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    /// Consume the next character
    fn consume_char(&mut self) -> Option<u8> {
        let ch = self.peek_char();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    /// Skip whitespace and return the number of bytes skipped
    pub(crate) fn skip_whitespace(&mut self) -> usize {
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.position += 1;
            } else {
                break;
            }
        }
        self.position - start
    }

    /// Read a comment (from % to end of line)
    fn read_comment(&mut self) -> Token {
        self.consume_char(); // consume '%'
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.position += 1;
        }
        Token::Comment(self.data[start..self.position].to_vec())
    }

    /// Read a name object (e.g., /Type). Escapes are kept as written.
    fn read_name(&mut self) -> ParseResult<Token> {
        self.consume_char(); // consume '/'
        let start = self.position;

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;
        }

        let raw = &self.data[start..self.position];
        if self.strict_names && !name::is_well_formed(raw) {
            return Err(ParseError::SyntaxError {
                position: start,
                message: format!(
                    "Malformed escape in name /{}",
                    String::from_utf8_lossy(raw)
                ),
            });
        }

        Ok(Token::Name(raw.to_vec()))
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.consume_char(); // consume '('
        let mut string = Vec::new();
        let mut paren_depth = 1;
        let mut escape = false;

        while paren_depth > 0 {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.syntax_error("Unterminated string"))?;

            if escape {
                escape = false;
                let escaped = match ch {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'b' => b'\x08',
                    b'f' => b'\x0C',
                    b'(' => b'(',
                    b')' => b')',
                    b'\\' => b'\\',
                    b'0'..=b'7' => {
                        // Octal escape sequence
                        let mut value = (ch - b'0') as u32;
                        for _ in 0..2 {
                            match self.peek_char() {
                                Some(next @ b'0'..=b'7') => {
                                    self.consume_char();
                                    value = value * 8 + (next - b'0') as u32;
                                }
                                _ => break,
                            }
                        }
                        (value & 0xff) as u8
                    }
                    b'\r' => {
                        // Line continuation
                        if self.peek_char() == Some(b'\n') {
                            self.consume_char();
                        }
                        continue;
                    }
                    b'\n' => continue,
                    _ => ch, // Unknown escape, use literal
                };
                string.push(escaped);
            } else {
                match ch {
                    b'\\' => escape = true,
                    b'(' => {
                        string.push(ch);
                        paren_depth += 1;
                    }
                    b')' => {
                        paren_depth -= 1;
                        if paren_depth > 0 {
                            string.push(ch);
                        }
                    }
                    _ => string.push(ch),
                }
            }
        }

        Ok(Token::String(string))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        self.consume_char(); // consume '<'

        if self.peek_char() == Some(b'<') {
            self.consume_char();
            return Ok(Token::DictStart);
        }

        let mut bytes = Vec::new();
        let mut high: Option<u8> = None;
        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.syntax_error("Unterminated hex string"))?;
            if ch == b'>' {
                break;
            }
            if is_whitespace(ch) {
                continue;
            }
            let digit = (ch as char)
                .to_digit(16)
                .ok_or_else(|| self.syntax_error("Invalid character in hex string"))?
                as u8;
            match high.take() {
                Some(h) => bytes.push((h << 4) | digit),
                None => high = Some(digit),
            }
        }
        // Pad with 0 if odd number of digits
        if let Some(h) = high {
            bytes.push(h << 4);
        }

        Ok(Token::HexString(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let mut has_dot = false;
        let mut has_digit = false;

        if let Some(b'+' | b'-') = self.peek_char() {
            self.consume_char();
        }

        while let Some(ch) = self.peek_char() {
            match ch {
                b'0'..=b'9' => {
                    self.consume_char();
                    has_digit = true;
                }
                b'.' if !has_dot => {
                    self.consume_char();
                    has_dot = true;
                }
                _ => break,
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.position])
            .map_err(|_| self.syntax_error("Invalid number"))?;

        if !has_digit {
            return Err(self.syntax_error(&format!("Invalid number: '{text}'")));
        }

        if has_dot {
            let value = text
                .parse::<f64>()
                .map_err(|_| self.syntax_error(&format!("Invalid real number: '{text}'")))?;
            Ok(Token::Number(Number::real(value).with_text(text)))
        } else {
            match text.parse::<i64>() {
                Ok(value) => Ok(Token::Number(Number::integer(value).with_text(text))),
                Err(_) => {
                    // out of range integers degrade to reals
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| self.syntax_error(&format!("Invalid integer: '{text}'")))?;
                    Ok(Token::Number(Number::real(value).with_text(text)))
                }
            }
        }
    }

    /// Read a keyword
    fn read_keyword(&mut self) -> ParseResult<Token> {
        let word = self.read_word();
        Ok(self.process_keyword(word))
    }

    /// Process a word as a keyword
    fn process_keyword(&self, word: String) -> Token {
        match word.as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            "stream" => Token::Stream,
            "endstream" => Token::EndStream,
            "obj" => Token::Obj,
            "endobj" => Token::EndObj,
            "R" => Token::R,
            _ => Token::Keyword(word),
        }
    }

    /// Read a word (sequence of non-delimiter characters)
    fn read_word(&mut self) -> String {
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.position += 1;
        }
        String::from_utf8_lossy(&self.data[start..self.position]).into_owned()
    }

    /// Read a newline sequence (CR, LF, or CRLF)
    pub fn read_newline(&mut self) -> ParseResult<()> {
        match self.peek_char() {
            Some(b'\r') => {
                self.consume_char();
                // Check for CRLF
                if self.peek_char() == Some(b'\n') {
                    self.consume_char();
                }
                Ok(())
            }
            Some(b'\n') => {
                self.consume_char();
                Ok(())
            }
            _ => Err(self.syntax_error("Expected newline")),
        }
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to an absolute position, dropping pushed-back tokens
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.data.len());
        self.token_buffer.clear();
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Push back a token to be returned by the next call to next_token
    pub fn push_token(&mut self, token: Token) {
        self.token_buffer.push(token);
    }

    /// Expect a specific keyword token
    pub fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        let token = self.next_significant_token()?;
        let matched = match (&token, keyword) {
            (Token::Stream, "stream")
            | (Token::EndStream, "endstream")
            | (Token::Obj, "obj")
            | (Token::EndObj, "endobj")
            | (Token::R, "R") => true,
            (Token::Keyword(word), _) => word == keyword,
            _ => false,
        };
        if matched {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("keyword '{keyword}'"),
                found: format!("{token:?}"),
            })
        }
    }
}

pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
