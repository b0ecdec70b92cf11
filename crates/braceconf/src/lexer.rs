//! Tokenizer for the brace-structured configuration text.
//!
//! The lexer turns a byte span into the event stream consumed by
//! [`Binder`](crate::Binder):
//!
//! ```text
//! key value next-value      # Key, Value, ValueNext
//! object "with value" {     # Key, Value, ObjectOpen
//!     inner v               # Key, Value
//! }                         # ObjectClose
//! ```
//!
//! Borrowing
//! - Bare words and quoted strings without escapes are returned as borrowed
//!   slices of the input. A quoted string containing escapes is decoded into
//!   an owned buffer, which the binder takes over without copying when it
//!   stores the value.
//!
//! Positions
//! - `line()` and `column()` are 1-based and point at the first byte of the
//!   most recent token, or of the token that failed to lex.

use std::borrow::Cow;

use bstr::{BStr, BString, ByteSlice};

use crate::SyntaxError;

/// One parse event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'src> {
    /// First token of a line.
    Key(Cow<'src, BStr>),
    /// First value following a key.
    Value(Cow<'src, BStr>),
    /// Any further value on the same line.
    ValueNext(Cow<'src, BStr>),
    ObjectOpen,
    ObjectClose,
    /// End of input at top level.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Key,
    Value,
    NextValue,
}

/// Pull-based tokenizer over an in-memory byte span.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    input: &'src [u8],
    pos: usize,
    line: usize,
    column: usize,
    token_line: usize,
    token_column: usize,
    expect: Expect,
    depth: usize,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(input: &'src [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            token_line: 1,
            token_column: 1,
            expect: Expect::Key,
            depth: 0,
        }
    }

    /// Line of the most recent token.
    #[must_use]
    pub fn line(&self) -> usize {
        self.token_line
    }

    /// Byte column of the most recent token.
    #[must_use]
    pub fn column(&self) -> usize {
        self.token_column
    }

    /// Produces the next event. Once [`Event::End`] is returned, further calls
    /// keep returning it.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] for malformed text; `line()`/`column()` then
    /// point at the offending token.
    pub fn next_event(&mut self) -> Result<Event<'src>, SyntaxError> {
        loop {
            self.skip_blanks();
            self.token_line = self.line;
            self.token_column = self.column;

            let Some(&b) = self.input.get(self.pos) else {
                if self.depth != 0 {
                    return Err(SyntaxError::UnclosedObject);
                }
                return Ok(Event::End);
            };

            match b {
                b'\n' => {
                    self.bump();
                    self.expect = Expect::Key;
                }
                b'#' => self.skip_line(),
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                b'{' => {
                    if self.expect == Expect::Key {
                        return Err(SyntaxError::ObjectWithoutKey);
                    }
                    self.bump();
                    self.depth += 1;
                    self.expect = Expect::Key;
                    return Ok(Event::ObjectOpen);
                }
                b'}' => {
                    if self.depth == 0 {
                        return Err(SyntaxError::UnmatchedClose);
                    }
                    self.bump();
                    self.depth -= 1;
                    self.expect = Expect::Key;
                    return Ok(Event::ObjectClose);
                }
                b'"' => {
                    let text = self.quoted()?;
                    return Ok(self.emit(text));
                }
                _ => {
                    let text = self.bare();
                    return Ok(self.emit(text));
                }
            }
        }
    }

    fn emit(&mut self, text: Cow<'src, BStr>) -> Event<'src> {
        match self.expect {
            Expect::Key => {
                self.expect = Expect::Value;
                Event::Key(text)
            }
            Expect::Value => {
                self.expect = Expect::NextValue;
                Event::Value(text)
            }
            Expect::NextValue => Event::ValueNext(text),
        }
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    #[inline]
    fn bump(&mut self) {
        if self.input[self.pos] == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn skip_blanks(&mut self) {
        while let Some(b' ' | b'\t' | b'\r') = self.peek_at(0) {
            self.bump();
        }
    }

    // Stops before the LF so that it still ends the key line.
    fn skip_line(&mut self) {
        while self.peek_at(0).is_some_and(|b| b != b'\n') {
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), SyntaxError> {
        self.bump();
        self.bump();
        loop {
            match (self.peek_at(0), self.peek_at(1)) {
                (Some(b'*'), Some(b'/')) => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                (Some(_), _) => self.bump(),
                (None, _) => return Err(SyntaxError::UnterminatedComment),
            }
        }
    }

    fn bare(&mut self) -> Cow<'src, BStr> {
        let start = self.pos;
        while self.peek_at(0).is_some_and(|b| !is_delimiter(b)) {
            self.bump();
        }
        Cow::Borrowed(self.input[start..self.pos].as_bstr())
    }

    fn quoted(&mut self) -> Result<Cow<'src, BStr>, SyntaxError> {
        let input = self.input;
        self.bump();
        let start = self.pos;
        let mut owned: Option<Vec<u8>> = None;

        loop {
            let Some(&b) = input.get(self.pos) else {
                return Err(SyntaxError::UnterminatedString);
            };
            match b {
                b'"' => {
                    let end = self.pos;
                    self.bump();
                    return Ok(match owned {
                        Some(buf) => Cow::Owned(BString::from(buf)),
                        None => Cow::Borrowed(input[start..end].as_bstr()),
                    });
                }
                b'\\' => {
                    let buf = owned.get_or_insert_with(|| input[start..self.pos].to_vec());
                    self.bump();
                    let Some(&esc) = input.get(self.pos) else {
                        return Err(SyntaxError::UnterminatedString);
                    };
                    self.bump();
                    let decoded = match esc {
                        b'"' | b'\\' => esc,
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'0' => 0,
                        b'x' => {
                            let hi = self.hex_digit(esc)?;
                            let lo = self.hex_digit(esc)?;
                            hi << 4 | lo
                        }
                        other => return Err(SyntaxError::BadEscape(char::from(other))),
                    };
                    buf.push(decoded);
                }
                _ => {
                    if let Some(buf) = owned.as_mut() {
                        buf.push(b);
                    }
                    self.bump();
                }
            }
        }
    }

    fn hex_digit(&mut self, esc: u8) -> Result<u8, SyntaxError> {
        let digit = self
            .peek_at(0)
            .and_then(|b| char::from(b).to_digit(16))
            .ok_or(SyntaxError::BadEscape(char::from(esc)))?;
        self.bump();
        // to_digit(16) is always below 16
        Ok(u8::try_from(digit).unwrap_or_default())
    }
}

#[inline]
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'"' | b'{' | b'}')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn events(input: &str) -> Vec<Event<'_>> {
        let mut lexer = Lexer::new(input.as_bytes());
        let mut out = Vec::new();
        loop {
            let event = lexer.next_event().unwrap();
            if event == Event::End {
                return out;
            }
            out.push(event);
        }
    }

    fn key(s: &str) -> Event<'_> {
        Event::Key(Cow::Borrowed(s.as_bytes().as_bstr()))
    }

    fn val(s: &str) -> Event<'_> {
        Event::Value(Cow::Borrowed(s.as_bytes().as_bstr()))
    }

    fn next(s: &str) -> Event<'_> {
        Event::ValueNext(Cow::Borrowed(s.as_bytes().as_bstr()))
    }

    #[test]
    fn keys_values_and_objects() {
        let input = "key1 \"my str\"\nobj {\n\tkey3 -1234\n}\n\"obj 1\" value1 {\n}\nlist 11 22 33\n";
        assert_eq!(
            events(input),
            vec![
                key("key1"),
                val("my str"),
                key("obj"),
                Event::ObjectOpen,
                key("key3"),
                val("-1234"),
                Event::ObjectClose,
                key("obj 1"),
                val("value1"),
                Event::ObjectOpen,
                Event::ObjectClose,
                key("list"),
                val("11"),
                next("22"),
                next("33"),
            ]
        );
    }

    #[test]
    fn object_on_one_line() {
        assert_eq!(
            events("outer { inner v }"),
            vec![
                key("outer"),
                Event::ObjectOpen,
                key("inner"),
                val("v"),
                Event::ObjectClose,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let input = "# leading\nkey#0 v // trailing\n/* block\n */ k2 v2\n";
        assert_eq!(
            events(input),
            vec![key("key#0"), val("v"), key("k2"), val("v2")]
        );
    }

    #[test]
    fn escaped_string_is_owned() {
        let mut lexer = Lexer::new(br#""key2\n" "a\"b\x41""#);
        let Event::Key(k) = lexer.next_event().unwrap() else {
            panic!("expected key");
        };
        assert!(matches!(k, Cow::Owned(_)));
        assert_eq!(k.as_ref(), "key2\n");
        assert_eq!(
            lexer.next_event().unwrap(),
            Event::Value(Cow::Owned(BString::from("a\"bA")))
        );
    }

    #[test]
    fn unescaped_string_is_borrowed() {
        let mut lexer = Lexer::new(b"\"plain text\"");
        let Event::Key(k) = lexer.next_event().unwrap() else {
            panic!("expected key");
        };
        assert!(matches!(k, Cow::Borrowed(_)));
    }

    #[test]
    fn empty_quoted_value() {
        assert_eq!(events("k \"\""), vec![key("k"), val("")]);
    }

    #[test]
    fn positions_point_at_token_start() {
        let mut lexer = Lexer::new(b"a b\n  c d");
        lexer.next_event().unwrap();
        assert_eq!((lexer.line(), lexer.column()), (1, 1));
        lexer.next_event().unwrap();
        assert_eq!((lexer.line(), lexer.column()), (1, 3));
        lexer.next_event().unwrap();
        assert_eq!((lexer.line(), lexer.column()), (2, 3));
    }

    #[rstest]
    #[case("k \"abc", SyntaxError::UnterminatedString, (1, 3))]
    #[case("k \"a\\qb\"", SyntaxError::BadEscape('q'), (1, 3))]
    #[case("k \"\\x4\"", SyntaxError::BadEscape('x'), (1, 3))]
    #[case("k v\n{", SyntaxError::ObjectWithoutKey, (2, 1))]
    #[case("k v\n}", SyntaxError::UnmatchedClose, (2, 1))]
    #[case("k {\n a b\n", SyntaxError::UnclosedObject, (3, 1))]
    #[case("/* open", SyntaxError::UnterminatedComment, (1, 1))]
    fn syntax_errors(
        #[case] input: &str,
        #[case] expected: SyntaxError,
        #[case] position: (usize, usize),
    ) {
        let mut lexer = Lexer::new(input.as_bytes());
        let err = loop {
            match lexer.next_event() {
                Ok(Event::End) => panic!("expected an error"),
                Ok(_) => {}
                Err(err) => break err,
            }
        };
        assert_eq!(err, expected);
        assert_eq!((lexer.line(), lexer.column()), position);
    }

    #[test]
    fn end_is_sticky() {
        let mut lexer = Lexer::new(b"");
        assert_eq!(lexer.next_event().unwrap(), Event::End);
        assert_eq!(lexer.next_event().unwrap(), Event::End);
    }
}
