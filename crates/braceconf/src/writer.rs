//! Serializer producing text that the [`Lexer`](crate::Lexer) reads back as
//! the same event stream.

use bstr::{BStr, BString, ByteSlice};

use crate::lexer::is_delimiter;

/// Writer options.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterOptions {
    /// Indent nested lines with one tab per level.
    ///
    /// # Default
    ///
    /// `false`
    pub pretty: bool,
}

/// Builds configuration text one key, value or brace at a time.
///
/// ```rust
/// use braceconf::ConfWriter;
///
/// let mut w = ConfWriter::default();
/// w.key("k");
/// w.int(1234567890);
/// w.value("val");
/// w.pair("k 2", "v 2");
/// w.key("kctx");
/// w.open();
/// w.pair("k3", "v3");
/// w.close();
/// assert_eq!(w.finish(), "k 1234567890 val\n\"k 2\" \"v 2\"\nkctx {\nk3 v3\n}\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfWriter {
    out: BString,
    options: WriterOptions,
    depth: usize,
    line_open: bool,
}

impl ConfWriter {
    #[must_use]
    pub fn new(options: WriterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Starts a new line with `key`.
    pub fn key(&mut self, key: impl AsRef<[u8]>) {
        self.end_line();
        if self.options.pretty {
            self.out.extend(std::iter::repeat_n(b'\t', self.depth));
        }
        self.token(key.as_ref());
        self.line_open = true;
    }

    /// Appends a value to the current line.
    pub fn value(&mut self, value: impl AsRef<[u8]>) {
        self.out.push(b' ');
        self.token(value.as_ref());
    }

    pub fn int(&mut self, value: i64) {
        self.value(value.to_string());
    }

    /// A key with a single value.
    pub fn pair(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        self.key(key);
        self.value(value);
    }

    /// Opens an object after the current key and its values.
    pub fn open(&mut self) {
        self.out.extend_from_slice(b" {\n");
        self.line_open = false;
        self.depth += 1;
    }

    pub fn close(&mut self) {
        self.end_line();
        self.depth = self.depth.saturating_sub(1);
        if self.options.pretty {
            self.out.extend(std::iter::repeat_n(b'\t', self.depth));
        }
        self.out.extend_from_slice(b"}\n");
    }

    /// Current object depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Text written so far, without the pending line terminator.
    #[must_use]
    pub fn as_bstr(&self) -> &BStr {
        self.out.as_bstr()
    }

    /// Terminates the last line and returns the text.
    #[must_use]
    pub fn finish(mut self) -> BString {
        self.end_line();
        self.out
    }

    fn end_line(&mut self) {
        if self.line_open {
            self.out.push(b'\n');
            self.line_open = false;
        }
    }

    fn token(&mut self, text: &[u8]) {
        if !needs_quotes(text) {
            self.out.extend_from_slice(text);
            return;
        }
        self.out.push(b'"');
        for &b in text {
            match b {
                b'"' => self.out.extend_from_slice(b"\\\""),
                b'\\' => self.out.extend_from_slice(b"\\\\"),
                b'\n' => self.out.extend_from_slice(b"\\n"),
                b'\r' => self.out.extend_from_slice(b"\\r"),
                b'\t' => self.out.extend_from_slice(b"\\t"),
                0 => self.out.extend_from_slice(b"\\0"),
                b if b < 0x20 || b == 0x7f => {
                    const HEX: &[u8; 16] = b"0123456789abcdef";
                    self.out.extend_from_slice(&[
                        b'\\',
                        b'x',
                        HEX[usize::from(b >> 4)],
                        HEX[usize::from(b & 0xf)],
                    ]);
                }
                b => self.out.push(b),
            }
        }
        self.out.push(b'"');
    }
}

fn needs_quotes(text: &[u8]) -> bool {
    text.is_empty()
        || text.starts_with(b"#")
        || text.starts_with(b"//")
        || text.starts_with(b"/*")
        || text
            .iter()
            .any(|&b| is_delimiter(b) || b < 0x20 || b == 0x7f)
}
