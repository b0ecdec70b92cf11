//! Schema-driven reader for brace-structured configuration text.
//!
//! The input is a sequence of lines `key value value ...`, where a key may
//! open a nested object with `{` and `}` closes it:
//!
//! ```text
//! # comment
//! listen 0.0.0.0 8080
//! server "main site" {
//!     root /srv/www
//!     buffer 64k
//! }
//! ```
//!
//! Parsing is split in two layers. The [`Lexer`] turns bytes into a stream of
//! [`Event`]s. The [`Binder`] consumes events and stores values into typed
//! destination objects as described by a [`Schema`] per nesting level.
//! [`parse`] drives both over a complete buffer.
//!
//! ```rust
//! use braceconf::{
//!     BString, Binder, BinderOptions, Entry, HandlerResult, IntField, IntTarget, Kind, Schema,
//!     Target,
//! };
//!
//! #[derive(Default)]
//! struct Site {
//!     name: BString,
//!     root: BString,
//!     buffer: u64,
//! }
//!
//! #[derive(Default)]
//! struct Config {
//!     sites: Vec<Site>,
//! }
//!
//! static SITE: Schema<Site> = Schema::new(&[
//!     Entry::new("root", Kind::Str(Target::Field(|s: &mut Site| &mut s.root))),
//!     Entry::new("buffer", Kind::Size(IntTarget::Field(IntField::U64(|s: &mut Site| &mut s.buffer)))),
//! ]);
//!
//! fn site(binder: &mut Binder<'_>, _: &mut Config) -> HandlerResult {
//!     let name = binder.take_object_value().unwrap_or_default();
//!     binder.push_context(&SITE, Site { name, ..Site::default() }, |c: &mut Config, s| c.sites.push(s));
//!     Ok(())
//! }
//!
//! static CONFIG: Schema<Config> = Schema::new(&[Entry::new("server", Kind::Object(site))]);
//!
//! let mut config = Config::default();
//! braceconf::parse(
//!     &CONFIG,
//!     &mut config,
//!     b"server \"main site\" {\n root /srv/www\n buffer 64k\n}\n",
//!     BinderOptions::default(),
//! )?;
//! assert_eq!(config.sites[0].name, "main site");
//! assert_eq!(config.sites[0].buffer, 64 * 1024);
//! # Ok::<(), braceconf::ConfError>(())
//! ```

#![allow(missing_docs)]

use std::path::Path;

use tracing::debug;

mod binder;
mod capture;
pub mod convert;
mod error;
mod frame;
mod lexer;
mod options;
mod schema;
mod writer;

#[cfg(test)]
mod tests;

pub use binder::Binder;
pub use bstr::{BStr, BString};
pub use error::{
    ConfError, ErrorKind, HandlerError, HandlerResult, SchemaError, SyntaxError, ValueError,
};
pub use lexer::{Event, Lexer};
pub use options::BinderOptions;
pub use schema::{
    BoolFn, CloseFn, Entry, Flags, IntField, IntFn, IntFormat, IntTarget, Kind, Name, ObjectFn,
    Schema, StrFn, StrzFn, Target, Width,
};
pub use writer::{ConfWriter, WriterOptions};

/// Parses `input` completely, binding its top level to `root`.
///
/// # Errors
///
/// The first syntax, schema, value or handler error, with the position of
/// the token being processed. `root` may be partially filled in.
pub fn parse<T: 'static>(
    schema: &Schema<T>,
    root: &mut T,
    input: &[u8],
    options: BinderOptions,
) -> Result<(), ConfError> {
    debug!(len = input.len(), ignore_case = options.ignore_case, "parsing configuration");
    let mut lexer = Lexer::new(input);
    let mut binder = Binder::new(schema, root, options);
    loop {
        let event = lexer
            .next_event()
            .map_err(|err| ConfError::new(err.into(), lexer.line(), lexer.column()))?;
        let end = event == Event::End;
        if let Err(kind) = binder.process(event) {
            let err = ConfError::new(kind, lexer.line(), lexer.column());
            debug!(%err, "configuration rejected");
            return Err(err);
        }
        if end {
            return Ok(());
        }
    }
}

/// Reads the file at `path` and [`parse`]s its contents.
///
/// # Errors
///
/// [`ErrorKind::Io`] if the file cannot be read, otherwise as for [`parse`].
pub fn parse_file<T: 'static>(
    schema: &Schema<T>,
    root: &mut T,
    path: impl AsRef<Path>,
    options: BinderOptions,
) -> Result<(), ConfError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading configuration");
    let input = std::fs::read(path).map_err(|err| {
        debug!(path = %path.display(), %err, "cannot read configuration");
        ConfError::io(err)
    })?;
    parse(schema, root, &input, options)
}
