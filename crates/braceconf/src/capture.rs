//! Deferred sub-tree capture.
//!
//! A capture frame sits on top of the context stack while a deferred object is
//! being read. Every event of the sub-tree is re-serialized with the
//! non-pretty [`ConfWriter`], so canonical input comes out byte-for-byte. The
//! frame ends at the close brace matching the object it was pushed for; that
//! brace itself is not recorded.

use std::any::Any;

use bstr::{BString, ByteSlice};
use tracing::trace;

use crate::{ConfWriter, ErrorKind, Event, SchemaError};

pub(crate) type OnCaptured<'s> =
    Box<dyn FnOnce(&mut dyn Any, BString) -> Result<(), ErrorKind> + 's>;

pub(crate) struct Capture<'s> {
    writer: ConfWriter,
    on_done: OnCaptured<'s>,
}

impl<'s> Capture<'s> {
    pub(crate) fn new(on_done: OnCaptured<'s>) -> Self {
        Self {
            writer: ConfWriter::default(),
            on_done,
        }
    }

    /// Nesting depth inside the captured sub-tree.
    pub(crate) fn depth(&self) -> usize {
        self.writer.depth()
    }

    /// Records one event. Returns `true` for the close that ends the capture.
    pub(crate) fn record(&mut self, event: &Event<'_>) -> bool {
        match event {
            Event::Key(key) => self.writer.key(key.as_bytes()),
            Event::Value(value) | Event::ValueNext(value) => self.writer.value(value.as_bytes()),
            Event::ObjectOpen => self.writer.open(),
            Event::ObjectClose if self.writer.depth() == 0 => return true,
            Event::ObjectClose => self.writer.close(),
            Event::End => {}
        }
        false
    }

    /// Hands the captured text to the handler that requested it.
    pub(crate) fn finish(self, parent: Option<&mut dyn Any>) -> Result<(), ErrorKind> {
        let text = self.writer.finish();
        trace!(len = text.len(), "deferred capture complete");
        let parent = parent.ok_or(SchemaError::ParentTypeMismatch)?;
        (self.on_done)(parent, text)
    }
}
