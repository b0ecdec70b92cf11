//! Event processor and context stack.
//!
//! Overview
//! - [`Binder`] consumes one [`Event`] at a time and writes values into the
//!   destination object of the frame on top of its context stack. The stack
//!   has one frame per open object; the root frame is pushed by
//!   [`Binder::new`] and popped by [`Event::End`].
//! - A `Key` selects the active schema entry of the top frame. `Value` and
//!   `ValueNext` are converted according to that entry. `ObjectOpen` runs the
//!   entry's object handler, which must push exactly one new frame.
//!   `ObjectClose` runs the close marker of the top frame, pops it, and hands a
//!   nested destination back to its parent.
//!
//! Frames
//! - Bound frames own (or, for the root, borrow) their destination object and
//!   erase its type behind [`Bound`]. Handlers receive `&mut Binder` and the
//!   object at the same time; this works because the frame is taken off the
//!   stack while its handler runs.
//! - Skip frames swallow a sub-tree. Capture frames record it as text for a
//!   deferred handler.
//!
//! Errors
//! - The first error ends the session: the stack is unwound without invoking
//!   any further handler and every later event fails with
//!   [`SchemaError::NoContext`].

use std::{any::Any, borrow::Cow};

use bstr::{BStr, BString};
use tracing::{debug, trace};

use crate::{
    BinderOptions, ErrorKind, Event, HandlerResult, Schema, SchemaError,
    capture::Capture,
    frame::{Bind, Bound, Frame, Slot},
};

/// A binding session: the context stack plus the state between a key and its
/// values.
pub struct Binder<'s> {
    stack: Vec<Frame<'s>>,
    /// Frames pushed by the handler currently running.
    pending: Vec<Frame<'s>>,
    /// Schema entry selected by the last key, in the top frame's schema.
    active: Option<usize>,
    /// The value of `key VALUE {`, until the object handler has run.
    object_value: Option<BString>,
    options: BinderOptions,
}

impl<'s> Binder<'s> {
    /// Starts a session that binds the top level of the input to `root`.
    pub fn new<T: 'static>(schema: &'s Schema<T>, root: &'s mut T, options: BinderOptions) -> Self {
        Self {
            stack: vec![Frame::Bound(Box::new(Bind::new(schema, Slot::Root(root))))],
            pending: Vec::new(),
            active: None,
            object_value: None,
            options,
        }
    }

    /// Number of open contexts, including the root. 0 once the session has
    /// ended.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn options(&self) -> &BinderOptions {
        &self.options
    }

    /// The value preceding the brace being opened: `VALUE` in `key VALUE {`.
    #[must_use]
    pub fn object_value(&self) -> Option<&BStr> {
        self.object_value.as_ref().map(AsRef::as_ref)
    }

    /// Takes ownership of [`object_value`](Self::object_value).
    pub fn take_object_value(&mut self) -> Option<BString> {
        self.object_value.take()
    }

    pub(crate) fn set_object_value(&mut self, value: BString) {
        self.object_value = Some(value);
    }

    /// Enters a nested object bound to `schema`. `child` is owned by the new
    /// context and passed to `attach` together with the parent object when
    /// the object closes.
    ///
    /// For use by object handlers.
    pub fn push_context<P: 'static, C: 'static>(
        &mut self,
        schema: &'s Schema<C>,
        child: C,
        attach: impl FnOnce(&mut P, C) + 's,
    ) {
        let attach = Box::new(move |parent: &mut dyn Any, child: C| -> Result<(), ErrorKind> {
            let parent = parent
                .downcast_mut::<P>()
                .ok_or(SchemaError::ParentTypeMismatch)?;
            attach(parent, child);
            Ok(())
        });
        let slot = Slot::Nested {
            object: child,
            attach,
        };
        self.pending
            .push(Frame::Bound(Box::new(Bind::new(schema, slot))));
    }

    /// Ignores the object being opened together with everything inside it.
    ///
    /// For use by object handlers.
    pub fn skip_context(&mut self) {
        self.pending.push(Frame::Skip);
    }

    /// Records the object being opened as text instead of interpreting it.
    /// Once the object closes, `on_done` receives the parent object and the
    /// captured text, and normal processing resumes at the parent level.
    ///
    /// For use by object handlers.
    pub fn defer_context<P: 'static>(
        &mut self,
        on_done: impl FnOnce(&mut P, BString) -> HandlerResult + 's,
    ) {
        let on_done = Box::new(move |parent: &mut dyn Any, text: BString| -> Result<(), ErrorKind> {
            let parent = parent
                .downcast_mut::<P>()
                .ok_or(SchemaError::ParentTypeMismatch)?;
            on_done(parent, text).map_err(ErrorKind::User)
        });
        self.pending.push(Frame::Capture(Capture::new(on_done)));
    }

    /// Feeds one event.
    ///
    /// # Errors
    ///
    /// Fails on the first schema, value, handler or allocation error. The
    /// session is over afterwards: the stack is empty and later events fail
    /// with [`SchemaError::NoContext`].
    pub fn process(&mut self, event: Event<'_>) -> Result<(), ErrorKind> {
        let result = self.dispatch(event);
        if let Err(err) = &result {
            debug!(depth = self.stack.len(), %err, "binding failed");
            self.unwind();
        }
        result
    }

    fn dispatch(&mut self, event: Event<'_>) -> Result<(), ErrorKind> {
        let depth = self.stack.len();
        match self.stack.last_mut() {
            None => return Err(SchemaError::NoContext.into()),
            Some(Frame::Skip) => {
                match event {
                    Event::ObjectOpen => self.push(Frame::Skip)?,
                    Event::ObjectClose => self.pop(),
                    Event::End => return Err(SchemaError::UnclosedObject.into()),
                    Event::Key(_) | Event::Value(_) | Event::ValueNext(_) => {}
                }
                return Ok(());
            }
            Some(Frame::Capture(capture)) => {
                match event {
                    Event::End => return Err(SchemaError::UnclosedObject.into()),
                    Event::ObjectOpen if depth + capture.depth() >= self.options.max_depth => {
                        return Err(SchemaError::DepthLimitExceeded.into());
                    }
                    _ => {}
                }
                if capture.record(&event) {
                    return self.close_capture();
                }
                return Ok(());
            }
            Some(Frame::Bound(_)) => {}
        }

        match event {
            Event::Key(key) => self.key(&key),
            Event::Value(text) => self.value(text, false),
            Event::ValueNext(text) => self.value(text, true),
            Event::ObjectOpen => self.open(),
            Event::ObjectClose => self.close(),
            Event::End => self.end(),
        }
    }

    fn key(&mut self, key: &[u8]) -> Result<(), ErrorKind> {
        let ignore_case = self.options.ignore_case;
        let Some(Frame::Bound(top)) = self.stack.last() else {
            return Err(SchemaError::NoContext.into());
        };
        let entry = top
            .find(key, ignore_case)
            .ok_or(SchemaError::UnknownKey)?;
        self.active = Some(entry);
        Ok(())
    }

    fn value(&mut self, text: Cow<'_, BStr>, next: bool) -> Result<(), ErrorKind> {
        let entry = self.active.ok_or(SchemaError::NoActiveKey)?;
        self.with_top(|top, binder| top.value(binder, entry, text, next))
    }

    fn open(&mut self) -> Result<(), ErrorKind> {
        let entry = self.active.take().ok_or(SchemaError::UnexpectedObject)?;
        self.pending.clear();
        self.with_top(|top, binder| top.open(binder, entry))?;

        if self.pending.len() != 1 {
            return Err(SchemaError::HandlerContractViolated.into());
        }
        if let Some(frame) = self.pending.pop() {
            self.push(frame)?;
        }
        self.object_value = None;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ErrorKind> {
        self.active = None;
        if self.stack.len() <= 1 {
            return Err(SchemaError::UnexpectedClose.into());
        }
        let Some(Frame::Bound(mut top)) = self.stack.pop() else {
            return Err(SchemaError::NoContext.into());
        };
        trace!(depth = self.stack.len(), "pop context");

        top.close(self)?;
        if !self.pending.is_empty() {
            return Err(SchemaError::HandlerContractViolated.into());
        }
        top.finish(self.parent_object())
    }

    fn close_capture(&mut self) -> Result<(), ErrorKind> {
        let Some(Frame::Capture(capture)) = self.stack.pop() else {
            return Err(SchemaError::NoContext.into());
        };
        trace!(depth = self.stack.len(), "pop context");
        self.active = None;
        capture.finish(self.parent_object())
    }

    fn end(&mut self) -> Result<(), ErrorKind> {
        if self.stack.len() != 1 {
            return Err(SchemaError::UnclosedObject.into());
        }
        self.active = None;
        match self.stack.pop() {
            Some(Frame::Bound(root)) => root.finish(None),
            _ => Err(SchemaError::NoContext.into()),
        }
    }

    fn parent_object(&mut self) -> Option<&mut dyn Any> {
        match self.stack.last_mut() {
            Some(Frame::Bound(parent)) => Some(parent.object()),
            _ => None,
        }
    }

    /// Runs `f` on the top frame with the frame taken off the stack.
    fn with_top<R>(
        &mut self,
        f: impl FnOnce(&mut dyn Bound<'s>, &mut Self) -> Result<R, ErrorKind>,
    ) -> Result<R, ErrorKind> {
        let mut top = match self.stack.pop() {
            Some(Frame::Bound(top)) => top,
            Some(other) => {
                self.stack.push(other);
                return Err(SchemaError::NoContext.into());
            }
            None => return Err(SchemaError::NoContext.into()),
        };
        let result = f(top.as_mut(), self);
        self.stack.push(Frame::Bound(top));
        result
    }

    fn push(&mut self, frame: Frame<'s>) -> Result<(), ErrorKind> {
        if self.stack.len() >= self.options.max_depth {
            return Err(SchemaError::DepthLimitExceeded.into());
        }
        self.stack.push(frame);
        trace!(depth = self.stack.len(), "push context");
        Ok(())
    }

    fn pop(&mut self) {
        self.stack.pop();
        self.active = None;
        trace!(depth = self.stack.len(), "pop context");
    }

    fn unwind(&mut self) {
        self.stack.clear();
        self.pending.clear();
        self.active = None;
        self.object_value = None;
    }
}

impl std::fmt::Debug for Binder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("depth", &self.stack.len())
            .field("active", &self.active)
            .field("object_value", &self.object_value)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
