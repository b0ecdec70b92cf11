//! Context frames and per-type value dispatch.

use std::{any::Any, borrow::Cow, ffi::CString};

use bstr::{BStr, BString};

use crate::{
    Binder, ErrorKind, Flags, IntField, IntTarget, Kind, Schema, SchemaError, Target, ValueError,
    capture::Capture, convert,
};

/// One entry of the context stack.
pub(crate) enum Frame<'s> {
    Bound(Box<dyn Bound<'s> + 's>),
    /// Unrecognized object; its whole sub-tree is ignored.
    Skip,
    Capture(Capture<'s>),
}

/// A schema paired with its destination object, with the object's type erased.
///
/// Methods that may run handlers take the binder separately: the frame is
/// popped off the stack for the duration of the call.
pub(crate) trait Bound<'s> {
    fn find(&self, key: &[u8], ignore_case: bool) -> Option<usize>;

    fn value(
        &mut self,
        binder: &mut Binder<'s>,
        entry: usize,
        text: Cow<'_, BStr>,
        next: bool,
    ) -> Result<(), ErrorKind>;

    fn open(&mut self, binder: &mut Binder<'s>, entry: usize) -> Result<(), ErrorKind>;

    fn close(&mut self, binder: &mut Binder<'s>) -> Result<(), ErrorKind>;

    fn object(&mut self) -> &mut dyn Any;

    /// Attaches a nested object to its parent once it has been closed.
    fn finish(self: Box<Self>, parent: Option<&mut dyn Any>) -> Result<(), ErrorKind>;
}

pub(crate) type Attach<'s, T> = Box<dyn FnOnce(&mut dyn Any, T) -> Result<(), ErrorKind> + 's>;

pub(crate) enum Slot<'s, T> {
    Root(&'s mut T),
    Nested { object: T, attach: Attach<'s, T> },
}

pub(crate) struct Bind<'s, T: 'static> {
    schema: &'s Schema<T>,
    slot: Slot<'s, T>,
}

impl<'s, T: 'static> Bind<'s, T> {
    pub(crate) fn new(schema: &'s Schema<T>, slot: Slot<'s, T>) -> Self {
        Self { schema, slot }
    }

    fn object_mut(&mut self) -> &mut T {
        match &mut self.slot {
            Slot::Root(object) => &mut **object,
            Slot::Nested { object, .. } => object,
        }
    }
}

impl<'s, T: 'static> Bound<'s> for Bind<'s, T> {
    fn find(&self, key: &[u8], ignore_case: bool) -> Option<usize> {
        self.schema.find(key, ignore_case)
    }

    fn value(
        &mut self,
        binder: &mut Binder<'s>,
        entry: usize,
        text: Cow<'_, BStr>,
        next: bool,
    ) -> Result<(), ErrorKind> {
        let schema = self.schema;
        let entry = &schema.entries()[entry];
        if next && !entry.flags.list {
            return Err(SchemaError::UnexpectedMultipleValues.into());
        }
        let object = self.object_mut();

        match entry.kind {
            Kind::Str(target) => {
                check_not_empty(entry.flags, &text)?;
                match target {
                    Target::Field(field) => *field(object) = acquire(text)?,
                    Target::Call(handler) => handler(binder, object, &text).map_err(ErrorKind::User)?,
                }
            }
            Kind::Strz(target) => {
                check_not_empty(entry.flags, &text)?;
                let value = to_cstring(&text)?;
                match target {
                    Target::Field(field) => *field(object) = Some(value),
                    Target::Call(handler) => handler(binder, object, value).map_err(ErrorKind::User)?,
                }
            }
            Kind::Int(target) => store_int(binder, object, target, &text, false, entry.flags)?,
            Kind::Size(target) => store_int(binder, object, target, &text, true, entry.flags)?,
            Kind::Bool(target) => {
                let value = convert::parse_bool(&text)?;
                match target {
                    Target::Field(field) => *field(object) = value,
                    Target::Call(handler) => handler(binder, object, value).map_err(ErrorKind::User)?,
                }
            }
            Kind::Object(_) => {
                if next {
                    return Err(SchemaError::MultipleObjectValues.into());
                }
                check_not_empty(entry.flags, &text)?;
                binder.set_object_value(acquire(text)?);
            }
            Kind::Close(_) => return Err(SchemaError::InvalidSchemaType.into()),
        }
        Ok(())
    }

    fn open(&mut self, binder: &mut Binder<'s>, entry: usize) -> Result<(), ErrorKind> {
        let Kind::Object(handler) = self.schema.entries()[entry].kind else {
            return Err(SchemaError::UnexpectedObject.into());
        };
        handler(binder, self.object_mut()).map_err(ErrorKind::User)
    }

    fn close(&mut self, binder: &mut Binder<'s>) -> Result<(), ErrorKind> {
        match self.schema.close_handler() {
            Some(handler) => handler(binder, self.object_mut()).map_err(ErrorKind::User),
            None => Ok(()),
        }
    }

    fn object(&mut self) -> &mut dyn Any {
        self.object_mut()
    }

    fn finish(self: Box<Self>, parent: Option<&mut dyn Any>) -> Result<(), ErrorKind> {
        let this = *self;
        match this.slot {
            Slot::Root(_) => Ok(()),
            Slot::Nested { object, attach } => {
                let parent = parent.ok_or(SchemaError::ParentTypeMismatch)?;
                attach(parent, object)
            }
        }
    }
}

fn check_not_empty(flags: Flags, text: &[u8]) -> Result<(), ValueError> {
    if flags.not_empty && text.is_empty() {
        return Err(ValueError::ValueEmpty);
    }
    Ok(())
}

/// Takes over an owned value from the lexer, or copies a borrowed one.
fn acquire(text: Cow<'_, BStr>) -> Result<BString, ErrorKind> {
    match text {
        Cow::Owned(value) => Ok(value),
        Cow::Borrowed(value) => {
            let mut buf = Vec::new();
            buf.try_reserve_exact(value.len())?;
            buf.extend_from_slice(value);
            Ok(BString::from(buf))
        }
    }
}

fn to_cstring(text: &[u8]) -> Result<CString, ErrorKind> {
    if text.contains(&0) {
        return Err(ValueError::EmbeddedNull.into());
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(text.len() + 1)?;
    buf.extend_from_slice(text);
    CString::new(buf).map_err(|_| ValueError::EmbeddedNull.into())
}

fn store_int<T>(
    binder: &mut Binder<'_>,
    object: &mut T,
    target: IntTarget<T>,
    text: &[u8],
    size: bool,
    flags: Flags,
) -> Result<(), ErrorKind> {
    let value = convert::parse_integer(text, target.format(), size, flags.not_zero)?;
    let out_of_range = |_| ValueError::OutOfRange;
    match target {
        IntTarget::Field(field) => match field {
            IntField::I8(f) => *f(object) = i8::try_from(value).map_err(out_of_range)?,
            IntField::U8(f) => *f(object) = u8::try_from(value).map_err(out_of_range)?,
            IntField::I16(f) => *f(object) = i16::try_from(value).map_err(out_of_range)?,
            IntField::U16(f) => *f(object) = u16::try_from(value).map_err(out_of_range)?,
            IntField::I32(f) => *f(object) = i32::try_from(value).map_err(out_of_range)?,
            IntField::U32(f) => *f(object) = u32::try_from(value).map_err(out_of_range)?,
            IntField::I64(f) => *f(object) = i64::try_from(value).map_err(out_of_range)?,
            IntField::U64(f) => *f(object) = u64::try_from(value).map_err(out_of_range)?,
        },
        IntTarget::Call(format, handler) => {
            // Unsigned values above `i64::MAX` arrive as their two's complement bit pattern.
            let value = if format.signed {
                i64::try_from(value)
            } else {
                u64::try_from(value).map(|v| i64::from_ne_bytes(v.to_ne_bytes()))
            }
            .map_err(out_of_range)?;
            handler(binder, object, value).map_err(ErrorKind::User)?;
        }
    }
    Ok(())
}
