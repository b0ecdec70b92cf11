//! Schema tables: the ordered list of keys recognized at one nesting level and
//! how each key's value is stored.
//!
//! A value is either written straight into a field of the destination object
//! through an accessor function ([`Target::Field`]), or handed to a callback
//! ([`Target::Call`]). Field accessors are plain functions, so a table can be
//! a `static`:
//!
//! ```rust
//! use braceconf::{BString, Entry, Kind, Schema, Target};
//!
//! #[derive(Default)]
//! struct Server {
//!     name: BString,
//!     tls: bool,
//! }
//!
//! static SERVER: Schema<Server> = Schema::new(&[
//!     Entry::new("name", Kind::Str(Target::Field(|s: &mut Server| &mut s.name))).not_empty(),
//!     Entry::new("tls", Kind::Bool(Target::Field(|s: &mut Server| &mut s.tls))),
//! ]);
//! ```

use std::{borrow::Cow, ffi::CString, fmt};

use bstr::BStr;

use crate::{Binder, HandlerResult};

/// Callback receiving a borrowed string value, valid for the call only.
pub type StrFn<T> = for<'a> fn(&mut Binder<'a>, &mut T, &BStr) -> HandlerResult;
/// Callback receiving ownership of a zero-terminated string value.
pub type StrzFn<T> = for<'a> fn(&mut Binder<'a>, &mut T, CString) -> HandlerResult;
/// Callback receiving an integer or size value, widened to 64 bits.
///
/// For an unsigned format the argument is the value's bit pattern: reinterpret
/// it with `as u64` to recover values above `i64::MAX`.
pub type IntFn<T> = for<'a> fn(&mut Binder<'a>, &mut T, i64) -> HandlerResult;
/// Callback receiving a boolean value.
pub type BoolFn<T> = for<'a> fn(&mut Binder<'a>, &mut T, bool) -> HandlerResult;
/// Object handler. Must push exactly one context (see
/// [`Binder::push_context`], [`Binder::skip_context`],
/// [`Binder::defer_context`]) before returning `Ok`.
pub type ObjectFn<T> = for<'a> fn(&mut Binder<'a>, &mut T) -> HandlerResult;
/// Invoked once when the object owning the schema closes.
pub type CloseFn<T> = for<'a> fn(&mut Binder<'a>, &mut T) -> HandlerResult;

/// Where a value goes: a field of the destination object, or a callback.
pub enum Target<T, F, C> {
    Field(fn(&mut T) -> &mut F),
    Call(C),
}

impl<T, F, C: Copy> Clone for Target<T, F, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, F, C: Copy> Copy for Target<T, F, C> {}

/// Bit width of an integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Width::W8 => 8,
            Width::W16 => 16,
            Width::W32 => 32,
            Width::W64 => 64,
        }
    }
}

/// Declared width and signedness of an integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntFormat {
    pub width: Width,
    pub signed: bool,
}

impl IntFormat {
    pub const I8: Self = Self::new(Width::W8, true);
    pub const U8: Self = Self::new(Width::W8, false);
    pub const I16: Self = Self::new(Width::W16, true);
    pub const U16: Self = Self::new(Width::W16, false);
    pub const I32: Self = Self::new(Width::W32, true);
    pub const U32: Self = Self::new(Width::W32, false);
    pub const I64: Self = Self::new(Width::W64, true);
    pub const U64: Self = Self::new(Width::W64, false);

    #[must_use]
    pub const fn new(width: Width, signed: bool) -> Self {
        Self { width, signed }
    }

    /// Inclusive range of representable values.
    #[must_use]
    pub const fn bounds(self) -> (i128, i128) {
        let bits = self.width.bits();
        if self.signed {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        } else {
            (0, (1i128 << bits) - 1)
        }
    }
}

/// Accessor for an integer field; the field's type fixes width and sign.
pub enum IntField<T> {
    I8(fn(&mut T) -> &mut i8),
    U8(fn(&mut T) -> &mut u8),
    I16(fn(&mut T) -> &mut i16),
    U16(fn(&mut T) -> &mut u16),
    I32(fn(&mut T) -> &mut i32),
    U32(fn(&mut T) -> &mut u32),
    I64(fn(&mut T) -> &mut i64),
    U64(fn(&mut T) -> &mut u64),
}

impl<T> Clone for IntField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IntField<T> {}

impl<T> IntField<T> {
    #[must_use]
    pub const fn format(&self) -> IntFormat {
        match self {
            IntField::I8(_) => IntFormat::I8,
            IntField::U8(_) => IntFormat::U8,
            IntField::I16(_) => IntFormat::I16,
            IntField::U16(_) => IntFormat::U16,
            IntField::I32(_) => IntFormat::I32,
            IntField::U32(_) => IntFormat::U32,
            IntField::I64(_) => IntFormat::I64,
            IntField::U64(_) => IntFormat::U64,
        }
    }
}

/// Integer destination. Callbacks declare the width and sign they accept.
pub enum IntTarget<T> {
    Field(IntField<T>),
    Call(IntFormat, IntFn<T>),
}

impl<T> Clone for IntTarget<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IntTarget<T> {}

impl<T> IntTarget<T> {
    #[must_use]
    pub const fn format(&self) -> IntFormat {
        match self {
            IntTarget::Field(field) => field.format(),
            IntTarget::Call(format, _) => *format,
        }
    }
}

/// Value kind of a schema entry together with its destination.
pub enum Kind<T> {
    /// Byte string. Fields receive an owned copy; the previous value is dropped.
    Str(Target<T, bstr::BString, StrFn<T>>),
    /// String without embedded NUL bytes.
    Strz(Target<T, Option<CString>, StrzFn<T>>),
    /// Integer, range-checked against the declared format.
    Int(IntTarget<T>),
    /// Integer with an optional `k`/`m`/`g`/`t` binary magnitude suffix.
    ///
    /// The shifted value must still fit the declared format; overflow is
    /// rejected with [`ValueError::OutOfRange`](crate::ValueError::OutOfRange)
    /// rather than truncated.
    Size(IntTarget<T>),
    /// `true`/`false` (any case) or `0`/`1`.
    Bool(Target<T, bool, BoolFn<T>>),
    /// Key introducing a nested object, optionally preceded by one value
    /// (see [`Binder::object_value`]).
    Object(ObjectFn<T>),
    /// Close marker, see [`Entry::close`].
    Close(CloseFn<T>),
}

impl<T> Clone for Kind<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Kind<T> {}

/// Modifiers of a schema entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// The key accepts several values: `key v1 v2 v3`.
    pub list: bool,
    /// Reject an empty value.
    pub not_empty: bool,
    /// Reject a zero integer.
    pub not_zero: bool,
}

/// How an entry is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Name {
    Key(&'static str),
    /// Matches any key not matched by a named entry.
    Any,
    /// Never matched by a key; invoked when the object closes.
    Close,
}

/// One recognized key.
pub struct Entry<T> {
    pub name: Name,
    pub kind: Kind<T>,
    pub flags: Flags,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Entry<T> {}

impl<T> Entry<T> {
    #[must_use]
    pub const fn new(name: &'static str, kind: Kind<T>) -> Self {
        Self {
            name: Name::Key(name),
            kind,
            flags: Flags {
                list: false,
                not_empty: false,
                not_zero: false,
            },
        }
    }

    /// Wildcard entry: the lowest-priority fallback for unnamed keys, whatever
    /// its position in the table.
    #[must_use]
    pub const fn any(kind: Kind<T>) -> Self {
        let mut entry = Self::new("*", kind);
        entry.name = Name::Any;
        entry
    }

    /// Close marker, invoked with the destination object when it closes.
    #[must_use]
    pub const fn close(handler: CloseFn<T>) -> Self {
        let mut entry = Self::new("", Kind::Close(handler));
        entry.name = Name::Close;
        entry
    }

    /// Accepts several values after the key.
    #[must_use]
    pub const fn list(mut self) -> Self {
        self.flags.list = true;
        self
    }

    /// Rejects an empty string value with [`ValueError::ValueEmpty`](crate::ValueError::ValueEmpty).
    #[must_use]
    pub const fn not_empty(mut self) -> Self {
        self.flags.not_empty = true;
        self
    }

    /// Rejects a zero integer with [`ValueError::ZeroNotAllowed`](crate::ValueError::ZeroNotAllowed).
    #[must_use]
    pub const fn not_zero(mut self) -> Self {
        self.flags.not_zero = true;
        self
    }
}

impl<T> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            Kind::Str(_) => "Str",
            Kind::Strz(_) => "Strz",
            Kind::Int(_) => "Int",
            Kind::Size(_) => "Size",
            Kind::Bool(_) => "Bool",
            Kind::Object(_) => "Object",
            Kind::Close(_) => "Close",
        };
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Ordered schema table for objects of type `T`.
pub struct Schema<T: 'static> {
    entries: Cow<'static, [Entry<T>]>,
}

impl<T: 'static> Schema<T> {
    /// Table over a static slice, usable in `static` items.
    #[must_use]
    pub const fn new(entries: &'static [Entry<T>]) -> Self {
        Self {
            entries: Cow::Borrowed(entries),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    /// Finds the entry for `key`: the first named match in declaration order,
    /// else the first wildcard.
    #[must_use]
    pub fn find(&self, key: &[u8], ignore_case: bool) -> Option<usize> {
        let mut wildcard = None;
        for (i, entry) in self.entries.iter().enumerate() {
            match entry.name {
                Name::Key(name) => {
                    let hit = if ignore_case {
                        name.as_bytes().eq_ignore_ascii_case(key)
                    } else {
                        name.as_bytes() == key
                    };
                    if hit {
                        return Some(i);
                    }
                }
                Name::Any => {
                    wildcard.get_or_insert(i);
                }
                Name::Close => {}
            }
        }
        wildcard
    }

    /// The close marker's handler, if the table declares one.
    #[must_use]
    pub fn close_handler(&self) -> Option<CloseFn<T>> {
        self.entries.iter().find_map(|entry| match (entry.name, &entry.kind) {
            (Name::Close, Kind::Close(handler)) => Some(*handler),
            _ => None,
        })
    }
}

impl<T: 'static> From<Vec<Entry<T>>> for Schema<T> {
    fn from(entries: Vec<Entry<T>>) -> Self {
        Self {
            entries: Cow::Owned(entries),
        }
    }
}

impl<T: 'static> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
