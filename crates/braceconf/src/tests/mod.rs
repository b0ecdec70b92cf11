mod parse_good;

use std::ffi::CString;

use bstr::{BStr, BString};

use crate::{
    Binder, BinderOptions, ConfError, Entry, HandlerResult, IntField, IntTarget, Kind, Schema,
    Target,
};

/// Destination exercising every value kind, nested through `obj`.
#[derive(Debug, Default)]
pub(crate) struct Fixture {
    pub(crate) s: BString,
    pub(crate) sz: Option<CString>,
    pub(crate) n: i64,
    pub(crate) size: i64,
    pub(crate) b: bool,
    pub(crate) list: Vec<BString>,
    pub(crate) obj: Option<Box<Fixture>>,
}

fn fixture_list(_: &mut Binder<'_>, o: &mut Fixture, val: &BStr) -> HandlerResult {
    o.list.push(val.to_owned());
    Ok(())
}

fn fixture_obj(binder: &mut Binder<'_>, _: &mut Fixture) -> HandlerResult {
    binder.push_context(&FIXTURE, Fixture::default(), |o: &mut Fixture, child| {
        o.obj = Some(Box::new(child));
    });
    Ok(())
}

pub(crate) static FIXTURE: Schema<Fixture> = Schema::new(&[
    Entry::new("str", Kind::Str(Target::Field(|o: &mut Fixture| &mut o.s))),
    Entry::new("sz", Kind::Strz(Target::Field(|o: &mut Fixture| &mut o.sz))),
    Entry::new(
        "int",
        Kind::Int(IntTarget::Field(IntField::I64(|o: &mut Fixture| &mut o.n))),
    ),
    Entry::new(
        "size",
        Kind::Size(IntTarget::Field(IntField::I64(|o: &mut Fixture| &mut o.size))),
    ),
    Entry::new("bool", Kind::Bool(Target::Field(|o: &mut Fixture| &mut o.b))),
    Entry::new("list", Kind::Str(Target::Call(fixture_list))).list(),
    Entry::new("obj", Kind::Object(fixture_obj)),
]);

/// Parses `input` into a fresh destination.
pub(crate) fn bind<T: Default + 'static>(schema: &Schema<T>, input: &str) -> Result<T, ConfError> {
    bind_with(schema, input, BinderOptions::default())
}

pub(crate) fn bind_with<T: Default + 'static>(
    schema: &Schema<T>,
    input: &str,
    options: BinderOptions,
) -> Result<T, ConfError> {
    let mut root = T::default();
    crate::parse(schema, &mut root, input.as_bytes(), options)?;
    Ok(root)
}
