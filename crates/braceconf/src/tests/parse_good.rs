use std::ffi::CString;

use bstr::{BStr, BString, ByteSlice};
use rstest::rstest;

use super::{FIXTURE, Fixture, bind, bind_with};
use crate::{
    Binder, BinderOptions, Entry, HandlerResult, IntField, IntFormat, IntTarget, Kind, Schema,
    Target,
};

const OBJECT_CONF: &str = r#"# every kind of value
str "string"
sz stringz
int 1234
size 1234k
bool true
list val1 val2

obj {
	str objstring
	int 1234
	bool 1
	obj {
	}
}
"#;

#[test]
fn binds_every_kind() {
    let o = bind(&FIXTURE, OBJECT_CONF).unwrap();
    assert_eq!(o.s, "string");
    assert_eq!(o.sz.as_deref().map(|s| s.to_bytes()), Some(&b"stringz"[..]));
    assert_eq!(o.n, 1234);
    assert_eq!(o.size, 1234 * 1024);
    assert!(o.b);
    assert_eq!(o.list, ["val1", "val2"]);

    let inner = o.obj.as_deref().unwrap();
    assert_eq!(inner.s, "objstring");
    assert_eq!(inner.n, 1234);
    assert!(inner.b);
    assert!(inner.obj.is_some());
    assert!(inner.obj.as_deref().unwrap().obj.is_none());
}

#[test]
fn objects_close_on_one_line() {
    let o = bind(&FIXTURE, "obj { str x }\nint 5").unwrap();
    assert_eq!(o.obj.unwrap().s, "x");
    assert_eq!(o.n, 5);
}

#[test]
fn later_assignment_replaces_earlier() {
    let o = bind(&FIXTURE, "str a\nstr b\nsz one\nsz two").unwrap();
    assert_eq!(o.s, "b");
    assert_eq!(o.sz.unwrap().as_bytes(), b"two");
}

#[test]
fn list_values_arrive_in_order() {
    let o = bind(&FIXTURE, "list a b\nlist \"c d\"\nlist e").unwrap();
    assert_eq!(o.list, ["a", "b", "c d", "e"]);
}

#[test]
fn escaped_strings_are_decoded() {
    let o = bind(&FIXTURE, r#"str "tab\there \"q\" \x41""#).unwrap();
    assert_eq!(o.s, "tab\there \"q\" A");
}

#[test]
fn empty_input_binds_nothing() {
    let o = bind(&FIXTURE, "  # only a comment\n/* and\n another */\n").unwrap();
    assert!(o.s.is_empty());
    assert!(o.obj.is_none());
}

#[rstest]
#[case("1k", 1024)]
#[case("1m", 1_048_576)]
#[case("2G", 2 << 30)]
#[case("1t", 1 << 40)]
#[case("-3k", -3072)]
#[case("7", 7)]
fn size_suffixes(#[case] text: &str, #[case] expected: i64) {
    let o = bind(&FIXTURE, &format!("size {text}")).unwrap();
    assert_eq!(o.size, expected);
}

#[rstest]
#[case("true", true)]
#[case("TRUE", true)]
#[case("1", true)]
#[case("false", false)]
#[case("0", false)]
fn booleans(#[case] text: &str, #[case] expected: bool) {
    let o = bind(&FIXTURE, &format!("bool {}\nbool {text}", !expected)).unwrap();
    assert_eq!(o.b, expected);
}

#[derive(Debug, Default)]
struct Widths {
    a: u8,
    b: i16,
    c: u32,
    d: u64,
    seen: Vec<i64>,
}

fn widths_call(_: &mut Binder<'_>, w: &mut Widths, value: i64) -> HandlerResult {
    w.seen.push(value);
    Ok(())
}

static WIDTHS: Schema<Widths> = Schema::new(&[
    Entry::new("a", Kind::Int(IntTarget::Field(IntField::U8(|w: &mut Widths| &mut w.a)))),
    Entry::new("b", Kind::Int(IntTarget::Field(IntField::I16(|w: &mut Widths| &mut w.b)))),
    Entry::new("c", Kind::Size(IntTarget::Field(IntField::U32(|w: &mut Widths| &mut w.c)))),
    Entry::new("d", Kind::Int(IntTarget::Field(IntField::U64(|w: &mut Widths| &mut w.d)))),
    Entry::new("e", Kind::Int(IntTarget::Call(IntFormat::I8, widths_call))).list(),
]);

#[test]
fn integer_widths() {
    let w = bind(
        &WIDTHS,
        "a 255\nb -32768\nc 4m\nd 18446744073709551615\ne -128 0 127",
    )
    .unwrap();
    assert_eq!(w.a, 255);
    assert_eq!(w.b, i16::MIN);
    assert_eq!(w.c, 4 << 20);
    assert_eq!(w.d, u64::MAX);
    assert_eq!(w.seen, [-128, 0, 127]);
}

#[derive(Debug, Default)]
struct Calls {
    names: Vec<CString>,
    flags: Vec<bool>,
    big: Vec<u64>,
}

fn calls_name(_: &mut Binder<'_>, c: &mut Calls, value: CString) -> HandlerResult {
    c.names.push(value);
    Ok(())
}

fn calls_flag(_: &mut Binder<'_>, c: &mut Calls, value: bool) -> HandlerResult {
    c.flags.push(value);
    Ok(())
}

fn calls_big(_: &mut Binder<'_>, c: &mut Calls, value: i64) -> HandlerResult {
    c.big.push(u64::from_ne_bytes(value.to_ne_bytes()));
    Ok(())
}

static CALLS: Schema<Calls> = Schema::new(&[
    Entry::new("name", Kind::Strz(Target::Call(calls_name))).list(),
    Entry::new("flag", Kind::Bool(Target::Call(calls_flag))).list(),
    Entry::new("big", Kind::Int(IntTarget::Call(IntFormat::U64, calls_big))).list(),
    Entry::new("huge", Kind::Size(IntTarget::Call(IntFormat::U64, calls_big))),
]);

#[test]
fn callbacks_receive_converted_values() {
    let c = bind(
        &CALLS,
        "name alpha \"be ta\"\nflag true 0 FALSE\nbig 0 9223372036854775808 18446744073709551615\nhuge 16777215t",
    )
    .unwrap();
    let names: Vec<&[u8]> = c.names.iter().map(|n| n.as_bytes()).collect();
    assert_eq!(names, [&b"alpha"[..], &b"be ta"[..]]);
    assert_eq!(c.flags, [true, false, false]);
    assert_eq!(c.big, [0, 1 << 63, u64::MAX, 16_777_215 << 40]);
}

#[derive(Debug, Default)]
struct Loose {
    known: BString,
    other: Vec<(BString, BString)>,
    pending: Option<BString>,
}

fn loose_value(_: &mut Binder<'_>, l: &mut Loose, val: &BStr) -> HandlerResult {
    let key = l.pending.take().unwrap_or_default();
    l.other.push((key, val.to_owned()));
    Ok(())
}

fn loose_key(_: &mut Binder<'_>, l: &mut Loose, val: &BStr) -> HandlerResult {
    l.pending = Some(val.to_owned());
    Ok(())
}

static LOOSE: Schema<Loose> = Schema::new(&[
    Entry::any(Kind::Str(Target::Call(loose_value))),
    Entry::new("Known", Kind::Str(Target::Field(|l: &mut Loose| &mut l.known))),
    Entry::new("key", Kind::Str(Target::Call(loose_key))),
]);

#[test]
fn wildcard_catches_unknown_keys_only() {
    let l = bind(&LOOSE, "Known a\nkey x\nmystery b").unwrap();
    assert_eq!(l.known, "a");
    assert_eq!(l.other, [(BString::from("x"), BString::from("b"))]);
}

#[test]
fn ignore_case_matches_named_entries() {
    let options = BinderOptions {
        ignore_case: true,
        ..BinderOptions::default()
    };
    let l = bind_with(&LOOSE, "KNOWN a\nknown b", options).unwrap();
    assert_eq!(l.known, "b");
    assert!(l.other.is_empty());

    let l = bind(&LOOSE, "KNOWN a").unwrap();
    assert!(l.known.is_empty());
    assert_eq!(l.other.len(), 1);
}

#[derive(Debug, Default)]
struct Sections {
    names: Vec<BString>,
    closed: usize,
    skipped_ok: bool,
}

#[derive(Debug, Default)]
struct Section {
    name: BString,
    port: u16,
}

fn section_open(binder: &mut Binder<'_>, _: &mut Sections) -> HandlerResult {
    let name = binder.take_object_value().unwrap_or_default();
    binder.push_context(&SECTION, Section { name, port: 0 }, |s: &mut Sections, child: Section| {
        s.names.push(child.name);
    });
    Ok(())
}

fn section_close(_: &mut Binder<'_>, s: &mut Section) -> HandlerResult {
    if s.port == 0 {
        s.port = 80;
    }
    Ok(())
}

fn ignored_open(binder: &mut Binder<'_>, s: &mut Sections) -> HandlerResult {
    assert_eq!(binder.object_value(), Some(b"anything".as_bstr()));
    s.skipped_ok = true;
    binder.skip_context();
    Ok(())
}

fn count_close(_: &mut Binder<'_>, s: &mut Sections) -> HandlerResult {
    s.closed += 1;
    Ok(())
}

static SECTION: Schema<Section> = Schema::new(&[
    Entry::new("port", Kind::Int(IntTarget::Field(IntField::U16(|s: &mut Section| &mut s.port)))),
    Entry::close(section_close),
]);

static SECTIONS: Schema<Sections> = Schema::new(&[
    Entry::new("section", Kind::Object(section_open)),
    Entry::new("ignored", Kind::Object(ignored_open)),
    Entry::close(count_close),
]);

#[test]
fn object_value_reaches_handler() {
    let s = bind(&SECTIONS, "section one {\n}\nsection \"two 2\" {\nport 8080\n}").unwrap();
    assert_eq!(s.names, ["one", "two 2"]);
}

#[test]
fn skipped_subtree_is_not_interpreted() {
    let input = "ignored anything {\n  bogus 1 2 3\n  deeper {\n    x { y z }\n  }\n}\nsection a {\n}";
    let s = bind(&SECTIONS, input).unwrap();
    assert!(s.skipped_ok);
    assert_eq!(s.names, ["a"]);
}

#[test]
fn root_close_marker_is_not_invoked_at_end() {
    let s = bind(&SECTIONS, "section a {\n}").unwrap();
    assert_eq!(s.closed, 0);
}

#[derive(Debug, Default)]
struct Ports {
    ports: Vec<u16>,
}

fn port_open(binder: &mut Binder<'_>, _: &mut Ports) -> HandlerResult {
    binder.push_context(&SECTION, Section::default(), |p: &mut Ports, s: Section| p.ports.push(s.port));
    Ok(())
}

static PORTS: Schema<Ports> = Schema::new(&[Entry::new("listen", Kind::Object(port_open))]);

#[test]
fn close_marker_runs_before_attach() {
    let p = bind(&PORTS, "listen {\n}\nlisten {\nport 443\n}").unwrap();
    assert_eq!(p.ports, [80, 443]);
}

#[test]
fn binder_reports_depth() {
    use crate::{Event, Lexer};

    let mut root = Fixture::default();
    let mut binder = Binder::new(&FIXTURE, &mut root, BinderOptions::default());
    let mut lexer = Lexer::new(b"obj {\nobj {\n}\n}\n");
    let mut depths = Vec::new();
    loop {
        let event = lexer.next_event().unwrap();
        let end = event == Event::End;
        binder.process(event).unwrap();
        depths.push(binder.depth());
        if end {
            break;
        }
    }
    assert_eq!(depths, [1, 2, 2, 3, 2, 1, 0]);
}
