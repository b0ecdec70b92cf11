#![no_main]

use arbitrary::Arbitrary;
use braceconf::{
    BStr, BString, Binder, BinderOptions, ConfWriter, Entry, HandlerResult, IntField, IntTarget,
    Kind, Schema, Target, WriterOptions,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    ignore_case: bool,
    max_depth: u8,
    pretty: bool,
    text: &'a [u8],
}

#[derive(Default)]
struct Node {
    s: BString,
    sz: Option<std::ffi::CString>,
    n: i32,
    size: u64,
    b: bool,
    list: Vec<BString>,
    children: Vec<Node>,
    deferred: Vec<BString>,
}

fn list(_: &mut Binder<'_>, node: &mut Node, value: &BStr) -> HandlerResult {
    node.list.push(value.to_owned());
    Ok(())
}

fn child(binder: &mut Binder<'_>, _: &mut Node) -> HandlerResult {
    binder.push_context(&NODE, Node::default(), |parent: &mut Node, c| parent.children.push(c));
    Ok(())
}

fn skip(binder: &mut Binder<'_>, _: &mut Node) -> HandlerResult {
    binder.skip_context();
    Ok(())
}

fn defer(binder: &mut Binder<'_>, _: &mut Node) -> HandlerResult {
    binder.defer_context(|parent: &mut Node, text| {
        parent.deferred.push(text);
        Ok(())
    });
    Ok(())
}

static NODE: Schema<Node> = Schema::new(&[
    Entry::new("s", Kind::Str(Target::Field(|n: &mut Node| &mut n.s))).not_empty(),
    Entry::new("sz", Kind::Strz(Target::Field(|n: &mut Node| &mut n.sz))),
    Entry::new("n", Kind::Int(IntTarget::Field(IntField::I32(|n: &mut Node| &mut n.n)))),
    Entry::new("size", Kind::Size(IntTarget::Field(IntField::U64(|n: &mut Node| &mut n.size)))).not_zero(),
    Entry::new("b", Kind::Bool(Target::Field(|n: &mut Node| &mut n.b))),
    Entry::new("l", Kind::Str(Target::Call(list))).list(),
    Entry::new("o", Kind::Object(child)),
    Entry::new("skip", Kind::Object(skip)),
    Entry::new("defer", Kind::Object(defer)),
    Entry::any(Kind::Str(Target::Call(list))),
]);

fn write_node(w: &mut ConfWriter, node: &Node) {
    if !node.s.is_empty() {
        w.pair("s", &node.s);
    }
    for value in &node.list {
        w.pair("l", value);
    }
    for c in &node.children {
        w.key("o");
        w.open();
        write_node(w, c);
        w.close();
    }
}

fn collect_strings(node: &Node) -> (Vec<&BString>, usize) {
    let mut out: Vec<&BString> = node.list.iter().collect();
    let mut children = node.children.len();
    if !node.s.is_empty() {
        out.push(&node.s);
    }
    for c in &node.children {
        let (strings, count) = collect_strings(c);
        out.extend(strings);
        children += count;
    }
    (out, children)
}

fuzz_target!(|input: Input<'_>| {
    let options = BinderOptions {
        ignore_case: input.ignore_case,
        max_depth: usize::from(input.max_depth).max(1),
    };
    let mut root = Node::default();
    if braceconf::parse(&NODE, &mut root, input.text, options).is_err() {
        return;
    }

    // Whatever was bound must survive a write/read cycle.
    let mut w = ConfWriter::new(WriterOptions { pretty: input.pretty });
    write_node(&mut w, &root);
    let text = w.finish();
    let mut again = Node::default();
    braceconf::parse(&NODE, &mut again, &text, options)
        .expect("writer output must parse");
    let (before, before_children) = collect_strings(&root);
    let (after, after_children) = collect_strings(&again);
    assert_eq!(before_children, after_children);
    assert_eq!(before.len(), after.len());
});
