/*!
 Renders the raw event stream and the decoded object tree as indented text.
*/

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use typedstream::{
    archiver::{
        models::{Object, ObjectContents, TypedGroup, Value},
        unarchiver::Unarchiver,
    },
    encoding::encoding_string,
    error::{archiver::ArchiveError, stream::StreamError},
    stream::{events::Event, reader::TypedStreamReader},
};

/// Dump the raw event stream, one event per line, indented by nesting depth.
pub fn dump_events(reader: TypedStreamReader<'_>) -> Result<Vec<String>, StreamError> {
    let mut lines = vec![];
    let mut indent = 0usize;
    for event in reader {
        let event = event?;
        if event.closes_nesting() {
            indent = indent.saturating_sub(1);
        }
        lines.push(format!("{}{event}", "\t".repeat(indent)));
        if matches!(event, Event::Header { .. }) {
            lines.push(String::new());
        }
        if event.opens_nesting() {
            indent += 1;
        }
    }
    Ok(lines)
}

/// Dump every decoded top-level group of the stream as a multi-line tree.
pub fn dump_decoded(unarchiver: &mut Unarchiver<'_>) -> Result<Vec<String>, ArchiveError> {
    let mut state = RenderState::default();
    let mut lines = vec![];
    for group in unarchiver.decode_all()? {
        lines.extend(render_group(&group, &mut state));
    }
    Ok(lines)
}

/// Tracks which objects are being or have been rendered, so that shared
/// references print as backreferences and cycles terminate.
#[derive(Default)]
struct RenderState {
    rendering: Vec<*const RefCell<Object>>,
    rendered: HashSet<*const RefCell<Object>>,
}

fn indented(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|line| format!("\t{line}"))
}

/// Prepend `prefix` to the first of `lines`, keeping the rest indented as-is.
fn prefixed(prefix: String, lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut lines = lines.into_iter();
    match lines.next() {
        Some(first) => out.push(format!("{prefix}{first}")),
        None => out.push(prefix),
    }
    out.extend(lines);
    out
}

fn render_group(group: &TypedGroup, state: &mut RenderState) -> Vec<String> {
    if let (1, Some(value)) = (group.encodings.len(), group.values.first()) {
        let encoding = encoding_string(&group.encodings);
        return prefixed(format!("type {encoding:?}: "), render_value(value, state));
    }

    let mut lines = vec!["group:".to_string()];
    for (encoding, value) in group.encodings.iter().zip(&group.values) {
        let rendered = prefixed(format!("type \"{encoding}\": "), render_value(value, state));
        lines.extend(indented(rendered));
    }
    lines
}

fn render_value(value: &Value, state: &mut RenderState) -> Vec<String> {
    match value {
        Value::SignedInteger(value) => vec![value.to_string()],
        Value::UnsignedInteger(value) => vec![value.to_string()],
        Value::Float(value) => vec![value.to_string()],
        Value::Double(value) => vec![value.to_string()],
        Value::String(text) => vec![format!("{text:?}")],
        Value::Bytes(data) => vec![format!(
            "data ({} bytes): {:?}",
            data.len(),
            String::from_utf8_lossy(data)
        )],
        Value::CString(contents) => {
            vec![format!("C string: {:?}", String::from_utf8_lossy(contents))]
        }
        Value::Selector(name) => {
            vec![format!("selector: {:?}", String::from_utf8_lossy(name))]
        }
        Value::Array(elements) => {
            let mut lines = vec![format!("array, {} elements:", elements.len())];
            for element in elements {
                lines.extend(indented(render_value(element, state)));
            }
            lines
        }
        Value::Dictionary(entries) => {
            let mut lines = vec![format!("dictionary, {} entries:", entries.len())];
            for (key, value) in entries {
                lines.extend(indented(prefixed(
                    "key: ".to_string(),
                    render_value(key, state),
                )));
                lines.extend(indented(prefixed(
                    "value: ".to_string(),
                    render_value(value, state),
                )));
            }
            lines
        }
        Value::Struct { name, fields } => {
            let mut lines = vec![format!("struct {name}:")];
            for field in fields {
                lines.extend(indented(render_value(field, state)));
            }
            lines
        }
        Value::Class(class) => vec![format!("class {class}")],
        Value::Object(handle) => render_object(handle, state),
        Value::Nil => vec!["nil".to_string()],
    }
}

fn render_object(handle: &Rc<RefCell<Object>>, state: &mut RenderState) -> Vec<String> {
    let pointer = Rc::as_ptr(handle);
    let object = handle.borrow();
    let first = format!("object of class {}", object.class);

    if state.rendering.contains(&pointer) {
        return vec![format!("{first} (circular reference)")];
    }
    if state.rendered.contains(&pointer) {
        return vec![format!("{first} (backreference)")];
    }

    state.rendering.push(pointer);
    let lines = match &object.contents {
        ObjectContents::Pending => vec![format!("{first}, still decoding")],
        ObjectContents::Generic(groups) if groups.is_empty() => {
            vec![format!("{first}, no contents")]
        }
        ObjectContents::Generic(groups) => {
            let mut lines = vec![format!("{first}, contents:")];
            for group in groups {
                lines.extend(indented(render_group(group, state)));
            }
            lines
        }
        ObjectContents::Value(value) => {
            let mut lines = vec![format!("{first}, contents:")];
            lines.extend(indented(render_value(value, state)));
            lines
        }
    };
    state.rendering.pop();
    state.rendered.insert(pointer);
    lines
}
