//! Stable pretty-printing for the results file.
//!
//! The layout is plain two-space indented JSON with one item per line, except
//! for `values` arrays of scalars, which are wrapped a fixed number of items
//! per line so run lists stay short and diff well. The output is ordinary
//! JSON and parses back to the same data.

use serde_json::Value;

/// Items per line in wrapped `values` arrays.
pub const VALUES_PER_LINE: usize = 7;

const INDENT: &str = "  ";

/// Renders a JSON value in the store layout, with a trailing newline.
pub fn to_pretty_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0, false);
    out.push('\n');
    out
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_scalar(out: &mut String, value: &Value) {
    // Scalars render the same compact or pretty
    out.push_str(&value.to_string());
}

fn write_value(out: &mut String, value: &Value, depth: usize, wrap: bool) {
    match value {
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) if wrap && items.iter().all(is_scalar) => {
            out.push('[');
            for (row, chunk) in items.chunks(VALUES_PER_LINE).enumerate() {
                if row > 0 {
                    out.push(',');
                }
                out.push('\n');
                push_indent(out, depth + 1);
                for (i, item) in chunk.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_scalar(out, item);
                }
            }
            out.push('\n');
            push_indent(out, depth);
            out.push(']');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('\n');
                push_indent(out, depth + 1);
                write_value(out, item, depth + 1, false);
            }
            out.push('\n');
            push_indent(out, depth);
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('\n');
                push_indent(out, depth + 1);
                write_scalar(out, &Value::String(key.clone()));
                out.push_str(": ");
                write_value(out, item, depth + 1, key == "values");
            }
            out.push('\n');
            push_indent(out, depth);
            out.push('}');
        }
        scalar => write_scalar(out, scalar),
    }
}
