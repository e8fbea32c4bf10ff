use std::fmt::{self, Write};

use super::{Identity, Key, Value};

const MAX_DEPTH: usize = 32;

/// Cycle-safe rendering; a container reached again through itself prints
/// as `[...]`, `{...}` or `Name {...}`.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        render(self, &mut out, &mut Vec::new())?;
        f.write_str(&out)
    }
}

fn render(value: &Value, out: &mut String, ancestors: &mut Vec<Identity>) -> fmt::Result {
    match value {
        Value::None => out.push_str("None"),
        Value::Bool(b) => write!(out, "{}", b)?,
        Value::Int(i) => write!(out, "{}", i)?,
        Value::Float(x) => write!(out, "{:?}", x)?,
        Value::Str(s) => write!(out, "{:?}", s)?,
        Value::Bytes(b) => write!(out, "b\"{}\"", b.escape_ascii())?,
        Value::Callable(c) => write!(out, "<callable {}>", c.name())?,
        Value::Class(c) => write!(out, "{:?}", c)?,
        Value::Tuple(_) | Value::List(_) | Value::Dict(_) | Value::Object(_) => {
            render_container(value, out, ancestors)?
        }
    }
    Ok(())
}

fn render_container(value: &Value, out: &mut String, ancestors: &mut Vec<Identity>) -> fmt::Result {
    let Some(identity) = value.identity() else {
        return Ok(());
    };
    let recursive = ancestors.contains(&identity) || ancestors.len() >= MAX_DEPTH;

    ancestors.push(identity);
    let result = match value {
        Value::Tuple(_) if recursive => {
            out.push_str("(...)");
            Ok(())
        }
        Value::Tuple(t) => {
            out.push('(');
            render_seq(t.items(), out, ancestors)?;
            if t.len() == 1 {
                out.push(',');
            }
            out.push(')');
            Ok(())
        }
        Value::List(_) if recursive => {
            out.push_str("[...]");
            Ok(())
        }
        Value::List(l) => {
            out.push('[');
            render_seq(&l.snapshot(), out, ancestors)?;
            out.push(']');
            Ok(())
        }
        Value::Dict(_) if recursive => {
            out.push_str("{...}");
            Ok(())
        }
        Value::Dict(d) => render_entries(&d.snapshot(), out, ancestors),
        Value::Object(o) if recursive => write!(out, "{} {{...}}", o.class().name()),
        Value::Object(o) => {
            write!(out, "{} {{", o.class().name())?;
            for (i, (name, attr)) in o.attrs().iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                write!(out, "{}: ", name)?;
                render(attr, out, ancestors)?;
            }
            out.push_str(" }");
            let items = o.items();
            if !items.is_empty() {
                out.push_str(" [");
                render_seq(&items, out, ancestors)?;
                out.push(']');
            }
            let entries = o.entries();
            if !entries.is_empty() {
                out.push(' ');
                render_entries(&entries, out, ancestors)?;
            }
            Ok(())
        }
        _ => Ok(()),
    };
    ancestors.pop();
    result
}

fn render_seq(items: &[Value], out: &mut String, ancestors: &mut Vec<Identity>) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render(item, out, ancestors)?;
    }
    Ok(())
}

fn render_entries(
    entries: &[(Key, Value)],
    out: &mut String,
    ancestors: &mut Vec<Identity>,
) -> fmt::Result {
    out.push('{');
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render(&key.to_value(), out, ancestors)?;
        out.push_str(": ");
        render(value, out, ancestors)?;
    }
    out.push('}');
    Ok(())
}
