//! Terminal rendering shared by the CLI commands.
//!
//! JSON reports are printed with colored keys and scalars; table cells go
//! through the small formatters below.

use std::fmt::Write;

use colored::Colorize;
use serde_json::Value;

/// Indentation of one nesting level in printed JSON.
const INDENT: &str = "  ";

/// Prints a JSON value, pretty and colored, to stdout.
pub fn print_json(value: &Value) { println!("{}", render_json(value)); }

/// Renders a JSON value the way `serde_json::to_string_pretty` lays it out,
/// with keys in cyan, strings in green, numbers in yellow and literals in
/// magenta.
#[must_use]
pub fn render_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, 0, &mut out);
    out
}

fn write_value(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::Null => out.push_str(&"null".magenta().to_string()),
        Value::Bool(flag) => out.push_str(&flag.to_string().magenta().to_string()),
        Value::Number(number) => out.push_str(&number.to_string().yellow().to_string()),
        Value::String(text) => out.push_str(&quoted(text).green().to_string()),
        Value::Array(items) => {
            write_container(('[', ']'), items.iter().map(|item| (None, item)), depth, out);
        }
        Value::Object(map) => {
            write_container(
                ('{', '}'),
                map.iter().map(|(key, item)| (Some(key.as_str()), item)),
                depth,
                out,
            );
        }
    }
}

fn write_container<'a>(
    (open, close): (char, char),
    entries: impl ExactSizeIterator<Item = (Option<&'a str>, &'a Value)>,
    depth: usize,
    out: &mut String,
) {
    if entries.len() == 0 {
        let _ = write!(out, "{}", format!("{open}{close}").bold());
        return;
    }

    let _ = write!(out, "{}", open.to_string().bold());
    let last = entries.len() - 1;
    for (index, (key, item)) in entries.enumerate() {
        out.push('\n');
        out.push_str(&INDENT.repeat(depth + 1));
        if let Some(key) = key {
            let _ = write!(out, "{}: ", quoted(key).cyan());
        }
        write_value(item, depth + 1, out);
        if index != last {
            out.push(',');
        }
    }
    out.push('\n');
    out.push_str(&INDENT.repeat(depth));
    let _ = write!(out, "{}", close.to_string().bold());
}

/// JSON string literal for `text`, escapes included.
fn quoted(text: &str) -> String { Value::String(text.to_string()).to_string() }

/// Shortens `text` to at most `width` characters, marking the cut with `…`.
#[must_use]
pub fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Table cell telling whether a display's physical size came from the system
/// or was assumed.
#[must_use]
pub fn size_source(detected: bool) -> String {
    if detected {
        "detected".green().to_string()
    } else {
        "assumed".yellow().to_string()
    }
}
