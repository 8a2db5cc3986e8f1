//! Rendering of values the front end computed at compile time.

use crate::namer::{ArgStyle, Namer};
use unveil_tree::{ConstValue, CppType, StaticAssertDecl};

/// Spell a constant value as a C++ literal or initializer.
pub fn render_value(value: &ConstValue, namer: &Namer, style: ArgStyle) -> String {
    match value {
        ConstValue::Int(v) => v.to_string(),
        ConstValue::UInt(v) => v.to_string(),
        ConstValue::Bool(b) => b.to_string(),
        ConstValue::Char(c) => format!("'{}'", escape_char(*c, '\'', None)),
        ConstValue::Float(f) => render_float(*f),
        ConstValue::NullPtr => "nullptr".to_string(),
        ConstValue::Str(s) => format!("\"{}\"", escape_str(s)),
        ConstValue::Enumerator(name) => name.clone(),
        ConstValue::Aggregate { ty, fields } => format!(
            "{}{{{}}}",
            namer.print_type_styled(ty, style),
            render_list(fields, namer, style)
        ),
        ConstValue::Array(items) => format!("{{{}}}", render_list(items, namer, style)),
    }
}

fn render_list(values: &[ConstValue], namer: &Namer, style: ArgStyle) -> String {
    values
        .iter()
        .map(|v| render_value(v, namer, style))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A literal of type `ty`, carrying the suffix that keeps its type.
pub fn render_literal(value: &ConstValue, ty: &CppType, namer: &Namer) -> String {
    let text = render_value(value, namer, ArgStyle::Display);
    match value {
        // The most negative value has no literal of its own type.
        ConstValue::Int(v) if is_type_minimum(*v, ty) => {
            format!("({}{} - 1)", v + 1, integer_suffix(ty))
        }
        ConstValue::Int(_) | ConstValue::UInt(_) => format!("{}{}", text, integer_suffix(ty)),
        ConstValue::Float(f) if f.is_finite() && *ty.decayed() == CppType::Float => {
            format!("{}f", text)
        }
        ConstValue::Float(f) if f.is_finite() && *ty.decayed() == CppType::LongDouble => {
            format!("{}L", text)
        }
        _ => text,
    }
}

pub fn integer_suffix(ty: &CppType) -> &'static str {
    match ty.decayed() {
        CppType::Int { signed: false } => "U",
        CppType::Long { signed: true } => "L",
        CppType::Long { signed: false } => "UL",
        CppType::LongLong { signed: true } => "LL",
        CppType::LongLong { signed: false } => "ULL",
        _ => "",
    }
}

fn is_type_minimum(v: i64, ty: &CppType) -> bool {
    match ty.decayed() {
        CppType::Int { signed: true } => v == i64::from(i32::MIN),
        CppType::Long { signed: true } | CppType::LongLong { signed: true } => v == i64::MIN,
        _ => false,
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "__builtin_nan(\"\")".to_string()
    } else if f.is_infinite() {
        if f > 0.0 {
            "__builtin_inf()".to_string()
        } else {
            "-__builtin_inf()".to_string()
        }
    } else {
        format!("{:?}", f)
    }
}

fn escape_str(s: &str) -> String {
    let mut chars = s.chars().peekable();
    let mut escaped = String::with_capacity(s.len());
    while let Some(c) = chars.next() {
        escaped.push_str(&escape_char(c, '"', chars.peek().copied()));
    }
    escaped
}

/// Escape `c` so that it cannot run together with `next`: octal escapes
/// stop after three digits and `\u` after four.
fn escape_char(c: char, quote: char, next: Option<char>) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        '\0' if !next.is_some_and(|n| n.is_digit(8)) => "\\0".to_string(),
        '\\' => "\\\\".to_string(),
        c if c == quote => format!("\\{}", c),
        c if c.is_control() && c.is_ascii() => format!("\\{:03o}", c as u32),
        c if c.is_control() => format!("\\u{:04x}", c as u32),
        c => c.to_string(),
    }
}

/// Keep text safe inside a `/* */` comment.
pub fn comment_safe(text: &str) -> String {
    text.replace("*/", "* /").replace("/*", "/ *")
}

/// `value /* original */`, or just the value when both read the same.
pub fn annotate(value: &str, original: &str) -> String {
    if value == original {
        value.to_string()
    } else {
        format!("{} /* {} */", value, comment_safe(original))
    }
}

pub fn static_assert_comment(assertion: &StaticAssertDecl) -> String {
    let verdict = if assertion.passed { "PASSED" } else { "FAILED" };
    let statement = match &assertion.message {
        Some(message) => {
            format!("static_assert({}, \"{}\");", assertion.condition, escape_str(message))
        }
        None => format!("static_assert({});", assertion.condition),
    };
    format!("/* {}: {} */", verdict, comment_safe(&statement))
}

/// Whether `if consteval` (or `if !consteval` when `negated`) takes its
/// first branch in the given evaluation context.
pub fn takes_then_branch(negated: bool, compile_time: bool) -> bool {
    compile_time != negated
}

pub fn evaluation_context(compile_time: bool) -> &'static str {
    if compile_time {
        "compile-time"
    } else {
        "run-time"
    }
}
