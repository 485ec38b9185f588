//! The embedded evaluator that turns expanded template text into a render function.
//!
//! Supported tags:
//! - `<%= path %>` outputs the value, HTML-escaped
//! - `<%- path %>` outputs the value unescaped
//! - `<%# ... %>` is a comment
//! - `<%%` outputs a literal `<%`
//! - a `-%>` close swallows the newline that follows it
//!
//! `path` is a dotted or indexed lookup into the render data, for example
//! `user.name`, `items[0]` or `locals`. Anything else is rejected at compile
//! time.

use crate::errors::TemplateError;
use serde_json::Value;
use std::path::{Path, PathBuf};

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

/// One step of a lookup path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// A parsed lookup expression.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Expr {
    source: String,
    root: String,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Escaped(Expr),
    Raw(Expr),
}

/// A compiled template, ready to render data.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    source_path: PathBuf,
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    /// Returns the template this was compiled from.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Renders `data`.
    ///
    /// # Errors
    ///
    /// Returns a `RenderFailed` error when an expression refers to an undefined
    /// variable or walks through a value that has no properties.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Escaped(expr) => {
                    let value = self.lookup(expr, data)?;
                    out.push_str(&escape_html(&stringify(value)));
                }
                Segment::Raw(expr) => {
                    let value = self.lookup(expr, data)?;
                    out.push_str(&stringify(value));
                }
            }
        }
        Ok(out)
    }

    fn lookup<'a>(&self, expr: &Expr, data: &'a Value) -> Result<Option<&'a Value>, TemplateError> {
        let mut current = if expr.root == "locals" {
            Some(data)
        } else {
            match data.get(&expr.root) {
                Some(value) => Some(value),
                None => {
                    return Err(TemplateError::render_failed(
                        &self.source_path,
                        format!("{} is not defined", expr.root),
                    ))
                }
            }
        };

        for step in &expr.steps {
            let container = match current {
                Some(value @ (Value::Object(_) | Value::Array(_))) => value,
                Some(other) => {
                    return Err(TemplateError::render_failed(
                        &self.source_path,
                        format!("cannot read {} of {} in '{}'", describe(step), kind_of(other), expr.source),
                    ))
                }
                None => {
                    return Err(TemplateError::render_failed(
                        &self.source_path,
                        format!("cannot read {} of undefined in '{}'", describe(step), expr.source),
                    ))
                }
            };
            current = match step {
                Step::Key(key) => container.get(key.as_str()),
                Step::Index(index) => container.get(*index),
            };
        }

        Ok(current)
    }
}

/// Compiles expanded template text.
///
/// # Errors
///
/// Returns a `CompileFailed` error for unclosed tags, scriptlet tags and
/// expressions outside the supported lookup syntax.
pub fn compile(source_path: &Path, text: &str) -> Result<CompiledTemplate, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        literal.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        if let Some(after) = after_open.strip_prefix('%') {
            literal.push_str(OPEN);
            rest = after;
            continue;
        }

        let Some(end) = after_open.find(CLOSE) else {
            return Err(TemplateError::compile_failed(
                source_path,
                format!("could not find matching close tag for \"{OPEN}\""),
            ));
        };
        let mut body = &after_open[..end];
        rest = &after_open[end + CLOSE.len()..];

        let trim_newline = body.ends_with('-') && body.len() > 1;
        if trim_newline {
            body = &body[..body.len() - 1];
            rest = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest);
        }

        let mut chars = body.chars();
        let segment = match chars.next() {
            Some('#') => None,
            Some('=') => Some(Segment::Escaped(parse_expr(source_path, chars.as_str())?)),
            Some('-') => Some(Segment::Raw(parse_expr(source_path, chars.as_str())?)),
            _ => {
                return Err(TemplateError::compile_failed(
                    source_path,
                    format!("unsupported tag \"{OPEN}{body}{CLOSE}\""),
                ))
            }
        };

        if let Some(segment) = segment {
            if !literal.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut literal)));
            }
            segments.push(segment);
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Text(literal));
    }

    Ok(CompiledTemplate {
        source_path: source_path.to_path_buf(),
        segments,
    })
}

fn parse_expr(source_path: &Path, raw: &str) -> Result<Expr, TemplateError> {
    let source = raw.trim();
    let invalid = || {
        TemplateError::compile_failed(source_path, format!("unsupported expression '{source}'"))
    };

    let mut chars = source.char_indices().peekable();
    let mut root = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if is_ident_char(c, root.is_empty()) {
            root.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if root.is_empty() {
        return Err(invalid());
    }

    let mut steps = Vec::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '.' => {
                let mut key = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if is_ident_char(c, key.is_empty()) {
                        key.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if key.is_empty() {
                    return Err(invalid());
                }
                steps.push(Step::Key(key));
            }
            '[' => {
                let mut inner = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(invalid());
                }
                steps.push(parse_bracket(inner.trim()).ok_or_else(invalid)?);
            }
            _ => return Err(invalid()),
        }
    }

    Ok(Expr {
        source: source.to_string(),
        root,
        steps,
    })
}

fn parse_bracket(inner: &str) -> Option<Step> {
    if let Ok(index) = inner.parse::<usize>() {
        return Some(Step::Index(index));
    }
    let quoted = inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;
    Some(Step::Key(quoted.to_string()))
}

fn is_ident_char(c: char, first: bool) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphabetic() || (!first && c.is_ascii_digit())
}

fn describe(step: &Step) -> String {
    match step {
        Step::Key(key) => format!("property '{key}'"),
        Step::Index(index) => format!("index {index}"),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Formats a value for output. Missing and null values print nothing.
fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| stringify(Some(item)))
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

/// Escapes the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
