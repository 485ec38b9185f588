//! Include directive scanning, argument parsing and splicing.

use crate::errors::TemplateError;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

/// `<%- include('path' [, {arg: value}]) %>`
static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<%-\s*include\s*\(\s*(?:'([^']*)'|"([^"]*)")\s*(?:,\s*(\{.*?\}))?\s*\)\s*(-?)%>"#,
    )
    .unwrap_or_else(|err| panic!("invalid include pattern: {err}"))
});

/// `<%= name %>` with a bare identifier.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<%=\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*%>")
        .unwrap_or_else(|err| panic!("invalid placeholder pattern: {err}"))
});

/// One include directive found in a template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IncludeDirective {
    /// Byte range of the whole directive in the including text.
    pub range: Range<usize>,
    /// The path as written.
    pub reference: String,
    /// Arguments to substitute into the included fragment.
    pub args: Option<Map<String, Value>>,
}

/// Finds every include directive in `text`, in order.
pub(crate) fn scan(path: &Path, text: &str) -> Result<Vec<IncludeDirective>, TemplateError> {
    INCLUDE_DIRECTIVE
        .captures_iter(text)
        .map(|caps| {
            let mut whole = caps.get(0).map_or(0..0, |m| m.range());
            if caps.get(4).is_some_and(|m| !m.is_empty()) {
                let rest = &text[whole.end..];
                if rest.starts_with("\r\n") {
                    whole.end += 2;
                } else if rest.starts_with('\n') {
                    whole.end += 1;
                }
            }
            let reference = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let args = caps
                .get(3)
                .map(|m| parse_args(path, m.as_str()))
                .transpose()?;
            Ok(IncludeDirective {
                range: whole,
                reference,
                args,
            })
        })
        .collect()
}

/// Parses a single-quoted, bare-keyed object literal into JSON.
pub(crate) fn parse_args(path: &Path, literal: &str) -> Result<Map<String, Value>, TemplateError> {
    let json = literal_to_json(literal).map_err(|message| {
        TemplateError::compile_failed(path, format!("invalid include arguments {literal}: {message}"))
    })?;
    serde_json::from_str(&json).map_err(|err| {
        TemplateError::compile_failed(path, format!("invalid include arguments {literal}: {err}"))
    })
}

/// Rewrites an object literal as JSON text.
///
/// Strings in either quote style become JSON strings and bare identifier
/// keys get quoted. Everything outside strings is copied through for
/// `serde_json` to validate.
fn literal_to_json(literal: &str) -> Result<String, String> {
    let mut out = String::with_capacity(literal.len() + 8);
    let mut chars = literal.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == c => break,
                        Some('\\') => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some('r') => value.push('\r'),
                            Some(escaped) => value.push(escaped),
                            None => return Err("unterminated string".to_string()),
                        },
                        Some(ch) => value.push(ch),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                out.push_str(&Value::String(value).to_string());
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' || next == '$' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                while chars.peek().is_some_and(|ch| ch.is_whitespace()) {
                    chars.next();
                }
                if chars.peek() == Some(&':') {
                    out.push_str(&Value::String(ident).to_string());
                } else {
                    // true, false, null and anything serde_json should reject
                    out.push_str(&ident);
                    out.push(' ');
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Replaces `<%= name %>` placeholders that have a matching argument.
///
/// String arguments are inserted as is, anything else as its JSON text.
pub(crate) fn substitute(fragment: &str, args: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(fragment, |caps: &Captures<'_>| {
            match args.get(&caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Replaces each directive with its expansion in one pass.
pub(crate) fn splice(text: &str, directives: &[IncludeDirective], expansions: &[String]) -> String {
    let mut out = String::with_capacity(text.len() + expansions.iter().map(String::len).sum::<usize>());
    let mut cursor = 0;
    for (directive, expansion) in directives.iter().zip(expansions) {
        out.push_str(&text[cursor..directive.range.start]);
        out.push_str(expansion);
        cursor = directive.range.end;
    }
    out.push_str(&text[cursor..]);
    out
}
