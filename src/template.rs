//! Named-placeholder substitution for the scaffolding templates.
//!
//! Templates reference values as `$name`, where `name` is the longest run of
//! `[A-Za-z0-9_]` starting with a letter or underscore. Every placeholder
//! must have a value: an unknown name is an error, never left in the output.
//!
//! ```text
//! publish_date = "$date"     →  publish_date = "2026-10-19T09:30:00Z"
//! price = "$$5"              →  price = "$5"
//! ratio = "50 $ off"         →  ratio = "50 $ off"   (no identifier, literal)
//! ```
//!
//! Substitution is a single left-to-right pass; inserted values are never
//! rescanned, so a value containing `$x` is emitted verbatim.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '${name}' on line {line}")]
    UnknownPlaceholder { name: String, line: usize },
}

/// Placeholder values keyed by name (without the `$`).
pub type Values<'a> = BTreeMap<&'a str, String>;

pub fn substitute(template: &str, values: &Values<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut line = 1;
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        let (before, after) = rest.split_at(pos);
        line += before.matches('\n').count();
        out.push_str(before);

        let tail = &after[1..];
        if let Some(stripped) = tail.strip_prefix('$') {
            out.push('$');
            rest = stripped;
            continue;
        }

        let ident_len = identifier_len(tail);
        if ident_len == 0 {
            out.push('$');
            rest = tail;
            continue;
        }

        let name = &tail[..ident_len];
        match values.get(name) {
            Some(value) => out.push_str(value),
            None => {
                return Err(TemplateError::UnknownPlaceholder {
                    name: name.to_string(),
                    line,
                });
            }
        }
        rest = &tail[ident_len..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Byte length of the identifier at the start of `s`, 0 if there is none.
fn identifier_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
