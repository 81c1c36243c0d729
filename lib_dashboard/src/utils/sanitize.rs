//! # Sanitizer
//!
//! Every string that originates from the collaborator API (usernames, IPs,
//! city and country names, alert descriptions, alert types...) is untrusted.
//! It reaches a rendering surface only as a [`SafeText`], and the only way to
//! build one is through [`sanitize`] or [`sanitize_opt`].

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A string that has been HTML-escaped and can be concatenated into markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafeText(String);

impl SafeText {
    /// Borrow the escaped text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the escaped text is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `self`, or the given trusted literal when `self` is empty.
    ///
    /// The fallback is a compile-time constant, so it needs no escaping.
    pub fn or_placeholder(self, placeholder: &'static str) -> SafeText {
        if self.0.is_empty() {
            SafeText(placeholder.to_string())
        } else {
            self
        }
    }

    /// Replaces underscores with spaces. Escaped output never contains `_`
    /// as part of an entity, so this cannot break an escape sequence.
    pub fn humanize(&self) -> SafeText {
        SafeText(self.0.replace('_', " "))
    }

    /// Wraps a trusted literal (labels, placeholders, numbers we formatted).
    pub(crate) fn trusted(text: impl Into<String>) -> SafeText {
        SafeText(text.into())
    }
}

impl fmt::Display for SafeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for SafeText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Escapes the five XML-significant characters of any displayable value.
pub fn sanitize<T: fmt::Display + ?Sized>(value: &T) -> SafeText {
    SafeText(escape_html(&value.to_string()))
}

/// Like [`sanitize`], mapping `None` to the empty string.
pub fn sanitize_opt<T: fmt::Display>(value: Option<&T>) -> SafeText {
    match value {
        Some(v) => sanitize(v),
        None => SafeText::default(),
    }
}

/// Sanitizes a raw JSON value: `null` is empty, strings are escaped without
/// their quotes, every other scalar or structure is stringified first.
pub fn sanitize_json(value: &Value) -> SafeText {
    match value {
        Value::Null => SafeText::default(),
        Value::String(s) => sanitize(s.as_str()),
        other => sanitize(other),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
