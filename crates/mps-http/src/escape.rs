// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Output-side string escaping for the two response families §4.4 requires:
//! XML/RSS (entity escaping) and the object-notation family — JSON, Ruby,
//! Python — (backslash-escaping of quotes and control characters).

/// Escapes the five XML-significant characters for inclusion in element
/// text or attribute values.
pub fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Backslash-escapes `"`, `\`, and control characters, the shared rule for
/// the JSON/Ruby object-notation encoders.
pub fn object_escape(input: &str) -> String {
    escape_for_quote(input, '"')
}

/// Same backslash-escaping rule, parameterized on the literal's quote
/// character so Python's single-quoted string literals escape `'` instead
/// of `"`.
pub fn escape_for_quote(input: &str, quote: char) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_escape_covers_all_five_entities() {
        assert_eq!(xml_escape("<a>&'\""), "&lt;a&gt;&amp;&apos;&quot;");
    }

    #[test]
    fn object_escape_handles_quotes_and_control_chars() {
        assert_eq!(object_escape("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
