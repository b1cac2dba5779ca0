//! Loose JSON reading for GameMaker files.
//!
//! The IDE writes `.yy`/`.yyp` files with trailing commas before closing
//! brackets, which strict JSON parsers reject.

use serde_json::Value;

/// Parses GameMaker-flavoured JSON: strict first, then with trailing commas removed.
pub fn parse_loose(text: &str) -> serde_json::Result<Value> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(strict_err) => {
            let cleaned = strip_trailing_commas(text);
            if cleaned.len() == text.len() {
                return Err(strict_err);
            }
            serde_json::from_str(&cleaned)
        }
    }
}

/// Removes commas that directly precede `}` or `]`, ignoring string contents.
pub fn strip_trailing_commas(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match b {
            b'"' => {
                in_string = true;
                out.push(b);
            }
            b',' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && (bytes[j] == b'}' || bytes[j] == b']') {
                    // dropped
                } else {
                    out.push(b);
                }
            }
            _ => out.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
