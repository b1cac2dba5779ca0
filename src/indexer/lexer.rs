//! Lexical helpers shared by the extractor, the deep graph scan and the
//! reference resolver.
//!
//! The central operation is [`mask`]: comments and string literal contents
//! are overwritten with spaces so that later passes can pattern-match code
//! without tripping over text. Byte offsets and line breaks are preserved,
//! so positions found in the masked text are valid in the original.

/// Returns `source` with comments and string contents blanked out.
pub fn mask(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'/' if i + 1 < len && bytes[i + 1] == b'/' => {
                let end = line_end(bytes, i);
                blank(&mut out, i, end);
                i = end;
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                let end = find_seq(bytes, i + 2, b"*/").map(|e| e + 2).unwrap_or(len);
                blank(&mut out, i, end);
                i = end;
            }
            b'@' if i + 1 < len && (bytes[i + 1] == b'"' || bytes[i + 1] == b'\'') => {
                // verbatim strings: no escapes, may span lines
                let quote = bytes[i + 1];
                let end = bytes[i + 2..]
                    .iter()
                    .position(|&b| b == quote)
                    .map(|p| i + 2 + p)
                    .unwrap_or(len);
                blank(&mut out, i + 2, end);
                i = (end + 1).min(len);
            }
            b'$' if i + 1 < len && bytes[i + 1] == b'"' => {
                let end = escaped_string_end(bytes, i + 2, b'"');
                blank(&mut out, i + 2, end);
                i = (end + 1).min(len);
            }
            quote @ (b'"' | b'\'') => {
                let end = escaped_string_end(bytes, i + 1, quote);
                blank(&mut out, i + 1, end);
                i = (end + 1).min(len);
            }
            _ => i += 1,
        }
    }

    // only whole ASCII-delimited regions were blanked, so this stays valid UTF-8
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Blanks `#if 0` / `#if false` regions (up to the matching `#else` or `#endif`).
///
/// Other conditions are unknown statically, so both of their branches stay visible.
pub fn mask_disabled_regions(masked: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum Cond {
        True,
        False,
        Unknown,
    }

    let mut out = String::with_capacity(masked.len());
    let mut stack: Vec<Cond> = Vec::new();

    for line in masked.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let directive = trimmed.strip_prefix('#').map(|rest| {
            let word_end = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            (&rest[..word_end], rest[word_end..].trim())
        });

        let excluded_before = stack.contains(&Cond::False);
        let mut is_directive = true;
        match directive {
            Some(("if", cond)) => stack.push(match cond {
                "0" | "false" => Cond::False,
                "1" | "true" => Cond::True,
                _ => Cond::Unknown,
            }),
            Some(("else", _)) => {
                if let Some(top) = stack.last_mut() {
                    *top = match *top {
                        Cond::True => Cond::False,
                        Cond::False => Cond::True,
                        Cond::Unknown => Cond::Unknown,
                    };
                }
            }
            Some(("endif", _)) => {
                stack.pop();
            }
            _ => is_directive = false,
        }

        if is_directive || excluded_before {
            let body = line.trim_end_matches(['\n', '\r']);
            out.extend(std::iter::repeat(' ').take(body.len()));
            out.push_str(&line[body.len()..]);
        } else {
            out.push_str(line);
        }
    }
    out
}

fn blank(out: &mut [u8], start: usize, end: usize) {
    let end = end.min(out.len());
    for b in &mut out[start..end] {
        if *b != b'\n' && *b != b'\r' {
            *b = b' ';
        }
    }
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| from + p)
        .unwrap_or(bytes.len())
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Index of the closing quote (or the line break / end of input for an unterminated string).
fn escaped_string_end(bytes: &[u8], from: usize, quote: u8) -> usize {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

pub fn is_ident_start(c: char) -> bool {
    c == '_' || (c.is_alphanumeric() && !c.is_ascii_digit())
}

pub fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Maximal identifier runs of `text` as `(byte offset, identifier)`.
///
/// Runs starting with a digit are numbers and are skipped whole.
pub fn identifiers(text: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    let mut chars = text.char_indices().peekable();
    std::iter::from_fn(move || {
        while let Some((start, c)) = chars.next() {
            if !is_ident_char(c) {
                continue;
            }
            let mut end = start + c.len_utf8();
            while let Some(&(idx, next)) = chars.peek() {
                if !is_ident_char(next) {
                    break;
                }
                end = idx + next.len_utf8();
                chars.next();
            }
            if is_ident_start(c) {
                return Some((start, &text[start..end]));
            }
        }
        None
    })
}

/// Reads the identifier starting exactly at `at`, if any.
pub fn ident_at(text: &str, at: usize) -> Option<&str> {
    let rest = text.get(at..)?;
    let first = rest.chars().next()?;
    if !is_ident_start(first) {
        return None;
    }
    let end = rest
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Offset of the first non-whitespace character at or after `at`.
pub fn skip_ws(text: &str, at: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = at;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Offset of the bracket closing the one at `open`, honouring nesting of the same kind.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open_byte = *bytes.get(open)?;
    let close_byte = match open_byte {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        _ => return None,
    };
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if b == open_byte {
            depth += 1;
        } else if b == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Splits `text` on commas that are not nested inside brackets.
///
/// Yields `(byte offset within text, piece)`.
pub fn split_top_level(text: &str) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                parts.push((start, &text[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push((start, &text[start..]));
    parts
}

/// Maps byte offsets to 1-based line and character column.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// `(line, column)` of `offset` in `text` (the text this index was built from).
    pub fn position(&self, text: &str, offset: usize) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        let column = text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        (line_idx as u32 + 1, column as u32 + 1)
    }

    pub fn line_start(&self, line: u32) -> Option<usize> {
        self.line_starts.get((line as usize).checked_sub(1)?).copied()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
