use std::collections::HashSet;

use crate::index::{Location, Symbol, SymbolKind};

use super::lexer::{self, LineIndex};

/// Lexical GML declaration extractor.
///
/// Recognises top-level `function` declarations (optionally `constructor`),
/// `#macro`, `enum` with its members, `globalvar` and the first
/// `global.name =` assignment of each name. Comments, strings and `#if 0`
/// regions are masked before scanning.
pub struct SymbolExtractor;

struct FileContext<'a> {
    file_path: &'a str,
    source: &'a str,
    masked: &'a str,
    lines: LineIndex,
    source_lines: Vec<&'a str>,
}

impl<'a> FileContext<'a> {
    fn location(&self, start: usize, end: usize) -> Location {
        let (start_line, start_column) = self.lines.position(self.source, start);
        let (end_line, end_column) = self.lines.position(self.source, end);
        Location::new(
            self.file_path,
            start,
            end,
            start_line,
            start_column,
            end_line,
            end_column,
        )
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.masked.as_bytes().get(at).copied()
    }

    fn symbol(&self, name: &str, kind: SymbolKind, start: usize, end: usize) -> Symbol {
        let location = self.location(start, end);
        let mut symbol = Symbol::new(name, kind, location);
        if kind != SymbolKind::EnumMember {
            if let Some(doc) = doc_comment(&self.source_lines, symbol.location.start_line) {
                symbol = symbol.with_doc_comment(doc);
            }
        }
        symbol
    }
}

impl SymbolExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts declarations in order of first occurrence.
    pub fn extract(&self, file_path: &str, source: &str) -> Vec<Symbol> {
        let masked = lexer::mask_disabled_regions(&lexer::mask(source));
        let ctx = FileContext {
            file_path,
            source,
            masked: &masked,
            lines: LineIndex::new(source),
            source_lines: source.split('\n').map(|l| l.trim_end_matches('\r')).collect(),
        };

        let mut symbols = Vec::new();
        let mut seen_globals: HashSet<String> = HashSet::new();
        let mut depth = 0usize;
        let mut i = 0;

        while let Some(c) = masked[i..].chars().next() {
            match c {
                '{' => {
                    depth += 1;
                    i += 1;
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    i += 1;
                }
                '#' => {
                    i = self
                        .macro_directive(&ctx, i, &mut symbols)
                        .unwrap_or(i + 1);
                }
                c if lexer::is_ident_char(c) => {
                    let end = masked[i..]
                        .char_indices()
                        .find(|&(_, ch)| !lexer::is_ident_char(ch))
                        .map(|(off, _)| i + off)
                        .unwrap_or(masked.len());
                    let word = &masked[i..end];
                    let member_access = masked[..i].trim_end().ends_with('.');

                    let next = if !lexer::is_ident_start(c) || member_access {
                        None
                    } else {
                        match word {
                            "function" if depth == 0 => self.function(&ctx, i, end, &mut symbols),
                            "enum" => self.enumeration(&ctx, i, end, &mut symbols),
                            "globalvar" => {
                                Some(self.globalvar(&ctx, end, &mut symbols, &mut seen_globals))
                            }
                            "global" => self.global_assignment(&ctx, i, end, &mut symbols, &mut seen_globals),
                            _ => None,
                        }
                    };
                    i = next.unwrap_or(end);
                }
                c => i += c.len_utf8(),
            }
        }

        symbols
    }

    /// `function name(params) [: Parent(args)] [constructor]`; returns where scanning resumes.
    fn function(
        &self,
        ctx: &FileContext,
        start: usize,
        keyword_end: usize,
        symbols: &mut Vec<Symbol>,
    ) -> Option<usize> {
        let masked = ctx.masked;
        let mut p = lexer::skip_ws(masked, keyword_end);
        // anonymous function expressions have no name
        let name = lexer::ident_at(masked, p)?;
        p = lexer::skip_ws(masked, p + name.len());
        if ctx.byte(p) != Some(b'(') {
            return None;
        }
        let close = lexer::matching_close(masked, p)?;
        let params: Vec<String> = lexer::split_top_level(&masked[p + 1..close])
            .into_iter()
            .filter_map(|(_, piece)| lexer::ident_at(piece.trim_start(), 0))
            .map(str::to_string)
            .collect();
        p = lexer::skip_ws(masked, close + 1);

        if ctx.byte(p) == Some(b':') {
            p = lexer::skip_ws(masked, p + 1);
            if let Some(parent) = lexer::ident_at(masked, p) {
                p = lexer::skip_ws(masked, p + parent.len());
                if ctx.byte(p) == Some(b'(') {
                    if let Some(parent_close) = lexer::matching_close(masked, p) {
                        p = lexer::skip_ws(masked, parent_close + 1);
                    }
                }
            }
        }

        let mut kind = SymbolKind::Function;
        if lexer::ident_at(masked, p) == Some("constructor") {
            kind = SymbolKind::Constructor;
            p = lexer::skip_ws(masked, p + "constructor".len());
        }

        let end = if ctx.byte(p) == Some(b'{') {
            lexer::matching_close(masked, p).map(|c| c + 1).unwrap_or(p)
        } else {
            p
        };

        symbols.push(ctx.symbol(name, kind, start, end).with_params(params));
        // resume at the body so its braces are counted and nested functions skipped
        Some(p)
    }

    /// `#macro [Config:]NAME value`, value continued by trailing backslashes.
    fn macro_directive(
        &self,
        ctx: &FileContext,
        start: usize,
        symbols: &mut Vec<Symbol>,
    ) -> Option<usize> {
        let masked = ctx.masked;
        let after_hash = start + 1;
        if lexer::ident_at(masked, after_hash) != Some("macro") {
            return None;
        }
        let mut p = skip_inline_ws(masked, after_hash + "macro".len());
        let first = lexer::ident_at(masked, p)?;
        p += first.len();

        let (name, config) = if ctx.byte(p) == Some(b':') {
            let name = lexer::ident_at(masked, p + 1)?;
            p += 1 + name.len();
            (name, Some(first))
        } else {
            (first, None)
        };

        let mut end = line_end(masked, p);
        while masked[..end].trim_end_matches('\r').ends_with('\\') && end < masked.len() {
            end = line_end(masked, end + 1);
        }
        let value_end = masked[..end].trim_end().len().max(p);

        let mut symbol = ctx.symbol(name, SymbolKind::Macro, start, value_end);
        if let Some(config) = config {
            symbol = symbol.with_config(config);
        }
        symbols.push(symbol);
        Some(end)
    }

    fn enumeration(
        &self,
        ctx: &FileContext,
        start: usize,
        keyword_end: usize,
        symbols: &mut Vec<Symbol>,
    ) -> Option<usize> {
        let masked = ctx.masked;
        let mut p = lexer::skip_ws(masked, keyword_end);
        let name = lexer::ident_at(masked, p)?;
        p = lexer::skip_ws(masked, p + name.len());
        if ctx.byte(p) != Some(b'{') {
            return None;
        }
        let close = lexer::matching_close(masked, p)?;

        symbols.push(ctx.symbol(name, SymbolKind::Enum, start, close + 1));

        let body_start = p + 1;
        for (offset, piece) in lexer::split_top_level(&masked[body_start..close]) {
            let leading = piece.len() - piece.trim_start().len();
            let member_start = body_start + offset + leading;
            if let Some(member) = lexer::ident_at(masked, member_start) {
                let member_end = body_start + offset + piece.trim_end().len();
                symbols.push(
                    ctx.symbol(member, SymbolKind::EnumMember, member_start, member_end)
                        .with_parent(name),
                );
            }
        }

        Some(close + 1)
    }

    fn globalvar(
        &self,
        ctx: &FileContext,
        keyword_end: usize,
        symbols: &mut Vec<Symbol>,
        seen: &mut HashSet<String>,
    ) -> usize {
        let masked = ctx.masked;
        let mut p = lexer::skip_ws(masked, keyword_end);
        while let Some(name) = lexer::ident_at(masked, p) {
            if seen.insert(name.to_string()) {
                symbols.push(ctx.symbol(name, SymbolKind::GlobalVariable, p, p + name.len()));
            }
            p = lexer::skip_ws(masked, p + name.len());
            if ctx.byte(p) != Some(b',') {
                break;
            }
            p = lexer::skip_ws(masked, p + 1);
        }
        p
    }

    /// `global.name = value` (plain assignment only, not `==` or compound operators).
    fn global_assignment(
        &self,
        ctx: &FileContext,
        start: usize,
        keyword_end: usize,
        symbols: &mut Vec<Symbol>,
        seen: &mut HashSet<String>,
    ) -> Option<usize> {
        let masked = ctx.masked;
        if ctx.byte(keyword_end) != Some(b'.') {
            return None;
        }
        let name_start = keyword_end + 1;
        let name = lexer::ident_at(masked, name_start)?;
        let name_end = name_start + name.len();
        let q = lexer::skip_ws(masked, name_end);
        if ctx.byte(q) == Some(b'=') && ctx.byte(q + 1) != Some(b'=') && seen.insert(name.to_string()) {
            symbols.push(ctx.symbol(name, SymbolKind::GlobalVariable, start, name_end));
        }
        Some(name_end)
    }
}

impl Default for SymbolExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_inline_ws(text: &str, at: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = at;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map(|p| from + p)
        .unwrap_or(text.len())
}

/// Doc text directly above `decl_line`: contiguous `///` lines or one `/** */` block.
fn doc_comment(lines: &[&str], decl_line: u32) -> Option<String> {
    let decl_idx = (decl_line as usize).checked_sub(1)?;
    let above = decl_idx.checked_sub(1)?;
    let prev = lines.get(above)?.trim();

    let text = if prev.starts_with("///") {
        let mut collected = Vec::new();
        let mut j = decl_idx;
        while j > 0 {
            let Some(rest) = lines[j - 1].trim().strip_prefix("///") else {
                break;
            };
            collected.push(rest.strip_prefix(' ').unwrap_or(rest).trim_end());
            j -= 1;
        }
        collected.reverse();
        collected.join("\n")
    } else if prev.ends_with("*/") {
        let mut j = above;
        loop {
            if lines[j].contains("/**") {
                break;
            }
            if lines[j].contains("/*") || j == 0 {
                return None;
            }
            j -= 1;
        }
        let block = lines[j..=above].join("\n");
        let start = block.find("/**")? + 3;
        let end = block.rfind("*/")?;
        if end < start {
            return None;
        }
        block[start..end]
            .lines()
            .map(|l| {
                let l = l.trim();
                l.strip_prefix('*').unwrap_or(l).trim()
            })
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        return None;
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
