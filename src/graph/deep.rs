//! Code-level edges: one lexical pass per script file over a fixed catalogue.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info};

use super::catalogue::{self, ArgSlot, BUILTIN_IDENTIFIERS};
use super::shallow::add_structural_edges;
use super::{Evidence, Graph, GraphBuilder, GraphMode, Relation};
use crate::error::{IndexerError, Result};
use crate::index::{IndexOptions, SymbolIndex, SymbolKind};
use crate::indexer::{lexer, worker_pool, LineIndex, SymbolExtractor};
use crate::project::{AssetKind, Project};

struct ScriptText {
    file: String,
    owner: String,
    masked: String,
    /// Declarations, only when no index was supplied
    declared: Vec<(String, SymbolKind)>,
}

enum Finding {
    Edge {
        to: String,
        relation: Relation,
        construct: String,
        line: u32,
    },
    Dangling {
        target: String,
        relation: Relation,
        construct: String,
        line: u32,
    },
}

/// Names the scan needs to tell assets, functions and variables apart.
struct ProjectNames {
    /// Function or constructor name -> script asset declaring it (first in file order)
    functions: HashMap<String, String>,
    /// Every declared symbol name
    symbols: HashSet<String>,
}

/// Shallow edges plus code edges from every asset-owned script.
///
/// `index` supplies declarations for cross-script `calls` edges; without it
/// the scripts are extracted on the fly.
pub fn build_deep(project: &Project, index: Option<&SymbolIndex>, opts: &IndexOptions) -> Result<Graph> {
    let mut builder = GraphBuilder::new();
    add_structural_edges(project, &mut builder);

    let files: Vec<(String, String)> = project
        .script_files()
        .into_iter()
        .filter_map(|file| {
            let owner = project.script_owner(&file)?.name.clone();
            Some((file, owner))
        })
        .collect();
    info!("Deep scan over {} script files", files.len());

    let pool = worker_pool(opts.workers)?;
    let cancel = &opts.cancel;
    let extractor = SymbolExtractor::new();

    let texts: Vec<Result<Option<ScriptText>>> = pool.install(|| {
        files
            .par_iter()
            .map(|(file, owner)| {
                if cancel.is_cancelled() {
                    return Err(IndexerError::Cancelled);
                }
                let Ok(text) = project.read_file(file) else {
                    debug!("Deep scan skips unreadable {}", file);
                    return Ok(None);
                };
                let declared = match index {
                    Some(_) => Vec::new(),
                    None => extractor
                        .extract(file, &text)
                        .into_iter()
                        .map(|s| (s.name, s.kind))
                        .collect(),
                };
                Ok(Some(ScriptText {
                    file: file.clone(),
                    owner: owner.clone(),
                    masked: lexer::mask_disabled_regions(&lexer::mask(&text)),
                    declared,
                }))
            })
            .collect()
    });
    let mut scripts = Vec::with_capacity(texts.len());
    for text in texts {
        if let Some(script) = text? {
            scripts.push(script);
        }
    }

    let names = collect_names(project, index, &scripts);

    let findings: Vec<Result<Vec<Finding>>> = pool.install(|| {
        scripts
            .par_iter()
            .map(|script| {
                if cancel.is_cancelled() {
                    return Err(IndexerError::Cancelled);
                }
                Ok(scan_script(project, &names, script))
            })
            .collect()
    });

    for (script, found) in scripts.iter().zip(findings) {
        for finding in found? {
            match finding {
                Finding::Edge {
                    to,
                    relation,
                    construct,
                    line,
                } => builder.edge(
                    &script.owner,
                    &to,
                    relation,
                    Evidence::code(construct, script.file.clone(), line),
                ),
                Finding::Dangling {
                    target,
                    relation,
                    construct,
                    line,
                } => builder.dangling(
                    &script.owner,
                    &target,
                    relation,
                    Evidence::code(construct, script.file.clone(), line),
                ),
            }
        }
    }

    Ok(builder.finish(GraphMode::Deep, project))
}

fn collect_names(project: &Project, index: Option<&SymbolIndex>, scripts: &[ScriptText]) -> ProjectNames {
    let mut functions = HashMap::new();
    let mut symbols = HashSet::new();

    let mut record = |file: &str, name: &str, kind: SymbolKind| {
        symbols.insert(name.to_string());
        if matches!(kind, SymbolKind::Function | SymbolKind::Constructor) {
            if let Some(owner) = project.script_owner(file).filter(|a| a.kind == AssetKind::Script) {
                functions
                    .entry(name.to_string())
                    .or_insert_with(|| owner.name.clone());
            }
        }
    };

    match index {
        Some(index) => {
            // file entries iterate in path order, so the first declaration wins deterministically
            for (file, entry) in index.file_entries() {
                for symbol in &entry.symbols {
                    record(file, &symbol.name, symbol.kind);
                }
            }
        }
        None => {
            for script in scripts {
                for (name, kind) in &script.declared {
                    record(&script.file, name, *kind);
                }
            }
        }
    }

    ProjectNames { functions, symbols }
}

fn scan_script(project: &Project, names: &ProjectNames, script: &ScriptText) -> Vec<Finding> {
    let masked = script.masked.as_str();
    let bytes = masked.as_bytes();
    let lines = LineIndex::new(masked);
    let locals = local_names(masked);
    let mut found = Vec::new();

    let resolve = |found: &mut Vec<Finding>,
                   name: &str,
                   relation: Relation,
                   kinds: &[AssetKind],
                   canonical: bool,
                   construct: &str,
                   line: u32| {
        match project.asset(name) {
            Some(asset) if kinds.contains(&asset.kind) => found.push(Finding::Edge {
                to: asset.name.clone(),
                relation,
                construct: construct.to_string(),
                line,
            }),
            Some(_) => {}
            None => {
                if relation == Relation::Calls {
                    if let Some(owner) = names.functions.get(name) {
                        found.push(Finding::Edge {
                            to: owner.clone(),
                            relation,
                            construct: construct.to_string(),
                            line,
                        });
                        return;
                    }
                }
                let is_variable = locals.contains(name)
                    || BUILTIN_IDENTIFIERS.contains(name)
                    || names.symbols.contains(name);
                if canonical && !is_variable {
                    found.push(Finding::Dangling {
                        target: name.to_string(),
                        relation,
                        construct: construct.to_string(),
                        line,
                    });
                }
            }
        }
    };

    for (offset, word) in lexer::identifiers(masked) {
        if is_member_access(masked, offset) || follows_keyword(masked, offset, "function") {
            continue;
        }
        let line = lines.position(masked, offset).0;
        let next = lexer::skip_ws(masked, offset + word.len());

        if word == "with" {
            let target = if bytes.get(next) == Some(&b'(') {
                lexer::matching_close(masked, next).and_then(|close| bare_ident(&masked[next + 1..close]))
            } else {
                lexer::ident_at(masked, next)
            };
            if let Some(target) = target {
                resolve(&mut found, target, Relation::UsesObject, &[AssetKind::Object], true, "with", line);
            }
            continue;
        }

        if bytes.get(next) == Some(&b'(') {
            if let Some(pattern) = catalogue::match_call(word) {
                let Some(close) = lexer::matching_close(masked, next) else {
                    continue;
                };
                let args = lexer::split_top_level(&masked[next + 1..close]);
                match pattern.slot {
                    ArgSlot::At(slot) => {
                        if let Some(name) = args.get(slot).and_then(|(_, arg)| bare_ident(arg)) {
                            resolve(&mut found, name, pattern.relation, pattern.kinds, true, word, line);
                        }
                    }
                    ArgSlot::Any => {
                        for name in args.iter().filter_map(|(_, arg)| bare_ident(arg)) {
                            resolve(&mut found, name, pattern.relation, pattern.kinds, false, word, line);
                        }
                    }
                }
            } else if let Some(owner) = names.functions.get(word) {
                found.push(Finding::Edge {
                    to: owner.clone(),
                    relation: Relation::Calls,
                    construct: word.to_string(),
                    line,
                });
            }
            continue;
        }

        if let Some(pattern) = catalogue::match_assignment(word) {
            if bytes.get(next) == Some(&b'=') && bytes.get(next + 1) != Some(&b'=') {
                let rhs = skip_inline_ws(masked, next + 1);
                if let Some(name) = lexer::ident_at(masked, rhs) {
                    let after = skip_inline_ws(masked, rhs + name.len());
                    let bare = matches!(bytes.get(after), None | Some(b';' | b'\n' | b'\r' | b'}'));
                    if bare {
                        let construct = format!("{} =", pattern.variable);
                        resolve(&mut found, name, pattern.relation, pattern.kinds, true, &construct, line);
                    }
                }
            }
        }
    }

    found
}

/// The argument text if it is exactly one identifier.
fn bare_ident(arg: &str) -> Option<&str> {
    let arg = arg.trim();
    let ident = lexer::ident_at(arg, 0)?;
    (ident.len() == arg.len()).then_some(ident)
}

fn is_member_access(text: &str, offset: usize) -> bool {
    text[..offset].trim_end().ends_with('.')
}

fn follows_keyword(text: &str, offset: usize, keyword: &str) -> bool {
    let before = text[..offset].trim_end();
    before.ends_with(keyword)
        && !before[..before.len() - keyword.len()]
            .chars()
            .next_back()
            .map_or(false, lexer::is_ident_char)
}

fn skip_inline_ws(text: &str, at: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = at;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// Names that are variables somewhere in the file: `var` declarations,
/// function parameters and plain assignment targets.
fn local_names(masked: &str) -> HashSet<String> {
    let bytes = masked.as_bytes();
    let mut locals = HashSet::new();

    for (offset, word) in lexer::identifiers(masked) {
        if is_member_access(masked, offset) {
            continue;
        }
        let after = offset + word.len();
        match word {
            "var" | "globalvar" => {
                let mut p = lexer::skip_ws(masked, after);
                while let Some(name) = lexer::ident_at(masked, p) {
                    locals.insert(name.to_string());
                    match declaration_end(bytes, p + name.len()) {
                        Some(comma) => p = lexer::skip_ws(masked, comma + 1),
                        None => break,
                    }
                }
            }
            "function" => {
                let mut p = lexer::skip_ws(masked, after);
                if let Some(name) = lexer::ident_at(masked, p) {
                    p = lexer::skip_ws(masked, p + name.len());
                }
                if bytes.get(p) == Some(&b'(') {
                    if let Some(close) = lexer::matching_close(masked, p) {
                        for (_, piece) in lexer::split_top_level(&masked[p + 1..close]) {
                            if let Some(param) = lexer::ident_at(piece.trim_start(), 0) {
                                locals.insert(param.to_string());
                            }
                        }
                    }
                }
            }
            _ => {
                let next = skip_inline_ws(masked, after);
                if bytes.get(next) == Some(&b'=') && bytes.get(next + 1) != Some(&b'=') {
                    locals.insert(word.to_string());
                }
            }
        }
    }
    locals
}

/// Position of the comma continuing a `var` list, or `None` when the statement ends.
fn declaration_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            b',' if depth == 0 => return Some(i),
            b';' | b'\n' if depth == 0 => return None,
            _ => {}
        }
    }
    None
}
