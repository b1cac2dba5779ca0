//! Definition lookup and textual cross-file reference search.

use std::collections::BTreeSet;

use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IndexerError, Result};
use crate::index::{IndexOptions, Symbol, SymbolIndex};
use crate::indexer::{lexer, worker_pool, LineIndex};
use crate::project::{AssetKind, Project};

/// Declarations named exactly `name`; an empty result is not an error.
pub fn find_definition<'a>(index: &'a SymbolIndex, name: &str) -> Vec<&'a Symbol> {
    index.lookup(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Plain text anywhere
    Substring,
    /// Plain text not touching identifier characters on either side
    Identifier,
    Regex,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Substring => "substring",
            MatchMode::Identifier => "identifier",
            MatchMode::Regex => "regex",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "substring" => Some(MatchMode::Substring),
            "identifier" => Some(MatchMode::Identifier),
            "regex" => Some(MatchMode::Regex),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| {
            IndexerError::invalid_argument(
                "mode",
                format!("unknown mode '{s}' (expected substring, identifier or regex)"),
            )
        })
    }
}

/// Which project files a reference search reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Manifest, descriptors and scripts
    All,
    Scripts,
    Descriptors,
    /// Descriptors and scripts of assets of these kinds
    Kinds(Vec<AssetKind>),
}

impl SearchScope {
    /// Parses `all`, `scripts`, `descriptors` or `kinds:<kind>[,<kind>...]`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "all" => return Ok(SearchScope::All),
            "scripts" => return Ok(SearchScope::Scripts),
            "descriptors" => return Ok(SearchScope::Descriptors),
            _ => {}
        }
        let Some(list) = s.strip_prefix("kinds:") else {
            return Err(IndexerError::invalid_argument(
                "scope",
                format!("unknown scope '{s}' (expected all, scripts, descriptors or kinds:<k1>,<k2>)"),
            ));
        };
        let mut kinds = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let kind = AssetKind::from_str(name).ok_or_else(|| {
                IndexerError::invalid_argument("scope", format!("unknown asset kind '{name}'"))
            })?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return Err(IndexerError::invalid_argument(
                "scope",
                "`kinds:` needs at least one asset kind",
            ));
        }
        Ok(SearchScope::Kinds(kinds))
    }

    fn files(&self, project: &Project) -> Vec<String> {
        let files: BTreeSet<String> = match self {
            SearchScope::All => {
                let mut files: BTreeSet<String> = project.script_files().into_iter().collect();
                files.extend(project.descriptor_files());
                files.insert(project.manifest_file());
                files
            }
            SearchScope::Scripts => project.script_files().into_iter().collect(),
            SearchScope::Descriptors => project.descriptor_files().into_iter().collect(),
            SearchScope::Kinds(kinds) => project
                .assets
                .iter()
                .filter(|a| kinds.contains(&a.kind))
                .flat_map(|a| {
                    let descriptor = project
                        .absolute(&a.descriptor_path)
                        .is_file()
                        .then(|| a.descriptor_path.clone());
                    descriptor.into_iter().chain(a.scripts.iter().cloned())
                })
                .collect(),
        };
        files.into_iter().collect()
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceQuery {
    pub pattern: String,
    pub scope: SearchScope,
    pub mode: MatchMode,
    pub case_sensitive: bool,
    pub max_results: usize,
}

impl ReferenceQuery {
    pub const DEFAULT_MAX_RESULTS: usize = 200;

    pub fn new(pattern: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            pattern: pattern.into(),
            scope: SearchScope::All,
            mode,
            case_sensitive: true,
            max_results: Self::DEFAULT_MAX_RESULTS,
        }
    }

    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Checks the query and compiles its matcher; nothing is read from disk.
    fn compile(&self) -> Result<Regex> {
        if self.pattern.is_empty() {
            return Err(IndexerError::invalid_argument("pattern", "pattern must not be empty"));
        }
        if self.max_results == 0 {
            return Err(IndexerError::invalid_argument(
                "max_results",
                "max_results must be at least 1",
            ));
        }
        let source = match self.mode {
            MatchMode::Regex => self.pattern.clone(),
            MatchMode::Substring | MatchMode::Identifier => regex::escape(&self.pattern),
        };
        RegexBuilder::new(&source)
            .case_insensitive(!self.case_sensitive)
            .multi_line(true)
            .build()
            .map_err(|e| IndexerError::invalid_argument("pattern", format!("invalid regex: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub matched_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceResults {
    pub results: Vec<Reference>,
    pub truncated: bool,
}

/// Searches project files for `query`.
///
/// Exactly `max_results` references come back with `truncated` set when more
/// exist; results are ordered by file, line and column.
pub fn find_references(
    project: &Project,
    query: &ReferenceQuery,
    opts: &IndexOptions,
) -> Result<ReferenceResults> {
    let matcher = query.compile()?;
    let files = query.scope.files(project);
    let per_file_cap = query.max_results + 1;
    debug!(
        "Searching {} files for {:?} ({})",
        files.len(),
        query.pattern,
        query.mode.as_str()
    );

    let pool = worker_pool(opts.workers)?;
    let cancel = &opts.cancel;
    let per_file: Vec<Result<Vec<Reference>>> = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                if cancel.is_cancelled() {
                    return Err(IndexerError::Cancelled);
                }
                let text = match project.read_file(file) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Skipping unreadable file {}: {}", file, e);
                        return Ok(Vec::new());
                    }
                };
                let asset = project.file_owner(file).map(|a| a.name.clone());
                Ok(search_text(&text, &matcher, query.mode, per_file_cap)
                    .into_iter()
                    .map(|(line, column, matched_text)| Reference {
                        file: file.clone(),
                        line,
                        column,
                        matched_text,
                        asset: asset.clone(),
                    })
                    .collect())
            })
            .collect()
    });

    let mut results = Vec::new();
    for file_results in per_file {
        results.extend(file_results?);
    }
    results.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.line.cmp(&b.line))
            .then(a.column.cmp(&b.column))
    });

    let truncated = results.len() > query.max_results;
    results.truncate(query.max_results);
    Ok(ReferenceResults { results, truncated })
}

fn search_text(text: &str, matcher: &Regex, mode: MatchMode, cap: usize) -> Vec<(u32, u32, String)> {
    let lines = LineIndex::new(text);
    let mut found = Vec::new();
    for m in matcher.find_iter(text) {
        if m.as_str().is_empty() {
            continue;
        }
        if mode == MatchMode::Identifier && !on_identifier_boundaries(text, m.start(), m.end()) {
            continue;
        }
        let (line, column) = lines.position(text, m.start());
        found.push((line, column, m.as_str().to_string()));
        if found.len() >= cap {
            break;
        }
    }
    found
}

fn on_identifier_boundaries(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.map_or(false, lexer::is_ident_char) && !after.map_or(false, lexer::is_ident_char)
}
