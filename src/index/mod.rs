pub mod models;
pub mod store;

pub use models::*;
pub use store::{IndexStore, INDEX_FILE_NAME, SCHEMA_VERSION};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{IndexerError, Result};
use crate::indexer::{worker_pool, SymbolExtractor};
use crate::project::Project;

/// Symbols extracted from one file, keyed by its content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSymbols {
    pub fingerprint: String,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Scanning threads; `None` uses one per core
    pub workers: Option<usize>,
    pub cancel: CancellationToken,
}

impl IndexOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Immutable snapshot of every declaration in a project's scripts.
///
/// Updates return a new snapshot; file entries that did not change are
/// shared between the old and the new one.
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    files: BTreeMap<String, Arc<FileSymbols>>,
    by_name: HashMap<String, Vec<(Arc<FileSymbols>, usize)>>,
}

enum ScanOutcome {
    Unchanged,
    Extracted(FileSymbols),
    Gone,
}

impl SymbolIndex {
    pub fn from_files(files: BTreeMap<String, FileSymbols>) -> Self {
        Self::from_shared(files.into_iter().map(|(k, v)| (k, Arc::new(v))).collect())
    }

    fn from_shared(files: BTreeMap<String, Arc<FileSymbols>>) -> Self {
        let mut by_name: HashMap<String, Vec<(Arc<FileSymbols>, usize)>> = HashMap::new();
        for entry in files.values() {
            for (idx, symbol) in entry.symbols.iter().enumerate() {
                by_name
                    .entry(symbol.name.clone())
                    .or_default()
                    .push((Arc::clone(entry), idx));
            }
        }
        Self { files, by_name }
    }

    /// Full scan of every script file of the project.
    pub fn build(project: &Project, opts: &IndexOptions) -> Result<(SymbolIndex, BuildStats)> {
        let files = project.script_files();
        info!("Building symbol index over {} files", files.len());
        SymbolIndex::default().update(project, &files, opts)
    }

    /// Re-examines `changed_files` (project-relative paths).
    ///
    /// Files whose fingerprint still matches keep their entry; files that are
    /// gone from disk or from the project are dropped. `self` is left untouched.
    pub fn update(
        &self,
        project: &Project,
        changed_files: &[String],
        opts: &IndexOptions,
    ) -> Result<(SymbolIndex, BuildStats)> {
        let project_files: BTreeSet<String> = project.script_files().into_iter().collect();
        let targets: BTreeSet<String> = changed_files
            .iter()
            .map(|f| f.replace('\\', "/"))
            .collect();

        let (present, absent): (Vec<String>, Vec<String>) =
            targets.into_iter().partition(|f| project_files.contains(f));

        let outcomes = self.scan(project, &present, opts)?;

        let mut stats = BuildStats {
            files_scanned: present.len(),
            ..Default::default()
        };
        let mut files = self.files.clone();
        for file in absent {
            if files.remove(&file).is_some() {
                stats.files_removed += 1;
            }
        }
        for (file, outcome) in outcomes {
            match outcome {
                ScanOutcome::Unchanged => {}
                ScanOutcome::Extracted(entry) => {
                    stats.files_extracted += 1;
                    files.insert(file, Arc::new(entry));
                }
                ScanOutcome::Gone => {
                    if files.remove(&file).is_some() {
                        stats.files_removed += 1;
                    }
                }
            }
        }

        let index = SymbolIndex::from_shared(files);
        stats.symbols_indexed = index.symbol_count();
        debug!(
            "Index update: {} scanned, {} extracted, {} removed",
            stats.files_scanned, stats.files_extracted, stats.files_removed
        );
        Ok((index, stats))
    }

    /// `update` over every file either indexed or currently in the project.
    pub fn refresh(&self, project: &Project, opts: &IndexOptions) -> Result<(SymbolIndex, BuildStats)> {
        let mut files: BTreeSet<String> = self.files.keys().cloned().collect();
        files.extend(project.script_files());
        let files: Vec<String> = files.into_iter().collect();
        self.update(project, &files, opts)
    }

    fn scan(
        &self,
        project: &Project,
        files: &[String],
        opts: &IndexOptions,
    ) -> Result<Vec<(String, ScanOutcome)>> {
        let pool = worker_pool(opts.workers)?;
        let extractor = SymbolExtractor::new();
        let cancel = &opts.cancel;

        let results: Vec<Result<(String, ScanOutcome)>> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    if cancel.is_cancelled() {
                        return Err(IndexerError::Cancelled);
                    }
                    let bytes = match std::fs::read(project.absolute(file)) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            if e.kind() != std::io::ErrorKind::NotFound {
                                warn!("Skipping unreadable file {}: {}", file, e);
                            }
                            return Ok((file.clone(), ScanOutcome::Gone));
                        }
                    };
                    let fingerprint = fingerprint(&bytes);
                    if self.fingerprint(file) == Some(fingerprint.as_str()) {
                        return Ok((file.clone(), ScanOutcome::Unchanged));
                    }
                    let text = String::from_utf8_lossy(&bytes);
                    let symbols = extractor.extract(file, &text);
                    debug!("Extracted {} symbols from {}", symbols.len(), file);
                    Ok((file.clone(), ScanOutcome::Extracted(FileSymbols { fingerprint, symbols })))
                })
                .collect()
        });

        results.into_iter().collect()
    }

    /// Declarations named exactly `name`, ordered by file then position.
    pub fn lookup(&self, name: &str) -> Vec<&Symbol> {
        let mut found: Vec<&Symbol> = self
            .by_name
            .get(name)
            .map(|hits| hits.iter().map(|(entry, idx)| &entry.symbols[*idx]).collect())
            .unwrap_or_default();
        found.sort_by(|a, b| {
            a.location
                .file_path
                .cmp(&b.location.file_path)
                .then(a.location.start_byte.cmp(&b.location.start_byte))
        });
        found
    }

    /// Filtered listing ordered by name (case-insensitive), file, then position.
    pub fn list(&self, filter: &SymbolFilter) -> Vec<&Symbol> {
        let name_needle = filter.name_contains.as_ref().map(|s| s.to_lowercase());
        let file_needle = filter.file_contains.as_ref().map(|s| s.to_lowercase());

        let mut found: Vec<&Symbol> = self
            .symbols()
            .filter(|s| filter.kind.map_or(true, |k| s.kind == k))
            .filter(|s| {
                name_needle
                    .as_ref()
                    .map_or(true, |n| s.name.to_lowercase().contains(n.as_str()))
            })
            .filter(|s| {
                file_needle
                    .as_ref()
                    .map_or(true, |n| s.location.file_path.to_lowercase().contains(n.as_str()))
            })
            .collect();

        found.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.location.file_path.cmp(&b.location.file_path))
                .then(a.location.start_byte.cmp(&b.location.start_byte))
        });
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        found
    }

    pub fn stats(&self) -> IndexStats {
        let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
        for symbol in self.symbols() {
            *by_kind.entry(symbol.kind.as_str()).or_default() += 1;
        }
        IndexStats {
            total_files: self.files.len(),
            total_symbols: self.symbol_count(),
            symbols_by_kind: by_kind
                .into_iter()
                .map(|(k, n)| (k.to_string(), n))
                .collect(),
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.files.values().flat_map(|entry| entry.symbols.iter())
    }

    pub fn file_symbols(&self, file: &str) -> &[Symbol] {
        self.files
            .get(file)
            .map(|entry| entry.symbols.as_slice())
            .unwrap_or_default()
    }

    pub fn file_entries(&self) -> impl Iterator<Item = (&str, &FileSymbols)> {
        self.files.iter().map(|(path, entry)| (path.as_str(), entry.as_ref()))
    }

    pub fn fingerprint(&self, file: &str) -> Option<&str> {
        self.files.get(file).map(|entry| entry.fingerprint.as_str())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.files.values().map(|entry| entry.symbols.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether both snapshots hold the very same entry for `file`.
    pub fn shares_entry(&self, other: &SymbolIndex, file: &str) -> bool {
        match (self.files.get(file), other.files.get(file)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Content fingerprint: xxh3-64 as 16 hex digits.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:016x}", xxh3_64(bytes))
}

impl PartialEq for SymbolIndex {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn write_project(dir: &Path) {
        create_file(
            dir,
            "Game.yyp",
            r#"{"name":"Game","resources":[
                {"id":{"name":"scr_a","path":"scripts/scr_a/scr_a.yy"}},
                {"id":{"name":"scr_b","path":"scripts/scr_b/scr_b.yy"}}
            ]}"#,
        );
        create_file(dir, "scripts/scr_a/scr_a.yy", r#"{"resourceType":"GMScript","name":"scr_a"}"#);
        create_file(dir, "scripts/scr_b/scr_b.yy", r#"{"resourceType":"GMScript","name":"scr_b"}"#);
        create_file(dir, "scripts/scr_a/scr_a.gml", "function alpha() {}\n#macro LIMIT 10\n");
        create_file(dir, "scripts/scr_b/scr_b.gml", "function beta() {}\nfunction Alpha_helper() {}\n");
    }

    #[test]
    fn test_build_and_lookup() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path());
        let project = Project::load(temp.path()).unwrap();

        let (index, stats) = SymbolIndex::build(&project, &IndexOptions::default()).unwrap();
        assert_eq!(stats.files_scanned, 2);
        assert_eq!(stats.files_extracted, 2);
        assert_eq!(stats.symbols_indexed, 4);
        assert_eq!(index.lookup("alpha").len(), 1);
        assert!(index.lookup("ALPHA").is_empty());
        assert!(index.lookup("missing").is_empty());
    }

    #[test]
    fn test_list_filters() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path());
        let project = Project::load(temp.path()).unwrap();
        let (index, _) = SymbolIndex::build(&project, &IndexOptions::default()).unwrap();

        let all: Vec<_> = index.list(&SymbolFilter::default()).iter().map(|s| s.name.clone()).collect();
        assert_eq!(all, vec!["alpha", "Alpha_helper", "beta", "LIMIT"]);

        let functions = index.list(&SymbolFilter::default().kind(SymbolKind::Function).name_contains("ALP"));
        assert_eq!(functions.len(), 2);

        let in_b = index.list(&SymbolFilter::default().file_contains("SCR_B"));
        assert_eq!(in_b.len(), 2);

        assert_eq!(index.list(&SymbolFilter::default().limit(1)).len(), 1);
    }

    #[test]
    fn test_update_reuses_unchanged_entries() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path());
        let project = Project::load(temp.path()).unwrap();
        let (index, _) = SymbolIndex::build(&project, &IndexOptions::default()).unwrap();

        create_file(temp.path(), "scripts/scr_b/scr_b.gml", "function gamma() {}\n");
        let changed = vec![
            "scripts/scr_a/scr_a.gml".to_string(),
            "scripts/scr_b/scr_b.gml".to_string(),
        ];
        let (updated, stats) = index.update(&project, &changed, &IndexOptions::default()).unwrap();

        assert_eq!(stats.files_extracted, 1);
        assert!(updated.shares_entry(&index, "scripts/scr_a/scr_a.gml"));
        assert!(!updated.shares_entry(&index, "scripts/scr_b/scr_b.gml"));
        assert_eq!(updated.lookup("gamma").len(), 1);
        assert!(updated.lookup("beta").is_empty());
        // the original snapshot is untouched
        assert_eq!(index.lookup("beta").len(), 1);
    }

    #[test]
    fn test_update_drops_deleted_files() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path());
        let project = Project::load(temp.path()).unwrap();
        let (index, _) = SymbolIndex::build(&project, &IndexOptions::default()).unwrap();

        fs::remove_file(temp.path().join("scripts/scr_b/scr_b.gml")).unwrap();
        let (updated, stats) = index
            .update(&project, &["scripts/scr_b/scr_b.gml".to_string()], &IndexOptions::default())
            .unwrap();
        assert_eq!(stats.files_removed, 1);
        assert!(updated.lookup("beta").is_empty());
        assert_eq!(updated.file_count(), 1);
    }

    #[test]
    fn test_cancelled_build() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path());
        let project = Project::load(temp.path()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = SymbolIndex::build(&project, &IndexOptions::default().with_cancel(cancel));
        assert!(matches!(result, Err(IndexerError::Cancelled)));
    }

    #[test]
    fn test_stats() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path());
        let project = Project::load(temp.path()).unwrap();
        let (index, _) = SymbolIndex::build(&project, &IndexOptions::default()).unwrap();

        let stats = index.stats();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_symbols, 4);
        assert_eq!(
            stats.symbols_by_kind,
            vec![("function".to_string(), 3), ("macro".to_string(), 1)]
        );
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint(b"function a() {}");
        assert_eq!(a.len(), 16);
        assert_eq!(a, fingerprint(b"function a() {}"));
        assert_ne!(a, fingerprint(b"function b() {}"));
    }
}
