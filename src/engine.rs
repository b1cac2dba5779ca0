//! Operations on one opened project, shared by the MCP server and the CLI.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ProjectConfig;
use crate::diagnostics::{Diagnostic, DiagnosticsEngine};
use crate::error::{IndexerError, Result};
use crate::graph::{build_deep, build_shallow, Graph, GraphMode};
use crate::index::{IndexOptions, IndexStore, Symbol, SymbolFilter, SymbolIndex, SymbolKind};
use crate::project::{parse_loose, AssetFilter, AssetKind, AssetSummary, Project};
use crate::resolver::{self, ReferenceQuery, ReferenceResults};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    /// No usable index on disk; every script was extracted
    Built,
    /// A stored index was brought up to date
    Incremental,
    /// The stored index already matched the project
    Cached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub status: BuildStatus,
    pub symbols_indexed: usize,
    pub files_scanned: usize,
    pub files_extracted: usize,
    pub files_removed: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionHit {
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: u32,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl From<&Symbol> for SymbolSummary {
    fn from(symbol: &Symbol) -> Self {
        Self {
            name: symbol.name.clone(),
            kind: symbol.kind,
            file: symbol.location.file_path.clone(),
            line: symbol.location.start_line,
            signature: symbol.signature(),
            parent: symbol.parent.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub root: String,
    pub manifest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ide_version: Option<String>,
    pub total_assets: usize,
    pub asset_counts: BTreeMap<String, usize>,
    pub script_files: usize,
    pub unowned_scripts: Vec<String>,
    pub folders: Vec<String>,
    pub configs: Vec<String>,
    pub texture_groups: Vec<String>,
    pub audio_groups: Vec<String>,
    pub room_order: Vec<String>,
    pub index_file: String,
    pub indexed: bool,
}

/// Descriptor JSON of one asset, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDocument {
    pub name: String,
    pub kind: AssetKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub data: Value,
}

/// An opened project together with its configuration and index store.
///
/// The project model is loaded once per workspace; open a new workspace to
/// pick up edits to descriptors or the manifest.
pub struct Workspace {
    project: Project,
    config: ProjectConfig,
    store: IndexStore,
    options: IndexOptions,
}

impl Workspace {
    pub fn open(start: &Path) -> Result<Self> {
        let project = Project::load(start)?;
        let config = ProjectConfig::load_for(&project.root)?;
        let store = IndexStore::for_project(&project.root, &config.index);
        let options = IndexOptions::default().with_workers(config.index.effective_workers());
        info!(
            "Opened project '{}' ({} assets) at {}",
            project.name,
            project.assets.len(),
            project.root.display()
        );
        Ok(Self {
            project,
            config,
            store,
            options,
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.options.workers = Some(workers);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.options.cancel = cancel;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Loads, refreshes or rebuilds the stored symbol index.
    ///
    /// `force` ignores whatever is on disk. The index file is only written
    /// when its content changed, and never for a cancelled build. A failed
    /// write is reported as an `index` error.
    pub fn build_index(&self, force: bool) -> Result<(SymbolIndex, BuildReport)> {
        let (index, report) = self.refresh_index(force)?;
        self.persist(&index, report.status).map_err(|e| {
            IndexerError::Index(format!(
                "could not write index file {}: {}",
                self.store.path().display(),
                e
            ))
        })?;
        Ok((index, report))
    }

    /// Current index, brought up to date first.
    ///
    /// Queries never fail on an unwritable index file; the fresh in-memory
    /// index is used and the failure is logged.
    pub fn index(&self) -> Result<SymbolIndex> {
        let (index, report) = self.refresh_index(false)?;
        if let Err(e) = self.persist(&index, report.status) {
            warn!(
                "Could not write index file {}: {}. Using the in-memory index.",
                self.store.path().display(),
                e
            );
        }
        Ok(index)
    }

    fn refresh_index(&self, force: bool) -> Result<(SymbolIndex, BuildReport)> {
        let started = Instant::now();
        let stored = if force { None } else { self.store.load() };

        let (index, stats, status) = match stored {
            Some(previous) => {
                let (index, stats) = previous.refresh(&self.project, &self.options)?;
                let status = if index == previous {
                    BuildStatus::Cached
                } else {
                    BuildStatus::Incremental
                };
                (index, stats, status)
            }
            None => {
                let (index, stats) = SymbolIndex::build(&self.project, &self.options)?;
                (index, stats, BuildStatus::Built)
            }
        };

        let report = BuildReport {
            status,
            symbols_indexed: index.symbol_count(),
            files_scanned: stats.files_scanned,
            files_extracted: stats.files_extracted,
            files_removed: stats.files_removed,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Index {:?}: {} symbols from {} files in {}ms",
            report.status, report.symbols_indexed, report.files_scanned, report.duration_ms
        );
        Ok((index, report))
    }

    fn persist(&self, index: &SymbolIndex, status: BuildStatus) -> Result<()> {
        if status != BuildStatus::Cached || !self.store.exists() {
            self.store.save(index)?;
        }
        Ok(())
    }

    pub fn find_definition(&self, name: &str) -> Result<Vec<DefinitionHit>> {
        let index = self.index()?;
        Ok(resolver::find_definition(&index, name)
            .into_iter()
            .map(|symbol| DefinitionHit {
                name: symbol.name.clone(),
                kind: symbol.kind,
                file: symbol.location.file_path.clone(),
                line: symbol.location.start_line,
                column: symbol.location.start_column,
                signature: symbol.signature(),
                doc: symbol.doc_comment.clone(),
                parent: symbol.parent.clone(),
                asset: self
                    .project
                    .script_owner(&symbol.location.file_path)
                    .map(|a| a.name.clone()),
            })
            .collect())
    }

    pub fn find_references(&self, query: &ReferenceQuery) -> Result<ReferenceResults> {
        resolver::find_references(&self.project, query, &self.options)
    }

    pub fn list_symbols(&self, filter: &SymbolFilter) -> Result<Vec<SymbolSummary>> {
        let index = self.index()?;
        Ok(index.list(filter).into_iter().map(SymbolSummary::from).collect())
    }

    pub fn asset_graph(&self, mode: GraphMode) -> Result<Graph> {
        match mode {
            GraphMode::Shallow => Ok(build_shallow(&self.project)),
            GraphMode::Deep => {
                let index = self.index()?;
                build_deep(&self.project, Some(&index), &self.options)
            }
        }
    }

    /// Every rule over the graph of `mode`, configured from `.gml-indexer.toml`.
    pub fn run_diagnostics(&self, mode: GraphMode, include_info: bool) -> Result<Vec<Diagnostic>> {
        let index = self.index()?;
        let graph = match mode {
            GraphMode::Shallow => build_shallow(&self.project),
            GraphMode::Deep => build_deep(&self.project, Some(&index), &self.options)?,
        };
        Ok(DiagnosticsEngine::from_config(&self.config)
            .include_info(include_info)
            .run(&self.project, &graph, Some(&index)))
    }

    pub fn list_assets(&self, filter: &AssetFilter) -> Vec<AssetSummary> {
        self.project.list_assets(filter)
    }

    /// Reads the descriptor of the asset named by `identifier` (a name or a
    /// descriptor path).
    pub fn read_asset(&self, identifier: &str) -> Result<AssetDocument> {
        let asset = self
            .project
            .find_asset(identifier)
            .ok_or_else(|| IndexerError::AssetNotFound(identifier.to_string()))?;
        let text = self.project.read_file(&asset.descriptor_path)?;
        let data = parse_loose(&text)?;
        Ok(AssetDocument {
            name: asset.name.clone(),
            kind: asset.kind,
            path: asset.descriptor_path.clone(),
            folder: asset.folder.clone(),
            data,
        })
    }

    pub fn project_info(&self) -> ProjectInfo {
        let project = &self.project;
        let mut asset_counts = BTreeMap::new();
        for asset in &project.assets {
            *asset_counts.entry(asset.kind.as_str().to_string()).or_insert(0) += 1;
        }
        ProjectInfo {
            name: project.name.clone(),
            root: project.root.display().to_string(),
            manifest: project.manifest_file(),
            ide_version: project.ide_version.clone(),
            total_assets: project.assets.len(),
            asset_counts,
            script_files: project.script_files().len(),
            unowned_scripts: project.unowned_scripts.clone(),
            folders: project.folders.clone(),
            configs: project.configs.clone(),
            texture_groups: project.texture_groups.clone(),
            audio_groups: project.audio_groups.clone(),
            room_order: project.room_order.clone(),
            index_file: self.store.path().display().to_string(),
            indexed: self.store.exists(),
        }
    }
}

/// Project root for tools that were not given one: `GM_PROJECT_ROOT`, else the working directory.
pub fn default_project_root() -> PathBuf {
    std::env::var_os("GM_PROJECT_ROOT")
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn sample(dir: &Path) {
        create_file(
            dir,
            "Game.yyp",
            r#"{"name":"Game","resources":[
                {"id":{"name":"scr_math","path":"scripts/scr_math/scr_math.yy"}},
                {"id":{"name":"obj_a","path":"objects/obj_a/obj_a.yy"}}
            ],"MetaData":{"IDEVersion":"2024.2.0.163"}}"#,
        );
        create_file(dir, "scripts/scr_math/scr_math.yy", r#"{"name":"scr_math"}"#);
        create_file(
            dir,
            "scripts/scr_math/scr_math.gml",
            "/// Adds two numbers\nfunction add(a, b) {\n    return a + b;\n}\n#macro TAU 6.283\n",
        );
        create_file(dir, "objects/obj_a/obj_a.yy", r#"{"name":"obj_a"}"#);
        create_file(dir, "objects/obj_a/Create_0.gml", "total = add(1, 2);\n");
    }

    #[test]
    fn test_build_status_progression() {
        let temp = TempDir::new().unwrap();
        sample(temp.path());

        let workspace = Workspace::open(temp.path()).unwrap();
        let (_, first) = workspace.build_index(false).unwrap();
        assert_eq!(first.status, BuildStatus::Built);
        assert_eq!(first.symbols_indexed, 2);

        let (_, second) = workspace.build_index(false).unwrap();
        assert_eq!(second.status, BuildStatus::Cached);

        create_file(
            temp.path(),
            "scripts/scr_math/scr_math.gml",
            "function add(a, b) {\n    return a + b;\n}\nfunction sub(a, b) {\n    return a - b;\n}\n",
        );
        let (_, third) = workspace.build_index(false).unwrap();
        assert_eq!(third.status, BuildStatus::Incremental);
        assert_eq!(third.files_extracted, 1);

        let (_, forced) = workspace.build_index(true).unwrap();
        assert_eq!(forced.status, BuildStatus::Built);
    }

    #[test]
    fn test_cancelled_build_writes_nothing() {
        let temp = TempDir::new().unwrap();
        sample(temp.path());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let workspace = Workspace::open(temp.path()).unwrap().with_cancel(cancel);
        let err = workspace.build_index(false).unwrap_err();
        assert_eq!(err.kind(), "cancelled");
        assert!(!workspace.store().exists());
    }

    #[test]
    fn test_unwritable_index_still_answers_queries() {
        let temp = TempDir::new().unwrap();
        sample(temp.path());
        // a plain file where the index directory belongs
        create_file(temp.path(), ".gml-indexer", "not a directory");
        let workspace = Workspace::open(temp.path()).unwrap();

        assert_eq!(workspace.find_definition("add").unwrap().len(), 1);
        assert_eq!(workspace.list_symbols(&SymbolFilter::default()).unwrap().len(), 2);
        let graph = workspace.asset_graph(GraphMode::Deep).unwrap();
        assert!(graph.has_edge("obj_a", "scr_math", crate::graph::Relation::Calls));
        workspace.run_diagnostics(GraphMode::Deep, true).unwrap();

        let err = workspace.build_index(false).unwrap_err();
        assert_eq!(err.kind(), "index");
        assert!(err.to_string().contains("symbols.json"));
    }

    #[test]
    fn test_list_and_read_assets() {
        let temp = TempDir::new().unwrap();
        sample(temp.path());
        let workspace = Workspace::open(temp.path()).unwrap();

        let all = workspace.list_assets(&AssetFilter::default());
        let names: Vec<_> = all.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["obj_a", "scr_math"]);
        let scripts = workspace.list_assets(&AssetFilter::default().kind(AssetKind::Script));
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].script_count, 1);
        assert!(workspace
            .list_assets(&AssetFilter::default().name_contains("OBJ"))
            .iter()
            .all(|a| a.name == "obj_a"));

        let by_name = workspace.read_asset("scr_math").unwrap();
        assert_eq!(by_name.path, "scripts/scr_math/scr_math.yy");
        assert_eq!(by_name.data["name"], "scr_math");
        let by_path = workspace.read_asset("objects\\obj_a\\obj_a.yy").unwrap();
        assert_eq!(by_path.name, "obj_a");
        assert_eq!(by_path.kind, AssetKind::Object);

        let err = workspace.read_asset("obj_missing").unwrap_err();
        assert_eq!(err.kind(), "asset_not_found");
    }

    #[test]
    fn test_definition_and_listing() {
        let temp = TempDir::new().unwrap();
        sample(temp.path());
        let workspace = Workspace::open(temp.path()).unwrap();

        let hits = workspace.find_definition("add").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file, "scripts/scr_math/scr_math.gml");
        assert_eq!(hits[0].line, 2);
        assert_eq!(hits[0].doc.as_deref(), Some("Adds two numbers"));
        assert_eq!(hits[0].asset.as_deref(), Some("scr_math"));
        assert!(workspace.find_definition("missing").unwrap().is_empty());

        let macros = workspace
            .list_symbols(&SymbolFilter::default().kind(SymbolKind::Macro))
            .unwrap();
        assert_eq!(macros.len(), 1);
        assert_eq!(macros[0].name, "TAU");
    }

    #[test]
    fn test_project_info() {
        let temp = TempDir::new().unwrap();
        sample(temp.path());
        let workspace = Workspace::open(temp.path()).unwrap();

        let info = workspace.project_info();
        assert_eq!(info.name, "Game");
        assert_eq!(info.manifest, "Game.yyp");
        assert_eq!(info.ide_version.as_deref(), Some("2024.2.0.163"));
        assert_eq!(info.asset_counts.get("script"), Some(&1));
        assert_eq!(info.asset_counts.get("object"), Some(&1));
        assert_eq!(info.script_files, 2);
        assert!(!info.indexed);
    }

    #[test]
    fn test_deep_graph_uses_index_for_calls() {
        let temp = TempDir::new().unwrap();
        sample(temp.path());
        let workspace = Workspace::open(temp.path()).unwrap();

        let graph = workspace.asset_graph(GraphMode::Deep).unwrap();
        assert!(graph.has_edge("obj_a", "scr_math", crate::graph::Relation::Calls));
        let shallow = workspace.asset_graph(GraphMode::Shallow).unwrap();
        assert!(shallow.edges.is_empty());
    }
}
