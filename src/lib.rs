pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod graph;
pub mod index;
pub mod indexer;
pub mod mcp;
pub mod project;
pub mod resolver;

pub use config::{NamingRules, OrphanConfig, ProjectConfig};
pub use diagnostics::{Category, Diagnostic, DiagnosticsEngine, Severity};
pub use engine::{AssetDocument, BuildReport, BuildStatus, DefinitionHit, ProjectInfo, SymbolSummary, Workspace};
pub use error::{IndexerError, Result};
pub use graph::{build_deep, build_shallow, DanglingReference, Edge, Evidence, Graph, GraphMode, Relation};
pub use index::{
    BuildStats, IndexOptions, IndexStore, Location, Symbol, SymbolFilter, SymbolIndex, SymbolKind,
};
pub use indexer::SymbolExtractor;
pub use project::{Asset, AssetFilter, AssetKind, AssetSummary, Project, ProjectLocator};
pub use resolver::{find_definition, find_references, MatchMode, Reference, ReferenceQuery, ReferenceResults, SearchScope};
