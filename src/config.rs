//! Per-project configuration.
//!
//! Read from `<project>/.gml-indexer.toml`; every section is optional.
//!
//! ```toml
//! [index]
//! dir = ".gml-indexer"
//! workers = 4
//!
//! [naming.assets.object]
//! prefix = "obj_"
//!
//! [naming.symbols.macro]
//! pattern = "^[A-Z][A-Z0-9_]*$"
//!
//! [orphans]
//! allow_kinds = ["extension", "note"]
//! entry_assets = ["obj_game_controller"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

pub const CONFIG_FILE_NAME: &str = ".gml-indexer.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub index: IndexConfig,
    pub naming: NamingRules,
    pub orphans: OrphanConfig,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| IndexerError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Loads the config of a project, or defaults when it has none.
    pub fn load_for(project_root: &Path) -> Result<Self> {
        let path = Self::path_for(project_root);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn path_for(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_FILE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index directory, relative to the project root
    pub dir: String,
    /// Worker threads for file scanning; 0 means one per core
    pub workers: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: ".gml-indexer".to_string(),
            workers: 0,
        }
    }
}

impl IndexConfig {
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Naming conventions checked by the diagnostics engine.
///
/// Keys are asset kind names (`object`, `sprite`, ...) and symbol kind names
/// (`function`, `macro`, ...). Empty tables mean no convention is enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    pub assets: BTreeMap<String, AssetNamingRule>,
    pub symbols: BTreeMap<String, SymbolNamingRule>,
}

impl NamingRules {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.symbols.is_empty()
    }

    pub fn with_asset_prefix(mut self, kind: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.assets.entry(kind.into()).or_default().prefix = Some(prefix.into());
        self
    }

    pub fn with_asset_pattern(mut self, kind: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.assets.entry(kind.into()).or_default().pattern = Some(pattern.into());
        self
    }

    pub fn with_symbol_pattern(mut self, kind: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.symbols.entry(kind.into()).or_default().pattern = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetNamingRule {
    pub prefix: Option<String>,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolNamingRule {
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrphanConfig {
    /// Asset kinds never reported as unreferenced
    pub allow_kinds: Vec<String>,
    /// Assets reachable from outside the graph (besides the start room)
    pub entry_assets: Vec<String>,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            allow_kinds: vec!["extension".to_string(), "note".to_string()],
            entry_assets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let temp = TempDir::new().unwrap();
        let config = ProjectConfig::load_for(temp.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.index.dir, ".gml-indexer");
        assert!(config.naming.is_empty());
        assert_eq!(config.orphans.allow_kinds, vec!["extension", "note"]);
    }

    #[test]
    fn test_partial_config() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            r#"
[index]
workers = 2

[naming.assets.object]
prefix = "obj_"

[naming.symbols.macro]
pattern = "^[A-Z_]+$"

[orphans]
entry_assets = ["obj_controller"]
"#,
        )
        .unwrap();

        let config = ProjectConfig::load_for(temp.path()).unwrap();
        assert_eq!(config.index.workers, 2);
        assert_eq!(config.index.effective_workers(), 2);
        assert_eq!(config.index.dir, ".gml-indexer");
        assert_eq!(config.naming.assets["object"].prefix.as_deref(), Some("obj_"));
        assert_eq!(config.naming.symbols["macro"].pattern.as_deref(), Some("^[A-Z_]+$"));
        assert_eq!(config.orphans.entry_assets, vec!["obj_controller"]);
        assert_eq!(config.orphans.allow_kinds, vec!["extension", "note"]);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "[index]\nworkers = \"many\"").unwrap();
        assert!(matches!(
            ProjectConfig::load_for(temp.path()),
            Err(IndexerError::Config(_))
        ));
    }

    #[test]
    fn test_naming_builders() {
        let rules = NamingRules::default()
            .with_asset_prefix("sprite", "spr_")
            .with_asset_pattern("sprite", "^spr_[a-z0-9_]+$")
            .with_symbol_pattern("function", "^[a-z_][a-z0-9_]*$");
        assert_eq!(rules.assets["sprite"].prefix.as_deref(), Some("spr_"));
        assert!(rules.assets["sprite"].pattern.is_some());
        assert!(!rules.is_empty());
    }
}
