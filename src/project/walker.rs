use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::asset::AssetKind;
use crate::error::Result;

pub const SCRIPT_EXTENSION: &str = "gml";

/// Finds `.gml` source files under the standard asset directories of a project.
pub struct ScriptWalker;

impl ScriptWalker {
    pub fn new() -> Self {
        Self
    }

    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let roots: Vec<PathBuf> = AssetKind::ALL
            .iter()
            .map(|k| root.join(k.directory()))
            .filter(|p| p.is_dir())
            .collect();

        let Some((first, rest)) = roots.split_first() else {
            return Ok(Vec::new());
        };

        let mut builder = WalkBuilder::new(first);
        for extra in rest {
            builder.add(extra);
        }
        let walker = builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .build();

        let mut files = Vec::new();
        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_file() && self.is_supported(path) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
            .unwrap_or(false)
    }

    /// Script files sitting directly in an asset directory (not recursive).
    pub fn scripts_in(&self, dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.is_supported(p))
            .collect();
        files.sort();
        files
    }
}

impl Default for ScriptWalker {
    fn default() -> Self {
        Self::new()
    }
}
