//! Project discovery: finds the `.yyp` manifest for a starting path.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IndexerError, Result};

const MANIFEST_EXTENSION: &str = "yyp";
const NESTED_PROJECT_DIR: &str = "gamemaker";

/// Locates a project manifest starting from a file or directory.
#[derive(Debug, Clone, Default)]
pub struct ProjectLocator {
    manifest_name: Option<String>,
}

impl ProjectLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a specific manifest (file name with or without extension) when a
    /// directory holds several.
    pub fn manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = Some(name.into());
        self
    }

    /// Returns the manifest path for `start`.
    ///
    /// Relative paths are resolved against the working directory first, so
    /// `.` still walks up through its ancestors.
    pub fn locate(&self, start: &Path) -> Result<PathBuf> {
        let start = &std::path::absolute(start)?;
        if is_manifest(start) && start.is_file() {
            return Ok(start.to_path_buf());
        }

        let start_dir = if start.is_file() {
            start.parent().map(Path::to_path_buf).unwrap_or_default()
        } else {
            start.to_path_buf()
        };

        for dir in start_dir.ancestors() {
            for candidate_dir in [dir.to_path_buf(), dir.join(NESTED_PROJECT_DIR)] {
                if let Some(found) = self.check_dir(&candidate_dir)? {
                    debug!("Located manifest {}", found.display());
                    return Ok(found);
                }
            }
        }

        Err(IndexerError::NotAProject(start.to_path_buf()))
    }

    fn check_dir(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let candidates = manifests_in(dir);
        if candidates.is_empty() {
            return Ok(None);
        }

        if let Some(wanted) = &self.manifest_name {
            let found = candidates.iter().find(|c| {
                let file_name = c.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                let stem = c.file_stem().map(|n| n.to_string_lossy()).unwrap_or_default();
                file_name == wanted.as_str() || stem == wanted.as_str()
            });
            return Ok(found.cloned());
        }

        if candidates.len() > 1 {
            return Err(IndexerError::AmbiguousProject {
                dir: dir.to_path_buf(),
                candidates: candidates
                    .iter()
                    .filter_map(|c| c.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect(),
            });
        }

        Ok(candidates.into_iter().next())
    }
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXTENSION))
        .unwrap_or(false)
}

fn manifests_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_manifest(p))
        .collect();
    found.sort();
    found
}
