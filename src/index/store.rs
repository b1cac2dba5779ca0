//! On-disk symbol index.
//!
//! `<project>/<index dir>/symbols.json` holds
//! `{"schema_version": N, "files": {path: {"fingerprint", "symbols"}}}`.
//! Keys are sorted and nothing time-dependent is written, so rebuilding an
//! unchanged project yields a byte-identical file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{FileSymbols, SymbolIndex};
use crate::config::IndexConfig;
use crate::error::{IndexerError, Result};

pub const SCHEMA_VERSION: u32 = 2;
pub const INDEX_FILE_NAME: &str = "symbols.json";

#[derive(Serialize)]
struct PersistedRef<'a> {
    schema_version: u32,
    files: BTreeMap<&'a str, &'a FileSymbols>,
}

#[derive(Deserialize)]
struct Persisted {
    schema_version: u32,
    files: BTreeMap<String, FileSymbols>,
}

#[derive(Deserialize)]
struct Header {
    schema_version: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: index_dir.into().join(INDEX_FILE_NAME),
        }
    }

    pub fn for_project(project_root: &Path, config: &IndexConfig) -> Self {
        Self::new(project_root.join(&config.dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the persisted index.
    ///
    /// Any problem (missing, unreadable, corrupt, other schema version) yields
    /// `None` so the caller rebuilds from scratch.
    pub fn load(&self) -> Option<SymbolIndex> {
        if !self.path.exists() {
            debug!("No persisted index at {}", self.path.display());
            return None;
        }

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read index at {}: {}. Will rebuild.", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<Header>(&bytes) {
            Ok(Header {
                schema_version: Some(SCHEMA_VERSION),
            }) => {}
            Ok(header) => {
                warn!(
                    "Index version mismatch at {} (found {:?}, expected {}). Will rebuild.",
                    self.path.display(),
                    header.schema_version,
                    SCHEMA_VERSION
                );
                return None;
            }
            Err(e) => {
                warn!("Failed to parse index at {}: {}. Will rebuild.", self.path.display(), e);
                return None;
            }
        }

        let persisted: Persisted = match serde_json::from_slice(&bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to parse index at {}: {}. Will rebuild.", self.path.display(), e);
                return None;
            }
        };
        debug_assert_eq!(persisted.schema_version, SCHEMA_VERSION);

        let misplaced = persisted
            .files
            .iter()
            .any(|(path, entry)| entry.symbols.iter().any(|s| &s.location.file_path != path));
        if misplaced {
            warn!(
                "Index at {} has symbols filed under the wrong path. Will rebuild.",
                self.path.display()
            );
            return None;
        }

        let index = SymbolIndex::from_files(persisted.files);
        info!(
            "Loaded index from {} ({} files)",
            self.path.display(),
            index.file_count()
        );
        Some(index)
    }

    /// Writes the index atomically: a temp file in the same directory renamed over the target.
    pub fn save(&self, index: &SymbolIndex) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| IndexerError::Index(format!("invalid index path {}", self.path.display())))?;
        std::fs::create_dir_all(dir)?;

        let persisted = PersistedRef {
            schema_version: SCHEMA_VERSION,
            files: index.file_entries().collect(),
        };
        let mut bytes = serde_json::to_vec_pretty(&persisted)?;
        bytes.push(b'\n');

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| IndexerError::Io(e.error))?;

        info!("Saved index to {}", self.path.display());
        Ok(())
    }
}
