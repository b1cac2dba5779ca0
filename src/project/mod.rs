//! GameMaker project model.
//!
//! A [`Project`] is an immutable snapshot of the manifest, every declared
//! asset with its parsed descriptor, and the `.gml` files belonging to them.
//! Problems with individual assets never abort a load; they are collected as
//! load diagnostics instead.

mod asset;
mod descriptor;
mod json;
mod locator;
mod manifest;
mod walker;

pub use asset::{Asset, AssetFilter, AssetKind, AssetSummary};
pub use descriptor::{
    Descriptor, ObjectDescriptor, ObjectEvent, ResourceRef, RoomDescriptor, RoomInstance,
    RoomLayer, SoundDescriptor, SpriteDescriptor, TilesetDescriptor,
};
pub use json::{parse_loose, strip_trailing_commas};
pub use locator::ProjectLocator;
pub use manifest::{Manifest, ResourceEntry};
pub use walker::ScriptWalker;

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::diagnostics::{Category, Diagnostic};
use crate::error::{IndexerError, Result};

#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub name: String,
    pub ide_version: Option<String>,
    /// Sorted by name, then descriptor path
    pub assets: Vec<Asset>,
    pub folders: Vec<String>,
    pub room_order: Vec<String>,
    pub configs: Vec<String>,
    pub texture_groups: Vec<String>,
    pub audio_groups: Vec<String>,
    /// `.gml` files under asset directories that no declared asset owns
    pub unowned_scripts: Vec<String>,
    pub load_diagnostics: Vec<Diagnostic>,
    by_name: HashMap<String, usize>,
    owner_by_script: HashMap<String, usize>,
}

impl Project {
    /// Locates and loads the project at or above `start`.
    pub fn load(start: &Path) -> Result<Self> {
        Self::load_with(start, &ProjectLocator::new())
    }

    pub fn load_with(start: &Path, locator: &ProjectLocator) -> Result<Self> {
        let manifest_path = locator.locate(start)?;
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| IndexerError::NotAProject(start.to_path_buf()))?;
        let manifest = Manifest::read(&manifest_path)?;

        info!(
            "Loading project {} ({} resources)",
            manifest.name,
            manifest.resources.len()
        );

        let mut diagnostics = Vec::new();
        let manifest_file = relative_path(&root, &manifest_path).unwrap_or_default();
        if manifest.skipped_resources > 0 {
            diagnostics.push(
                Diagnostic::warning(
                    Category::Schema,
                    "schema.invalid_resource_entry",
                    format!(
                        "{} manifest resource entries have no `id.name`/`id.path` and were skipped",
                        manifest.skipped_resources
                    ),
                )
                .at(manifest_file.clone(), None),
            );
        }

        let walker = ScriptWalker::new();
        let loaded: Vec<(Option<Asset>, Vec<Diagnostic>)> = manifest
            .resources
            .par_iter()
            .map(|entry| load_asset(&root, entry, &manifest_file, &walker))
            .collect();

        let mut assets = Vec::with_capacity(loaded.len());
        for (asset, mut asset_diagnostics) in loaded {
            diagnostics.append(&mut asset_diagnostics);
            if let Some(asset) = asset {
                assets.push(asset);
            }
        }
        assets.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.descriptor_path.cmp(&b.descriptor_path))
        });

        let mut by_name = HashMap::new();
        let mut kept = Vec::with_capacity(assets.len());
        for asset in assets {
            if by_name.contains_key(&asset.name) {
                diagnostics.push(
                    Diagnostic::warning(
                        Category::Schema,
                        "schema.duplicate_asset",
                        format!(
                            "Asset '{}' is declared more than once; '{}' is ignored",
                            asset.name, asset.descriptor_path
                        ),
                    )
                    .at(manifest_file.clone(), None)
                    .for_asset(asset.name.clone()),
                );
                continue;
            }
            by_name.insert(asset.name.clone(), kept.len());
            kept.push(asset);
        }

        let mut owner_by_script = HashMap::new();
        for (idx, asset) in kept.iter().enumerate() {
            for script in &asset.scripts {
                owner_by_script.entry(script.clone()).or_insert(idx);
            }
        }

        let unowned_scripts: Vec<String> = walker
            .walk(&root)?
            .iter()
            .filter_map(|p| relative_path(&root, p))
            .filter(|p| !owner_by_script.contains_key(p))
            .collect();
        if !unowned_scripts.is_empty() {
            debug!("{} script files are not owned by any asset", unowned_scripts.len());
        }

        Ok(Self {
            root,
            manifest_path,
            name: manifest.name,
            ide_version: manifest.ide_version,
            assets: kept,
            folders: manifest.folders,
            room_order: manifest.room_order,
            configs: manifest.configs,
            texture_groups: manifest.texture_groups,
            audio_groups: manifest.audio_groups,
            unowned_scripts,
            load_diagnostics: diagnostics,
            by_name,
            owner_by_script,
        })
    }

    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.by_name.get(name).map(|&idx| &self.assets[idx])
    }

    pub fn assets_of_kind(&self, kind: AssetKind) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(move |a| a.kind == kind)
    }

    /// Asset owning a project-relative script path.
    pub fn script_owner(&self, file: &str) -> Option<&Asset> {
        self.owner_by_script.get(file).map(|&idx| &self.assets[idx])
    }

    /// Asset owning any project file: a script or a descriptor.
    pub fn file_owner(&self, file: &str) -> Option<&Asset> {
        self.script_owner(file)
            .or_else(|| self.assets.iter().find(|a| a.descriptor_path == file))
    }

    /// Every script file (owned and unowned), sorted.
    pub fn script_files(&self) -> Vec<String> {
        let mut files: BTreeSet<String> = self
            .assets
            .iter()
            .flat_map(|a| a.scripts.iter().cloned())
            .collect();
        files.extend(self.unowned_scripts.iter().cloned());
        files.into_iter().collect()
    }

    /// Descriptor files that exist on disk, sorted.
    pub fn descriptor_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .assets
            .iter()
            .filter(|a| self.root.join(&a.descriptor_path).is_file())
            .map(|a| a.descriptor_path.clone())
            .collect();
        files.sort();
        files.dedup();
        files
    }

    /// Manifest path relative to the project root.
    pub fn manifest_file(&self) -> String {
        relative_path(&self.root, &self.manifest_path).unwrap_or_default()
    }

    /// First room in room order, the one the game starts in.
    pub fn start_room(&self) -> Option<&str> {
        self.room_order.first().map(String::as_str)
    }

    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn relative(&self, path: &Path) -> Option<String> {
        relative_path(&self.root, path)
    }

    /// Reads a project file as text, replacing invalid UTF-8.
    pub fn read_file(&self, relative: &str) -> Result<String> {
        let bytes = std::fs::read(self.absolute(relative))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn summaries(&self) -> Vec<AssetSummary> {
        self.assets.iter().map(Asset::summary).collect()
    }

    /// Assets matching `filter`, in project order.
    pub fn list_assets(&self, filter: &AssetFilter) -> Vec<AssetSummary> {
        self.assets
            .iter()
            .filter(|a| filter.matches(a))
            .map(Asset::summary)
            .collect()
    }

    /// Resolves an asset by name, or by descriptor path or asset directory
    /// (`objects/obj_a/obj_a.yy`, `objects/obj_a`, `\` separators allowed).
    pub fn find_asset(&self, identifier: &str) -> Option<&Asset> {
        let identifier = identifier.trim();
        if let Some(asset) = self.asset(identifier) {
            return Some(asset);
        }
        let path = identifier.replace('\\', "/");
        let path = path.trim_start_matches("./").trim_end_matches('/');
        self.assets
            .iter()
            .find(|a| a.descriptor_path.eq_ignore_ascii_case(path) || a.directory().eq_ignore_ascii_case(path))
    }
}

fn load_asset(
    root: &Path,
    entry: &ResourceEntry,
    manifest_file: &str,
    walker: &ScriptWalker,
) -> (Option<Asset>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();

    let Some(kind) = AssetKind::from_descriptor_path(&entry.path) else {
        diagnostics.push(
            Diagnostic::info(
                Category::Other,
                "project.unsupported_kind",
                format!(
                    "Resource '{}' at '{}' is of an unsupported kind and was skipped",
                    entry.name, entry.path
                ),
            )
            .at(manifest_file, None)
            .for_asset(entry.name.clone()),
        );
        return (None, diagnostics);
    };

    let descriptor_abs = root.join(&entry.path);
    let descriptor = if !descriptor_abs.is_file() {
        diagnostics.push(
            Diagnostic::error(
                Category::Schema,
                "schema.missing_descriptor",
                format!("Descriptor file for '{}' does not exist", entry.name),
            )
            .at(entry.path.clone(), None)
            .for_asset(entry.name.clone()),
        );
        None
    } else {
        read_descriptor(&descriptor_abs, kind, entry, &mut diagnostics)
    };

    let folder = descriptor
        .as_ref()
        .and_then(Descriptor::folder)
        .map(|r| r.path);

    let scripts = descriptor_abs
        .parent()
        .map(|dir| walker.scripts_in(dir))
        .unwrap_or_default()
        .iter()
        .filter_map(|p| relative_path(root, p))
        .collect();

    let asset = Asset {
        name: entry.name.clone(),
        kind,
        descriptor_path: entry.path.clone(),
        folder,
        descriptor,
        scripts,
    };
    (Some(asset), diagnostics)
}

fn read_descriptor(
    path: &Path,
    kind: AssetKind,
    entry: &ResourceEntry,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Descriptor> {
    let parse_error = |message: String| {
        Diagnostic::error(Category::Schema, "schema.parse_error", message)
            .at(entry.path.clone(), None)
            .for_asset(entry.name.clone())
    };

    let text = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("Failed to read descriptor {}: {}", path.display(), e);
            diagnostics.push(parse_error(format!("Cannot read descriptor: {e}")));
            return None;
        }
    };

    let value = match parse_loose(&text) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            diagnostics.push(parse_error("Descriptor root is not a JSON object".to_string()));
            return None;
        }
        Err(e) => {
            diagnostics.push(parse_error(format!("Descriptor is not valid JSON: {e}")));
            return None;
        }
    };

    let (descriptor, issue) = Descriptor::decode(kind, value);
    if let Some(issue) = issue {
        diagnostics.push(
            Diagnostic::error(
                Category::Schema,
                "schema.missing_field",
                format!("Descriptor of '{}' is incomplete: {}", entry.name, issue),
            )
            .at(entry.path.clone(), None)
            .for_asset(entry.name.clone()),
        );
    }

    if let Some(declared) = descriptor.resource_type() {
        if let Some(declared_kind) = AssetKind::from_resource_type(declared) {
            if declared_kind != kind {
                diagnostics.push(
                    Diagnostic::warning(
                        Category::Schema,
                        "schema.kind_mismatch",
                        format!(
                            "'{}' lives under '{}' but its descriptor declares {}",
                            entry.name,
                            kind.directory(),
                            declared
                        ),
                    )
                    .at(entry.path.clone(), None)
                    .for_asset(entry.name.clone()),
                );
            }
        }
    }

    if let Some(name) = descriptor.name() {
        if name != entry.name {
            diagnostics.push(
                Diagnostic::warning(
                    Category::Schema,
                    "schema.name_mismatch",
                    format!(
                        "Manifest declares '{}' but the descriptor is named '{}'",
                        entry.name, name
                    ),
                )
                .at(entry.path.clone(), None)
                .for_asset(entry.name.clone()),
            );
        }
    }

    Some(descriptor)
}

/// Project-relative, `/`-separated form of `path`.
pub(crate) fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
