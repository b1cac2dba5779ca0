//! `.yyp` manifest reading.

use std::path::Path;

use serde_json::Value;

use super::json::parse_loose;
use crate::error::{IndexerError, Result};

/// A `resources[]` entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub path: String,
}

/// The parts of a `.yyp` manifest the engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub resources: Vec<ResourceEntry>,
    pub folders: Vec<String>,
    pub room_order: Vec<String>,
    pub configs: Vec<String>,
    pub texture_groups: Vec<String>,
    pub audio_groups: Vec<String>,
    pub ide_version: Option<String>,
    /// Entries that could not be read as `{id: {name, path}}`
    pub skipped_resources: usize,
}

impl Manifest {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IndexerError::MalformedManifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let fallback_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&text, &fallback_name).map_err(|message| IndexerError::MalformedManifest {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parses manifest text; `fallback_name` is used when the manifest has no `name`.
    pub fn parse(text: &str, fallback_name: &str) -> std::result::Result<Self, String> {
        let value = parse_loose(text).map_err(|e| e.to_string())?;
        let Value::Object(root) = value else {
            return Err("manifest root is not a JSON object".to_string());
        };

        let mut manifest = Manifest {
            name: root
                .get("name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback_name)
                .to_string(),
            ..Default::default()
        };

        match root.get("resources") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    // current format nests the reference under `id`
                    let entry = item.get("id").unwrap_or(item);
                    let name = entry.get("name").and_then(Value::as_str);
                    let path = entry.get("path").and_then(Value::as_str);
                    match (name, path) {
                        (Some(name), Some(path)) if !name.is_empty() && !path.is_empty() => {
                            manifest.resources.push(ResourceEntry {
                                name: name.to_string(),
                                path: path.replace('\\', "/"),
                            });
                        }
                        _ => manifest.skipped_resources += 1,
                    }
                }
            }
            Some(_) => return Err("`resources` is not an array".to_string()),
        }

        if let Some(Value::Array(folders)) = root.get("Folders").or_else(|| root.get("folders")) {
            manifest.folders = folders
                .iter()
                .filter_map(|f| f.get("folderPath").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
        }

        if let Some(Value::Array(nodes)) = root.get("RoomOrderNodes") {
            manifest.room_order = nodes
                .iter()
                .filter_map(|n| n.get("roomId").and_then(|r| r.get("name")).and_then(Value::as_str))
                .map(str::to_string)
                .collect();
        }

        if let Some(configs) = root.get("configs") {
            collect_config_names(configs, &mut manifest.configs);
        }

        manifest.texture_groups = group_names(&root, &["TextureGroups", "textureGroups"]);
        manifest.audio_groups = group_names(&root, &["AudioGroups", "audioGroups"]);

        manifest.ide_version = root
            .get("MetaData")
            .and_then(|m| m.get("IDEVersion"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(manifest)
    }
}

fn collect_config_names(node: &Value, out: &mut Vec<String>) {
    if let Some(name) = node.get("name").and_then(Value::as_str) {
        if name != "Default" && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    if let Some(Value::Array(children)) = node.get("children") {
        for child in children {
            collect_config_names(child, out);
        }
    }
}

fn group_names(root: &serde_json::Map<String, Value>, keys: &[&str]) -> Vec<String> {
    let mut names: Vec<String> = keys
        .iter()
        .filter_map(|k| root.get(*k).and_then(Value::as_array))
        .flatten()
        .filter_map(|g| g.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}
