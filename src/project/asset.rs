use serde::{Deserialize, Serialize};

use super::descriptor::Descriptor;

/// Asset kinds supported by the project model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Object,
    Sprite,
    Sound,
    Room,
    Script,
    Tileset,
    Font,
    Path,
    Timeline,
    Sequence,
    Shader,
    Extension,
    Note,
    AnimationCurve,
    ParticleSystem,
}

impl AssetKind {
    pub const ALL: [AssetKind; 15] = [
        AssetKind::Object,
        AssetKind::Sprite,
        AssetKind::Sound,
        AssetKind::Room,
        AssetKind::Script,
        AssetKind::Tileset,
        AssetKind::Font,
        AssetKind::Path,
        AssetKind::Timeline,
        AssetKind::Sequence,
        AssetKind::Shader,
        AssetKind::Extension,
        AssetKind::Note,
        AssetKind::AnimationCurve,
        AssetKind::ParticleSystem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Object => "object",
            AssetKind::Sprite => "sprite",
            AssetKind::Sound => "sound",
            AssetKind::Room => "room",
            AssetKind::Script => "script",
            AssetKind::Tileset => "tileset",
            AssetKind::Font => "font",
            AssetKind::Path => "path",
            AssetKind::Timeline => "timeline",
            AssetKind::Sequence => "sequence",
            AssetKind::Shader => "shader",
            AssetKind::Extension => "extension",
            AssetKind::Note => "note",
            AssetKind::AnimationCurve => "animation_curve",
            AssetKind::ParticleSystem => "particle_system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        AssetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.directory() == s)
    }

    /// Top-level project directory holding assets of this kind.
    pub fn directory(&self) -> &'static str {
        match self {
            AssetKind::Object => "objects",
            AssetKind::Sprite => "sprites",
            AssetKind::Sound => "sounds",
            AssetKind::Room => "rooms",
            AssetKind::Script => "scripts",
            AssetKind::Tileset => "tilesets",
            AssetKind::Font => "fonts",
            AssetKind::Path => "paths",
            AssetKind::Timeline => "timelines",
            AssetKind::Sequence => "sequences",
            AssetKind::Shader => "shaders",
            AssetKind::Extension => "extensions",
            AssetKind::Note => "notes",
            AssetKind::AnimationCurve => "animcurves",
            AssetKind::ParticleSystem => "particles",
        }
    }

    pub fn from_directory(dir: &str) -> Option<Self> {
        AssetKind::ALL.into_iter().find(|k| k.directory() == dir)
    }

    /// Kind implied by a project-relative descriptor path (`objects/obj_a/obj_a.yy`).
    pub fn from_descriptor_path(path: &str) -> Option<Self> {
        let first = path.split(['/', '\\']).next()?;
        Self::from_directory(first)
    }

    /// `resourceType` value the IDE writes into descriptors of this kind.
    pub fn resource_type(&self) -> &'static str {
        match self {
            AssetKind::Object => "GMObject",
            AssetKind::Sprite => "GMSprite",
            AssetKind::Sound => "GMSound",
            AssetKind::Room => "GMRoom",
            AssetKind::Script => "GMScript",
            AssetKind::Tileset => "GMTileSet",
            AssetKind::Font => "GMFont",
            AssetKind::Path => "GMPath",
            AssetKind::Timeline => "GMTimeline",
            AssetKind::Sequence => "GMSequence",
            AssetKind::Shader => "GMShader",
            AssetKind::Extension => "GMExtension",
            AssetKind::Note => "GMNotes",
            AssetKind::AnimationCurve => "GMAnimCurve",
            AssetKind::ParticleSystem => "GMParticleSystem",
        }
    }

    pub fn from_resource_type(s: &str) -> Option<Self> {
        AssetKind::ALL.into_iter().find(|k| k.resource_type() == s)
    }
}

/// An asset declared in the manifest.
///
/// The folder is a back-reference by path only; the project owns every asset.
#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub kind: AssetKind,
    /// Project-relative descriptor path, `/` separated
    pub descriptor_path: String,
    /// Folder path from the descriptor's `parent` field (e.g. `folders/Objects.yy`)
    pub folder: Option<String>,
    /// Parsed descriptor; `None` when the file is missing or unparseable
    pub descriptor: Option<Descriptor>,
    /// Project-relative `.gml` files living next to the descriptor
    pub scripts: Vec<String>,
}

impl Asset {
    /// Project-relative directory containing the descriptor.
    pub fn directory(&self) -> &str {
        match self.descriptor_path.rfind('/') {
            Some(idx) => &self.descriptor_path[..idx],
            None => "",
        }
    }

    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            name: self.name.clone(),
            kind: self.kind,
            path: self.descriptor_path.clone(),
            folder: self.folder.clone(),
            script_count: self.scripts.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub name: String,
    pub kind: AssetKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub script_count: usize,
}

/// Filter for listing assets.
///
/// Name and folder filters are case-insensitive. The folder prefix is matched
/// against the asset's virtual folder (with or without the leading
/// `folders/`) and against its descriptor path.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub kind: Option<AssetKind>,
    pub name_contains: Option<String>,
    pub folder_prefix: Option<String>,
}

impl AssetFilter {
    pub fn kind(mut self, kind: AssetKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    pub fn folder_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.folder_prefix = Some(prefix.into());
        self
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        if self.kind.is_some_and(|kind| kind != asset.kind) {
            return false;
        }
        if let Some(needle) = &self.name_contains {
            if !asset.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(prefix) = &self.folder_prefix {
            let prefix = prefix.replace('\\', "/").to_lowercase();
            let folder = asset.folder.as_deref().unwrap_or_default().to_lowercase();
            let matched = folder.starts_with(&prefix)
                || folder.strip_prefix("folders/").is_some_and(|f| f.starts_with(&prefix))
                || asset.descriptor_path.to_lowercase().starts_with(&prefix);
            if !matched {
                return false;
            }
        }
        true
    }
}
