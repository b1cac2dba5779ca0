//! Asset dependency graph.
//!
//! The shallow graph only follows structural descriptor fields; the deep
//! graph adds edges found by scanning script code for a fixed catalogue of
//! asset-consuming calls and assignments. Deep always contains shallow.

pub mod catalogue;
mod deep;
mod shallow;

pub use deep::build_deep;
pub use shallow::build_shallow;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};
use crate::project::{AssetSummary, Project};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphMode {
    Shallow,
    Deep,
}

impl GraphMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphMode::Shallow => "shallow",
            GraphMode::Deep => "deep",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "shallow" => Some(GraphMode::Shallow),
            "deep" => Some(GraphMode::Deep),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| {
            IndexerError::invalid_argument("mode", format!("unknown graph mode '{s}' (expected shallow or deep)"))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Parent,
    Sprite,
    Mask,
    Collision,
    Places,
    Tileset,
    References,
    TextureGroup,
    AudioGroup,
    Instantiates,
    UsesObject,
    UsesSprite,
    PlaysSound,
    GoesToRoom,
    UsesFont,
    UsesShader,
    FollowsPath,
    RunsTimeline,
    PlaysSequence,
    Calls,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Parent => "parent",
            Relation::Sprite => "sprite",
            Relation::Mask => "mask",
            Relation::Collision => "collision",
            Relation::Places => "places",
            Relation::Tileset => "tileset",
            Relation::References => "references",
            Relation::TextureGroup => "texture_group",
            Relation::AudioGroup => "audio_group",
            Relation::Instantiates => "instantiates",
            Relation::UsesObject => "uses_object",
            Relation::UsesSprite => "uses_sprite",
            Relation::PlaysSound => "plays_sound",
            Relation::GoesToRoom => "goes_to_room",
            Relation::UsesFont => "uses_font",
            Relation::UsesShader => "uses_shader",
            Relation::FollowsPath => "follows_path",
            Relation::RunsTimeline => "runs_timeline",
            Relation::PlaysSequence => "plays_sequence",
            Relation::Calls => "calls",
        }
    }
}

/// Why an edge (or a dangling reference) exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    /// A descriptor field such as `parentObjectId`
    Structural { field: String },
    /// A matched code construct such as `instance_create`
    Code {
        construct: String,
        file: String,
        line: u32,
    },
}

impl Evidence {
    pub fn structural(field: impl Into<String>) -> Self {
        Evidence::Structural {
            field: field.into(),
        }
    }

    pub fn code(construct: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Evidence::Code {
            construct: construct.into(),
            file: file.into(),
            line,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Evidence::Structural { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub relation: Relation,
    pub evidence: Evidence,
}

/// A reference to a name that is not a declared asset (or group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    pub from: String,
    pub target: String,
    pub relation: Relation,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub mode: GraphMode,
    /// Sorted by name
    pub nodes: Vec<AssetSummary>,
    /// Sorted by source, target, relation
    pub edges: Vec<Edge>,
    /// Sorted by source, target, relation
    pub dangling: Vec<DanglingReference>,
}

impl Graph {
    /// Edges pointing at `name` from another asset.
    pub fn incoming(&self, name: &str) -> impl Iterator<Item = &Edge> {
        let name = name.to_string();
        self.edges
            .iter()
            .filter(move |e| e.to == name && e.from != name)
    }

    pub fn outgoing<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.from == name)
    }

    pub fn has_edge(&self, from: &str, to: &str, relation: Relation) -> bool {
        self.edges
            .iter()
            .any(|e| e.from == from && e.to == to && e.relation == relation)
    }
}

type EdgeKey = (String, String, &'static str);

/// Accumulates edges and dangling references, keeping the first evidence per key.
pub(crate) struct GraphBuilder {
    edges: BTreeMap<EdgeKey, Edge>,
    dangling: BTreeMap<EdgeKey, DanglingReference>,
}

impl GraphBuilder {
    pub(crate) fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
            dangling: BTreeMap::new(),
        }
    }

    pub(crate) fn edge(&mut self, from: &str, to: &str, relation: Relation, evidence: Evidence) {
        self.edges
            .entry((from.to_string(), to.to_string(), relation.as_str()))
            .or_insert_with(|| Edge {
                from: from.to_string(),
                to: to.to_string(),
                relation,
                evidence,
            });
    }

    pub(crate) fn dangling(&mut self, from: &str, target: &str, relation: Relation, evidence: Evidence) {
        self.dangling
            .entry((from.to_string(), target.to_string(), relation.as_str()))
            .or_insert_with(|| DanglingReference {
                from: from.to_string(),
                target: target.to_string(),
                relation,
                evidence,
            });
    }

    /// Records an edge when `target` is an asset, a dangling reference otherwise.
    pub(crate) fn link(
        &mut self,
        project: &Project,
        from: &str,
        target: &str,
        relation: Relation,
        evidence: Evidence,
    ) {
        if project.asset(target).is_some() {
            self.edge(from, target, relation, evidence);
        } else {
            self.dangling(from, target, relation, evidence);
        }
    }

    pub(crate) fn finish(self, mode: GraphMode, project: &Project) -> Graph {
        Graph {
            mode,
            nodes: project.summaries(),
            edges: self.edges.into_values().collect(),
            dangling: self.dangling.into_values().collect(),
        }
    }
}
