use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No GameMaker project (.yyp) found at or above {}", .0.display())]
    NotAProject(PathBuf),

    #[error("Malformed manifest {}: {message}", .path.display())]
    MalformedManifest { path: PathBuf, message: String },

    #[error("Multiple manifests found in {}: {}", .dir.display(), .candidates.join(", "))]
    AmbiguousProject {
        dir: PathBuf,
        candidates: Vec<String>,
    },

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Invalid argument `{argument}`: {message}")]
    InvalidArgument { argument: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("MCP error: {0}")]
    Mcp(String),
}

impl IndexerError {
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        IndexerError::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable kind, used in tool error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexerError::Io(_) => "io",
            IndexerError::Json(_) => "json",
            IndexerError::NotAProject(_) => "not_a_project",
            IndexerError::MalformedManifest { .. } => "malformed_manifest",
            IndexerError::AmbiguousProject { .. } => "ambiguous_project",
            IndexerError::AssetNotFound(_) => "asset_not_found",
            IndexerError::InvalidArgument { .. } => "invalid_argument",
            IndexerError::Cancelled => "cancelled",
            IndexerError::Config(_) => "config",
            IndexerError::Index(_) => "index",
            IndexerError::Mcp(_) => "mcp",
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
