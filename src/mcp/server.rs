use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool, ToolsCapability,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::params::*;
use crate::engine::{default_project_root, Workspace};
use crate::error::{IndexerError, Result};
use crate::graph::GraphMode;
use crate::index::{SymbolFilter, SymbolKind};
use crate::project::{AssetFilter, AssetKind};
use crate::resolver::{MatchMode, ReferenceQuery, SearchScope};

const DEFAULT_LIST_LIMIT: usize = 200;

/// Why a tool call produced no payload.
#[derive(Debug)]
pub enum ToolError {
    /// Arguments did not deserialize, or the tool does not exist
    InvalidParams(String),
    /// The engine rejected or failed the operation
    Failed(IndexerError),
}

impl From<IndexerError> for ToolError {
    fn from(e: IndexerError) -> Self {
        ToolError::Failed(e)
    }
}

/// MCP server over stdio exposing the engine operations as tools.
///
/// Every call opens the project fresh so edits made in the IDE between
/// calls are visible; the symbol index is reused through its on-disk store.
#[derive(Clone)]
pub struct McpServer {
    default_root: Option<PathBuf>,
    workers: Option<usize>,
    cancel: CancellationToken,
}

impl McpServer {
    pub fn new(default_root: Option<PathBuf>) -> Self {
        Self {
            default_root,
            workers: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Token whose cancellation aborts every running tool call.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn workspace(&self, project_root: Option<&str>) -> Result<Workspace> {
        let root = match project_root {
            Some(root) if !root.trim().is_empty() => PathBuf::from(root),
            _ => self.default_root.clone().unwrap_or_else(default_project_root),
        };
        let workspace = Workspace::open(&root)?.with_cancel(self.cancel.child_token());
        Ok(match self.workers {
            Some(workers) => workspace.with_workers(workers),
            None => workspace,
        })
    }

    /// Runs one tool synchronously and returns its JSON payload.
    pub fn execute(&self, name: &str, arguments: Map<String, Value>) -> std::result::Result<Value, ToolError> {
        debug!("Tool call: {}", name);
        match name {
            "build_index" => {
                let params: BuildIndexParams = parse(arguments)?;
                let workspace = self.workspace(params.project_root.as_deref())?;
                let (_, report) = workspace.build_index(params.force.unwrap_or(false))?;
                to_json(&report)
            }
            "find_definition" => {
                let params: FindDefinitionParams = parse(arguments)?;
                let workspace = self.workspace(params.project_root.as_deref())?;
                to_json(&workspace.find_definition(&params.name)?)
            }
            "find_references" => {
                let params: FindReferencesParams = parse(arguments)?;
                let mode = MatchMode::parse(params.mode.as_deref().unwrap_or("identifier"))?;
                let scope = SearchScope::parse(params.scope.as_deref().unwrap_or("all"))?;
                let query = ReferenceQuery::new(params.pattern, mode)
                    .scope(scope)
                    .case_sensitive(params.case_sensitive.unwrap_or(true))
                    .max_results(params.max_results.unwrap_or(ReferenceQuery::DEFAULT_MAX_RESULTS));
                let workspace = self.workspace(params.project_root.as_deref())?;
                to_json(&workspace.find_references(&query)?)
            }
            "list_symbols" => {
                let params: ListSymbolsParams = parse(arguments)?;
                let mut filter = SymbolFilter::default().limit(params.max_results.unwrap_or(DEFAULT_LIST_LIMIT));
                if let Some(kind) = params.kind.as_deref() {
                    let kind = SymbolKind::from_str(kind).ok_or_else(|| {
                        IndexerError::invalid_argument("kind", format!("unknown symbol kind '{kind}'"))
                    })?;
                    filter = filter.kind(kind);
                }
                if let Some(needle) = params.name_contains {
                    filter = filter.name_contains(needle);
                }
                if let Some(needle) = params.file_path {
                    filter = filter.file_contains(needle);
                }
                let workspace = self.workspace(params.project_root.as_deref())?;
                to_json(&workspace.list_symbols(&filter)?)
            }
            "get_asset_graph" => {
                let params: GetAssetGraphParams = parse(arguments)?;
                let mode = GraphMode::parse(params.mode.as_deref().unwrap_or("deep"))?;
                let workspace = self.workspace(params.project_root.as_deref())?;
                to_json(&workspace.asset_graph(mode)?)
            }
            "run_diagnostics" => {
                let params: RunDiagnosticsParams = parse(arguments)?;
                let mode = GraphMode::parse(params.mode.as_deref().unwrap_or("deep"))?;
                let workspace = self.workspace(params.project_root.as_deref())?;
                to_json(&workspace.run_diagnostics(mode, params.include_info.unwrap_or(true))?)
            }
            "project_info" => {
                let params: ProjectInfoParams = parse(arguments)?;
                let workspace = self.workspace(params.project_root.as_deref())?;
                to_json(&workspace.project_info())
            }
            "list_assets" => {
                let params: ListAssetsParams = parse(arguments)?;
                let mut filter = AssetFilter::default();
                if let Some(kind) = params.asset_type.as_deref() {
                    let kind = AssetKind::from_str(kind).ok_or_else(|| {
                        IndexerError::invalid_argument("asset_type", format!("unknown asset type '{kind}'"))
                    })?;
                    filter = filter.kind(kind);
                }
                if let Some(needle) = params.name_contains {
                    filter = filter.name_contains(needle);
                }
                if let Some(prefix) = params.folder_prefix {
                    filter = filter.folder_prefix(prefix);
                }
                let workspace = self.workspace(params.project_root.as_deref())?;
                let assets = workspace.list_assets(&filter);
                Ok(serde_json::json!({
                    "count": assets.len(),
                    "assets": to_json(&assets)?,
                }))
            }
            "read_asset" => {
                let params: ReadAssetParams = parse(arguments)?;
                let workspace = self.workspace(params.project_root.as_deref())?;
                to_json(&workspace.read_asset(&params.asset_identifier)?)
            }
            _ => Err(ToolError::InvalidParams(format!("Unknown tool: {name}"))),
        }
    }
}

fn parse<P: DeserializeOwned>(arguments: Map<String, Value>) -> std::result::Result<P, ToolError> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> std::result::Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Failed(IndexerError::Json(e)))
}

/// `{kind, message}` body of a failed tool call.
pub fn error_payload(error: &IndexerError) -> Value {
    serde_json::json!({
        "kind": error.kind(),
        "message": error.to_string(),
    })
}

fn schema_for<T: JsonSchema>() -> Arc<Map<String, Value>> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema) {
        Ok(Value::Object(map)) => Arc::new(map),
        _ => Arc::new(Map::new()),
    }
}

fn tool<P: JsonSchema>(name: &'static str, title: &str, description: &str) -> Tool {
    Tool {
        name: name.into(),
        title: Some(title.to_string()),
        description: Some(description.to_string().into()),
        input_schema: schema_for::<P>(),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

pub fn tools() -> Vec<Tool> {
    vec![
        tool::<BuildIndexParams>(
            "build_index",
            "Build Index",
            "Build or incrementally refresh the symbol index of a GameMaker project",
        ),
        tool::<FindDefinitionParams>(
            "find_definition",
            "Find Definition",
            "Find where a function, constructor, macro, enum or global variable is declared",
        ),
        tool::<FindReferencesParams>(
            "find_references",
            "Find References",
            "Search scripts, descriptors and the manifest for a name or pattern",
        ),
        tool::<ListSymbolsParams>(
            "list_symbols",
            "List Symbols",
            "List declared symbols, optionally filtered by kind, name or file",
        ),
        tool::<GetAssetGraphParams>(
            "get_asset_graph",
            "Get Asset Graph",
            "Asset dependency graph with evidence for every edge and a list of dangling references",
        ),
        tool::<RunDiagnosticsParams>(
            "run_diagnostics",
            "Run Diagnostics",
            "Schema, naming, orphan and reference-integrity findings for the project",
        ),
        tool::<ListAssetsParams>(
            "list_assets",
            "List Assets",
            "List project assets, optionally filtered by type, name substring or folder prefix",
        ),
        tool::<ReadAssetParams>(
            "read_asset",
            "Read Asset",
            "Descriptor JSON of one asset, looked up by name or descriptor path",
        ),
        tool::<ProjectInfoParams>(
            "project_info",
            "Project Info",
            "Project name, manifest, asset counts by kind, configs, groups and room order",
        ),
    ]
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(true),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "gml-indexer".to_string(),
                title: Some("GameMaker Project Indexer".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Project intelligence for GameMaker projects: symbol lookup, reference search, \
                 asset dependency graph and diagnostics. Tools default to the project at GM_PROJECT_ROOT."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let server = self.clone();
        let name = request.name.to_string();
        let arguments = request.arguments.unwrap_or_default();

        let outcome = tokio::task::spawn_blocking(move || server.execute(&name, arguments))
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        match outcome {
            Ok(value) => {
                let json = serde_json::to_string_pretty(&value).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(ToolError::InvalidParams(message)) => Err(McpError::invalid_params(message, None)),
            Err(ToolError::Failed(e)) => {
                warn!("Tool {} failed: {}", request.name, e);
                let json = serde_json::to_string_pretty(&error_payload(&e)).unwrap_or_default();
                Ok(CallToolResult::error(vec![Content::text(json)]))
            }
        }
    }
}
