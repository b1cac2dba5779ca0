use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use gml_indexer::engine::{default_project_root, Workspace};
use gml_indexer::error::{IndexerError, Result};
use gml_indexer::mcp::McpServer;

#[derive(Parser)]
#[command(name = "gml-indexer")]
#[command(about = "Project intelligence for GameMaker projects, served over MCP")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Serve the project at GM_PROJECT_ROOT (or the working directory) over stdio
    gml-indexer serve

    # Serve a specific project
    gml-indexer serve --root ~/GameMakerProjects/MyGame

    # Build or refresh the symbol index and print the report
    gml-indexer index ~/GameMakerProjects/MyGame

    # Rebuild from scratch
    gml-indexer index --force
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Worker threads for file scanning (default: config or one per core)
    #[arg(long, global = true)]
    pub workers: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server over stdio
    Serve {
        /// Default project root for tool calls (overrides GM_PROJECT_ROOT)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Build or refresh the symbol index of a project
    Index {
        /// Project directory or .yyp file
        path: Option<PathBuf>,
        /// Ignore the stored index
        #[arg(long)]
        force: bool,
    },
}

pub async fn run_mcp_server(root: Option<PathBuf>, workers: Option<usize>) -> Result<()> {
    use rmcp::ServiceExt;

    let root = root.unwrap_or_else(default_project_root);
    info!("Serving GameMaker project tools for {}", root.display());

    let mut server = McpServer::new(Some(root));
    if let Some(workers) = workers {
        server = server.with_workers(workers);
    }
    let cancel = server.cancel_token();

    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let running = server
        .serve(transport)
        .await
        .map_err(|e| IndexerError::Mcp(e.to_string()))?;
    let outcome = running.waiting().await;
    cancel.cancel();
    outcome.map_err(|e| IndexerError::Mcp(e.to_string()))?;

    Ok(())
}

pub fn index_project(path: Option<&Path>, force: bool, workers: Option<usize>) -> Result<()> {
    let root = path.map(Path::to_path_buf).unwrap_or_else(default_project_root);
    let mut workspace = Workspace::open(&root)?;
    if let Some(workers) = workers {
        workspace = workspace.with_workers(workers);
    }

    let (_, report) = workspace.build_index(force)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
