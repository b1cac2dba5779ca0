//! Tool parameters for the MCP server.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for building or refreshing the symbol index
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct BuildIndexParams {
    /// Project directory or .yyp file (defaults to GM_PROJECT_ROOT)
    #[serde(default)]
    pub project_root: Option<String>,
    /// Ignore the stored index and rebuild from scratch
    #[serde(default)]
    pub force: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FindDefinitionParams {
    /// Exact symbol name
    pub name: String,
    #[serde(default)]
    pub project_root: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FindReferencesParams {
    /// Text, identifier or regular expression to search for
    pub pattern: String,
    /// all | scripts | descriptors | kinds:<kind>,<kind>
    #[serde(default)]
    pub scope: Option<String>,
    /// substring | identifier | regex (default identifier); in regex mode `^` and `$` match at line boundaries
    #[serde(default)]
    pub mode: Option<String>,
    /// Default true
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    /// Default 200
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub project_root: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListSymbolsParams {
    /// function | constructor | macro | enum | enum_member | global_variable
    #[serde(default)]
    pub kind: Option<String>,
    /// Case-insensitive name substring
    #[serde(default)]
    pub name_contains: Option<String>,
    /// Case-insensitive file path substring
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub project_root: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetAssetGraphParams {
    /// shallow | deep (default deep)
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub project_root: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct RunDiagnosticsParams {
    /// Include info-level findings (default true)
    #[serde(default)]
    pub include_info: Option<bool>,
    /// Graph used by the orphan and reference rules: shallow | deep (default deep)
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub project_root: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProjectInfoParams {
    #[serde(default)]
    pub project_root: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListAssetsParams {
    /// Asset kind, e.g. object, sprite, script, room (directory names work too)
    #[serde(default)]
    pub asset_type: Option<String>,
    /// Case-insensitive name substring
    #[serde(default)]
    pub name_contains: Option<String>,
    /// Case-insensitive prefix of the asset's folder or descriptor path
    #[serde(default)]
    pub folder_prefix: Option<String>,
    #[serde(default)]
    pub project_root: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReadAssetParams {
    /// Asset name or descriptor path (objects/obj_player/obj_player.yy)
    pub asset_identifier: String,
    #[serde(default)]
    pub project_root: Option<String>,
}
