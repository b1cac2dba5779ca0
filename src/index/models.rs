use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Constructor,
    Macro,
    Enum,
    EnumMember,
    GlobalVariable,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 6] = [
        SymbolKind::Function,
        SymbolKind::Constructor,
        SymbolKind::Macro,
        SymbolKind::Enum,
        SymbolKind::EnumMember,
        SymbolKind::GlobalVariable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Macro => "macro",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum_member",
            SymbolKind::GlobalVariable => "global_variable",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "function" => Some(SymbolKind::Function),
            "constructor" => Some(SymbolKind::Constructor),
            "macro" => Some(SymbolKind::Macro),
            "enum" => Some(SymbolKind::Enum),
            "enum_member" | "enum_value" => Some(SymbolKind::EnumMember),
            "global_variable" | "globalvar" => Some(SymbolKind::GlobalVariable),
            _ => None,
        }
    }
}

/// Where a declaration sits: byte range plus 1-based line/column bounds.
///
/// Columns count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file_path: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    pub fn new(
        file_path: impl Into<String>,
        start_byte: usize,
        end_byte: usize,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            start_byte,
            end_byte,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<String>,
    /// Enclosing enum for enum members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Parameter names for functions and constructors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    /// Configuration a `#macro Config:NAME` applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, location: Location) -> Self {
        Self {
            name: name.into(),
            kind,
            location,
            doc_comment: None,
            parent: None,
            params: None,
            config: None,
        }
    }

    pub fn with_doc_comment(mut self, doc: impl Into<String>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    /// `name(a, b)` for callables, the bare name otherwise.
    pub fn signature(&self) -> String {
        match &self.params {
            Some(params) => format!("{}({})", self.name, params.join(", ")),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_files: usize,
    pub total_symbols: usize,
    pub symbols_by_kind: Vec<(String, usize)>,
}

/// What a build or update actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Files whose content was read and fingerprinted
    pub files_scanned: usize,
    /// Files whose symbols were (re-)extracted
    pub files_extracted: usize,
    /// Index entries dropped because the file is gone
    pub files_removed: usize,
    pub symbols_indexed: usize,
}

/// Filter for [`SymbolIndex::list`](super::SymbolIndex::list).
///
/// Name and file filters are case-insensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    pub kind: Option<SymbolKind>,
    pub name_contains: Option<String>,
    pub file_contains: Option<String>,
    pub limit: Option<usize>,
}

impl SymbolFilter {
    pub fn kind(mut self, kind: SymbolKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    pub fn file_contains(mut self, needle: impl Into<String>) -> Self {
        self.file_contains = Some(needle.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
