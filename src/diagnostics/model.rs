use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Schema,
    Naming,
    Orphan,
    ReferenceIntegrity,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Schema => "schema",
            Category::Naming => "naming",
            Category::Orphan => "orphan",
            Category::ReferenceIntegrity => "reference_integrity",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiagnosticLocation {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// A single finding. Diagnostics are computed output only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    /// Stable machine-readable code, e.g. `reference.dangling_parent`
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<DiagnosticLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        category: Category,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            code: code.into(),
            message: message.into(),
            location: None,
            asset: None,
            suggested_fix: None,
        }
    }

    pub fn error(category: Category, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, code, message)
    }

    pub fn warning(category: Category, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, code, message)
    }

    pub fn info(category: Category, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, code, message)
    }

    pub fn at(mut self, file: impl Into<String>, line: Option<u32>) -> Self {
        self.location = Some(DiagnosticLocation {
            file: file.into(),
            line,
        });
        self
    }

    pub fn for_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = Some(asset.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    /// Total order used for output: severity, category, code, location, asset, message.
    pub fn sort_key(&self) -> (Severity, Category, &str, Option<&DiagnosticLocation>, Option<&str>, &str) {
        (
            self.severity,
            self.category,
            self.code.as_str(),
            self.location.as_ref(),
            self.asset.as_deref(),
            self.message.as_str(),
        )
    }
}
