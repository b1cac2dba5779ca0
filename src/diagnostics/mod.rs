//! Project health checks over the model, the asset graph and the symbol index.

mod model;
pub mod rules;

pub use model::*;
pub use rules::{NamingRule, OrphanRule, ReferenceIntegrityRule, Rule, RuleContext, SchemaRule};

use tracing::{debug, warn};

use crate::config::{NamingRules, OrphanConfig, ProjectConfig};
use crate::graph::Graph;
use crate::index::SymbolIndex;
use crate::project::Project;

/// Runs every rule and merges their findings into one ordered list.
pub struct DiagnosticsEngine {
    rules: Vec<Box<dyn Rule>>,
    include_info: bool,
}

impl DiagnosticsEngine {
    pub fn new(naming: NamingRules, orphans: OrphanConfig) -> Self {
        Self {
            rules: vec![
                Box::new(SchemaRule),
                Box::new(NamingRule { rules: naming }),
                Box::new(OrphanRule { config: orphans }),
                Box::new(ReferenceIntegrityRule),
            ],
            include_info: true,
        }
    }

    pub fn from_config(config: &ProjectConfig) -> Self {
        Self::new(config.naming.clone(), config.orphans.clone())
    }

    pub fn include_info(mut self, include_info: bool) -> Self {
        self.include_info = include_info;
        self
    }

    pub fn run(&self, project: &Project, graph: &Graph, index: Option<&SymbolIndex>) -> Vec<Diagnostic> {
        let ctx = RuleContext { project, graph, index };
        let mut diagnostics = Vec::new();

        for rule in &self.rules {
            let before = diagnostics.len();
            if let Err(e) = rule.check(&ctx, &mut diagnostics) {
                warn!("Rule '{}' could not fully evaluate: {}", rule.name(), e);
                diagnostics.push(Diagnostic::error(
                    Category::Other,
                    "engine.rule_failed",
                    format!("rule '{}' failed: {}", rule.name(), e),
                ));
            }
            debug!("Rule '{}' produced {} findings", rule.name(), diagnostics.len() - before);
        }

        if !self.include_info {
            diagnostics.retain(|d| d.severity != Severity::Info);
        }
        diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        diagnostics
    }
}

impl Default for DiagnosticsEngine {
    fn default() -> Self {
        Self::new(NamingRules::default(), OrphanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_shallow;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn project(dir: &Path) -> Project {
        create_file(
            dir,
            "Game.yyp",
            r#"{"name":"Game","resources":[
                {"id":{"name":"obj_a","path":"objects/obj_a/obj_a.yy"}},
                {"id":{"name":"obj_b","path":"objects/obj_b/obj_b.yy"}}
            ]}"#,
        );
        create_file(
            dir,
            "objects/obj_a/obj_a.yy",
            r#"{"name":"obj_a","parentObjectId":{"name":"obj_c","path":"objects/obj_c/obj_c.yy"}}"#,
        );
        create_file(dir, "objects/obj_b/obj_b.yy", r#"{"name":"obj_b",}"#);
        Project::load(dir).unwrap()
    }

    #[test]
    fn test_output_is_ordered_and_filterable() {
        let temp = TempDir::new().unwrap();
        let project = project(temp.path());
        let graph = build_shallow(&project);

        let all = DiagnosticsEngine::default().run(&project, &graph, None);
        assert_eq!(all[0].code, "reference.dangling_parent");
        assert!(all.iter().any(|d| d.severity == Severity::Info));
        for pair in all.windows(2) {
            assert!(pair[0].sort_key() <= pair[1].sort_key());
        }

        let no_info = DiagnosticsEngine::default()
            .include_info(false)
            .run(&project, &graph, None);
        assert!(no_info.iter().all(|d| d.severity != Severity::Info));
    }

    #[test]
    fn test_failed_rule_does_not_stop_others() {
        let temp = TempDir::new().unwrap();
        let project = project(temp.path());
        let graph = build_shallow(&project);

        let engine = DiagnosticsEngine::new(
            NamingRules::default().with_asset_pattern("object", "["),
            OrphanConfig::default(),
        );
        let diagnostics = engine.run(&project, &graph, None);
        assert!(diagnostics.iter().any(|d| d.code == "engine.rule_failed"));
        assert!(diagnostics.iter().any(|d| d.code == "reference.dangling_parent"));
    }
}
