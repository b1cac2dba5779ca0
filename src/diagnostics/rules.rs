use regex::Regex;
use strsim::jaro_winkler;

use super::{Category, Diagnostic};
use crate::config::{NamingRules, OrphanConfig};
use crate::error::{IndexerError, Result};
use crate::graph::{DanglingReference, Evidence, Graph, GraphMode, Relation};
use crate::index::{SymbolIndex, SymbolKind};
use crate::project::{AssetKind, Project};

/// Similarity a name needs before it is offered as a "did you mean".
const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Inputs shared by every rule.
pub struct RuleContext<'a> {
    pub project: &'a Project,
    pub graph: &'a Graph,
    pub index: Option<&'a SymbolIndex>,
}

/// One independent check.
///
/// Findings pushed before an error are kept; the error itself is reported
/// as `engine.rule_failed`.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &RuleContext<'_>, out: &mut Vec<Diagnostic>) -> Result<()>;
}

/// Problems found while loading descriptors and the manifest.
pub struct SchemaRule;

impl Rule for SchemaRule {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn check(&self, ctx: &RuleContext<'_>, out: &mut Vec<Diagnostic>) -> Result<()> {
        out.extend(ctx.project.load_diagnostics.iter().cloned());
        Ok(())
    }
}

pub struct NamingRule {
    pub rules: NamingRules,
}

impl Rule for NamingRule {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn check(&self, ctx: &RuleContext<'_>, out: &mut Vec<Diagnostic>) -> Result<()> {
        let mut failures = Vec::new();

        for (kind_name, rule) in &self.rules.assets {
            let Some(kind) = AssetKind::from_str(kind_name) else {
                failures.push(format!("unknown asset kind '{kind_name}'"));
                continue;
            };
            let pattern = match rule.pattern.as_deref().map(compile).transpose() {
                Ok(pattern) => pattern,
                Err(e) => {
                    failures.push(e.to_string());
                    None
                }
            };

            for asset in ctx.project.assets_of_kind(kind) {
                if let Some(prefix) = &rule.prefix {
                    if !asset.name.starts_with(prefix.as_str()) {
                        out.push(
                            Diagnostic::warning(
                                Category::Naming,
                                "naming.asset_prefix",
                                format!("{} '{}' does not start with '{}'", kind.as_str(), asset.name, prefix),
                            )
                            .at(asset.descriptor_path.clone(), None)
                            .for_asset(asset.name.clone())
                            .with_fix(format!("rename to '{}{}'", prefix, asset.name)),
                        );
                    }
                }
                if let Some(pattern) = &pattern {
                    if !pattern.is_match(&asset.name) {
                        out.push(
                            Diagnostic::warning(
                                Category::Naming,
                                "naming.asset_pattern",
                                format!(
                                    "{} '{}' does not match /{}/",
                                    kind.as_str(),
                                    asset.name,
                                    pattern.as_str()
                                ),
                            )
                            .at(asset.descriptor_path.clone(), None)
                            .for_asset(asset.name.clone()),
                        );
                    }
                }
            }
        }

        if !self.rules.symbols.is_empty() {
            match ctx.index {
                Some(index) => {
                    for (kind_name, rule) in &self.rules.symbols {
                        let Some(kind) = SymbolKind::from_str(kind_name) else {
                            failures.push(format!("unknown symbol kind '{kind_name}'"));
                            continue;
                        };
                        let Some(source) = rule.pattern.as_deref() else {
                            continue;
                        };
                        let pattern = match compile(source) {
                            Ok(pattern) => pattern,
                            Err(e) => {
                                failures.push(e.to_string());
                                continue;
                            }
                        };
                        for symbol in index.symbols().filter(|s| s.kind == kind) {
                            if pattern.is_match(&symbol.name) {
                                continue;
                            }
                            let mut diagnostic = Diagnostic::warning(
                                Category::Naming,
                                "naming.symbol_pattern",
                                format!("{} '{}' does not match /{}/", kind.as_str(), symbol.name, source),
                            )
                            .at(symbol.location.file_path.clone(), Some(symbol.location.start_line));
                            if let Some(owner) = ctx.project.script_owner(&symbol.location.file_path) {
                                diagnostic = diagnostic.for_asset(owner.name.clone());
                            }
                            out.push(diagnostic);
                        }
                    }
                }
                None => failures.push("symbol naming rules need a symbol index".to_string()),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(IndexerError::Config(failures.join("; ")))
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| IndexerError::Config(format!("invalid naming pattern /{pattern}/: {e}")))
}

/// Assets nothing else points at.
pub struct OrphanRule {
    pub config: OrphanConfig,
}

impl Rule for OrphanRule {
    fn name(&self) -> &'static str {
        "orphan"
    }

    fn check(&self, ctx: &RuleContext<'_>, out: &mut Vec<Diagnostic>) -> Result<()> {
        let mut allowed = Vec::new();
        let mut unknown = Vec::new();
        for name in &self.config.allow_kinds {
            match AssetKind::from_str(name) {
                Some(kind) => allowed.push(kind),
                None => unknown.push(name.as_str()),
            }
        }

        let start_room = ctx.project.start_room();
        let deep = ctx.graph.mode == GraphMode::Deep;

        for asset in &ctx.project.assets {
            if allowed.contains(&asset.kind)
                || start_room == Some(asset.name.as_str())
                || self.config.entry_assets.iter().any(|e| e == &asset.name)
            {
                continue;
            }
            if ctx.graph.incoming(&asset.name).next().is_some() {
                continue;
            }
            let diagnostic = if deep {
                Diagnostic::warning(
                    Category::Orphan,
                    "orphan.unreferenced",
                    format!("{} '{}' is not referenced by any other asset", asset.kind.as_str(), asset.name),
                )
            } else {
                Diagnostic::info(
                    Category::Orphan,
                    "orphan.unreferenced_shallow",
                    format!(
                        "{} '{}' has no structural references (code references were not scanned)",
                        asset.kind.as_str(),
                        asset.name
                    ),
                )
            };
            out.push(
                diagnostic
                    .at(asset.descriptor_path.clone(), None)
                    .for_asset(asset.name.clone()),
            );
        }

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(IndexerError::Config(format!(
                "unknown asset kind(s) in orphans.allow_kinds: {}",
                unknown.join(", ")
            )))
        }
    }
}

/// Every dangling reference of the graph.
pub struct ReferenceIntegrityRule;

impl Rule for ReferenceIntegrityRule {
    fn name(&self) -> &'static str {
        "reference_integrity"
    }

    fn check(&self, ctx: &RuleContext<'_>, out: &mut Vec<Diagnostic>) -> Result<()> {
        for reference in &ctx.graph.dangling {
            out.push(dangling_diagnostic(ctx.project, reference));
        }
        Ok(())
    }
}

fn dangling_diagnostic(project: &Project, reference: &DanglingReference) -> Diagnostic {
    let code = format!("reference.dangling_{}", reference.relation.as_str());
    let (how, file, line) = match &reference.evidence {
        Evidence::Structural { field } => {
            let file = project
                .asset(&reference.from)
                .map(|a| a.descriptor_path.clone())
                .unwrap_or_default();
            (format!("field {field}"), file, None)
        }
        Evidence::Code { construct, file, line } => {
            (format!("`{construct}`"), file.clone(), Some(*line))
        }
    };
    let message = format!(
        "'{}' references '{}' ({}) via {}, which is not declared in the project",
        reference.from,
        reference.target,
        reference.relation.as_str(),
        how
    );
    let mut diagnostic = if reference.evidence.is_structural() {
        Diagnostic::error(Category::ReferenceIntegrity, code, message)
    } else {
        Diagnostic::warning(Category::ReferenceIntegrity, code, message)
    }
    .for_asset(reference.from.clone());
    if !file.is_empty() {
        diagnostic = diagnostic.at(file, line);
    }
    if let Some(candidate) = suggestion(project, reference) {
        diagnostic = diagnostic.with_fix(format!("did you mean '{candidate}'?"));
    }
    diagnostic
}

/// Closest declared name to a dangling target, among names of the right sort.
fn suggestion<'a>(project: &'a Project, reference: &DanglingReference) -> Option<&'a str> {
    let candidates: Box<dyn Iterator<Item = &'a str> + 'a> = match reference.relation {
        Relation::TextureGroup => Box::new(project.texture_groups.iter().map(String::as_str)),
        Relation::AudioGroup => Box::new(project.audio_groups.iter().map(String::as_str)),
        _ => Box::new(project.assets.iter().map(|a| a.name.as_str())),
    };
    candidates
        .map(|name| (jaro_winkler(name, &reference.target), name))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        // ties resolve to the smaller name for stable output
        .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(a.1)))
        .map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::graph::Edge;
    use crate::project::Project;
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

    fn sample_project(dir: &Path) -> Project {
        create_file(
            dir,
            "Game.yyp",
            r#"{"name":"Game","resources":[
                {"id":{"name":"obj_player","path":"objects/obj_player/obj_player.yy"}},
                {"id":{"name":"enemy","path":"objects/enemy/enemy.yy"}},
                {"id":{"name":"rm_start","path":"rooms/rm_start/rm_start.yy"}},
                {"id":{"name":"ext_steam","path":"extensions/ext_steam/ext_steam.yy"}}
            ],"RoomOrderNodes":[{"roomId":{"name":"rm_start","path":"rooms/rm_start/rm_start.yy"}}]}"#,
        );
        create_file(dir, "objects/obj_player/obj_player.yy", r#"{"name":"obj_player"}"#);
        create_file(dir, "objects/enemy/enemy.yy", r#"{"name":"enemy"}"#);
        create_file(dir, "rooms/rm_start/rm_start.yy", r#"{"name":"rm_start","layers":[]}"#);
        create_file(dir, "extensions/ext_steam/ext_steam.yy", r#"{"name":"ext_steam"}"#);
        Project::load(dir).unwrap()
    }

    fn empty_graph(project: &Project, mode: GraphMode) -> Graph {
        Graph {
            mode,
            nodes: project.summaries(),
            edges: Vec::new(),
            dangling: Vec::new(),
        }
    }

    fn run(rule: &dyn Rule, ctx: &RuleContext<'_>) -> (Vec<Diagnostic>, Result<()>) {
        let mut out = Vec::new();
        let result = rule.check(ctx, &mut out);
        (out, result)
    }

    #[test]
    fn test_naming_prefix_and_pattern() {
        let temp = TempDir::new().unwrap();
        let project = sample_project(temp.path());
        let graph = empty_graph(&project, GraphMode::Shallow);
        let ctx = RuleContext {
            project: &project,
            graph: &graph,
            index: None,
        };

        let rule = NamingRule {
            rules: NamingRules::default()
                .with_asset_prefix("object", "obj_")
                .with_asset_pattern("room", "^rm_[a-z]+$"),
        };
        let (out, result) = run(&rule, &ctx);
        assert!(result.is_ok());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, "naming.asset_prefix");
        assert_eq!(out[0].asset.as_deref(), Some("enemy"));
        assert_eq!(out[0].suggested_fix.as_deref(), Some("rename to 'obj_enemy'"));
    }

    #[test]
    fn test_naming_invalid_pattern_keeps_other_findings() {
        let temp = TempDir::new().unwrap();
        let project = sample_project(temp.path());
        let graph = empty_graph(&project, GraphMode::Shallow);
        let ctx = RuleContext {
            project: &project,
            graph: &graph,
            index: None,
        };

        let rule = NamingRule {
            rules: NamingRules::default()
                .with_asset_prefix("object", "obj_")
                .with_asset_pattern("room", "(unclosed"),
        };
        let (out, result) = run(&rule, &ctx);
        assert!(result.is_err());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_orphans_respect_entries_and_allow_list() {
        let temp = TempDir::new().unwrap();
        let project = sample_project(temp.path());
        let mut graph = empty_graph(&project, GraphMode::Deep);
        graph.edges.push(Edge {
            from: "rm_start".into(),
            to: "obj_player".into(),
            relation: Relation::Places,
            evidence: Evidence::structural("layers.instances.objectId"),
        });
        graph.edges.push(Edge {
            from: "enemy".into(),
            to: "enemy".into(),
            relation: Relation::Calls,
            evidence: Evidence::code("f", "objects/enemy/Step_0.gml", 1),
        });
        let ctx = RuleContext {
            project: &project,
            graph: &graph,
            index: None,
        };

        let (out, result) = run(
            &OrphanRule {
                config: OrphanConfig::default(),
            },
            &ctx,
        );
        assert!(result.is_ok());
        let orphans: Vec<_> = out.iter().map(|d| d.asset.as_deref().unwrap()).collect();
        // start room is an entry, extensions are allowed, self edges do not count
        assert_eq!(orphans, vec!["enemy"]);
        assert_eq!(out[0].code, "orphan.unreferenced");
    }

    #[test]
    fn test_shallow_orphans_are_info() {
        let temp = TempDir::new().unwrap();
        let project = sample_project(temp.path());
        let graph = empty_graph(&project, GraphMode::Shallow);
        let ctx = RuleContext {
            project: &project,
            graph: &graph,
            index: None,
        };
        let (out, _) = run(
            &OrphanRule {
                config: OrphanConfig {
                    allow_kinds: Vec::new(),
                    entry_assets: vec!["obj_player".into()],
                },
            },
            &ctx,
        );
        let codes: Vec<_> = out.iter().map(|d| (d.asset.as_deref().unwrap(), d.code.as_str())).collect();
        assert!(codes.contains(&("enemy", "orphan.unreferenced_shallow")));
        assert!(codes.contains(&("ext_steam", "orphan.unreferenced_shallow")));
        assert!(!codes.iter().any(|(name, _)| *name == "obj_player" || *name == "rm_start"));
    }

    #[test]
    fn test_dangling_severity_and_suggestion() {
        let temp = TempDir::new().unwrap();
        let project = sample_project(temp.path());
        let mut graph = empty_graph(&project, GraphMode::Deep);
        graph.dangling.push(DanglingReference {
            from: "enemy".into(),
            target: "obj_playr".into(),
            relation: Relation::Parent,
            evidence: Evidence::structural("parentObjectId"),
        });
        graph.dangling.push(DanglingReference {
            from: "obj_player".into(),
            target: "obj_zzz_unknown_thing".into(),
            relation: Relation::Instantiates,
            evidence: Evidence::code("instance_create", "objects/obj_player/Create_0.gml", 3),
        });
        let ctx = RuleContext {
            project: &project,
            graph: &graph,
            index: None,
        };

        let (out, result) = run(&ReferenceIntegrityRule, &ctx);
        assert!(result.is_ok());
        assert_eq!(out[0].code, "reference.dangling_parent");
        assert_eq!(out[0].severity, Severity::Error);
        assert_eq!(out[0].suggested_fix.as_deref(), Some("did you mean 'obj_player'?"));
        assert_eq!(out[0].location.as_ref().unwrap().file, "objects/enemy/enemy.yy");

        assert_eq!(out[1].code, "reference.dangling_instantiates");
        assert_eq!(out[1].severity, Severity::Warning);
        assert_eq!(out[1].location.as_ref().unwrap().line, Some(3));
        assert!(out[1].suggested_fix.is_none());
    }
}
