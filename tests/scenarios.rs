//! End-to-end scenarios through the workspace facade.

mod common;

use common::TestProject;
use gml_indexer::{Evidence, GraphMode, Relation, Severity, Workspace};

#[test]
fn test_parent_edge_becomes_dangling_after_delete() {
    let mut project = TestProject::new();
    project
        .object("obj_player", None)
        .object("obj_enemy", Some("obj_player"));

    let workspace = Workspace::open(project.path()).unwrap();
    let graph = workspace.asset_graph(GraphMode::Shallow).unwrap();
    let edge = graph
        .edges
        .iter()
        .find(|e| e.from == "obj_enemy" && e.to == "obj_player")
        .expect("parent edge");
    assert_eq!(edge.relation, Relation::Parent);
    assert_eq!(edge.evidence, Evidence::structural("parentObjectId"));
    assert!(graph.dangling.is_empty());

    project.delete_asset("obj_player");

    let workspace = Workspace::open(project.path()).unwrap();
    let graph = workspace.asset_graph(GraphMode::Shallow).unwrap();
    assert!(graph.edges.is_empty());
    assert_eq!(graph.dangling.len(), 1);

    let diagnostics = workspace.run_diagnostics(GraphMode::Shallow, true).unwrap();
    let dangling = diagnostics
        .iter()
        .find(|d| d.code == "reference.dangling_parent")
        .expect("dangling parent diagnostic");
    assert_eq!(dangling.severity, Severity::Error);
    assert_eq!(dangling.asset.as_deref(), Some("obj_enemy"));
    assert_eq!(
        dangling.location.as_ref().map(|l| l.file.as_str()),
        Some("objects/obj_enemy/obj_enemy.yy")
    );
    // errors sort first
    assert_eq!(diagnostics[0].code, "reference.dangling_parent");
}

#[test]
fn test_init_script_definition_and_instantiation() {
    let mut project = TestProject::new();
    project.object("obj_enemy", None).script(
        "scr_init",
        "/// Sets up the first wave\nfunction init_game() {\n    instance_create(obj_enemy, 100, 100);\n}\n",
    );

    let workspace = Workspace::open(project.path()).unwrap();

    let hits = workspace.find_definition("init_game").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file, "scripts/scr_init/scr_init.gml");
    assert_eq!(hits[0].asset.as_deref(), Some("scr_init"));
    assert_eq!(hits[0].line, 2);

    let graph = workspace.asset_graph(GraphMode::Deep).unwrap();
    let edge = graph
        .edges
        .iter()
        .find(|e| e.from == "scr_init" && e.to == "obj_enemy")
        .expect("instantiates edge");
    assert_eq!(edge.relation, Relation::Instantiates);
    match &edge.evidence {
        Evidence::Code { construct, file, line } => {
            assert_eq!(construct, "instance_create");
            assert_eq!(file, "scripts/scr_init/scr_init.gml");
            assert_eq!(*line, 3);
        }
        other => panic!("expected code evidence, got {other:?}"),
    }
}

#[test]
fn test_project_info_reports_assets() {
    let mut project = TestProject::new();
    project
        .object("obj_player", None)
        .asset("rooms", "rm_title", r#"{"resourceType":"GMRoom","name":"rm_title","layers":[]}"#)
        .script("scr_init", "function init_game() {}\n");

    let workspace = Workspace::open(project.path()).unwrap();
    let info = workspace.project_info();
    assert_eq!(info.name, "TestGame");
    assert_eq!(info.total_assets, 3);
    assert_eq!(info.room_order, vec!["rm_title".to_string()]);
    assert_eq!(info.asset_counts.get("room"), Some(&1));
}
