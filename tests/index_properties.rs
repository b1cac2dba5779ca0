//! Symbol index persistence and incremental update behaviour.

mod common;

use std::fs;

use common::TestProject;
use gml_indexer::{
    BuildStatus, IndexOptions, Project, SymbolFilter, SymbolIndex, SymbolKind, Workspace,
};

fn sample() -> TestProject {
    let mut project = TestProject::new();
    project
        .script(
            "scr_math",
            "/// Clamp to [0, 1]\nfunction saturate(v) {\n    return clamp(v, 0, 1);\n}\n#macro EPSILON 0.0001\n",
        )
        .script(
            "scr_state",
            "enum GameState {\n    Title,\n    Playing = 5,\n    Paused\n}\nglobalvar g_state;\nglobal.lives = 3;\nfunction Player(_x, _y) constructor {\n    x = _x;\n}\n",
        )
        .object("obj_game", None)
        .write("objects/obj_game/Create_0.gml", "global.score = 0;\nstate = GameState.Title;\n");
    project
}

#[test]
fn test_build_is_idempotent() {
    let project = sample();

    let workspace = Workspace::open(project.path()).unwrap();
    let (_, first) = workspace.build_index(false).unwrap();
    assert_eq!(first.status, BuildStatus::Built);
    let bytes_first = fs::read(project.index_file()).unwrap();
    let defs_first = workspace.find_definition("saturate").unwrap();
    let list_first = workspace.list_symbols(&SymbolFilter::default()).unwrap();

    let workspace = Workspace::open(project.path()).unwrap();
    let (_, second) = workspace.build_index(false).unwrap();
    assert_eq!(second.status, BuildStatus::Cached);
    assert_eq!(fs::read(project.index_file()).unwrap(), bytes_first);
    assert_eq!(workspace.find_definition("saturate").unwrap(), defs_first);
    assert_eq!(workspace.list_symbols(&SymbolFilter::default()).unwrap(), list_first);

    let (_, forced) = workspace.build_index(true).unwrap();
    assert_eq!(forced.status, BuildStatus::Built);
    assert_eq!(fs::read(project.index_file()).unwrap(), bytes_first);
}

#[test]
fn test_index_contents() {
    let project = sample();
    let workspace = Workspace::open(project.path()).unwrap();

    let kinds = |kind| {
        workspace
            .list_symbols(&SymbolFilter::default().kind(kind))
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect::<Vec<_>>()
    };
    assert_eq!(kinds(SymbolKind::Function), vec!["saturate"]);
    assert_eq!(kinds(SymbolKind::Constructor), vec!["Player"]);
    assert_eq!(kinds(SymbolKind::Macro), vec!["EPSILON"]);
    assert_eq!(kinds(SymbolKind::Enum), vec!["GameState"]);
    assert_eq!(kinds(SymbolKind::EnumMember), vec!["Paused", "Playing", "Title"]);
    assert_eq!(kinds(SymbolKind::GlobalVariable), vec!["g_state", "lives", "score"]);
}

#[test]
fn test_single_file_update_matches_full_rebuild() {
    let mut project = sample();
    let opts = IndexOptions::default();

    let loaded = Project::load(project.path()).unwrap();
    let (before, _) = SymbolIndex::build(&loaded, &opts).unwrap();

    project.write(
        "scripts/scr_math/scr_math.gml",
        "function saturate(v) {\n    return clamp(v, 0, 1);\n}\nfunction lerp3(a, b, c, t) {\n    return lerp(lerp(a, b, t), c, t);\n}\n",
    );
    let loaded = Project::load(project.path()).unwrap();

    let changed = vec!["scripts/scr_math/scr_math.gml".to_string()];
    let (updated, stats) = before.update(&loaded, &changed, &opts).unwrap();
    let (rebuilt, _) = SymbolIndex::build(&loaded, &opts).unwrap();

    assert_eq!(stats.files_extracted, 1);
    assert_eq!(updated, rebuilt);
    assert_eq!(
        updated.file_symbols("scripts/scr_math/scr_math.gml"),
        rebuilt.file_symbols("scripts/scr_math/scr_math.gml")
    );
    // unaffected entries are shared with the previous snapshot
    assert!(updated.shares_entry(&before, "scripts/scr_state/scr_state.gml"));
    // the old snapshot is untouched
    assert_eq!(before.lookup("lerp3").len(), 0);
    assert_eq!(updated.lookup("lerp3").len(), 1);
}

#[test]
fn test_deleted_script_leaves_index() {
    let mut project = sample();
    let workspace = Workspace::open(project.path()).unwrap();
    workspace.build_index(false).unwrap();
    assert_eq!(workspace.find_definition("Player").unwrap().len(), 1);

    project.delete_asset("scr_state");

    let workspace = Workspace::open(project.path()).unwrap();
    let (_, report) = workspace.build_index(false).unwrap();
    assert_eq!(report.status, BuildStatus::Incremental);
    assert_eq!(report.files_removed, 1);
    assert!(workspace.find_definition("Player").unwrap().is_empty());
}

#[test]
fn test_corrupt_index_is_rebuilt() {
    let mut project = sample();
    let workspace = Workspace::open(project.path()).unwrap();
    workspace.build_index(false).unwrap();

    let index_file = project.index_file();
    project.write(".gml-indexer/symbols.json", "{ not json");
    assert!(index_file.exists());

    let workspace = Workspace::open(project.path()).unwrap();
    let (_, report) = workspace.build_index(false).unwrap();
    assert_eq!(report.status, BuildStatus::Built);
    assert_eq!(workspace.find_definition("saturate").unwrap().len(), 1);
}

#[test]
fn test_results_independent_of_worker_count() {
    let project = sample();
    let loaded = Project::load(project.path()).unwrap();

    let (one, _) = SymbolIndex::build(&loaded, &IndexOptions::default().with_workers(1)).unwrap();
    let (many, _) = SymbolIndex::build(&loaded, &IndexOptions::default().with_workers(8)).unwrap();
    assert_eq!(one, many);
}
