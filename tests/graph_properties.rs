//! Determinism, fidelity and orphan behaviour of the asset graph.

mod common;

use common::TestProject;
use gml_indexer::config::OrphanConfig;
use gml_indexer::{
    build_deep, build_shallow, DiagnosticsEngine, Graph, IndexOptions, NamingRules, Project, Relation,
};

fn sample() -> TestProject {
    let mut project = TestProject::new();
    project
        .object("obj_actor", None)
        .object("obj_player", Some("obj_actor"))
        .object("obj_bullet", None)
        .asset(
            "sprites",
            "spr_player",
            r#"{"resourceType":"GMSprite","name":"spr_player","frames":[]}"#,
        )
        .asset(
            "sounds",
            "snd_shoot",
            r#"{"resourceType":"GMSound","name":"snd_shoot","soundFile":"snd_shoot.wav"}"#,
        )
        .asset(
            "rooms",
            "rm_main",
            r#"{"resourceType":"GMRoom","name":"rm_main","layers":[
                {"resourceType":"GMRInstanceLayer","name":"Instances","instances":[
                    {"name":"inst_1","objectId":{"name":"obj_player","path":"objects/obj_player/obj_player.yy"}}
                ]}
            ]}"#,
        )
        .write(
            "objects/obj_player/Step_0.gml",
            "if (mouse_check_button_pressed(mb_left)) {\n    var b = instance_create_layer(x, y, \"Bullets\", obj_bullet);\n    b.direction = point_direction(x, y, mouse_x, mouse_y);\n    audio_play_sound(snd_shoot, 10, false);\n}\nsprite_index = spr_player;\n",
        )
        .script(
            "scr_helpers",
            "function fire_at(target) {\n    with (obj_bullet) {\n        speed = 8;\n    }\n}\n",
        );
    project
}

#[test]
fn test_graphs_are_deterministic() {
    let project = sample();
    let loaded = Project::load(project.path()).unwrap();

    assert_eq!(build_shallow(&loaded), build_shallow(&loaded));

    let one = build_deep(&loaded, None, &IndexOptions::default().with_workers(1)).unwrap();
    let eight = build_deep(&loaded, None, &IndexOptions::default().with_workers(8)).unwrap();
    assert_eq!(one, eight);
    assert_eq!(
        serde_json::to_vec(&one).unwrap(),
        serde_json::to_vec(&eight).unwrap()
    );
}

#[test]
fn test_deep_contains_every_shallow_edge() {
    let project = sample();
    let loaded = Project::load(project.path()).unwrap();

    let shallow = build_shallow(&loaded);
    let deep = build_deep(&loaded, None, &IndexOptions::default()).unwrap();

    assert!(shallow.has_edge("obj_player", "obj_actor", Relation::Parent));
    assert!(shallow.has_edge("rm_main", "obj_player", Relation::Places));
    for edge in &shallow.edges {
        assert!(deep.edges.contains(edge), "deep graph lost {edge:?}");
    }

    assert!(deep.has_edge("obj_player", "obj_bullet", Relation::Instantiates));
    assert!(deep.has_edge("obj_player", "snd_shoot", Relation::PlaysSound));
    assert!(deep.has_edge("obj_player", "spr_player", Relation::UsesSprite));
    assert!(deep.has_edge("scr_helpers", "obj_bullet", Relation::UsesObject));
    assert!(deep.dangling.is_empty(), "{:?}", deep.dangling);
}

#[test]
fn test_code_only_reference_is_orphan_only_in_shallow_mode() {
    let project = sample();
    let loaded = Project::load(project.path()).unwrap();
    let engine = DiagnosticsEngine::new(NamingRules::default(), OrphanConfig::default());

    let orphans = |graph: &Graph| {
        engine
            .run(&loaded, graph, None)
            .into_iter()
            .filter(|d| d.code.starts_with("orphan."))
            .map(|d| (d.asset.unwrap_or_default(), d.code))
            .collect::<Vec<_>>()
    };

    let shallow = build_shallow(&loaded);
    let shallow_orphans = orphans(&shallow);
    assert!(shallow_orphans.contains(&("obj_bullet".to_string(), "orphan.unreferenced_shallow".to_string())));
    assert!(shallow_orphans.contains(&("snd_shoot".to_string(), "orphan.unreferenced_shallow".to_string())));

    let deep = build_deep(&loaded, None, &IndexOptions::default()).unwrap();
    let deep_orphans = orphans(&deep);
    let names: Vec<_> = deep_orphans.iter().map(|(name, _)| name.as_str()).collect();
    assert!(!names.contains(&"obj_bullet"));
    assert!(!names.contains(&"snd_shoot"));
    // the start room is an entry point; nothing references the helper script
    assert_eq!(names, vec!["scr_helpers"]);
    assert!(deep_orphans.iter().all(|(_, code)| code == "orphan.unreferenced"));
}
