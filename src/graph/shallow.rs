//! Structural edges read from descriptor fields.

use serde_json::{Map, Value};

use super::{Evidence, Graph, GraphBuilder, GraphMode, Relation};
use crate::project::{Asset, AssetKind, Descriptor, Project, ResourceRef, RoomLayer};

/// Graph of descriptor-level references only.
pub fn build_shallow(project: &Project) -> Graph {
    let mut builder = GraphBuilder::new();
    add_structural_edges(project, &mut builder);
    builder.finish(GraphMode::Shallow, project)
}

pub(crate) fn add_structural_edges(project: &Project, builder: &mut GraphBuilder) {
    for asset in &project.assets {
        let Some(descriptor) = &asset.descriptor else {
            continue;
        };
        let from = asset.name.as_str();

        match descriptor {
            Descriptor::Object(object) => {
                link_ref(project, builder, from, object.parent_object.as_ref(), Relation::Parent, "parentObjectId");
                link_ref(project, builder, from, object.sprite.as_ref(), Relation::Sprite, "spriteId");
                link_ref(project, builder, from, object.sprite_mask.as_ref(), Relation::Mask, "spriteMaskId");
                for event in &object.events {
                    link_ref(
                        project,
                        builder,
                        from,
                        event.collision_object.as_ref(),
                        Relation::Collision,
                        "eventList.collisionObjectId",
                    );
                }
            }
            Descriptor::Room(room) => {
                link_ref(project, builder, from, room.parent_room.as_ref(), Relation::Parent, "parentRoom");
                room_layers(project, builder, from, &room.layers);
            }
            Descriptor::Tileset(tileset) => {
                link_ref(project, builder, from, tileset.sprite.as_ref(), Relation::Sprite, "spriteId");
            }
            Descriptor::Sprite(sprite) => {
                check_group(
                    builder,
                    from,
                    sprite.texture_group.as_ref(),
                    &project.texture_groups,
                    Relation::TextureGroup,
                    "textureGroupId",
                );
            }
            Descriptor::Sound(sound) => {
                check_group(
                    builder,
                    from,
                    sound.audio_group.as_ref(),
                    &project.audio_groups,
                    Relation::AudioGroup,
                    "audioGroupId",
                );
            }
            Descriptor::Raw(map) => raw_references(project, builder, asset, map),
        }
    }
}

fn link_ref(
    project: &Project,
    builder: &mut GraphBuilder,
    from: &str,
    target: Option<&ResourceRef>,
    relation: Relation,
    field: &str,
) {
    if let Some(target) = target {
        builder.link(project, from, &target.name, relation, Evidence::structural(field));
    }
}

fn room_layers(project: &Project, builder: &mut GraphBuilder, from: &str, layers: &[RoomLayer]) {
    for layer in layers {
        for instance in &layer.instances {
            link_ref(
                project,
                builder,
                from,
                instance.object.as_ref(),
                Relation::Places,
                "layers.instances.objectId",
            );
        }
        link_ref(project, builder, from, layer.sprite.as_ref(), Relation::Sprite, "layers.spriteId");
        link_ref(project, builder, from, layer.tileset.as_ref(), Relation::Tileset, "layers.tilesetId");
        room_layers(project, builder, from, &layer.layers);
    }
}

/// Groups are manifest declarations, not assets: undeclared ones are dangling, declared ones add no edge.
fn check_group(
    builder: &mut GraphBuilder,
    from: &str,
    group: Option<&ResourceRef>,
    declared: &[String],
    relation: Relation,
    field: &str,
) {
    // manifests without group tables predate them; nothing to check against
    if declared.is_empty() {
        return;
    }
    if let Some(group) = group {
        if !declared.iter().any(|g| g == &group.name) {
            builder.dangling(from, &group.name, relation, Evidence::structural(field));
        }
    }
}

/// Any nested `{name, path}` pointing into an asset directory.
fn raw_references(project: &Project, builder: &mut GraphBuilder, asset: &Asset, map: &Map<String, Value>) {
    let mut found = Vec::new();
    for (key, value) in map {
        // `parent` is the IDE folder
        if key == "parent" {
            continue;
        }
        collect_refs(value, key, &mut found);
    }
    for (field, target) in found {
        builder.link(project, &asset.name, &target.name, Relation::References, Evidence::structural(field));
    }
}

fn collect_refs(value: &Value, field: &str, found: &mut Vec<(String, ResourceRef)>) {
    match value {
        Value::Object(map) => {
            if let Some(target) = ResourceRef::from_value(value) {
                if AssetKind::from_descriptor_path(&target.path).is_some() {
                    found.push((field.to_string(), target));
                    return;
                }
            }
            for (key, child) in map {
                collect_refs(child, &format!("{field}.{key}"), found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, field, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn resource(name: &str, dir: &str) -> String {
        format!(r#"{{"id":{{"name":"{name}","path":"{dir}/{name}/{name}.yy"}}}}"#)
    }

    #[test]
    fn test_structural_edges() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let resources = [
            resource("obj_player", "objects"),
            resource("obj_enemy", "objects"),
            resource("spr_enemy", "sprites"),
            resource("rm_level", "rooms"),
            resource("ts_ground", "tilesets"),
            resource("seq_intro", "sequences"),
        ]
        .join(",");
        create_file(
            dir,
            "Game.yyp",
            &format!(r#"{{"name":"Game","resources":[{resources}],"TextureGroups":[{{"name":"Default"}}]}}"#),
        );
        create_file(dir, "objects/obj_player/obj_player.yy", r#"{"name":"obj_player","eventList":[]}"#);
        create_file(
            dir,
            "objects/obj_enemy/obj_enemy.yy",
            r#"{"name":"obj_enemy",
                "parentObjectId":{"name":"obj_player","path":"objects/obj_player/obj_player.yy"},
                "spriteId":{"name":"spr_enemy","path":"sprites/spr_enemy/spr_enemy.yy"},
                "eventList":[{"eventType":4,"eventNum":0,"collisionObjectId":{"name":"obj_wall","path":"objects/obj_wall/obj_wall.yy"}}]}"#,
        );
        create_file(
            dir,
            "sprites/spr_enemy/spr_enemy.yy",
            r#"{"name":"spr_enemy","frames":[],"textureGroupId":{"name":"tg_missing","path":"texturegroups/tg_missing"}}"#,
        );
        create_file(
            dir,
            "rooms/rm_level/rm_level.yy",
            r#"{"name":"rm_level","layers":[
                {"resourceType":"GMRInstanceLayer","name":"Instances","instances":[
                    {"name":"i1","objectId":{"name":"obj_enemy","path":"objects/obj_enemy/obj_enemy.yy"}}]},
                {"resourceType":"GMRTileLayer","name":"Tiles","tilesetId":{"name":"ts_ground","path":"tilesets/ts_ground/ts_ground.yy"}}
            ]}"#,
        );
        create_file(
            dir,
            "tilesets/ts_ground/ts_ground.yy",
            r#"{"name":"ts_ground","spriteId":{"name":"spr_enemy","path":"sprites/spr_enemy/spr_enemy.yy"}}"#,
        );
        create_file(
            dir,
            "sequences/seq_intro/seq_intro.yy",
            r#"{"name":"seq_intro","parent":{"name":"Seqs","path":"folders/Seqs.yy"},
                "tracks":[{"keyframes":{"Keyframes":[{"Channels":{"0":{"Id":{"name":"obj_player","path":"objects/obj_player/obj_player.yy"}}}}]}}]}"#,
        );

        let project = Project::load(dir).unwrap();
        let graph = build_shallow(&project);

        assert_eq!(graph.mode, GraphMode::Shallow);
        assert!(graph.has_edge("obj_enemy", "obj_player", Relation::Parent));
        assert!(graph.has_edge("obj_enemy", "spr_enemy", Relation::Sprite));
        assert!(graph.has_edge("rm_level", "obj_enemy", Relation::Places));
        assert!(graph.has_edge("rm_level", "ts_ground", Relation::Tileset));
        assert!(graph.has_edge("ts_ground", "spr_enemy", Relation::Sprite));
        assert!(graph.has_edge("seq_intro", "obj_player", Relation::References));

        let dangling: Vec<_> = graph
            .dangling
            .iter()
            .map(|d| (d.from.as_str(), d.target.as_str(), d.relation))
            .collect();
        assert_eq!(
            dangling,
            vec![
                ("obj_enemy", "obj_wall", Relation::Collision),
                ("spr_enemy", "tg_missing", Relation::TextureGroup),
            ]
        );

        let names: Vec<_> = graph.nodes.iter().map(|n| n.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
