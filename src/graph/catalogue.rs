//! Code constructs that consume assets, recognised by the deep scan.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use super::Relation;
use crate::project::AssetKind;

/// Which call argument names the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSlot {
    /// Fixed position; an unresolved bare identifier there is reported as dangling
    At(usize),
    /// Any argument may be the asset; nothing is reported when none resolves
    Any,
}

#[derive(Debug, Clone, Copy)]
pub struct CallPattern {
    pub name: &'static str,
    /// `name` is a prefix (`draw_sprite` covers `draw_sprite_ext`, ...)
    pub prefix: bool,
    pub relation: Relation,
    pub slot: ArgSlot,
    pub kinds: &'static [AssetKind],
}

const OBJECTS: &[AssetKind] = &[AssetKind::Object];
const SPRITES: &[AssetKind] = &[AssetKind::Sprite];
const SOUNDS: &[AssetKind] = &[AssetKind::Sound];
const ROOMS: &[AssetKind] = &[AssetKind::Room];
const FONTS: &[AssetKind] = &[AssetKind::Font];
const SHADERS: &[AssetKind] = &[AssetKind::Shader];
const PATHS: &[AssetKind] = &[AssetKind::Path];
const TIMELINES: &[AssetKind] = &[AssetKind::Timeline];
const SEQUENCES: &[AssetKind] = &[AssetKind::Sequence];
const SCRIPTS: &[AssetKind] = &[AssetKind::Script];

const fn call(name: &'static str, relation: Relation, slot: usize, kinds: &'static [AssetKind]) -> CallPattern {
    CallPattern {
        name,
        prefix: false,
        relation,
        slot: ArgSlot::At(slot),
        kinds,
    }
}

const fn family(name: &'static str, relation: Relation, slot: ArgSlot, kinds: &'static [AssetKind]) -> CallPattern {
    CallPattern {
        name,
        prefix: true,
        relation,
        slot,
        kinds,
    }
}

pub static CALL_PATTERNS: &[CallPattern] = &[
    // legacy call; argument order differs between runtime versions
    CallPattern {
        name: "instance_create",
        prefix: false,
        relation: Relation::Instantiates,
        slot: ArgSlot::Any,
        kinds: OBJECTS,
    },
    call("instance_create_layer", Relation::Instantiates, 3, OBJECTS),
    call("instance_create_depth", Relation::Instantiates, 3, OBJECTS),
    call("instance_exists", Relation::UsesObject, 0, OBJECTS),
    call("instance_number", Relation::UsesObject, 0, OBJECTS),
    call("instance_find", Relation::UsesObject, 0, OBJECTS),
    call("instance_nearest", Relation::UsesObject, 2, OBJECTS),
    call("instance_furthest", Relation::UsesObject, 2, OBJECTS),
    call("instance_place", Relation::UsesObject, 2, OBJECTS),
    call("place_meeting", Relation::UsesObject, 2, OBJECTS),
    call("instance_destroy", Relation::UsesObject, 0, OBJECTS),
    call("instance_activate_object", Relation::UsesObject, 0, OBJECTS),
    call("instance_deactivate_object", Relation::UsesObject, 0, OBJECTS),
    call("instance_change", Relation::UsesObject, 0, OBJECTS),
    family("collision_", Relation::UsesObject, ArgSlot::Any, OBJECTS),
    family("draw_sprite", Relation::UsesSprite, ArgSlot::At(0), SPRITES),
    family("sprite_get_", Relation::UsesSprite, ArgSlot::At(0), SPRITES),
    call("audio_play_sound_on", Relation::PlaysSound, 1, SOUNDS),
    family("audio_play_sound", Relation::PlaysSound, ArgSlot::At(0), SOUNDS),
    call("audio_stop_sound", Relation::PlaysSound, 0, SOUNDS),
    call("audio_is_playing", Relation::PlaysSound, 0, SOUNDS),
    call("room_goto", Relation::GoesToRoom, 0, ROOMS),
    call("draw_set_font", Relation::UsesFont, 0, FONTS),
    call("shader_set", Relation::UsesShader, 0, SHADERS),
    call("path_start", Relation::FollowsPath, 0, PATHS),
    call("layer_sequence_create", Relation::PlaysSequence, 3, SEQUENCES),
    call("script_execute", Relation::Calls, 0, SCRIPTS),
];

/// Pattern for a called function name; exact names win over prefixes, longer prefixes over shorter.
pub fn match_call(name: &str) -> Option<&'static CallPattern> {
    CALL_PATTERNS
        .iter()
        .find(|p| !p.prefix && p.name == name)
        .or_else(|| {
            CALL_PATTERNS
                .iter()
                .filter(|p| p.prefix && name.starts_with(p.name))
                .max_by_key(|p| p.name.len())
        })
}

/// `variable = asset` assignments.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentPattern {
    pub variable: &'static str,
    pub relation: Relation,
    pub kinds: &'static [AssetKind],
}

pub static ASSIGNMENT_PATTERNS: &[AssignmentPattern] = &[
    AssignmentPattern {
        variable: "sprite_index",
        relation: Relation::UsesSprite,
        kinds: SPRITES,
    },
    AssignmentPattern {
        variable: "mask_index",
        relation: Relation::UsesSprite,
        kinds: SPRITES,
    },
    AssignmentPattern {
        variable: "room",
        relation: Relation::GoesToRoom,
        kinds: ROOMS,
    },
    AssignmentPattern {
        variable: "timeline_index",
        relation: Relation::RunsTimeline,
        kinds: TIMELINES,
    },
];

pub fn match_assignment(variable: &str) -> Option<&'static AssignmentPattern> {
    ASSIGNMENT_PATTERNS.iter().find(|p| p.variable == variable)
}

/// Built-in names that are valid in asset slots but are never assets.
pub static BUILTIN_IDENTIFIERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "all",
        "noone",
        "self",
        "other",
        "id",
        "undefined",
        "true",
        "false",
        "global",
        "object_index",
        "sprite_index",
        "mask_index",
        "room",
        "room_first",
        "room_last",
        "timeline_index",
        "path_index",
        "layer",
        "x",
        "y",
        "depth",
        "pi",
        "infinity",
        "NaN",
        "argument",
        "argument0",
        "argument1",
        "argument2",
        "argument3",
    ]
    .into_iter()
    .collect()
});
