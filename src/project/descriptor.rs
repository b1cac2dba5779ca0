//! Typed views of `.yy` asset descriptors.
//!
//! Kinds with structural references get a typed variant; every typed variant
//! keeps unrecognised fields in `extra`, and all other kinds stay `Raw`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::asset::AssetKind;
use super::json::parse_loose;

/// `{ "name": ..., "path": ... }` pointer to another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
    #[serde(default)]
    pub path: String,
}

impl ResourceRef {
    /// Accepts the object form or the stringified form the IDE uses inside `ConfigValues`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => {
                let name = map.get("name")?.as_str()?;
                if name.is_empty() {
                    return None;
                }
                let path = map.get("path").and_then(Value::as_str).unwrap_or_default();
                Some(Self {
                    name: name.to_string(),
                    path: path.to_string(),
                })
            }
            Value::String(raw) => {
                let raw = raw.trim();
                if !(raw.starts_with('{') && raw.ends_with('}')) {
                    return None;
                }
                let parsed = parse_loose(raw).ok()?;
                Self::from_value(&parsed)
            }
            _ => None,
        }
    }

    /// Top-level directory of the referenced path (`objects`, `folders`, `texturegroups`...).
    pub fn path_root(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }
}

fn lenient_ref<'de, D>(deserializer: D) -> Result<Option<ResourceRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(ResourceRef::from_value))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub name: String,
    #[serde(rename = "parentObjectId", default, deserialize_with = "lenient_ref")]
    pub parent_object: Option<ResourceRef>,
    #[serde(rename = "spriteId", default, deserialize_with = "lenient_ref")]
    pub sprite: Option<ResourceRef>,
    #[serde(rename = "spriteMaskId", default, deserialize_with = "lenient_ref")]
    pub sprite_mask: Option<ResourceRef>,
    #[serde(rename = "eventList", default)]
    pub events: Vec<ObjectEvent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEvent {
    #[serde(rename = "eventType", default)]
    pub event_type: i64,
    #[serde(rename = "eventNum", default)]
    pub event_num: i64,
    #[serde(rename = "collisionObjectId", default, deserialize_with = "lenient_ref")]
    pub collision_object: Option<ResourceRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteDescriptor {
    pub name: String,
    #[serde(rename = "textureGroupId", default, deserialize_with = "lenient_ref")]
    pub texture_group: Option<ResourceRef>,
    pub frames: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundDescriptor {
    pub name: String,
    #[serde(rename = "audioGroupId", default, deserialize_with = "lenient_ref")]
    pub audio_group: Option<ResourceRef>,
    #[serde(rename = "soundFile")]
    pub sound_file: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDescriptor {
    pub name: String,
    #[serde(rename = "parentRoom", default, deserialize_with = "lenient_ref")]
    pub parent_room: Option<ResourceRef>,
    pub layers: Vec<RoomLayer>,
    #[serde(rename = "creationCodeFile", default)]
    pub creation_code_file: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomLayer {
    #[serde(rename = "resourceType", default)]
    pub resource_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub instances: Vec<RoomInstance>,
    #[serde(rename = "spriteId", default, deserialize_with = "lenient_ref")]
    pub sprite: Option<ResourceRef>,
    #[serde(rename = "tilesetId", default, deserialize_with = "lenient_ref")]
    pub tileset: Option<ResourceRef>,
    #[serde(default)]
    pub layers: Vec<RoomLayer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInstance {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "objectId", default, deserialize_with = "lenient_ref")]
    pub object: Option<ResourceRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetDescriptor {
    pub name: String,
    #[serde(rename = "spriteId", default, deserialize_with = "lenient_ref")]
    pub sprite: Option<ResourceRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Closed set of descriptor shapes; `Raw` keeps unmodelled kinds verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Descriptor {
    Object(ObjectDescriptor),
    Sprite(SpriteDescriptor),
    Sound(SoundDescriptor),
    Room(RoomDescriptor),
    Tileset(TilesetDescriptor),
    Raw(Map<String, Value>),
}

impl Descriptor {
    /// Decodes a parsed descriptor for `kind`.
    ///
    /// Never fails: a typed decoding problem is returned alongside a `Raw`
    /// fallback so that the rest of the project still loads.
    pub fn decode(kind: AssetKind, value: Value) -> (Descriptor, Option<String>) {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return (
                    Descriptor::Raw(Map::new()),
                    Some(format!("expected a JSON object, found {}", json_type_name(&other))),
                )
            }
        };

        if !map.get("name").map(Value::is_string).unwrap_or(false) {
            return (Descriptor::Raw(map), Some("missing field `name`".to_string()));
        }

        let typed = match kind {
            AssetKind::Object => decode_as(&map).map(Descriptor::Object),
            AssetKind::Sprite => decode_as(&map).map(Descriptor::Sprite),
            AssetKind::Sound => decode_as(&map).map(Descriptor::Sound),
            AssetKind::Room => decode_as(&map).map(Descriptor::Room),
            AssetKind::Tileset => decode_as(&map).map(Descriptor::Tileset),
            _ => return (Descriptor::Raw(map), None),
        };

        match typed {
            Ok(descriptor) => (descriptor, None),
            Err(e) => (Descriptor::Raw(map), Some(e.to_string())),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Descriptor::Object(d) => Some(&d.name),
            Descriptor::Sprite(d) => Some(&d.name),
            Descriptor::Sound(d) => Some(&d.name),
            Descriptor::Room(d) => Some(&d.name),
            Descriptor::Tileset(d) => Some(&d.name),
            Descriptor::Raw(map) => map.get("name").and_then(Value::as_str),
        }
    }

    /// Field not modelled by the typed variant (or any field of a `Raw` descriptor).
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Descriptor::Object(d) => d.extra.get(key),
            Descriptor::Sprite(d) => d.extra.get(key),
            Descriptor::Sound(d) => d.extra.get(key),
            Descriptor::Room(d) => d.extra.get(key),
            Descriptor::Tileset(d) => d.extra.get(key),
            Descriptor::Raw(map) => map.get(key),
        }
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.field("resourceType").and_then(Value::as_str)
    }

    /// Folder the IDE shows the asset under (`parent` field).
    pub fn folder(&self) -> Option<ResourceRef> {
        self.field("parent").and_then(ResourceRef::from_value)
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Descriptor::Raw(_))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn decode_as<T: serde::de::DeserializeOwned>(map: &Map<String, Value>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(map.clone()))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
