use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::hashing::asset_guid_for_path;
use super::host::{ObjectId, ObjectOrigin, Transform, Vec3};
use super::stable_id::GlobalObjectId;
use super::world::{ObjectSpec, SceneWorld};

/// JSON description of an editor scene and the prefab assets it can see.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneDescription {
    pub scene_guid: String,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    pub file_id: u64,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub prefab_instance: Option<u64>,
    #[serde(default)]
    pub prefab_asset: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub components: Vec<ComponentDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentDescription {
    #[serde(rename = "type")]
    pub type_name: String,
    pub file_id: u64,
}

#[derive(Debug, Error)]
pub enum SceneFixtureError {
    #[error("failed to read scene description {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene description: {message}")]
    Parse { message: String },
    #[error("object {object} names parent {parent}, which is not declared before it")]
    UnknownParent { object: String, parent: String },
    #[error("object {object} cannot be both a prefab instance and a prefab asset")]
    ConflictingOrigin { object: String },
}

pub fn load_scene_world(path: &Path) -> Result<SceneWorld, SceneFixtureError> {
    let raw = fs::read_to_string(path).map_err(|source| SceneFixtureError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let description = parse_scene_description(&raw)?;
    let world = build_scene_world(&description)?;
    info!(
        path = %path.display(),
        object_count = world.object_count(),
        "scene_description_loaded"
    );
    Ok(world)
}

pub fn parse_scene_description(raw: &str) -> Result<SceneDescription, SceneFixtureError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SceneDescription>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        let message = if path.is_empty() || path == "." {
            source.to_string()
        } else {
            format!("at {path}: {source}")
        };
        SceneFixtureError::Parse { message }
    })
}

pub fn build_scene_world(description: &SceneDescription) -> Result<SceneWorld, SceneFixtureError> {
    let mut world = SceneWorld::new(&description.scene_guid);
    let mut declared = HashMap::<String, ObjectId>::new();

    for object in &description.objects {
        let parent = match &object.parent {
            Some(parent_name) => Some(*declared.get(parent_name).ok_or_else(|| {
                SceneFixtureError::UnknownParent {
                    object: object.name.clone(),
                    parent: parent_name.clone(),
                }
            })?),
            None => None,
        };

        let (origin, global_id) = match (&object.prefab_instance, &object.prefab_asset) {
            (Some(_), Some(_)) => {
                return Err(SceneFixtureError::ConflictingOrigin {
                    object: object.name.clone(),
                })
            }
            (Some(instance_id), None) => (
                ObjectOrigin::PrefabInstance,
                GlobalObjectId::prefab_instance_object(
                    &description.scene_guid,
                    object.file_id,
                    *instance_id,
                ),
            ),
            (None, Some(asset_path)) => (
                ObjectOrigin::PrefabAsset {
                    asset_path: asset_path.clone(),
                },
                GlobalObjectId::prefab_asset_object(&asset_guid_for_path(asset_path), object.file_id),
            ),
            (None, None) => (
                ObjectOrigin::Scene,
                GlobalObjectId::scene_object(&description.scene_guid, object.file_id),
            ),
        };

        let id = world.spawn(ObjectSpec {
            name: object.name.clone(),
            tag: object.tag.clone(),
            parent,
            transform: Transform::at(object.position),
            origin,
            global_id,
        });
        for component in &object.components {
            world.add_script_component(id, &component.type_name, component.file_id);
        }
        declared.insert(object.name.clone(), id);
    }

    Ok(world)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scene::SceneHost;

    #[test]
    fn builds_hierarchy_and_components() {
        let raw = json!({
            "scene_guid": "5f1e",
            "objects": [
                { "name": "Rig", "file_id": 1, "prefab_instance": 700 },
                { "name": "Hand", "file_id": 2, "prefab_instance": 700, "parent": "Rig" },
                { "name": "Door", "file_id": 10, "position": [1, 0, 2],
                  "components": [ { "type": "DoorController", "file_id": 11 } ] },
                { "name": "Cup", "file_id": 20, "prefab_asset": "Assets/Cup.prefab" }
            ]
        })
        .to_string();

        let description = parse_scene_description(&raw).expect("parse");
        let world = build_scene_world(&description).expect("build");

        let rig = world.find_by_name("Rig").expect("rig");
        let hand = world.find_by_name("Hand").expect("hand");
        assert_eq!(world.parent(hand), Some(rig));
        assert!(world.is_prefab_instance(hand));
        assert_eq!(world.scene_components().len(), 1);
        assert_eq!(world.prefab_assets().len(), 1);
        let door = world.find_by_name("Door").expect("door");
        assert_eq!(world.position(door), Some(Vec3::new(1.0, 0.0, 2.0)));
    }

    #[test]
    fn parse_error_names_json_path() {
        let raw = r#"{ "scene_guid": "g", "objects": [ { "name": "A", "file_id": "x" } ] }"#;
        let error = parse_scene_description(raw).expect_err("bad file id");
        assert!(error.to_string().contains("objects[0].file_id"), "{error}");
    }

    #[test]
    fn parent_must_be_declared_first() {
        let description = SceneDescription {
            scene_guid: "g".to_string(),
            objects: vec![ObjectDescription {
                name: "Child".to_string(),
                file_id: 1,
                parent: Some("Missing".to_string()),
                prefab_instance: None,
                prefab_asset: None,
                tag: None,
                position: Vec3::ZERO,
                components: Vec::new(),
            }],
        };
        assert!(matches!(
            build_scene_world(&description),
            Err(SceneFixtureError::UnknownParent { .. })
        ));
    }
}
