use std::fmt;

use tracing::warn;

pub const GLOBAL_OBJECT_ID_PREFIX: &str = "GlobalObjectId_V1";

/// Identifier type tag used by the host: 1 = imported asset, 2 = scene object,
/// 3 = source asset.
pub const ID_TYPE_IMPORTED_ASSET: u8 = 1;
pub const ID_TYPE_SCENE_OBJECT: u8 = 2;
pub const ID_TYPE_SOURCE_ASSET: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalObjectId {
    pub identifier_type: u8,
    pub asset_guid: String,
    pub target_object_id: u64,
    pub target_prefab_id: u64,
}

impl GlobalObjectId {
    pub fn scene_object(scene_guid: &str, file_id: u64) -> Self {
        Self {
            identifier_type: ID_TYPE_SCENE_OBJECT,
            asset_guid: scene_guid.to_string(),
            target_object_id: file_id,
            target_prefab_id: 0,
        }
    }

    /// Objects inside one prefab instance share `prefab_instance_id`;
    /// `source_file_id` is the object's id inside the source prefab.
    pub fn prefab_instance_object(
        scene_guid: &str,
        source_file_id: u64,
        prefab_instance_id: u64,
    ) -> Self {
        Self {
            identifier_type: ID_TYPE_SCENE_OBJECT,
            asset_guid: scene_guid.to_string(),
            target_object_id: source_file_id,
            target_prefab_id: prefab_instance_id,
        }
    }

    pub fn prefab_asset_object(asset_guid: &str, file_id: u64) -> Self {
        Self {
            identifier_type: ID_TYPE_SOURCE_ASSET,
            asset_guid: asset_guid.to_string(),
            target_object_id: file_id,
            target_prefab_id: 0,
        }
    }
}

impl fmt::Display for GlobalObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{GLOBAL_OBJECT_ID_PREFIX}-{}-{}-{}-{}",
            self.identifier_type, self.asset_guid, self.target_object_id, self.target_prefab_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableIdSubject {
    GameObject { in_loaded_prefab_instance: bool },
    Component,
}

/// Derives the scene-file id from a raw global object id string.
///
/// Objects that belong to a prefab instance in a loaded scene report the
/// instance id (last segment); every other object and every component
/// reports its own target id (second-to-last segment).
pub fn derive_file_id(raw: &str, subject: StableIdSubject) -> Option<i64> {
    let parts = raw.split('-').collect::<Vec<_>>();
    if parts.len() < 2 {
        warn!(global_object_id = raw, "global_object_id_format_unexpected");
        return None;
    }

    let segment = match subject {
        StableIdSubject::GameObject {
            in_loaded_prefab_instance: true,
        } => parts[parts.len() - 1],
        StableIdSubject::GameObject {
            in_loaded_prefab_instance: false,
        }
        | StableIdSubject::Component => parts[parts.len() - 2],
    };

    match segment.parse::<i64>() {
        Ok(file_id) => Some(file_id),
        Err(_) => {
            warn!(global_object_id = raw, segment, "file_id_parse_failed");
            None
        }
    }
}
