use tracing::{error, warn};

use super::IdKind;
use crate::scene::{
    asset_guid_for_path, derive_file_id, ComponentId, ObjectId, SceneHost, StableIdSubject,
};

/// Maps stable plan identifiers to live handles in a host scene. All misses
/// are reported as `None`; nothing here fails loudly.
pub struct IdentifierResolver<'h> {
    host: &'h dyn SceneHost,
}

impl<'h> IdentifierResolver<'h> {
    pub fn new(host: &'h dyn SceneHost) -> Self {
        Self { host }
    }

    pub fn find_object(&self, id: &str, kind: IdKind) -> Option<ObjectId> {
        match kind {
            IdKind::FileId => match id.trim().parse::<i64>() {
                Ok(file_id) => self.find_object_by_file_id(file_id),
                Err(_) => {
                    error!(id, "invalid_file_id");
                    None
                }
            },
            IdKind::Guid => self.find_object_by_guid(id),
        }
    }

    pub fn find_object_by_file_id(&self, file_id: i64) -> Option<ObjectId> {
        if file_id == 0 {
            warn!("file_id_is_zero");
            return None;
        }

        for candidate in self.host.scene_objects() {
            if self.object_file_id(candidate) != Some(file_id) {
                continue;
            }
            if self.host.is_prefab_instance(candidate) {
                return Some(self.topmost_sharing_file_id(candidate, file_id));
            }
            return Some(candidate);
        }

        let matches = self
            .prefab_assets_by_path()
            .into_iter()
            .filter(|(_, prefab)| self.object_file_id(*prefab) == Some(file_id))
            .collect::<Vec<_>>();
        if let Some((path, prefab)) = matches.first() {
            if matches.len() > 1 {
                warn!(
                    file_id,
                    match_count = matches.len(),
                    chosen_path = %path,
                    "prefab_file_id_ambiguous"
                );
            }
            return Some(*prefab);
        }

        warn!(file_id, "object_not_found_for_file_id");
        None
    }

    pub fn find_object_by_guid(&self, guid: &str) -> Option<ObjectId> {
        if guid.is_empty() {
            return None;
        }

        let found = self
            .host
            .scene_objects()
            .into_iter()
            .find(|candidate| self.object_guid(*candidate).as_deref() == Some(guid))
            .or_else(|| {
                self.prefab_assets_by_path()
                    .into_iter()
                    .map(|(_, prefab)| prefab)
                    .find(|prefab| self.object_guid(*prefab).as_deref() == Some(guid))
            });
        if found.is_none() {
            warn!(guid, "object_not_found_for_guid");
        }
        found
    }

    pub fn find_component(&self, id: &str) -> Option<ComponentId> {
        let file_id = match id.trim().parse::<i64>() {
            Ok(file_id) if file_id != 0 => file_id,
            _ => {
                warn!(id, "component_file_id_invalid");
                return None;
            }
        };

        let in_scene = self
            .host
            .scene_components()
            .into_iter()
            .find(|component| self.component_file_id(*component) == Some(file_id));
        if in_scene.is_some() {
            return in_scene;
        }

        for (_, prefab) in self.prefab_assets_by_path() {
            let found = self
                .host
                .prefab_components(prefab)
                .into_iter()
                .find(|component| self.component_file_id(*component) == Some(file_id));
            if found.is_some() {
                return found;
            }
        }

        warn!(file_id, "component_not_found_for_file_id");
        None
    }

    pub fn object_file_id(&self, id: ObjectId) -> Option<i64> {
        let raw = self.host.global_object_id(id)?;
        // Prefab assets live outside any loaded scene.
        let in_loaded_prefab_instance =
            !self.host.is_prefab_asset(id) && self.host.is_prefab_instance(id);
        derive_file_id(
            &raw,
            StableIdSubject::GameObject {
                in_loaded_prefab_instance,
            },
        )
    }

    pub fn component_file_id(&self, id: ComponentId) -> Option<i64> {
        let raw = self.host.component_global_id(id)?;
        derive_file_id(&raw, StableIdSubject::Component)
    }

    pub fn object_guid(&self, id: ObjectId) -> Option<String> {
        match self.host.asset_path(id) {
            Some(asset_path) => Some(asset_guid_for_path(asset_path)),
            None => self.host.global_object_id(id),
        }
    }

    /// Walks up while the parent still reports `file_id`, returning the
    /// highest ancestor that does.
    fn topmost_sharing_file_id(&self, start: ObjectId, file_id: i64) -> ObjectId {
        let mut current = start;
        while let Some(parent) = self.host.parent(current) {
            if self.object_file_id(parent) != Some(file_id) {
                break;
            }
            current = parent;
        }
        current
    }

    fn prefab_assets_by_path(&self) -> Vec<(String, ObjectId)> {
        let mut prefabs = self
            .host
            .prefab_assets()
            .into_iter()
            .map(|prefab| {
                let path = self.host.asset_path(prefab).unwrap_or_default().to_string();
                (path, prefab)
            })
            .collect::<Vec<_>>();
        prefabs.sort();
        prefabs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{GlobalObjectId, ObjectOrigin, ObjectSpec, SceneWorld, Transform};

    fn instance_object(
        world: &mut SceneWorld,
        name: &str,
        parent: Option<ObjectId>,
        prefab_instance_id: u64,
    ) -> ObjectId {
        let global_id = GlobalObjectId::prefab_instance_object("scene", 1, prefab_instance_id);
        world.spawn(ObjectSpec {
            name: name.to_string(),
            tag: None,
            parent,
            transform: Transform::default(),
            origin: ObjectOrigin::PrefabInstance,
            global_id,
        })
    }

    #[test]
    fn resolves_plain_scene_object_by_file_id() {
        let mut world = SceneWorld::new("scene");
        world.spawn_scene_object("Floor", 99);
        let cup = world.spawn_scene_object("Cup", 100);

        let resolver = IdentifierResolver::new(&world);
        assert_eq!(resolver.find_object("100", IdKind::FileId), Some(cup));
        assert_eq!(resolver.find_object("100", IdKind::FileId), Some(cup));
    }

    #[test]
    fn returns_topmost_ancestor_sharing_the_id() {
        let mut world = SceneWorld::new("scene");
        // B is enumerated before its parent A so the walk has work to do.
        let b = instance_object(&mut world, "B", None, 4242);
        let a = instance_object(&mut world, "A", None, 4242);
        let c = instance_object(&mut world, "C", Some(b), 777);
        assert!(world.set_parent(b, Some(a)));

        let resolver = IdentifierResolver::new(&world);
        assert_eq!(resolver.find_object("4242", IdKind::FileId), Some(a));
        assert_eq!(resolver.find_object("777", IdKind::FileId), Some(c));
        assert_eq!(resolver.object_file_id(b), Some(4242));
    }

    #[test]
    fn walk_stops_at_first_ancestor_with_a_different_id() {
        let mut world = SceneWorld::new("scene");
        let outer = instance_object(&mut world, "Outer", None, 1000);
        let middle = instance_object(&mut world, "Middle", Some(outer), 2000);
        let inner = instance_object(&mut world, "Inner", Some(middle), 2000);

        let resolver = IdentifierResolver::new(&world);
        assert_eq!(resolver.topmost_sharing_file_id(inner, 2000), middle);
        assert_eq!(resolver.find_object("1000", IdKind::FileId), Some(outer));
    }

    #[test]
    fn falls_back_to_prefab_assets_in_path_order() {
        let mut world = SceneWorld::new("scene");
        let later = world.spawn_prefab_asset("Zeta", "Assets/Zeta.prefab", 300);
        let earlier = world.spawn_prefab_asset("Alpha", "Assets/Alpha.prefab", 300);

        let resolver = IdentifierResolver::new(&world);
        assert_eq!(resolver.find_object("300", IdKind::FileId), Some(earlier));
        assert_ne!(Some(later), resolver.find_object("300", IdKind::FileId));
    }

    #[test]
    fn scene_match_beats_prefab_asset() {
        let mut world = SceneWorld::new("scene");
        world.spawn_prefab_asset("Cup", "Assets/Cup.prefab", 300);
        let scene_cup = world.spawn_scene_object("Cup", 300);

        let resolver = IdentifierResolver::new(&world);
        assert_eq!(resolver.find_object("300", IdKind::FileId), Some(scene_cup));
    }

    #[test]
    fn invalid_or_zero_file_ids_are_not_found() {
        let mut world = SceneWorld::new("scene");
        world.spawn_scene_object("Cup", 100);

        let resolver = IdentifierResolver::new(&world);
        assert_eq!(resolver.find_object("abc", IdKind::FileId), None);
        assert_eq!(resolver.find_object("0", IdKind::FileId), None);
        assert_eq!(resolver.find_object("101", IdKind::FileId), None);
    }

    #[test]
    fn guid_kind_uses_asset_guid_for_prefabs_and_global_id_otherwise() {
        let mut world = SceneWorld::new("scene");
        let cup = world.spawn_scene_object("Cup", 100);
        let plate = world.spawn_prefab_asset("Plate", "Assets/Plate.prefab", 5);

        let resolver = IdentifierResolver::new(&world);
        let cup_guid = resolver.object_guid(cup).expect("cup guid");
        assert_eq!(cup_guid, "GlobalObjectId_V1-2-scene-100-0");
        assert_eq!(resolver.find_object(&cup_guid, IdKind::Guid), Some(cup));

        let plate_guid = asset_guid_for_path("Assets/Plate.prefab");
        assert_eq!(resolver.find_object(&plate_guid, IdKind::Guid), Some(plate));
        assert_eq!(resolver.find_object("", IdKind::Guid), None);
        assert_eq!(resolver.find_object("nope", IdKind::Guid), None);
    }

    #[test]
    fn finds_components_in_scene_then_prefabs() {
        let mut world = SceneWorld::new("scene");
        let door = world.spawn_scene_object("Door", 10);
        let door_script = world.add_script_component(door, "DoorController", 11);
        let lamp = world.spawn_prefab_asset("Lamp", "Assets/Lamp.prefab", 20);
        let lamp_script = world.add_script_component(lamp, "LampController", 21);

        let resolver = IdentifierResolver::new(&world);
        assert_eq!(resolver.find_component("11"), Some(door_script));
        assert_eq!(resolver.find_component("21"), Some(lamp_script));
        assert_eq!(resolver.find_component("10"), None);
        assert_eq!(resolver.find_component("0"), None);
    }
}
