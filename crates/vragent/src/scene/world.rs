use tracing::debug;

use super::hashing::asset_guid_for_path;
use super::host::{ComponentId, ObjectId, ObjectOrigin, SceneHost, Transform, Vec3};
use super::stable_id::GlobalObjectId;
use crate::behavior::{Behavior, BehaviorKind};

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub tag: Option<String>,
    pub parent: Option<ObjectId>,
    pub transform: Transform,
    pub origin: ObjectOrigin,
    pub global_id: GlobalObjectId,
    behaviors: Vec<Behavior>,
    dirty: bool,
}

impl SceneObject {
    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Debug, Clone)]
pub struct ScriptComponent {
    pub id: ComponentId,
    pub owner: ObjectId,
    pub type_name: String,
    pub global_id: GlobalObjectId,
}

#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub name: String,
    pub tag: Option<String>,
    pub parent: Option<ObjectId>,
    pub transform: Transform,
    pub origin: ObjectOrigin,
    pub global_id: GlobalObjectId,
}

#[derive(Debug, Default)]
struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    fn allocate(&mut self) -> u64 {
        self.next = self.next.saturating_add(1);
        self.next
    }
}

/// In-memory editor scene plus its prefab assets. Enumeration follows
/// insertion order.
#[derive(Debug, Default)]
pub struct SceneWorld {
    scene_guid: String,
    allocator: HandleAllocator,
    objects: Vec<SceneObject>,
    components: Vec<ScriptComponent>,
    next_marker_file_id: u64,
}

const MARKER_FILE_ID_BASE: u64 = 9_000_000_000;

impl SceneWorld {
    pub fn new(scene_guid: &str) -> Self {
        Self {
            scene_guid: scene_guid.to_string(),
            ..Self::default()
        }
    }

    pub fn spawn(&mut self, spec: ObjectSpec) -> ObjectId {
        let id = ObjectId(self.allocator.allocate());
        self.objects.push(SceneObject {
            id,
            name: spec.name,
            tag: spec.tag,
            parent: spec.parent,
            transform: spec.transform,
            origin: spec.origin,
            global_id: spec.global_id,
            behaviors: Vec::new(),
            dirty: false,
        });
        id
    }

    pub fn spawn_scene_object(&mut self, name: &str, file_id: u64) -> ObjectId {
        let global_id = GlobalObjectId::scene_object(&self.scene_guid, file_id);
        self.spawn(ObjectSpec {
            name: name.to_string(),
            tag: None,
            parent: None,
            transform: Transform::default(),
            origin: ObjectOrigin::Scene,
            global_id,
        })
    }

    pub fn spawn_prefab_instance_object(
        &mut self,
        name: &str,
        parent: Option<ObjectId>,
        source_file_id: u64,
        prefab_instance_id: u64,
    ) -> ObjectId {
        let global_id = GlobalObjectId::prefab_instance_object(
            &self.scene_guid,
            source_file_id,
            prefab_instance_id,
        );
        self.spawn(ObjectSpec {
            name: name.to_string(),
            tag: None,
            parent,
            transform: Transform::default(),
            origin: ObjectOrigin::PrefabInstance,
            global_id,
        })
    }

    pub fn spawn_prefab_asset(&mut self, name: &str, asset_path: &str, file_id: u64) -> ObjectId {
        let global_id = GlobalObjectId::prefab_asset_object(&asset_guid_for_path(asset_path), file_id);
        self.spawn(ObjectSpec {
            name: name.to_string(),
            tag: None,
            parent: None,
            transform: Transform::default(),
            origin: ObjectOrigin::PrefabAsset {
                asset_path: asset_path.to_string(),
            },
            global_id,
        })
    }

    pub fn add_script_component(
        &mut self,
        owner: ObjectId,
        type_name: &str,
        file_id: u64,
    ) -> ComponentId {
        let guid = match self.find_object(owner).map(|object| &object.origin) {
            Some(ObjectOrigin::PrefabAsset { asset_path }) => asset_guid_for_path(asset_path),
            _ => self.scene_guid.clone(),
        };
        let id = ComponentId(self.allocator.allocate());
        self.components.push(ScriptComponent {
            id,
            owner,
            type_name: type_name.to_string(),
            global_id: GlobalObjectId::scene_object(&guid, file_id),
        });
        id
    }

    pub fn set_position(&mut self, id: ObjectId, position: Vec3) -> bool {
        match self.find_object_mut(id) {
            Some(object) => {
                object.transform.position = position;
                true
            }
            None => false,
        }
    }

    pub fn position(&self, id: ObjectId) -> Option<Vec3> {
        self.find_object(id).map(|object| object.transform.position)
    }

    pub fn set_parent(&mut self, id: ObjectId, parent: Option<ObjectId>) -> bool {
        if parent == Some(id) {
            return false;
        }
        match self.find_object_mut(id) {
            Some(object) => {
                object.parent = parent;
                true
            }
            None => false,
        }
    }

    pub fn find_object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn find_object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.id == id)
    }

    pub fn find_component(&self, id: ComponentId) -> Option<&ScriptComponent> {
        self.components.iter().find(|component| component.id == id)
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn total_behavior_count(&self) -> usize {
        self.objects.iter().map(|object| object.behaviors.len()).sum()
    }

    fn is_in_scene(object: &SceneObject) -> bool {
        !matches!(object.origin, ObjectOrigin::PrefabAsset { .. })
    }

    fn root_of(&self, id: ObjectId) -> ObjectId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    fn collect_subtree(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = vec![root];
        let mut index = 0;
        while index < out.len() {
            let current = out[index];
            out.extend(
                self.objects
                    .iter()
                    .filter(|object| object.parent == Some(current))
                    .map(|object| object.id),
            );
            index += 1;
        }
        out
    }
}

impl SceneHost for SceneWorld {
    fn scene_objects(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|object| Self::is_in_scene(object))
            .map(|object| object.id)
            .collect()
    }

    fn prefab_assets(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|object| {
                matches!(object.origin, ObjectOrigin::PrefabAsset { .. }) && object.parent.is_none()
            })
            .map(|object| object.id)
            .collect()
    }

    fn scene_components(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|component| {
                self.find_object(component.owner)
                    .is_some_and(Self::is_in_scene)
            })
            .map(|component| component.id)
            .collect()
    }

    fn prefab_components(&self, prefab: ObjectId) -> Vec<ComponentId> {
        let subtree = self.collect_subtree(prefab);
        self.components
            .iter()
            .filter(|component| subtree.contains(&component.owner))
            .map(|component| component.id)
            .collect()
    }

    fn object_name(&self, id: ObjectId) -> Option<&str> {
        self.find_object(id).map(|object| object.name.as_str())
    }

    fn object_tag(&self, id: ObjectId) -> Option<&str> {
        self.find_object(id).and_then(|object| object.tag.as_deref())
    }

    fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.find_object(id).and_then(|object| object.parent)
    }

    fn origin(&self, id: ObjectId) -> Option<&ObjectOrigin> {
        self.find_object(id).map(|object| &object.origin)
    }

    fn global_object_id(&self, id: ObjectId) -> Option<String> {
        self.find_object(id).map(|object| object.global_id.to_string())
    }

    fn component_owner(&self, id: ComponentId) -> Option<ObjectId> {
        self.find_component(id).map(|component| component.owner)
    }

    fn component_type(&self, id: ComponentId) -> Option<&str> {
        self.find_component(id)
            .map(|component| component.type_name.as_str())
    }

    fn component_global_id(&self, id: ComponentId) -> Option<String> {
        self.find_component(id)
            .map(|component| component.global_id.to_string())
    }

    fn transform(&self, id: ObjectId) -> Option<Transform> {
        self.find_object(id).map(|object| object.transform)
    }

    fn set_transform(&mut self, id: ObjectId, transform: Transform) -> bool {
        match self.find_object_mut(id) {
            Some(object) => {
                object.transform = transform;
                true
            }
            None => false,
        }
    }

    fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .filter(|object| Self::is_in_scene(object))
            .find(|object| object.name == name)
            .map(|object| object.id)
    }

    fn find_tagged(&self, tag: &str) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|object| Self::is_in_scene(object) && object.tag.as_deref() == Some(tag))
            .map(|object| object.id)
            .collect()
    }

    fn spawn_marker(&mut self, name: &str, position: Vec3, tag: &str) -> ObjectId {
        self.next_marker_file_id = self.next_marker_file_id.saturating_add(1);
        let global_id = GlobalObjectId::scene_object(
            &self.scene_guid,
            MARKER_FILE_ID_BASE + self.next_marker_file_id,
        );
        self.spawn(ObjectSpec {
            name: name.to_string(),
            tag: Some(tag.to_string()),
            parent: None,
            transform: Transform::at(position),
            origin: ObjectOrigin::Scene,
            global_id,
        })
    }

    fn destroy_immediate(&mut self, id: ObjectId) -> bool {
        if self.find_object(id).is_none() {
            return false;
        }
        let doomed = self.collect_subtree(id);
        self.objects.retain(|object| !doomed.contains(&object.id));
        self.components
            .retain(|component| !doomed.contains(&component.owner));
        debug!(object = %id, destroyed = doomed.len(), "object_destroyed");
        true
    }

    fn behavior(&self, id: ObjectId, kind: BehaviorKind) -> Option<&Behavior> {
        self.find_object(id)?
            .behaviors
            .iter()
            .find(|behavior| behavior.kind() == kind)
    }

    fn behavior_mut(&mut self, id: ObjectId, kind: BehaviorKind) -> Option<&mut Behavior> {
        self.find_object_mut(id)?
            .behaviors
            .iter_mut()
            .find(|behavior| behavior.kind() == kind)
    }

    fn attach_behavior(&mut self, id: ObjectId, kind: BehaviorKind) -> Option<&mut Behavior> {
        let object = self.find_object_mut(id)?;
        let index = match object
            .behaviors
            .iter()
            .position(|behavior| behavior.kind() == kind)
        {
            Some(index) => index,
            None => {
                object.behaviors.push(Behavior::new(kind));
                object.behaviors.len() - 1
            }
        };
        object.behaviors.get_mut(index)
    }

    fn detach_behavior(&mut self, id: ObjectId, kind: BehaviorKind) -> Option<Behavior> {
        let object = self.find_object_mut(id)?;
        let index = object
            .behaviors
            .iter()
            .position(|behavior| behavior.kind() == kind)?;
        Some(object.behaviors.remove(index))
    }

    fn behavior_count(&self, id: ObjectId) -> usize {
        self.find_object(id)
            .map(|object| object.behaviors.len())
            .unwrap_or(0)
    }

    fn mark_asset_dirty(&mut self, id: ObjectId) {
        let root = self.root_of(id);
        if let Some(object) = self.find_object_mut(root) {
            object.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefab_assets_are_not_scene_objects() {
        let mut world = SceneWorld::new("scene");
        let table = world.spawn_scene_object("Table", 1);
        let cup = world.spawn_prefab_asset("Cup", "Assets/Cup.prefab", 2);

        assert_eq!(world.scene_objects(), vec![table]);
        assert_eq!(world.prefab_assets(), vec![cup]);
        assert!(world.find_by_name("Cup").is_none());
        assert_eq!(world.asset_path(cup), Some("Assets/Cup.prefab"));
    }

    #[test]
    fn attach_behavior_reuses_existing_component_of_same_kind() {
        let mut world = SceneWorld::new("scene");
        let cup = world.spawn_scene_object("Cup", 1);

        world.attach_behavior(cup, BehaviorKind::Grabbable);
        world.attach_behavior(cup, BehaviorKind::Grabbable);
        world.attach_behavior(cup, BehaviorKind::Transformable);

        assert_eq!(world.behavior_count(cup), 2);
        assert!(world.detach_behavior(cup, BehaviorKind::Grabbable).is_some());
        assert!(world.detach_behavior(cup, BehaviorKind::Grabbable).is_none());
        assert_eq!(world.behavior_count(cup), 1);
    }

    #[test]
    fn destroy_removes_children_and_their_components() {
        let mut world = SceneWorld::new("scene");
        let root = world.spawn_prefab_instance_object("Rig", None, 1, 500);
        let hand = world.spawn_prefab_instance_object("Hand", Some(root), 2, 500);
        world.add_script_component(hand, "HandController", 3);
        let other = world.spawn_scene_object("Floor", 4);

        assert!(world.destroy_immediate(root));
        assert_eq!(world.scene_objects(), vec![other]);
        assert!(world.scene_components().is_empty());
        assert!(!world.destroy_immediate(root));
    }

    #[test]
    fn markers_are_tagged_and_findable() {
        let mut world = SceneWorld::new("scene");
        let marker = world.spawn_marker("Cup_TargetPosition", Vec3::new(1.0, 2.0, 3.0), "TempTarget");

        assert_eq!(world.find_tagged("TempTarget"), vec![marker]);
        assert_eq!(world.find_by_name("Cup_TargetPosition"), Some(marker));
        assert_eq!(world.position(marker), Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn marking_a_prefab_child_dirties_the_asset_root() {
        let mut world = SceneWorld::new("scene");
        let cup = world.spawn_prefab_asset("Cup", "Assets/Cup.prefab", 2);
        world.mark_asset_dirty(cup);
        assert!(world.find_object(cup).expect("cup").is_dirty());
    }
}
