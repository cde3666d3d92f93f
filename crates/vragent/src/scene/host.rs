use std::fmt;

use serde::{Deserialize, Serialize};

use crate::behavior::{Behavior, BehaviorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec3Repr", into = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Vec3Repr {
    Array([f32; 3]),
    Object { x: f32, y: f32, z: f32 },
}

impl From<Vec3Repr> for Vec3 {
    fn from(repr: Vec3Repr) -> Self {
        match repr {
            Vec3Repr::Array([x, y, z]) => Vec3 { x, y, z },
            Vec3Repr::Object { x, y, z } => Vec3 { x, y, z },
        }
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(value: Vec3) -> Self {
        [value.x, value.y, value.z]
    }
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const ONE: Vec3 = Vec3 {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, factor: f32) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        other.sub(self).length()
    }

    /// Steps toward `target` by at most `max_delta`; returns the new point and
    /// whether it landed on the target.
    pub fn move_towards(self, target: Vec3, max_delta: f32) -> (Vec3, bool) {
        let offset = target.sub(self);
        let distance = offset.length();
        if distance <= max_delta || distance <= f32::EPSILON {
            return (target, true);
        }
        (self.add(offset.scale(max_delta / distance)), false)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectOrigin {
    Scene,
    PrefabInstance,
    PrefabAsset { asset_path: String },
}

/// Capabilities the agent needs from the host editor. Scene enumeration order
/// must be stable between calls for resolution to be deterministic.
pub trait SceneHost {
    fn scene_objects(&self) -> Vec<ObjectId>;
    fn prefab_assets(&self) -> Vec<ObjectId>;
    fn scene_components(&self) -> Vec<ComponentId>;
    fn prefab_components(&self, prefab: ObjectId) -> Vec<ComponentId>;

    fn object_name(&self, id: ObjectId) -> Option<&str>;
    fn object_tag(&self, id: ObjectId) -> Option<&str>;
    fn parent(&self, id: ObjectId) -> Option<ObjectId>;
    fn origin(&self, id: ObjectId) -> Option<&ObjectOrigin>;
    fn global_object_id(&self, id: ObjectId) -> Option<String>;

    fn component_owner(&self, id: ComponentId) -> Option<ObjectId>;
    fn component_type(&self, id: ComponentId) -> Option<&str>;
    fn component_global_id(&self, id: ComponentId) -> Option<String>;

    fn transform(&self, id: ObjectId) -> Option<Transform>;
    fn set_transform(&mut self, id: ObjectId, transform: Transform) -> bool;

    fn find_by_name(&self, name: &str) -> Option<ObjectId>;
    fn find_tagged(&self, tag: &str) -> Vec<ObjectId>;
    fn spawn_marker(&mut self, name: &str, position: Vec3, tag: &str) -> ObjectId;
    fn destroy_immediate(&mut self, id: ObjectId) -> bool;

    fn behavior(&self, id: ObjectId, kind: BehaviorKind) -> Option<&Behavior>;
    fn behavior_mut(&mut self, id: ObjectId, kind: BehaviorKind) -> Option<&mut Behavior>;
    /// Returns the existing component of `kind`, attaching a default one first
    /// when the object has none.
    fn attach_behavior(&mut self, id: ObjectId, kind: BehaviorKind) -> Option<&mut Behavior>;
    fn detach_behavior(&mut self, id: ObjectId, kind: BehaviorKind) -> Option<Behavior>;
    fn behavior_count(&self, id: ObjectId) -> usize;

    fn mark_asset_dirty(&mut self, id: ObjectId);

    fn is_prefab_instance(&self, id: ObjectId) -> bool {
        matches!(self.origin(id), Some(ObjectOrigin::PrefabInstance))
    }

    fn is_prefab_asset(&self, id: ObjectId) -> bool {
        matches!(self.origin(id), Some(ObjectOrigin::PrefabAsset { .. }))
    }

    fn asset_path(&self, id: ObjectId) -> Option<&str> {
        match self.origin(id) {
            Some(ObjectOrigin::PrefabAsset { asset_path }) => Some(asset_path.as_str()),
            _ => None,
        }
    }

    fn display_name(&self, id: ObjectId) -> String {
        self.object_name(id)
            .map(ToString::to_string)
            .unwrap_or_else(|| id.to_string())
    }
}
